// Feed API client and page parser. All traffic goes through the fetch
// gateway; this layer knows the endpoint shapes and turns raw listings into
// playable candidates.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::comments::{self, Comment};
use crate::api::gateway::{FetchGateway, RequestOptions};
use crate::api::models::FeedListing;
use crate::api::video;
use crate::config::FeedConfig;
use crate::error::FetchError;

/// Listings change often; cache briefly.
const LISTING_TTL: Duration = Duration::from_secs(30);
/// Comment threads are stabler.
const COMMENTS_TTL: Duration = Duration::from_secs(60);

/// Feed ranking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOption {
    Hot,
    New,
    Top,
    Rising,
}

impl SortOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOption::Hot => "hot",
            SortOption::New => "new",
            SortOption::Top => "top",
            SortOption::Rising => "rising",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "hot" => Some(SortOption::Hot),
            "new" => Some(SortOption::New),
            "top" => Some(SortOption::Top),
            "rising" => Some(SortOption::Rising),
            _ => None,
        }
    }
}

/// Recency window, only meaningful with [`SortOption::Top`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Hour,
    Day,
    Week,
    Month,
    Year,
    All,
}

impl TimeWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Hour => "hour",
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
            TimeWindow::Month => "month",
            TimeWindow::Year => "year",
            TimeWindow::All => "all",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "hour" => Some(TimeWindow::Hour),
            "day" => Some(TimeWindow::Day),
            "week" => Some(TimeWindow::Week),
            "month" => Some(TimeWindow::Month),
            "year" => Some(TimeWindow::Year),
            "all" => Some(TimeWindow::All),
            _ => None,
        }
    }
}

/// A feed entry that passed URL filtering but isn't a Track yet.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub video_id: String,
    pub title: String,
    pub artist: Option<String>,
    pub source_url: String,
    pub created_utc: f64,
}

#[derive(Debug, Clone)]
pub struct ParsedPage {
    pub candidates: Vec<Candidate>,
    /// Continuation cursor, verbatim from the payload; None when exhausted.
    pub after: Option<String>,
}

#[derive(Clone)]
pub struct FeedClient {
    gateway: FetchGateway,
    base_url: String,
    options: RequestOptions,
}

impl FeedClient {
    pub fn new(gateway: FetchGateway, config: &FeedConfig) -> Self {
        Self {
            gateway,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            options: RequestOptions::with_user_agent(&config.user_agent),
        }
    }

    /// Fetch one page of a topic listing.
    pub async fn fetch_topic_page(
        &self,
        topic: &str,
        sort: SortOption,
        window: TimeWindow,
        limit: u64,
        after: Option<&str>,
    ) -> Result<FeedListing, FetchError> {
        let mut url = format!(
            "{}/r/{}/{}.json?limit={}&raw_json=1",
            self.base_url,
            topic,
            sort.as_str(),
            limit
        );
        if let Some(cursor) = after {
            url.push_str("&after=");
            url.push_str(cursor);
        }
        if sort == SortOption::Top {
            url.push_str("&t=");
            url.push_str(window.as_str());
        }

        let value = self.gateway.request(&url, &self.options, LISTING_TTL).await?;
        serde_json::from_value(value).map_err(|e| FetchError::Decode(e.to_string()))
    }

    /// Fetch the comment tree for a post, given its permalink.
    pub async fn fetch_comments(&self, permalink: &str) -> Result<Vec<Comment>, FetchError> {
        let (topic, post_id) = comments::parse_permalink(permalink)?;
        let url = format!("{}/r/{}/comments/{}.json", self.base_url, topic, post_id);
        let value = self.gateway.request(&url, &self.options, COMMENTS_TTL).await?;
        comments::parse_comment_tree(&value)
    }

    /// Turn a raw listing page into playable candidates plus the continuation
    /// cursor. Entries that don't link to a recognized video host, or whose id
    /// can't be extracted, are dropped silently: they're expected noise in
    /// open forum data.
    pub fn parse_page(&self, listing: &FeedListing) -> ParsedPage {
        let candidates = listing
            .data
            .children
            .iter()
            .map(|child| &child.data)
            .filter(|post| video::is_video_url(&post.url))
            .filter_map(|post| {
                let video_id = video::extract_video_id(&post.url)?;
                let (title, artist) = video::clean_title(&post.title);
                Some(Candidate {
                    video_id,
                    title,
                    artist,
                    source_url: format!("{}{}", self.base_url, post.permalink),
                    created_utc: post.created_utc,
                })
            })
            .collect();

        ParsedPage {
            candidates,
            after: listing.data.after.clone(),
        }
    }
}
