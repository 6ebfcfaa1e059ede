// Playlist model and builder. The builder paginates a topic feed through the
// feed client until it has enough unique tracks, the cursor runs out, or the
// page cap is hit.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::feed::{Candidate, FeedClient, SortOption, TimeWindow};
use crate::api::video;
use crate::error::PlaylistError;

/// Posts requested per page.
pub const PAGE_SIZE: u64 = 100;
/// Pagination cap; guarantees termination even if the feed keeps handing out
/// continuation cursors.
pub const MAX_PAGE_ATTEMPTS: u32 = 5;

/// One playable track. Immutable once created; `id` is unique per construction
/// even when the same video shows up in two playlists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub video_id: String,
    pub title: String,
    pub artist: Option<String>,
    pub source_url: Option<String>,
    pub thumbnail_url: Option<String>,
    /// Milliseconds since the epoch.
    pub added_at: i64,
}

impl Track {
    pub fn from_candidate(candidate: Candidate) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            thumbnail_url: Some(video::thumbnail_url(&candidate.video_id)),
            video_id: candidate.video_id,
            title: candidate.title,
            artist: candidate.artist,
            source_url: Some(candidate.source_url),
            added_at: (candidate.created_utc * 1000.0) as i64,
        }
    }

    /// Canonical watch URL, what the player actually loads.
    pub fn watch_url(&self) -> String {
        video::watch_url(&self.video_id)
    }

    /// "Artist - Title" when the artist is known, bare title otherwise.
    pub fn display_title(&self) -> String {
        match &self.artist {
            Some(artist) => format!("{} - {}", artist, self.title),
            None => self.title.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub topic: String,
    pub sort: SortOption,
    pub window: TimeWindow,
    pub tracks: Vec<Track>,
    pub created_at: i64,
    pub last_updated: i64,
}

#[derive(Clone)]
pub struct PlaylistBuilder {
    client: FeedClient,
}

impl PlaylistBuilder {
    pub fn new(client: FeedClient) -> Self {
        Self { client }
    }

    /// Build a playlist for a topic. Pages through the feed, deduplicating by
    /// video id, until `target` tracks are collected, the feed is exhausted,
    /// or [`MAX_PAGE_ATTEMPTS`] pages have been consumed.
    pub async fn build(
        &self,
        topic: &str,
        sort: SortOption,
        window: TimeWindow,
        target: usize,
    ) -> Result<Playlist, PlaylistError> {
        let mut tracks: Vec<Track> = Vec::new();
        let mut after: Option<String> = None;
        let mut pages = 0u32;

        while tracks.len() < target && pages < MAX_PAGE_ATTEMPTS {
            let listing = self
                .client
                .fetch_topic_page(topic, sort, window, PAGE_SIZE, after.as_deref())
                .await?;
            let page = self.client.parse_page(&listing);

            for candidate in page.candidates {
                if tracks.iter().any(|t| t.video_id == candidate.video_id) {
                    continue;
                }
                tracks.push(Track::from_candidate(candidate));
                if tracks.len() >= target {
                    break;
                }
            }

            match page.after {
                Some(cursor) => after = Some(cursor),
                None => break, // feed exhausted
            }
            pages += 1;
        }

        if tracks.is_empty() {
            return Err(PlaylistError::Empty {
                topic: topic.to_string(),
            });
        }

        tracing::info!(topic, count = tracks.len(), pages, "playlist built");
        let now = now_millis();
        Ok(Playlist {
            id: Uuid::new_v4().to_string(),
            name: format!("{} - {}", topic, sort.as_str()),
            topic: topic.to_string(),
            sort,
            window,
            tracks,
            created_at: now,
            last_updated: now,
        })
    }
}

pub fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
