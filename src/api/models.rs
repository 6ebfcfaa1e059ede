// Serde models for the feed API wire format.

use serde::{Deserialize, Serialize};

// ── Topic listing ──

/// Top-level response of `/{topic}/{sort}.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedListing {
    pub data: FeedListingData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedListingData {
    pub children: Vec<FeedChild>,
    /// Opaque pagination cursor; null when the feed is exhausted.
    pub after: Option<String>,
    #[serde(default)]
    pub before: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedChild {
    pub data: FeedPost,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPost {
    pub id: String,
    pub title: String,
    pub url: String,
    pub permalink: String,
    pub author: String,
    #[serde(default)]
    pub score: i64,
    pub created_utc: f64,
    #[serde(default)]
    pub num_comments: u64,
}

// ── Comments listing ──
//
// The comments endpoint returns a two-element array: the post wrapper and the
// comments wrapper. Comment nodes are `t1`-kind children; `replies` is either
// a nested listing or, in the upstream's quirky way, the empty string.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentListing {
    pub data: CommentListingData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentListingData {
    pub children: Vec<CommentChild>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentChild {
    pub kind: String,
    pub data: CommentData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentData {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub selftext: Option<String>,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub replies: Replies,
}

/// `replies` comes back as `""` (or null) when a comment has none.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Replies {
    Listing(Box<CommentListing>),
    Empty(String),
    None,
}

impl Default for Replies {
    fn default() -> Self {
        Replies::None
    }
}
