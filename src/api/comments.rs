// Comment-tree parsing for the comments view. The endpoint returns
// [postWrapper, commentsWrapper]; comments are t1-kind nodes nested through
// `replies`. Known bot accounts are filtered out at every depth.

use crate::api::models::{CommentChild, CommentListing, Replies};
use crate::error::FetchError;

/// Accounts whose comments are noise in every thread.
const BOT_AUTHORS: &[&str] = &["AutoModerator", "MusicMirrorMan", "B0tRank", "sneakpeekbot"];

/// One comment with its (already filtered) replies.
#[derive(Debug, Clone)]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub body: String,
    pub score: i64,
    pub created_utc: f64,
    pub replies: Vec<Comment>,
    pub depth: usize,
}

/// Split a permalink like `/r/{topic}/comments/{post_id}/{slug}/` into
/// `(topic, post_id)`.
pub fn parse_permalink(permalink: &str) -> Result<(String, String), FetchError> {
    let parts: Vec<&str> = permalink
        .trim_start_matches('/')
        .split('/')
        .filter(|p| !p.is_empty())
        .collect();
    match parts.as_slice() {
        ["r", topic, "comments", post_id, ..] if !topic.is_empty() && !post_id.is_empty() => {
            Ok((topic.to_string(), post_id.to_string()))
        }
        _ => Err(FetchError::InvalidReference(permalink.to_string())),
    }
}

/// Build the comment tree from the raw two-element payload.
pub fn parse_comment_tree(payload: &serde_json::Value) -> Result<Vec<Comment>, FetchError> {
    let wrappers = payload
        .as_array()
        .filter(|a| a.len() >= 2)
        .ok_or_else(|| FetchError::Decode("expected [post, comments] payload".to_string()))?;

    let listing: CommentListing = serde_json::from_value(wrappers[1].clone())
        .map_err(|e| FetchError::Decode(e.to_string()))?;

    Ok(collect_comments(&listing.data.children, 0))
}

fn collect_comments(children: &[CommentChild], depth: usize) -> Vec<Comment> {
    children
        .iter()
        .filter(|child| child.kind == "t1")
        .filter(|child| !BOT_AUTHORS.contains(&child.data.author.as_str()))
        .map(|child| {
            let data = &child.data;
            let replies = match &data.replies {
                Replies::Listing(listing) => collect_comments(&listing.data.children, depth + 1),
                Replies::Empty(_) | Replies::None => Vec::new(),
            };
            Comment {
                id: data.id.clone(),
                author: data.author.clone(),
                body: data
                    .body
                    .clone()
                    .or_else(|| data.selftext.clone())
                    .unwrap_or_default(),
                score: data.score,
                created_utc: data.created_utc,
                replies,
                depth,
            }
        })
        .collect()
}
