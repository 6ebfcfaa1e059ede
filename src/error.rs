// Error taxonomy for the fetch and playlist layers. Queue and playback
// operations never error; bad input degrades to a no-op there.

use thiserror::Error;

/// Errors surfaced by the fetch gateway and the feed client.
///
/// Cloneable because coalesced requests hand the same result to every
/// concurrent caller.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Retries exhausted with the upstream repeatedly answering 429.
    #[error("rate limited by upstream after {attempts} attempts")]
    RateLimited { attempts: u32 },

    /// Non-recoverable upstream status, or a transient failure that survived
    /// every retry.
    #[error("upstream error (status {status:?}, attempts {attempts}): {message}")]
    Upstream {
        status: Option<u16>,
        attempts: u32,
        message: String,
    },

    /// Malformed permalink or identifier handed to the comments fetcher.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// Response body was not the JSON we expected.
    #[error("malformed response body: {0}")]
    Decode(String),
}

/// Errors surfaced by the playlist builder.
#[derive(Debug, Clone, Error)]
pub enum PlaylistError {
    /// The topic yielded no eligible video entries.
    #[error("no playable video links found in \"{topic}\"")]
    Empty { topic: String },

    #[error(transparent)]
    Fetch(#[from] FetchError),
}
