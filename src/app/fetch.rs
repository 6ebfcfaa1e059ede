// Background fetch tasks: playlist generation and comment loading. Results
// come back over the action channel.

use crate::action::Action;
use crate::api::feed::{SortOption, TimeWindow};
use crate::app::App;
use crate::error::{FetchError, PlaylistError};

impl App {
    pub(super) fn spawn_generate(
        &self,
        topic: String,
        sort: SortOption,
        window: TimeWindow,
        target: usize,
    ) {
        let builder = self.builder.clone();
        let tx = self.action_tx();
        tokio::spawn(async move {
            match builder.build(&topic, sort, window, target).await {
                Ok(playlist) => tx.send(Action::PlaylistReady(playlist)).ok(),
                Err(e) => tx.send(Action::ShowError(user_message(&e))).ok(),
            };
        });
    }

    pub(super) fn spawn_fetch_comments(&self, permalink: String) {
        let client = self.feed_client.clone();
        let tx = self.action_tx();
        tokio::spawn(async move {
            match client.fetch_comments(&permalink).await {
                Ok(comments) => tx.send(Action::CommentsLoaded(comments)).ok(),
                Err(e) => tx.send(Action::ShowError(e.to_string())).ok(),
            };
        });
    }
}

/// Rate limiting gets its own phrasing so the user knows waiting will help.
fn user_message(error: &PlaylistError) -> String {
    match error {
        PlaylistError::Fetch(FetchError::RateLimited { .. }) => {
            format!("{} (try again shortly)", error)
        }
        _ => error.to_string(),
    }
}
