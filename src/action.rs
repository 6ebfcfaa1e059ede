// Every user command, async result, and engine event is an Action variant.
// The App event loop consumes them one at a time, so no two handlers ever
// interleave on the queue.

use crate::api::comments::Comment;
use crate::api::feed::{SortOption, TimeWindow};
use crate::player::EngineState;
use crate::playlist::Playlist;

#[derive(Debug, Clone)]
pub enum Action {
    Quit,

    // Playlist lifecycle
    GeneratePlaylist {
        topic: String,
        sort: Option<SortOption>,
        window: Option<TimeWindow>,
        target: usize,
    },
    PlaylistReady(Playlist),
    LoadPlaylist(String),
    DeletePlaylist(String),
    RefreshPlaylist(String),

    // Queue edits
    PlayTrackAt(usize),
    NextTrack,
    PrevTrack,
    RemoveTrack(String),
    ToggleShuffle,
    ClearQueue,

    // Playback controls
    TogglePlayPause,
    Stop,
    CycleRepeat,
    SeekTo(f64),
    VolumeUp,
    VolumeDown,

    // Engine events (from the playback adapter)
    PlaybackLoading,
    PlaybackPosition(f64),
    EngineState(EngineState),
    EngineError(String),

    // Visibility
    Background,
    Foreground,

    // Comments view
    LoadComments {
        permalink: String,
    },
    CommentsLoaded(Vec<Comment>),

    // Preferences
    SetSort(SortOption),
    SetWindow(TimeWindow),

    // Errors
    ShowError(String),
    ClearError,
}
