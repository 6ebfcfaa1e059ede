// Playback queue. `current_index` is the single source of truth; the current
// track is derived from it. No operation here errors: out-of-range or
// empty-queue calls degrade to no-ops or None.

use rand::seq::SliceRandom;

use crate::playlist::Track;

pub struct Queue {
    tracks: Vec<Track>,
    /// Pre-shuffle snapshot, used to restore order and relocate the playing
    /// track by id after un-shuffling.
    original_order: Vec<Track>,
    current_index: usize,
    is_shuffled: bool,
}

impl Default for Queue {
    fn default() -> Self {
        Self::new()
    }
}

impl Queue {
    pub fn new() -> Self {
        Self {
            tracks: Vec::new(),
            original_order: Vec::new(),
            current_index: 0,
            is_shuffled: false,
        }
    }

    /// Replace the whole queue. Resets the pointer to 0 and drops any shuffle.
    pub fn load_tracks(&mut self, tracks: Vec<Track>) {
        self.original_order = tracks.clone();
        self.tracks = tracks;
        self.current_index = 0;
        self.is_shuffled = false;
    }

    /// Append a single track to both the queue and the original-order snapshot.
    pub fn add_track(&mut self, track: Track) {
        self.original_order.push(track.clone());
        self.tracks.push(track);
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn is_shuffled(&self) -> bool {
        self.is_shuffled
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current(&self) -> Option<&Track> {
        self.tracks.get(self.current_index)
    }

    /// Jump to a specific position. Out-of-range requests are ignored.
    pub fn set_current_index(&mut self, index: usize) -> Option<&Track> {
        if index < self.tracks.len() {
            self.current_index = index;
            self.tracks.get(index)
        } else {
            None
        }
    }

    /// Advance with wraparound. None when the queue is empty.
    pub fn next(&mut self) -> Option<&Track> {
        if self.tracks.is_empty() {
            return None;
        }
        self.current_index = (self.current_index + 1) % self.tracks.len();
        self.tracks.get(self.current_index)
    }

    /// Retreat with wraparound. None when the queue is empty.
    pub fn previous(&mut self) -> Option<&Track> {
        if self.tracks.is_empty() {
            return None;
        }
        self.current_index = if self.current_index == 0 {
            self.tracks.len() - 1
        } else {
            self.current_index - 1
        };
        self.tracks.get(self.current_index)
    }

    /// Remove a track by id from both the working queue and the snapshot,
    /// keeping the pointer on the track that was playing where possible.
    pub fn remove(&mut self, track_id: &str) {
        let Some(removed_index) = self.tracks.iter().position(|t| t.id == track_id) else {
            return;
        };
        self.tracks.remove(removed_index);
        self.original_order.retain(|t| t.id != track_id);

        if removed_index < self.current_index {
            self.current_index = self.current_index.saturating_sub(1);
        } else if removed_index == self.current_index && self.current_index >= self.tracks.len() {
            self.current_index = self.tracks.len().saturating_sub(1);
        }
    }

    /// Toggle shuffle. Enabling shuffles the queue and swaps the playing track
    /// into slot 0 so playback continues uninterrupted; disabling restores the
    /// snapshot and relocates the pointer by track id (falling back to 0 if
    /// the track has since been removed).
    pub fn toggle_shuffle(&mut self) {
        if self.is_shuffled {
            let current_id = self.current().map(|t| t.id.clone());
            self.tracks = self.original_order.clone();
            self.current_index = current_id
                .and_then(|id| self.tracks.iter().position(|t| t.id == id))
                .unwrap_or(0);
            self.is_shuffled = false;
        } else {
            if self.tracks.is_empty() {
                self.is_shuffled = true;
                return;
            }
            let current_id = self.current().map(|t| t.id.clone());
            self.tracks.shuffle(&mut rand::thread_rng());
            if let Some(id) = current_id {
                if let Some(pos) = self.tracks.iter().position(|t| t.id == id) {
                    self.tracks.swap(0, pos);
                }
            }
            self.current_index = 0;
            self.is_shuffled = true;
        }
    }

    /// Empty the queue (Empty state: pointer back to 0, shuffle off).
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.original_order.clear();
        self.current_index = 0;
        self.is_shuffled = false;
    }
}
