//! Per-tile lazy load state.
//!
//! A tile is identified by its path and bound to the URL it is currently
//! fetching. The URL embeds the cache epoch, so both a new path and a new epoch
//! show up here as a URL change, which resets the tile to `Loading`.

use std::collections::HashMap;

use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileLoadState {
    Loading,
    Loaded,
    Errored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub url: String,
    pub state: TileLoadState,
    /// Payload size once loaded.
    pub bytes: Option<usize>,
    /// Failure text once errored.
    pub error: Option<String>,
}

impl Tile {
    fn loading(url: String) -> Self {
        Self { url, state: TileLoadState::Loading, bytes: None, error: None }
    }
}

/// Load state for every tile that has been shown.
#[derive(Debug, Default)]
pub struct TileTracker {
    tiles: HashMap<String, Tile>,
}

impl TileTracker {
    /// Bind `path` to `url`. Returns true when the URL changed (or the tile is
    /// new), i.e. the tile went back to `Loading` and needs a fetch.
    pub fn sync_url(&mut self, path: &str, url: &str) -> bool {
        match self.tiles.get_mut(path) {
            Some(tile) if tile.url == url => false,
            Some(tile) => {
                *tile = Tile::loading(url.to_string());
                true
            }
            None => {
                self.tiles.insert(path.to_string(), Tile::loading(url.to_string()));
                true
            }
        }
    }

    /// `Loading -> Loaded`. Ignored if the tile has since moved to another URL.
    pub fn mark_loaded(&mut self, path: &str, url: &str, bytes: usize) -> bool {
        match self.current_loading(path, url) {
            Some(tile) => {
                tile.state = TileLoadState::Loaded;
                tile.bytes = Some(bytes);
                true
            }
            None => {
                debug!(path, "discarding stale tile load");
                false
            }
        }
    }

    /// `Loading -> Errored`. Ignored if the tile has since moved to another URL.
    pub fn mark_errored(&mut self, path: &str, url: &str, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        match self.current_loading(path, url) {
            Some(tile) => {
                warn!(path, error = %reason, "tile failed to load");
                tile.state = TileLoadState::Errored;
                tile.error = Some(reason);
                true
            }
            None => false,
        }
    }

    fn current_loading(&mut self, path: &str, url: &str) -> Option<&mut Tile> {
        self.tiles
            .get_mut(path)
            .filter(|tile| tile.url == url && tile.state == TileLoadState::Loading)
    }

    pub fn get(&self, path: &str) -> Option<&Tile> {
        self.tiles.get(path)
    }

    pub fn state(&self, path: &str) -> Option<TileLoadState> {
        self.tiles.get(path).map(|t| t.state)
    }

    /// Forget tiles that are no longer on screen.
    pub fn retain_paths<'a, I>(&mut self, visible: I)
    where
        I: IntoIterator<Item = &'a String>,
    {
        let keep: std::collections::HashSet<&String> = visible.into_iter().collect();
        self.tiles.retain(|path, _| keep.contains(path));
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loading_then_loaded() {
        let mut tiles = TileTracker::default();
        assert!(tiles.sync_url("/a.png", "u0"));
        assert_eq!(tiles.state("/a.png"), Some(TileLoadState::Loading));
        assert!(!tiles.sync_url("/a.png", "u0"));

        assert!(tiles.mark_loaded("/a.png", "u0", 10));
        assert_eq!(tiles.state("/a.png"), Some(TileLoadState::Loaded));
        assert_eq!(tiles.get("/a.png").unwrap().bytes, Some(10));
    }

    #[test]
    fn terminal_states_do_not_transition_without_url_change() {
        let mut tiles = TileTracker::default();
        tiles.sync_url("/a.png", "u0");
        tiles.mark_errored("/a.png", "u0", "404");
        assert!(!tiles.mark_loaded("/a.png", "u0", 3));
        assert_eq!(tiles.state("/a.png"), Some(TileLoadState::Errored));

        // same URL again: no retry
        assert!(!tiles.sync_url("/a.png", "u0"));
        assert_eq!(tiles.state("/a.png"), Some(TileLoadState::Errored));
    }

    #[test]
    fn url_change_resets_errored_tile() {
        let mut tiles = TileTracker::default();
        tiles.sync_url("/a.png", "u0");
        tiles.mark_errored("/a.png", "u0", "boom");

        assert!(tiles.sync_url("/a.png", "u1"));
        let tile = tiles.get("/a.png").unwrap();
        assert_eq!(tile.state, TileLoadState::Loading);
        assert!(tile.error.is_none());
    }

    #[test]
    fn late_result_for_old_url_is_ignored() {
        let mut tiles = TileTracker::default();
        tiles.sync_url("/a.png", "u0");
        tiles.sync_url("/a.png", "u1");
        assert!(!tiles.mark_loaded("/a.png", "u0", 5));
        assert!(!tiles.mark_errored("/a.png", "u0", "late"));
        assert_eq!(tiles.state("/a.png"), Some(TileLoadState::Loading));
    }

    #[test]
    fn retain_drops_offscreen_tiles() {
        let mut tiles = TileTracker::default();
        tiles.sync_url("/a", "ua");
        tiles.sync_url("/b", "ub");
        let visible = vec!["/b".to_string()];
        tiles.retain_paths(&visible);
        assert_eq!(tiles.len(), 1);
        assert!(tiles.get("/a").is_none());
    }
}
