//! Events consumed by the gallery event loop.

use crossterm::event::{KeyEvent, MouseEvent};

use crate::gallery::ListingQuery;

#[derive(Debug)]
pub enum TuiEvent {
    /// User keyboard input
    Key(KeyEvent),
    /// Mouse click (tile selection / click position)
    Mouse(MouseEvent),
    /// Terminal was resized; the grid is recomputed on the next draw
    Resize,
    /// Listing response for `query`, in arrival order
    ListingArrived {
        query: ListingQuery,
        result: Result<Vec<String>, String>,
    },
    /// Bytes for a tile URL arrived
    TileLoaded { path: String, url: String, bytes: usize },
    /// Fetch for a tile URL failed
    TileFailed { path: String, url: String, reason: String },
}
