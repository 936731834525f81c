//! Paginated, selectable gallery over a dynamically listed set of paths.

pub mod controls;
pub mod pagination;
pub mod selection;
pub mod session;
pub mod tiles;

pub use pagination::{compute_visible_window, modulo, roll, total_pages, PaginationState};
pub use selection::SelectionSet;
pub use session::{GallerySession, Intent, ListingQuery, RequestState};
pub use tiles::{TileLoadState, TileTracker};

/// Click position inside a tile as fractions of its size, each in `[0, 1]`.
///
/// `(x, y)` is relative to the tile's top-left corner.
pub fn normalized_click(x: u16, y: u16, width: u16, height: u16) -> (f64, f64) {
    let frac = |v: u16, extent: u16| {
        if extent == 0 {
            0.0
        } else {
            (f64::from(v) / f64::from(extent)).clamp(0.0, 1.0)
        }
    };
    (frac(x, width), frac(y, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_is_normalized() {
        assert_eq!(normalized_click(5, 10, 10, 40), (0.5, 0.25));
        assert_eq!(normalized_click(50, 0, 10, 0), (1.0, 0.0));
    }
}
