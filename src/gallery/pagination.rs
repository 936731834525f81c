//! Filter, roll and paginate a resource list into the visible window.

use super::selection::SelectionSet;

/// Always-non-negative remainder: `modulo(-1, 5) == 4`.
///
/// `y` must be positive.
pub fn modulo(x: i64, y: i64) -> i64 {
    ((x % y) + y) % y
}

/// Rotate `items` left by `shift` (first `shift` elements move to the end).
pub fn roll<T: Clone>(items: &[T], shift: i64) -> Vec<T> {
    if items.is_empty() {
        return Vec::new();
    }
    let s = modulo(shift, items.len() as i64) as usize;
    items[s..].iter().chain(&items[..s]).cloned().collect()
}

/// `ceil(n / page_size)`; a page size below 1 counts as 1.
pub fn total_pages(n: usize, page_size: usize) -> usize {
    n.div_ceil(page_size.max(1))
}

/// Which tiles are shown and where the window starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationState {
    pub page: usize,
    pub page_size: usize,
    pub roll_shift: i64,
}

impl PaginationState {
    pub fn new(page_size: usize) -> Self {
        Self { page: 1, page_size: page_size.max(1), roll_shift: 0 }
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
    }

    /// Page clamped to `[1, total_pages]` for a list of `n` visible items.
    pub fn clamped_page(&self, n: usize) -> usize {
        self.page.clamp(1, total_pages(n, self.page_size).max(1))
    }
}

impl Default for PaginationState {
    fn default() -> Self {
        Self::new(12)
    }
}

/// Filter flags: which side of the selection is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityFilter {
    pub show_selected: bool,
    pub show_deselected: bool,
}

impl Default for VisibilityFilter {
    fn default() -> Self {
        Self { show_selected: true, show_deselected: true }
    }
}

impl VisibilityFilter {
    pub fn admits(&self, selected: bool) -> bool {
        (selected && self.show_selected) || (!selected && self.show_deselected)
    }
}

/// Resources that pass the selection filter, in input order.
pub fn filter_resources<'a>(
    resources: &'a [String],
    selection: &SelectionSet,
    filter: VisibilityFilter,
) -> Vec<&'a String> {
    resources
        .iter()
        .filter(|path| filter.admits(selection.contains(path)))
        .collect()
}

/// The exact ordered window of paths to display.
///
/// Rolling happens on an index array over the filtered list, so successive
/// shifts compose additively. Out-of-range pages clamp; an empty filtered list
/// always yields an empty window.
pub fn compute_visible_window(
    resources: &[String],
    selection: &SelectionSet,
    show_selected: bool,
    show_deselected: bool,
    roll_shift: i64,
    page: usize,
    page_size: usize,
) -> Vec<String> {
    let filter = VisibilityFilter { show_selected, show_deselected };
    let filtered = filter_resources(resources, selection, filter);
    if filtered.is_empty() {
        return Vec::new();
    }

    let page_size = page_size.max(1);
    let indices: Vec<usize> = (0..filtered.len()).collect();
    let rolled = roll(&indices, roll_shift);

    let pages = total_pages(filtered.len(), page_size);
    let page = page.clamp(1, pages);
    rolled
        .chunks(page_size)
        .nth(page - 1)
        .unwrap_or_default()
        .iter()
        .map(|&i| filtered[i].clone())
        .collect()
}
