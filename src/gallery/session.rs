//! Gallery session state and the single reducer that mutates it.
//!
//! Every change arrives as an [`Intent`]. Remote work (listing, tile bytes) is
//! started by the caller from what the session reports as needed, and its
//! outcome comes back as another intent.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::{
    controls::{parse_tag_values, ControlPanel, ControlValue},
    pagination::{compute_visible_window, filter_resources, modulo, total_pages, PaginationState, VisibilityFilter},
    selection::SelectionSet,
    tiles::TileTracker,
};
use crate::{
    config::Config,
    resource::{suggested_filename, CacheEpoch, ResourceQuery},
    webeval::snippets,
};

/// Identity of a listing request; a different value means a different listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListingQuery {
    pub query: String,
    pub vars: BTreeMap<String, i64>,
}

impl ListingQuery {
    /// Code and bindings for the remote `glob_search` call.
    pub fn to_call(&self) -> (String, Map<String, Value>) {
        let replacements: Map<String, Value> =
            self.vars.iter().map(|(k, v)| (k.clone(), Value::from(*v))).collect();
        snippets::glob_search(&self.query, &replacements)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    Fetching(ListingQuery),
    Succeeded(ListingQuery),
    Failed { query: ListingQuery, error: String },
}

impl RequestState {
    fn query(&self) -> Option<&ListingQuery> {
        match self {
            Self::Idle => None,
            Self::Fetching(q) | Self::Succeeded(q) => Some(q),
            Self::Failed { query, .. } => Some(query),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    SetValue { name: String, value: ControlValue },
    ToggleSelection(String),
    /// Replace the selection wholesale (e.g. after an import).
    CommitSelection(Vec<String>),
    SetShowSelected(bool),
    SetShowDeselected(bool),
    SetPage(usize),
    NextPage,
    PrevPage,
    SetPageSize(usize),
    Roll(i64),
    /// Bump the cache epoch; every tile re-fetches.
    Reload,
    ListingStarted(ListingQuery),
    ListingArrived { query: ListingQuery, result: Result<Vec<String>, String> },
    TileLoaded { path: String, url: String, bytes: usize },
    TileFailed { path: String, url: String, reason: String },
}

/// A tile whose URL changed and must be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRequest {
    pub path: String,
    pub url: String,
}

#[derive(Debug)]
pub struct GallerySession {
    pub controls: ControlPanel,
    pub resources: Vec<String>,
    pub selection: SelectionSet,
    pub filter: VisibilityFilter,
    pub pagination: PaginationState,
    pub epoch: CacheEpoch,
    pub tiles: TileTracker,
    pub listing: RequestState,
    resource_base: String,
    content_type: String,
    /// Messages for the notification area, newest last.
    pub notices: Vec<String>,
}

impl GallerySession {
    pub fn from_config(cfg: &Config) -> Self {
        let query = cfg.get("PATH_QUERY").unwrap_or_default();
        let raw_vars = cfg.get("PATH_VARS").unwrap_or_default();
        let vars = parse_tag_values(&raw_vars).unwrap_or_else(|e| {
            warn!(error = %e, "ignoring PATH_VARS");
            BTreeMap::new()
        });
        let mut session = Self::new(cfg.resource_base(), cfg.get("CONTENT_TYPE").unwrap_or_else(|| "image/png".into()));
        session.controls = ControlPanel::path_searcher(&query, vars);
        session.pagination.set_page_size(cfg.page_size());
        session
    }

    pub fn new(resource_base: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            controls: ControlPanel::default(),
            resources: Vec::new(),
            selection: SelectionSet::default(),
            filter: VisibilityFilter::default(),
            pagination: PaginationState::default(),
            epoch: CacheEpoch::default(),
            tiles: TileTracker::default(),
            listing: RequestState::Idle,
            resource_base: resource_base.into(),
            content_type: content_type.into(),
            notices: Vec::new(),
        }
    }

    pub fn dispatch(&mut self, intent: Intent) {
        debug!(?intent, "gallery intent");
        match intent {
            Intent::SetValue { name, value } => {
                if let Err(e) = self.controls.set_value(&name, value) {
                    self.notify(e.to_string());
                }
            }
            Intent::ToggleSelection(path) => {
                self.selection.toggle(&path);
            }
            Intent::CommitSelection(paths) => {
                self.selection = paths.into_iter().collect();
                self.notify(format!("selection replaced ({} paths)", self.selection.len()));
            }
            Intent::SetShowSelected(show) => self.filter.show_selected = show,
            Intent::SetShowDeselected(show) => self.filter.show_deselected = show,
            Intent::SetPage(page) => self.pagination.page = page.max(1),
            Intent::NextPage => {
                let pages = self.total_pages().max(1);
                self.pagination.page = (self.current_page() + 1).min(pages);
            }
            Intent::PrevPage => {
                self.pagination.page = self.current_page().saturating_sub(1).max(1);
            }
            Intent::SetPageSize(size) => self.pagination.set_page_size(size),
            Intent::Roll(delta) => {
                let len = self.filtered_len() as i64;
                let shift = self.pagination.roll_shift + delta;
                self.pagination.roll_shift = if len > 0 { modulo(shift, len) } else { 0 };
            }
            Intent::Reload => {
                let epoch = self.epoch.bump();
                info!(epoch = epoch.value(), "cache epoch bumped");
            }
            Intent::ListingStarted(query) => {
                self.listing = RequestState::Fetching(query);
            }
            Intent::ListingArrived { query, result } => {
                // Responses are applied in arrival order; a stale one can land
                // after a newer one, and listing_needed() then asks again.
                match result {
                    Ok(paths) => {
                        debug!(count = paths.len(), "listing arrived");
                        self.resources = paths;
                        self.listing = RequestState::Succeeded(query);
                    }
                    Err(error) => {
                        self.resources.clear();
                        self.notify(format!("listing failed: {}", error));
                        self.listing = RequestState::Failed { query, error };
                    }
                }
            }
            Intent::TileLoaded { path, url, bytes } => {
                self.tiles.mark_loaded(&path, &url, bytes);
            }
            Intent::TileFailed { path, url, reason } => {
                self.tiles.mark_errored(&path, &url, reason);
            }
        }
    }

    fn notify(&mut self, message: String) {
        self.notices.push(message);
        if self.notices.len() > 20 {
            self.notices.remove(0);
        }
    }

    /// Listing identity derived from the current control values.
    pub fn current_listing(&self) -> ListingQuery {
        ListingQuery {
            query: self.controls.path_query(),
            vars: self.controls.path_vars(),
        }
    }

    /// The listing to fetch, if the controls no longer match the last request.
    pub fn listing_needed(&self) -> Option<ListingQuery> {
        let current = self.current_listing();
        match self.listing.query() {
            Some(q) if *q == current => None,
            _ => Some(current),
        }
    }

    pub fn filtered_len(&self) -> usize {
        filter_resources(&self.resources, &self.selection, self.filter).len()
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.filtered_len(), self.pagination.page_size)
    }

    pub fn current_page(&self) -> usize {
        self.pagination.clamped_page(self.filtered_len())
    }

    pub fn visible_window(&self) -> Vec<String> {
        compute_visible_window(
            &self.resources,
            &self.selection,
            self.filter.show_selected,
            self.filter.show_deselected,
            self.pagination.roll_shift,
            self.pagination.page,
            self.pagination.page_size,
        )
    }

    pub fn tile_url(&self, path: &str) -> String {
        ResourceQuery::new(snippets::file_bytes_expression(path), self.content_type.clone(), self.epoch)
            .url(&self.resource_base, &suggested_filename(path))
    }

    /// Bind every visible tile to its current URL and return those that need
    /// a fetch. Off-screen tiles are forgotten.
    pub fn sync_tiles(&mut self) -> Vec<TileRequest> {
        let window = self.visible_window();
        self.tiles.retain_paths(&window);
        let mut requests = Vec::new();
        for path in window {
            let url = self.tile_url(&path);
            if self.tiles.sync_url(&path, &url) {
                requests.push(TileRequest { path, url });
            }
        }
        requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::tiles::TileLoadState;

    fn session_with(paths: &[&str]) -> GallerySession {
        let mut s = GallerySession::new("/webeval/web/bytes", "image/png");
        s.controls = ControlPanel::path_searcher("/img/*{x}*", BTreeMap::from([("x".to_string(), 0)]));
        let query = s.current_listing();
        s.dispatch(Intent::ListingStarted(query.clone()));
        s.dispatch(Intent::ListingArrived {
            query,
            result: Ok(paths.iter().map(|p| p.to_string()).collect()),
        });
        s
    }

    #[test]
    fn listing_needed_tracks_control_identity() {
        let mut s = GallerySession::new("/b", "image/png");
        s.controls = ControlPanel::path_searcher("/img/*{x}*", BTreeMap::from([("x".to_string(), 0)]));
        let first = s.listing_needed().expect("idle session needs a listing");

        s.dispatch(Intent::ListingStarted(first.clone()));
        assert!(s.listing_needed().is_none());

        s.dispatch(Intent::SetValue { name: "PathVars".into(), value: ControlValue::TagValue("x".into(), 3) });
        let second = s.listing_needed().unwrap();
        assert_ne!(first, second);
        assert_eq!(second.vars.get("x"), Some(&3));
    }

    #[test]
    fn stale_listing_overwrites_then_refetches() {
        let mut s = session_with(&[]);
        let old = s.current_listing();
        s.dispatch(Intent::SetValue { name: "PathVars".into(), value: ControlValue::TagValue("x".into(), 1) });
        let new = s.current_listing();
        s.dispatch(Intent::ListingStarted(new.clone()));

        s.dispatch(Intent::ListingArrived { query: new, result: Ok(vec!["/new".into()]) });
        s.dispatch(Intent::ListingArrived { query: old, result: Ok(vec!["/old".into()]) });
        assert_eq!(s.resources, vec!["/old".to_string()]);
        assert!(s.listing_needed().is_some());
    }

    #[test]
    fn failed_listing_degrades_to_empty() {
        let mut s = session_with(&["/a"]);
        let q = s.current_listing();
        s.dispatch(Intent::ListingArrived { query: q.clone(), result: Err("boom".into()) });
        assert!(s.resources.is_empty());
        assert!(s.visible_window().is_empty());
        assert!(matches!(s.listing, RequestState::Failed { .. }));
        assert!(s.notices.last().unwrap().contains("boom"));
    }

    #[test]
    fn paging_and_rolling() {
        let mut s = session_with(&["/a", "/b", "/c", "/d", "/e"]);
        s.dispatch(Intent::SetPageSize(2));
        s.dispatch(Intent::Roll(2));
        assert_eq!(s.visible_window(), vec!["/c", "/d"]);

        s.dispatch(Intent::NextPage);
        s.dispatch(Intent::NextPage);
        s.dispatch(Intent::NextPage);
        assert_eq!(s.current_page(), 3);
        assert_eq!(s.visible_window(), vec!["/b"]);

        s.dispatch(Intent::Roll(-7));
        assert_eq!(s.pagination.roll_shift, 0);
        s.dispatch(Intent::PrevPage);
        assert_eq!(s.visible_window(), vec!["/c", "/d"]);
    }

    #[test]
    fn selection_filter_and_commit() {
        let mut s = session_with(&["/a", "/b", "/c"]);
        s.dispatch(Intent::ToggleSelection("/b".into()));
        s.dispatch(Intent::SetShowDeselected(false));
        assert_eq!(s.visible_window(), vec!["/b"]);

        s.dispatch(Intent::CommitSelection(vec!["/a".into(), "/gone".into()]));
        assert_eq!(s.visible_window(), vec!["/a"]);
        assert!(s.selection.contains("/gone"));
    }

    #[test]
    fn reload_resets_tiles_to_loading() {
        let mut s = session_with(&["/img.png"]);
        let requests = s.sync_tiles();
        assert_eq!(requests.len(), 1);
        let u0 = requests[0].url.clone();
        assert!(u0.contains("cache_key=0"));

        s.dispatch(Intent::TileLoaded { path: "/img.png".into(), url: u0.clone(), bytes: 42 });
        assert_eq!(s.tiles.state("/img.png"), Some(TileLoadState::Loaded));
        assert!(s.sync_tiles().is_empty());

        s.dispatch(Intent::Reload);
        assert_eq!(s.epoch.value(), 1);
        let requests = s.sync_tiles();
        assert_eq!(requests.len(), 1);
        assert_ne!(requests[0].url, u0);
        assert!(requests[0].url.contains("cache_key=1"));
        assert_eq!(s.tiles.state("/img.png"), Some(TileLoadState::Loading));

        // the old epoch's fetch finishing late changes nothing
        s.dispatch(Intent::TileFailed { path: "/img.png".into(), url: u0, reason: "late".into() });
        assert_eq!(s.tiles.state("/img.png"), Some(TileLoadState::Loading));
    }

    #[test]
    fn out_of_range_value_becomes_notice() {
        let mut s = session_with(&[]);
        s.dispatch(Intent::SetValue { name: "PathVars".into(), value: ControlValue::TagValue("x".into(), -4) });
        assert_eq!(s.controls.path_vars().get("x"), Some(&0));
        assert!(!s.notices.is_empty());
    }

    #[test]
    fn from_config_reads_path_controls() {
        let mut cfg = Config::from_file(std::path::Path::new("/nonexistent/.webevalrc"));
        cfg.set("PATH_QUERY", "/data/{x:05}/{frame}.png");
        cfg.set("PATH_VARS", "x=3, frame=10");
        cfg.set("PAGE_SIZE", "6");
        let s = GallerySession::from_config(&cfg);
        let listing = s.current_listing();
        assert_eq!(listing.query, "/data/{x:05}/{frame}.png");
        assert_eq!(listing.vars.get("frame"), Some(&10));
        assert_eq!(s.pagination.page_size, 6);
        assert!(s.tile_url("/data/00003/10.png").starts_with("http://127.0.0.1:8000/webeval/web/bytes/10.png?code="));

        cfg.set("PATH_VARS", "x=oops");
        assert!(GallerySession::from_config(&cfg).controls.path_vars().is_empty());
    }
}
