//! User-curated set of selected resource paths.

use std::{collections::HashSet, fs, path::Path};

use crate::error::SelectionError;

/// Membership is the only semantic. Paths that no longer appear in the
/// resource list stay in the set and simply match nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    paths: HashSet<String>,
}

impl SelectionSet {
    /// Flip membership of `path`; returns whether it is now selected.
    pub fn toggle(&mut self, path: &str) -> bool {
        if self.paths.remove(path) {
            false
        } else {
            self.paths.insert(path.to_string());
            true
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn clear(&mut self) {
        self.paths.clear();
    }

    /// Sorted copy of the members.
    pub fn to_sorted_vec(&self) -> Vec<String> {
        let mut list: Vec<String> = self.paths.iter().cloned().collect();
        list.sort();
        list
    }

    /// JSON array of the selected paths. Sorted so repeated exports diff cleanly.
    pub fn export_json(&self) -> String {
        serde_json::to_string_pretty(&self.to_sorted_vec()).unwrap_or_else(|_| "[]".to_string())
    }

    /// Replace the current set with the paths of a JSON array.
    ///
    /// On error the current set is left untouched.
    pub fn import_json(&mut self, text: &str) -> Result<(), SelectionError> {
        let list: Vec<String> = serde_json::from_str(text)?;
        self.paths = list.into_iter().collect();
        Ok(())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SelectionError> {
        let io_err = |source| SelectionError::Io { path: path.display().to_string(), source };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, self.export_json()).map_err(io_err)
    }

    pub fn load_from(&mut self, path: &Path) -> Result<(), SelectionError> {
        let text = fs::read_to_string(path)
            .map_err(|source| SelectionError::Io { path: path.display().to_string(), source })?;
        self.import_json(&text)
    }
}

impl FromIterator<String> for SelectionSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self { paths: iter.into_iter().collect() }
    }
}
