//! Grid retrieval.
//!
//! Grids live outside the session (bundled resources, a directory, a
//! remote store), so sessions fetch them through the [`GridSource`]
//! trait. A fetch failure is recoverable and must leave the session's
//! current overlay untouched; callers surface the error and move on.

use std::fs;
use std::io;
use std::path::PathBuf;

use irismap_core::overlay::{grid_file_name, DEFAULT_MAPS};
use thiserror::Error;

/// Errors raised while fetching a grid file.
#[derive(Debug, Error)]
pub enum GridError {
    /// No grid file with this name exists in the source
    #[error("Grid not found: {name}")]
    NotFound { name: String },

    /// The source could not be read
    #[error("Failed to read grid: {0}")]
    Io(#[from] io::Error),
}

/// A provider of grid SVG markup by file name.
///
/// File names follow the `{map_name}_{eye_id}.svg` convention from
/// [`grid_file_name`].
pub trait GridSource {
    /// Fetch the raw (untrusted) markup of one grid file.
    fn fetch(&self, file_name: &str) -> Result<String, GridError>;

    /// Map names this source can serve. Defaults to the built-in catalog.
    fn available_maps(&self) -> Vec<String> {
        DEFAULT_MAPS.iter().map(|name| name.to_string()).collect()
    }
}

/// Grid source backed by a directory of SVG files.
#[derive(Debug, Clone)]
pub struct DirGridSource {
    root: PathBuf,
}

impl DirGridSource {
    /// Create a source reading from `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl GridSource for DirGridSource {
    fn fetch(&self, file_name: &str) -> Result<String, GridError> {
        let path = self.root.join(file_name);
        match fs::read_to_string(&path) {
            Ok(markup) => Ok(markup),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Err(GridError::NotFound {
                name: file_name.to_string(),
            }),
            Err(error) => Err(error.into()),
        }
    }

    /// Map names for which both eyes' files are present on disk.
    fn available_maps(&self) -> Vec<String> {
        let mut maps: Vec<String> = DEFAULT_MAPS
            .iter()
            .filter(|name| {
                self.root.join(grid_file_name(name, "L")).is_file()
                    && self.root.join(grid_file_name(name, "R")).is_file()
            })
            .map(|name| name.to_string())
            .collect();
        maps.sort();
        maps
    }
}

/// In-memory grid source for tests.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;

    #[derive(Debug, Default)]
    pub(crate) struct MemoryGridSource {
        files: HashMap<String, String>,
    }

    impl MemoryGridSource {
        pub(crate) fn with_file(mut self, name: &str, markup: &str) -> Self {
            self.files.insert(name.to_string(), markup.to_string());
            self
        }
    }

    impl GridSource for MemoryGridSource {
        fn fetch(&self, file_name: &str) -> Result<String, GridError> {
            self.files
                .get(file_name)
                .cloned()
                .ok_or_else(|| GridError::NotFound {
                    name: file_name.to_string(),
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MemoryGridSource;
    use super::*;

    #[test]
    fn test_memory_source_fetch() {
        let source = MemoryGridSource::default().with_file("Jensen_EN_01_L.svg", "<svg/>");
        assert_eq!(source.fetch("Jensen_EN_01_L.svg").unwrap(), "<svg/>");
        assert!(matches!(
            source.fetch("Jensen_EN_01_R.svg"),
            Err(GridError::NotFound { .. })
        ));
    }

    #[test]
    fn test_default_available_maps_is_catalog() {
        let source = MemoryGridSource::default();
        let maps = source.available_maps();
        assert_eq!(maps.len(), 8);
        assert!(maps.contains(&"Angerer_DE_01".to_string()));
    }

    #[test]
    fn test_dir_source_missing_file_is_not_found() {
        let source = DirGridSource::new("/nonexistent-grid-root");
        assert!(matches!(
            source.fetch("Jensen_EN_01_L.svg"),
            Err(GridError::NotFound { .. })
        ));
    }

    #[test]
    fn test_dir_source_lists_nothing_when_empty() {
        let source = DirGridSource::new("/nonexistent-grid-root");
        assert!(source.available_maps().is_empty());
    }
}
