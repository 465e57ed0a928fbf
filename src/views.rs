use crate::query::Filter;
use crate::timeline::Interval;
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A filter saved under a name, with the display settings it was saved with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedView {
    pub name: String,
    #[serde(default)]
    pub filter: Filter,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asc: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<Interval>,
}

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid saved view: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub fn collect_view_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let walker = WalkBuilder::new(dir)
        .hidden(false)
        .git_ignore(true)
        .git_global(false)
        .git_exclude(false)
        .add_custom_ignore_filename(".mediaqignore")
        .build();

    for entry in walker.flatten() {
        let path = entry.path();
        let is_yaml = path
            .extension()
            .is_some_and(|ext| ext == "yaml" || ext == "yml");
        if path.is_file() && is_yaml {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    files
}

pub fn load_view(path: &Path) -> Result<SavedView, ViewError> {
    let content = fs::read_to_string(path).map_err(|source| ViewError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_view(&content)
}

pub fn parse_view(content: &str) -> Result<SavedView, ViewError> {
    Ok(serde_yaml::from_str(content)?)
}

/// Loads every view under `dir`, skipping files that fail to load.
pub fn load_dir(dir: &Path) -> Vec<SavedView> {
    collect_view_files(dir)
        .into_iter()
        .filter_map(|path| match load_view(&path) {
            Ok(view) => Some(view),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "skipping saved view");
                None
            }
        })
        .collect()
}

/// Views whose filter is exactly `filter`.
pub fn find_matching<'a>(
    views: &'a [SavedView],
    filter: &'a Filter,
) -> impl Iterator<Item = &'a SavedView> {
    views.iter().filter(move |view| &view.filter == filter)
}
