//! Extension filter deciding which file names are images

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Default image extensions
pub const DEFAULT_IMAGE_EXTENSIONS: &[&str] =
    &["jpg", "jpeg", "png", "gif", "webp", "bmp", "tiff", "tif"];

/// Case-insensitive set of file name suffixes.
///
/// Entries are stored lowercase with a leading dot, so `png`, `.png` and
/// `.PNG` all describe the same suffix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ExtensionFilter {
    suffixes: BTreeSet<String>,
}

impl ExtensionFilter {
    /// Build a filter from user supplied extensions. Blank entries are ignored.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let suffixes = extensions
            .into_iter()
            .filter_map(|ext| normalize(ext.as_ref()))
            .collect();
        Self { suffixes }
    }

    /// Filter matching the default image extensions
    pub fn images() -> Self {
        Self::new(DEFAULT_IMAGE_EXTENSIONS)
    }

    /// Whether `name` ends with one of the suffixes, ignoring case
    pub fn matches(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.suffixes.iter().any(|suffix| name.ends_with(suffix.as_str()))
    }

    /// Normalized suffixes, each with a leading dot
    pub fn suffixes(&self) -> impl Iterator<Item = &str> {
        self.suffixes.iter().map(String::as_str)
    }

    /// Whether the filter matches nothing
    pub fn is_empty(&self) -> bool {
        self.suffixes.is_empty()
    }
}

impl Default for ExtensionFilter {
    fn default() -> Self {
        Self::images()
    }
}

impl From<Vec<String>> for ExtensionFilter {
    fn from(extensions: Vec<String>) -> Self {
        Self::new(extensions)
    }
}

impl From<ExtensionFilter> for Vec<String> {
    fn from(filter: ExtensionFilter) -> Self {
        filter.suffixes.into_iter().collect()
    }
}

fn normalize(ext: &str) -> Option<String> {
    let ext = ext.trim().trim_start_matches('.');
    if ext.is_empty() {
        return None;
    }
    Some(format!(".{}", ext.to_lowercase()))
}
