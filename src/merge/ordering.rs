//! Merge ordering strategies.
//!
//! An [`OrderingMode`] decides the order in which validated sources are
//! concatenated. Keys are gathered once per source, then the sources are
//! sorted with a stable insertion sort. A key that cannot be read compares
//! equal to everything, which makes the relation non-transitive; insertion
//! sort stays deterministic under such a relation where the standard
//! library sorts are allowed to panic.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;
use tracing::warn;

use crate::config::ComparatorFallback;
use crate::error::{MergeError, Result};
use crate::io::SourceDescriptor;

/// Strategy for ordering sources in the merged document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OrderingMode {
    /// Keep the input order.
    #[default]
    #[serde(rename = "orderProvided")]
    AsProvided,
    /// Byte-wise order of display names.
    #[serde(rename = "byFileName")]
    ByDisplayName,
    /// Modification time of each source's temp file.
    #[serde(rename = "byDateModified")]
    ByModifiedTime,
    /// Creation time of each source's temp file.
    #[serde(rename = "byDateCreated")]
    ByCreatedTime,
    /// Title metadata of each document.
    #[serde(rename = "byPDFTitle")]
    ByDocumentTitle,
}

impl OrderingMode {
    /// All modes, in the order their tokens are listed in messages.
    pub const ALL: [OrderingMode; 5] = [
        Self::AsProvided,
        Self::ByDisplayName,
        Self::ByModifiedTime,
        Self::ByCreatedTime,
        Self::ByDocumentTitle,
    ];

    /// Wire token of this mode.
    pub fn token(&self) -> &'static str {
        match self {
            Self::AsProvided => "orderProvided",
            Self::ByDisplayName => "byFileName",
            Self::ByModifiedTime => "byDateModified",
            Self::ByCreatedTime => "byDateCreated",
            Self::ByDocumentTitle => "byPDFTitle",
        }
    }

    /// Compute the merge order of `sources`.
    ///
    /// Returns indices into `sources`. `title_of` is asked for the title of
    /// the document at an index and is only called for
    /// [`OrderingMode::ByDocumentTitle`]. A document without a title sorts
    /// as the empty string.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a key cannot be read and `fallback` is
    /// [`ComparatorFallback::Abort`].
    pub async fn order<F>(
        self,
        sources: &[SourceDescriptor],
        mut title_of: F,
        fallback: ComparatorFallback,
    ) -> Result<Vec<usize>>
    where
        F: FnMut(usize) -> Result<Option<String>>,
    {
        let mut keys = Vec::with_capacity(sources.len());
        for (idx, source) in sources.iter().enumerate() {
            let key = match self {
                Self::AsProvided => SortKey::Unordered,
                Self::ByDisplayName => SortKey::Text(source.display_name.clone()),
                Self::ByModifiedTime => file_time(source, |m| m.modified()).await,
                Self::ByCreatedTime => file_time(source, |m| m.created()).await,
                Self::ByDocumentTitle => match title_of(idx) {
                    Ok(title) => SortKey::Text(title.unwrap_or_default()),
                    Err(e) => SortKey::Unreadable(e.to_string()),
                },
            };

            if let SortKey::Unreadable(reason) = &key {
                match fallback {
                    ComparatorFallback::Abort => {
                        return Err(MergeError::io(format!(
                            "Could not read {} sort key of {source}: {reason}",
                            self.token()
                        )));
                    }
                    ComparatorFallback::TreatAsEqual => {
                        warn!(source = %source, mode = %self, %reason, "Sort key unreadable, treating as equal");
                    }
                }
            }
            keys.push(key);
        }

        Ok(stable_order(&keys))
    }
}

impl fmt::Display for OrderingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for OrderingMode {
    type Err = MergeError;

    /// Parse an ordering mode from its wire token.
    ///
    /// # Errors
    ///
    /// Returns a validation error for unknown tokens.
    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.token() == s.trim())
            .ok_or_else(|| {
                let tokens: Vec<_> = Self::ALL.iter().map(|m| m.token()).collect();
                MergeError::validation(format!(
                    "Unknown sort type: {s}. Must be one of: {}",
                    tokens.join(", ")
                ))
            })
    }
}

/// Key a source is ordered by.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SortKey {
    Unordered,
    Text(String),
    Time(SystemTime),
    Unreadable(String),
}

impl SortKey {
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Self::Time(a), Self::Time(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

async fn file_time<F>(source: &SourceDescriptor, pick: F) -> SortKey
where
    F: FnOnce(&std::fs::Metadata) -> std::io::Result<SystemTime>,
{
    match tokio::fs::metadata(&source.local_path).await {
        Ok(metadata) => match pick(&metadata) {
            Ok(time) => SortKey::Time(time),
            Err(e) => SortKey::Unreadable(e.to_string()),
        },
        Err(e) => SortKey::Unreadable(e.to_string()),
    }
}

/// Stable insertion sort over key indices. An element only moves left past
/// neighbours that compare strictly greater.
fn stable_order(keys: &[SortKey]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    for i in 1..order.len() {
        let mut j = i;
        while j > 0 && keys[order[j - 1]].compare(&keys[order[j]]) == Ordering::Greater {
            order.swap(j - 1, j);
            j -= 1;
        }
    }
    order
}
