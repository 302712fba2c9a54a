//! Tape timeline: albums laid out along the tape by start position.
//!
//! - [`builder`]: builds a [`Timeline`] from catalog metadata
//! - [`resolver`]: maps a tape position to the photo under it
//! - [`store`]: holds the current timeline snapshot

pub mod builder;
pub mod resolver;
pub mod store;

use serde::Serialize;

pub use builder::{build_timeline, parse_tape_descriptor, BuildWarning, DescriptorError, TapeDescriptor, TimelineBuild};
pub use resolver::{resolve, Resolved};
pub use store::TimelineStore;

/// A single displayable photo, identified by its content hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub content_hash: String,
}

impl Photo {
    pub fn new(content_hash: impl Into<String>) -> Self {
        Self {
            content_hash: content_hash.into(),
        }
    }
}

/// One contiguous stretch of the tape.
///
/// Occupies positions `[start_index, start_index + photos.len() - 1]`; an
/// album without photos occupies nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Album {
    /// Catalog UID.
    pub id: String,
    pub tape_id: String,
    pub category: String,
    pub title: String,
    pub color_tag: String,
    pub start_index: i64,
    /// Photos in catalog order.
    pub photos: Vec<Photo>,
}

impl Album {
    /// Last position covered by this album, or `None` if it has no photos.
    pub fn end_index(&self) -> Option<i64> {
        let len = i64::try_from(self.photos.len()).ok()?;
        (len > 0).then(|| self.start_index.saturating_add(len - 1))
    }

    /// Whether `position` falls inside this album's range.
    pub fn contains(&self, position: i64) -> bool {
        self.end_index()
            .is_some_and(|end| position >= self.start_index && position <= end)
    }

    /// Whether the ranges of `self` and `other` share any position.
    pub fn overlaps(&self, other: &Album) -> bool {
        match (self.end_index(), other.end_index()) {
            (Some(a_end), Some(b_end)) => {
                self.start_index <= b_end && other.start_index <= a_end
            }
            _ => false,
        }
    }
}

/// Per-album view exposed by the HTTP API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumSummary {
    pub id: String,
    pub tape_id: String,
    pub category: String,
    pub title: String,
    pub color: String,
    pub start_index: i64,
    pub end_index: Option<i64>,
    pub photo_count: usize,
}

/// Ordered set of albums for one tape.
///
/// Albums are always sorted ascending by `start_index`. Albums sharing a
/// start index keep their catalog order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    albums: Vec<Album>,
}

impl Timeline {
    /// Creates a timeline, sorting `albums` by start index.
    pub fn new(mut albums: Vec<Album>) -> Self {
        albums.sort_by_key(|a| a.start_index);
        Self { albums }
    }

    pub fn albums(&self) -> &[Album] {
        &self.albums
    }

    pub fn len(&self) -> usize {
        self.albums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.albums.is_empty()
    }

    /// Total number of photos across all albums.
    pub fn photo_count(&self) -> usize {
        self.albums.iter().map(|a| a.photos.len()).sum()
    }

    /// Returns the photo at `position`, if any. See [`resolve`].
    pub fn resolve(&self, position: i64) -> Option<Resolved<'_>> {
        resolve(self, position)
    }

    /// Pairs of album indices whose ranges overlap.
    pub fn overlapping_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (i, a) in self.albums.iter().enumerate() {
            for (j, b) in self.albums.iter().enumerate().skip(i + 1) {
                // Sorted by start: once b starts past a's end nothing later overlaps a.
                match a.end_index() {
                    Some(end) if b.start_index > end => break,
                    _ => {}
                }
                if a.overlaps(b) {
                    pairs.push((i, j));
                }
            }
        }
        pairs
    }

    pub fn summary(&self) -> Vec<AlbumSummary> {
        self.albums
            .iter()
            .map(|a| AlbumSummary {
                id: a.id.clone(),
                tape_id: a.tape_id.clone(),
                category: a.category.clone(),
                title: a.title.clone(),
                color: a.color_tag.clone(),
                start_index: a.start_index,
                end_index: a.end_index(),
                photo_count: a.photos.len(),
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Album starting at `start` with `len` photos hashed `"{id}-{n}"`.
    pub fn album(id: &str, start: i64, len: usize) -> Album {
        Album {
            id: id.to_string(),
            tape_id: "1".to_string(),
            category: "trip".to_string(),
            title: format!("Album {id}"),
            color_tag: "red".to_string(),
            start_index: start,
            photos: (0..len).map(|n| Photo::new(format!("{id}-{n}"))).collect(),
        }
    }
}
