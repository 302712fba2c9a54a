//! Builds a [`Timeline`] from catalog metadata.
//!
//! Tape albums are recognised by a descriptor in their description field:
//!
//! ```text
//! TAPE|<tapeId>|<category>|<title>|<colorTag>|<startIndex>
//! ```
//!
//! Bad records never abort a build. Albums with unusable descriptors are
//! dropped, and an album whose photo listing fails is kept with no photos.
//! Each such problem is logged and reported as a [`BuildWarning`].

use std::fmt;

use futures::future::join_all;
use thiserror::Error;

use super::{Album, Photo, Timeline};
use crate::catalog::{CatalogClient, CatalogResult, RawAlbum};
use crate::protocol_constants::{
    TAPE_DESCRIPTOR_FIELDS, TAPE_DESCRIPTOR_PREFIX, TAPE_DESCRIPTOR_SEPARATOR,
};

// ─────────────────────────────────────────────────────────────────────────────
// Descriptor Parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Classification fields decoded from an album descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapeDescriptor {
    pub tape_id: String,
    pub category: String,
    pub title: String,
    pub color_tag: String,
    pub start_index: i64,
}

/// Reasons a description is not a usable tape descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// Description does not start with `TAPE|`.
    #[error("not a tape descriptor")]
    NotTape,

    /// Fewer pipe-delimited fields than required.
    #[error("expected at least 6 fields, found {0}")]
    TooFewFields(usize),

    /// The start index is not an integer.
    #[error("start index {0:?} is not an integer")]
    InvalidStartIndex(String),
}

/// Parses a `TAPE|...` descriptor. Fields past the sixth are ignored.
pub fn parse_tape_descriptor(description: &str) -> Result<TapeDescriptor, DescriptorError> {
    if !description.starts_with(TAPE_DESCRIPTOR_PREFIX) {
        return Err(DescriptorError::NotTape);
    }

    let fields: Vec<&str> = description
        .split(TAPE_DESCRIPTOR_SEPARATOR)
        .map(str::trim)
        .collect();
    if fields.len() < TAPE_DESCRIPTOR_FIELDS {
        return Err(DescriptorError::TooFewFields(fields.len()));
    }

    let start_index = fields[5]
        .parse::<i64>()
        .map_err(|_| DescriptorError::InvalidStartIndex(fields[5].to_string()))?;

    Ok(TapeDescriptor {
        tape_id: fields[1].to_string(),
        category: fields[2].to_string(),
        title: fields[3].to_string(),
        color_tag: fields[4].to_string(),
        start_index,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Build
// ─────────────────────────────────────────────────────────────────────────────

/// Data problem encountered while building a timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildWarning {
    /// Album looked like a tape album but its descriptor was unusable; album dropped.
    MalformedDescriptor {
        album_uid: String,
        error: DescriptorError,
    },
    /// Photo listing failed; album kept with no photos.
    PhotoFetchFailed {
        album_uid: String,
        title: String,
        message: String,
    },
    /// Photos without a content hash were skipped.
    MissingPhotoHash { album_uid: String, skipped: usize },
    /// Two albums cover some of the same positions; the earlier one wins.
    OverlappingAlbums { first: String, second: String },
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedDescriptor { album_uid, error } => {
                write!(f, "album {} dropped: {}", album_uid, error)
            }
            Self::PhotoFetchFailed {
                album_uid,
                title,
                message,
            } => write!(
                f,
                "album {} ({}) has no photos, listing failed: {}",
                album_uid, title, message
            ),
            Self::MissingPhotoHash { album_uid, skipped } => {
                write!(f, "album {}: skipped {} photo(s) without hash", album_uid, skipped)
            }
            Self::OverlappingAlbums { first, second } => {
                write!(f, "albums {} and {} overlap", first, second)
            }
        }
    }
}

/// Result of a timeline build.
#[derive(Debug, Clone, Default)]
pub struct TimelineBuild {
    pub timeline: Timeline,
    pub warnings: Vec<BuildWarning>,
}

/// Builds a timeline from the catalog.
///
/// Fails only if the album list itself cannot be fetched; the caller should
/// then keep its previous timeline.
pub async fn build_timeline(
    catalog: &dyn CatalogClient,
    album_count: u32,
    photo_count: u32,
) -> CatalogResult<TimelineBuild> {
    let raw_albums = catalog.list_albums(album_count).await?;
    log::debug!("[Timeline] Catalog returned {} album(s)", raw_albums.len());

    let mut warnings = Vec::new();
    let mut tape_albums = select_tape_albums(&raw_albums, &mut warnings);
    tape_albums.sort_by_key(|(_, d)| d.start_index);

    let listings = join_all(
        tape_albums
            .iter()
            .map(|(uid, _)| catalog.list_photos(uid, photo_count)),
    )
    .await;

    let mut albums = Vec::with_capacity(tape_albums.len());
    for ((uid, descriptor), listing) in tape_albums.into_iter().zip(listings) {
        let photos = match listing {
            Ok(raw_photos) => {
                let total = raw_photos.len();
                let photos: Vec<Photo> = raw_photos
                    .into_iter()
                    .filter_map(|p| p.hash.filter(|h| !h.is_empty()))
                    .map(Photo::new)
                    .collect();
                if photos.len() < total {
                    warnings.push(BuildWarning::MissingPhotoHash {
                        album_uid: uid.clone(),
                        skipped: total - photos.len(),
                    });
                }
                photos
            }
            Err(e) => {
                warnings.push(BuildWarning::PhotoFetchFailed {
                    album_uid: uid.clone(),
                    title: descriptor.title.clone(),
                    message: e.to_string(),
                });
                Vec::new()
            }
        };

        albums.push(Album {
            id: uid,
            tape_id: descriptor.tape_id,
            category: descriptor.category,
            title: descriptor.title,
            color_tag: descriptor.color_tag,
            start_index: descriptor.start_index,
            photos,
        });
    }

    let timeline = Timeline::new(albums);
    for (i, j) in timeline.overlapping_pairs() {
        warnings.push(BuildWarning::OverlappingAlbums {
            first: timeline.albums()[i].id.clone(),
            second: timeline.albums()[j].id.clone(),
        });
    }

    for warning in &warnings {
        log::warn!("[Timeline] {}", warning);
    }
    log::info!(
        "[Timeline] Built timeline: {} album(s), {} photo(s), {} warning(s)",
        timeline.len(),
        timeline.photo_count(),
        warnings.len()
    );

    Ok(TimelineBuild { timeline, warnings })
}

/// Picks albums carrying a tape descriptor, decoding each one.
fn select_tape_albums(
    raw_albums: &[RawAlbum],
    warnings: &mut Vec<BuildWarning>,
) -> Vec<(String, TapeDescriptor)> {
    raw_albums
        .iter()
        .filter_map(|raw| {
            let description = raw.description.as_deref()?;
            match parse_tape_descriptor(description) {
                Ok(descriptor) => Some((raw.uid.clone(), descriptor)),
                Err(DescriptorError::NotTape) => None,
                Err(error) => {
                    warnings.push(BuildWarning::MalformedDescriptor {
                        album_uid: raw.uid.clone(),
                        error,
                    });
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogError, RawPhoto};
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// In-memory catalog. Albums missing from `photos` fail their listing.
    struct FakeCatalog {
        albums: CatalogResult<Vec<RawAlbum>>,
        photos: HashMap<String, Vec<RawPhoto>>,
    }

    impl FakeCatalog {
        fn new(albums: Vec<RawAlbum>) -> Self {
            Self {
                albums: Ok(albums),
                photos: HashMap::new(),
            }
        }

        fn with_photos(mut self, uid: &str, hashes: &[&str]) -> Self {
            let photos = hashes
                .iter()
                .map(|h| RawPhoto {
                    hash: Some(h.to_string()),
                })
                .collect();
            self.photos.insert(uid.to_string(), photos);
            self
        }
    }

    #[async_trait]
    impl CatalogClient for FakeCatalog {
        async fn list_albums(&self, _count: u32) -> CatalogResult<Vec<RawAlbum>> {
            match &self.albums {
                Ok(albums) => Ok(albums.clone()),
                Err(_) => Err(CatalogError::UnexpectedShape("object".into())),
            }
        }

        async fn list_photos(&self, album_uid: &str, _count: u32) -> CatalogResult<Vec<RawPhoto>> {
            self.photos
                .get(album_uid)
                .cloned()
                .ok_or_else(|| CatalogError::HttpStatus(500, "boom".into()))
        }
    }

    fn raw(uid: &str, description: &str) -> RawAlbum {
        RawAlbum {
            uid: uid.to_string(),
            description: Some(description.to_string()),
            title: None,
        }
    }

    #[test]
    fn parses_full_descriptor() {
        let d = parse_tape_descriptor("TAPE|7|holiday|Summer in Rome|Orange|120").unwrap();
        assert_eq!(d.tape_id, "7");
        assert_eq!(d.category, "holiday");
        assert_eq!(d.title, "Summer in Rome");
        assert_eq!(d.color_tag, "Orange");
        assert_eq!(d.start_index, 120);
    }

    #[test]
    fn extra_fields_are_ignored() {
        let d = parse_tape_descriptor("TAPE|1|a|b|red|5|extra|more").unwrap();
        assert_eq!(d.start_index, 5);
    }

    #[test]
    fn descriptor_errors() {
        assert_eq!(parse_tape_descriptor("Family photos"), Err(DescriptorError::NotTape));
        assert_eq!(parse_tape_descriptor("tape|1|a|b|red|5"), Err(DescriptorError::NotTape));
        assert_eq!(
            parse_tape_descriptor("TAPE|1|a|b|red"),
            Err(DescriptorError::TooFewFields(5))
        );
        assert_eq!(
            parse_tape_descriptor("TAPE|1|a|b|red|ten"),
            Err(DescriptorError::InvalidStartIndex("ten".into()))
        );
    }

    #[tokio::test]
    async fn build_orders_albums_by_start_index() {
        let catalog = FakeCatalog::new(vec![
            raw("c", "TAPE|1|x|C|red|40"),
            raw("a", "TAPE|1|x|A|green|10"),
            raw("b", "TAPE|1|x|B|blue|25"),
        ])
        .with_photos("a", &["a0"])
        .with_photos("b", &["b0"])
        .with_photos("c", &["c0"]);

        let build = build_timeline(&catalog, 100, 200).await.unwrap();
        let starts: Vec<_> = build.timeline.albums().iter().map(|a| a.start_index).collect();
        assert_eq!(starts, vec![10, 25, 40]);
        assert!(build.warnings.is_empty());
    }

    #[tokio::test]
    async fn malformed_and_foreign_albums_are_dropped() {
        let catalog = FakeCatalog::new(vec![
            raw("ok", "TAPE|1|x|Ok|red|0"),
            raw("short", "TAPE|1|x"),
            raw("nan", "TAPE|1|x|Bad|red|abc"),
            raw("other", "Birthday party"),
            RawAlbum {
                uid: "nodesc".into(),
                ..Default::default()
            },
        ])
        .with_photos("ok", &["h0", "h1"]);

        let build = build_timeline(&catalog, 100, 200).await.unwrap();
        assert_eq!(build.timeline.len(), 1);
        assert_eq!(build.timeline.albums()[0].id, "ok");
        assert_eq!(build.warnings.len(), 2);
        assert!(build.warnings.iter().all(|w| matches!(w, BuildWarning::MalformedDescriptor { .. })));
    }

    #[tokio::test]
    async fn photo_fetch_failure_is_isolated() {
        let catalog = FakeCatalog::new(vec![
            raw("a", "TAPE|1|x|A|red|0"),
            raw("broken", "TAPE|1|x|Broken|red|3"),
            raw("c", "TAPE|1|x|C|red|6"),
        ])
        .with_photos("a", &["a0", "a1"])
        .with_photos("c", &["c0"]);

        let build = build_timeline(&catalog, 100, 200).await.unwrap();
        let counts: Vec<_> = build.timeline.albums().iter().map(|a| a.photos.len()).collect();
        assert_eq!(counts, vec![2, 0, 1]);
        assert!(matches!(
            &build.warnings[..],
            [BuildWarning::PhotoFetchFailed { album_uid, .. }] if album_uid == "broken"
        ));
        assert_eq!(build.timeline.resolve(6).unwrap().photo.content_hash, "c0");
    }

    #[tokio::test]
    async fn photos_without_hash_are_skipped() {
        let mut catalog = FakeCatalog::new(vec![raw("a", "TAPE|1|x|A|red|0")]);
        catalog.photos.insert(
            "a".into(),
            vec![
                RawPhoto { hash: Some("h0".into()) },
                RawPhoto { hash: None },
                RawPhoto { hash: Some(String::new()) },
                RawPhoto { hash: Some("h1".into()) },
            ],
        );

        let build = build_timeline(&catalog, 100, 200).await.unwrap();
        let hashes: Vec<_> = build.timeline.albums()[0]
            .photos
            .iter()
            .map(|p| p.content_hash.as_str())
            .collect();
        assert_eq!(hashes, vec!["h0", "h1"]);
        assert_eq!(
            build.warnings,
            vec![BuildWarning::MissingPhotoHash {
                album_uid: "a".into(),
                skipped: 2
            }]
        );
    }

    #[tokio::test]
    async fn overlaps_are_reported_not_corrected() {
        let catalog = FakeCatalog::new(vec![
            raw("a", "TAPE|1|x|A|red|0"),
            raw("b", "TAPE|1|x|B|red|1"),
        ])
        .with_photos("a", &["a0", "a1", "a2"])
        .with_photos("b", &["b0", "b1"]);

        let build = build_timeline(&catalog, 100, 200).await.unwrap();
        assert_eq!(build.timeline.len(), 2);
        assert_eq!(
            build.warnings,
            vec![BuildWarning::OverlappingAlbums {
                first: "a".into(),
                second: "b".into()
            }]
        );
        assert_eq!(build.timeline.resolve(1).unwrap().album.id, "a");
    }

    #[tokio::test]
    async fn album_list_failure_is_an_error() {
        let catalog = FakeCatalog {
            albums: Err(CatalogError::UnexpectedShape("object".into())),
            photos: HashMap::new(),
        };
        assert!(build_timeline(&catalog, 100, 200).await.is_err());
    }
}
