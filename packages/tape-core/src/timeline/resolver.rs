//! Position → photo resolution.

use super::{Album, Photo, Timeline};

/// A photo located on the tape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved<'a> {
    pub album: &'a Album,
    pub photo: &'a Photo,
    /// Index of `photo` within `album.photos`.
    pub photo_index: usize,
}

/// Returns the photo under `position`, or `None` when the position falls in
/// a gap, before the first album or past the last one.
///
/// Albums are scanned in ascending start order and the first album whose
/// range contains `position` wins, even if a later album overlaps it.
pub fn resolve(timeline: &Timeline, position: i64) -> Option<Resolved<'_>> {
    let album = timeline.albums().iter().find(|a| a.contains(position))?;
    let photo_index = usize::try_from(position - album.start_index).ok()?;
    let photo = album.photos.get(photo_index)?;
    Some(Resolved {
        album,
        photo,
        photo_index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::test_support::album;

    fn scenario() -> Timeline {
        Timeline::new(vec![album("first", 0, 3), album("second", 5, 2)])
    }

    #[test]
    fn resolves_inside_first_album() {
        let timeline = scenario();
        let hit = resolve(&timeline, 2).unwrap();
        assert_eq!(hit.album.id, "first");
        assert_eq!(hit.photo_index, 2);
        assert_eq!(hit.photo.content_hash, "first-2");
    }

    #[test]
    fn gap_between_albums_is_none() {
        assert!(resolve(&scenario(), 4).is_none());
        assert!(resolve(&scenario(), 3).is_none());
    }

    #[test]
    fn resolves_inside_second_album() {
        let timeline = scenario();
        let hit = resolve(&timeline, 6).unwrap();
        assert_eq!(hit.album.id, "second");
        assert_eq!(hit.photo_index, 1);
    }

    #[test]
    fn out_of_range_positions_are_none() {
        let timeline = scenario();
        for position in [-1, 7, 100, i64::MIN, i64::MAX] {
            assert!(resolve(&timeline, position).is_none(), "position {position}");
        }
    }

    #[test]
    fn every_position_in_range_maps_to_its_photo() {
        let timeline = Timeline::new(vec![album("a", 10, 4), album("b", 20, 3), album("c", -5, 2)]);
        for a in timeline.albums() {
            let end = a.end_index().unwrap();
            for p in a.start_index..=end {
                let hit = resolve(&timeline, p).unwrap();
                assert_eq!(hit.album.id, a.id);
                let index = (p - a.start_index) as usize;
                assert_eq!(hit.photo_index, index);
                assert_eq!(hit.photo, &a.photos[index]);
            }
        }
    }

    #[test]
    fn first_album_wins_on_overlap() {
        let timeline = Timeline::new(vec![album("late", 2, 5), album("early", 0, 4)]);
        let hit = resolve(&timeline, 3).unwrap();
        assert_eq!(hit.album.id, "early");
        assert_eq!(hit.photo_index, 3);

        let hit = resolve(&timeline, 5).unwrap();
        assert_eq!(hit.album.id, "late");
    }

    #[test]
    fn album_without_photos_is_skipped() {
        let timeline = Timeline::new(vec![album("empty", 0, 0), album("b", 0, 1)]);
        assert_eq!(resolve(&timeline, 0).unwrap().album.id, "b");
    }

    #[test]
    fn empty_timeline_resolves_nothing() {
        assert!(resolve(&Timeline::default(), 0).is_none());
    }
}
