//! Wire records returned by the catalog API.
//!
//! Only the fields the relay reads are modelled; everything else in the
//! catalog's responses is ignored during deserialization.

use serde::{Deserialize, Serialize};

/// Album record from `GET /albums`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAlbum {
    /// Stable album identifier.
    #[serde(rename = "UID", default)]
    pub uid: String,

    /// Free-form description; tape albums carry a `TAPE|...` descriptor here.
    #[serde(rename = "Description", default)]
    pub description: Option<String>,

    /// Display title assigned in the catalog (informational only).
    #[serde(rename = "Title", default)]
    pub title: Option<String>,
}

/// Photo record from `GET /photos`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPhoto {
    /// Content hash of the primary file.
    #[serde(rename = "Hash", default)]
    pub hash: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_album_ignores_unknown_fields() {
        let json = r#"{"UID":"aq1","Description":"TAPE|1|trip|Rome|red|0","Type":"album","Favorite":false}"#;
        let album: RawAlbum = serde_json::from_str(json).unwrap();
        assert_eq!(album.uid, "aq1");
        assert_eq!(album.description.as_deref(), Some("TAPE|1|trip|Rome|red|0"));
        assert_eq!(album.title, None);
    }

    #[test]
    fn raw_photo_tolerates_missing_hash() {
        let photo: RawPhoto = serde_json::from_str(r#"{"UID":"p1"}"#).unwrap();
        assert_eq!(photo.hash, None);
    }
}
