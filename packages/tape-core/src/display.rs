//! Messages pushed to display clients.

use serde::Serialize;

use crate::protocol_constants::DISPLAY_MESSAGE_TYPE;

/// Canonical display message:
/// `{"type":"image","url":..,"albumTitle":..,"color":..,"position":..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayMessage {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub url: String,
    pub album_title: String,
    /// The album's color tag as written in its descriptor.
    pub color: String,
    pub position: i64,
}

impl DisplayMessage {
    pub fn image(
        url: impl Into<String>,
        album_title: impl Into<String>,
        color: impl Into<String>,
        position: i64,
    ) -> Self {
        Self {
            kind: DISPLAY_MESSAGE_TYPE,
            url: url.into(),
            album_title: album_title.into(),
            color: color.into(),
            position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_to_wire_shape() {
        let msg = DisplayMessage::image("http://x/t/h/public/fit_1920", "Rome", "red", 12);
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(
            json,
            r#"{"type":"image","url":"http://x/t/h/public/fit_1920","albumTitle":"Rome","color":"red","position":12}"#
        );
    }
}
