// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Wire encoding for recordings.
//!
//! Stores keep `frames` as a JSON string column, so the frame list is
//! encoded to a string on the way out. Rows written inline as an array
//! are still accepted on the way in.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

use super::Frame;

/// Encode frames to their JSON text form
pub fn encode_frames(frames: &[Frame]) -> Result<String, serde_json::Error> {
    serde_json::to_string(frames)
}

/// Decode frames from their JSON text form
pub fn decode_frames(text: &str) -> Result<Vec<Frame>, serde_json::Error> {
    serde_json::from_str(text)
}

/// Serde adapter for `Recording::frames`
pub mod frames {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Encoded {
        Text(String),
        Inline(Vec<Frame>),
    }

    pub fn serialize<S>(frames: &[Frame], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let text = encode_frames(frames).map_err(serde::ser::Error::custom)?;
        text.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Frame>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Encoded::deserialize(deserializer)? {
            Encoded::Text(text) => decode_frames(&text).map_err(de::Error::custom),
            Encoded::Inline(frames) => Ok(frames),
        }
    }
}

/// Accept a number or a numeric string, always yielding `f64`
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Numeric {
        Number(f64),
        Text(String),
    }

    match Numeric::deserialize(deserializer)? {
        Numeric::Number(value) => Ok(value),
        Numeric::Text(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| de::Error::custom(format!("invalid number: {:?}", text))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::Recording;

    fn sample() -> Recording {
        Recording::from_frames(vec![
            Frame::new(50, ["A"]),
            Frame::new(100, ["A", "S"]),
            Frame::silent(150),
        ])
    }

    #[test]
    fn test_frames_travel_as_string() {
        let recording = sample();
        let value = serde_json::to_value(&recording).unwrap();

        let frames = value.get("frames").unwrap();
        assert!(frames.is_string());
        assert_eq!(
            frames.as_str().unwrap(),
            r#"[{"timestamp":50,"activeNotes":["A"]},{"timestamp":100,"activeNotes":["A","S"]},{"timestamp":150,"activeNotes":[]}]"#
        );
        assert!(value.get("durationSeconds").unwrap().is_f64());
        assert!(value.get("createdAt").is_some());
        assert!(value.get("displayName").is_some());
    }

    #[test]
    fn test_store_round_trip() {
        let recording = sample();
        let json = serde_json::to_string(&recording).unwrap();
        let decoded: Recording = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, recording);
        assert_eq!(decoded.duration_seconds, 0.15);
    }

    #[test]
    fn test_inline_frames_accepted() {
        let json = r#"{
            "id": "recording-1",
            "frames": [{"timestamp": 0, "activeNotes": ["K"]}],
            "createdAt": "2026-01-02T03:04:05Z",
            "durationSeconds": 0
        }"#;
        let decoded: Recording = serde_json::from_str(json).unwrap();
        assert_eq!(decoded.frames, vec![Frame::new(0, ["K"])]);
        assert_eq!(decoded.location, "Unknown");
        assert_eq!(decoded.display_name, "");
    }

    #[test]
    fn test_duration_string_decodes_to_float() {
        let json = r#"{
            "id": "recording-2",
            "frames": "[]",
            "location": "Tucson, Arizona, United States",
            "createdAt": "2026-01-02T03:04:05Z",
            "displayName": "Morning",
            "durationSeconds": "2.5"
        }"#;
        let decoded: Recording = serde_json::from_str(json).unwrap();
        assert_eq!(decoded.duration_seconds, 2.5);
        assert!(decoded.frames.is_empty());
    }

    #[test]
    fn test_bad_frame_text_rejected() {
        let json = r#"{
            "id": "recording-3",
            "frames": "not json",
            "createdAt": "2026-01-02T03:04:05Z",
            "durationSeconds": 1.0
        }"#;
        assert!(serde_json::from_str::<Recording>(json).is_err());
    }

    #[test]
    fn test_encode_decode_helpers() {
        let frames = sample().frames;
        let text = encode_frames(&frames).unwrap();
        assert_eq!(decode_frames(&text).unwrap(), frames);
    }
}
