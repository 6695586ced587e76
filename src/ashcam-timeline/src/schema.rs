//! Image and webcam record types
//!
//! Field names follow the ashcam image API so the same types decode API
//! responses and serialize for the browser viewer.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Interesting code the API assigns to captures showing volcanic activity
pub const VOLCANIC_CODE: &str = "V";

/// One capture from the webcam
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    #[serde(rename = "imageId")]
    pub id: i64,
    /// Seconds since the epoch
    #[serde(rename = "imageTimestamp")]
    pub timestamp: i64,
    #[serde(rename = "imageUrl", default)]
    pub url: String,
    #[serde(default)]
    pub interesting_code: InterestingCode,
    #[serde(rename = "isNightImage", default, deserialize_with = "deserialize_flag")]
    pub is_night: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webcam_code: Option<String>,
}

impl ImageRecord {
    /// Capture time as a UTC date
    pub fn date(&self) -> DateTime<Utc> {
        timestamp_to_date(self.timestamp)
    }

    pub fn is_interesting(&self) -> bool {
        self.interesting_code.is_notable()
    }
}

/// Tag on a capture; only `Volcanic` marks notable activity
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum InterestingCode {
    #[default]
    Unset,
    Volcanic,
    Other(String),
}

impl InterestingCode {
    pub fn is_notable(&self) -> bool {
        matches!(self, InterestingCode::Volcanic)
    }
}

impl From<Option<String>> for InterestingCode {
    fn from(code: Option<String>) -> Self {
        match code.as_deref().map(str::trim) {
            None | Some("") => InterestingCode::Unset,
            Some(c) if c.eq_ignore_ascii_case(VOLCANIC_CODE) => InterestingCode::Volcanic,
            Some(c) => InterestingCode::Other(c.to_string()),
        }
    }
}

impl From<InterestingCode> for Option<String> {
    fn from(code: InterestingCode) -> Self {
        match code {
            InterestingCode::Unset => None,
            InterestingCode::Volcanic => Some(VOLCANIC_CODE.to_string()),
            InterestingCode::Other(c) => Some(c),
        }
    }
}

/// Descriptive metadata for the webcam being viewed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebcamInfo {
    #[serde(default)]
    pub webcam_code: String,
    #[serde(default)]
    pub webcam_name: String,
    /// Total number of images the server claims to hold
    #[serde(default)]
    pub image_total: u64,
    #[serde(default, rename = "firstImageTimestamp")]
    pub earliest_timestamp: Option<i64>,
    #[serde(default, rename = "lastImageTimestamp")]
    pub latest_timestamp: Option<i64>,
}

/// One response from the image API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageBatch {
    #[serde(default)]
    pub images: Vec<ImageRecord>,
    #[serde(default)]
    pub webcam: Option<WebcamInfo>,
    #[serde(default)]
    pub image_count: Option<u64>,
}

/// An expected capture slot with no image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingSlot {
    pub timestamp: i64,
    pub date: DateTime<Utc>,
}

impl MissingSlot {
    pub fn at(timestamp: i64) -> Self {
        Self {
            timestamp,
            date: timestamp_to_date(timestamp),
        }
    }
}

/// Coverage of the observed time span
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageStats {
    pub expected_count: usize,
    pub actual_count: usize,
    pub missing_count: usize,
    /// Percentage rounded to one decimal place
    pub coverage_percent: f64,
}

pub(crate) fn timestamp_to_date(timestamp: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(timestamp, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
    Text(String),
}

/// Accepts `true`/`false`, `1`/`0` and `Y`/`N` style flags
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let flag = Option::<Flag>::deserialize(deserializer)?;
    Ok(match flag {
        None => false,
        Some(Flag::Bool(b)) => b,
        Some(Flag::Int(n)) => n != 0,
        Some(Flag::Text(s)) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "y" | "yes" | "true" | "1"
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_api_image() {
        let json = r#"{
            "imageId": 42,
            "imageTimestamp": 1700000000,
            "imageUrl": "https://example.org/a.jpg",
            "interestingCode": "V",
            "isNightImage": "Y",
            "webcamCode": "ys-bbsn"
        }"#;
        let image: ImageRecord = serde_json::from_str(json).unwrap();
        assert_eq!(image.id, 42);
        assert_eq!(image.timestamp, 1_700_000_000);
        assert!(image.is_interesting());
        assert!(image.is_night);
        assert_eq!(image.webcam_code.as_deref(), Some("ys-bbsn"));
    }

    #[test]
    fn test_decode_sparse_image() {
        let json = r#"{"imageId": 1, "imageTimestamp": 5, "interestingCode": null, "isNightImage": 0}"#;
        let image: ImageRecord = serde_json::from_str(json).unwrap();
        assert_eq!(image.interesting_code, InterestingCode::Unset);
        assert!(!image.is_night);
        assert!(image.url.is_empty());
    }

    #[test]
    fn test_other_codes_are_not_notable() {
        let code = InterestingCode::from(Some("U".to_string()));
        assert_eq!(code, InterestingCode::Other("U".to_string()));
        assert!(!code.is_notable());
        assert!(InterestingCode::from(Some("v".to_string())).is_notable());
    }

    #[test]
    fn test_decode_webcam() {
        let json = r#"{
            "webcamCode": "ys-bbsn",
            "webcamName": "Black Sand Basin",
            "imageTotal": 12000,
            "firstImageTimestamp": 1600000000,
            "lastImageTimestamp": 1700000000
        }"#;
        let webcam: WebcamInfo = serde_json::from_str(json).unwrap();
        assert_eq!(webcam.image_total, 12000);
        assert_eq!(webcam.earliest_timestamp, Some(1_600_000_000));
        assert_eq!(webcam.latest_timestamp, Some(1_700_000_000));
    }

    #[test]
    fn test_missing_slot_date() {
        let slot = MissingSlot::at(0);
        assert_eq!(slot.date.to_rfc3339(), "1970-01-01T00:00:00+00:00");
    }
}
