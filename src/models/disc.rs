// Disc and track data models
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiscType {
    Dvd,
    Bluray,
    Uhd,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrackClass {
    Main,
    Extra,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Parse "WIDTHxHEIGHT", e.g. "1920x1080"
    pub fn parse(text: &str) -> Option<Self> {
        let (width, height) = text.trim().split_once(['x', 'X'])?;
        let width = width.trim().parse().ok()?;
        let height = height.trim().parse().ok()?;
        Some(Self { width, height })
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A track length as reported by the tool, kept alongside its original text
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackDuration {
    #[serde(with = "duration_secs")]
    pub length: Duration,
    pub text: String,
}

impl TrackDuration {
    /// Parse "H:MM:SS" (also accepts "MM:SS")
    pub fn parse(text: &str) -> Option<Self> {
        let parts: Vec<&str> = text.trim().split(':').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return None;
        }

        let mut total: u64 = 0;
        for (i, part) in parts.iter().enumerate() {
            let value: u64 = part.parse().ok()?;
            // minutes and seconds must stay below 60
            if i > 0 && value >= 60 {
                return None;
            }
            total = total * 60 + value;
        }

        Some(Self {
            length: Duration::from_secs(total),
            text: text.trim().to_string(),
        })
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    pub title_id: u32,
    pub duration: TrackDuration,
    pub size_bytes: u64,
    pub resolution: Option<Resolution>,
    pub suggested_name: String,
    pub classification: TrackClass,
    pub name: Option<String>,
    pub chapter_count: Option<u32>,
    pub source_file_name: Option<String>,
}

impl Track {
    pub fn new(title_id: u32) -> Self {
        Self {
            title_id,
            duration: TrackDuration::default(),
            size_bytes: 0,
            resolution: None,
            suggested_name: suggested_name(title_id),
            classification: TrackClass::Unknown,
            name: None,
            chapter_count: None,
            source_file_name: None,
        }
    }
}

/// File name the ripping tool gives a title it writes out
pub fn suggested_name(title_id: u32) -> String {
    format!("title_t{:02}.mkv", title_id)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscRecord {
    pub disc_type: DiscType,
    pub volume_name: String,
    pub device_path: String,
    pub tracks: Vec<Track>,
}

impl DiscRecord {
    pub fn main_track(&self) -> Option<&Track> {
        self.tracks
            .iter()
            .find(|t| t.classification == TrackClass::Main)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DriveState {
    EmptyClosed,
    EmptyOpen,
    Inserted,
    Loading,
    NoDrive,
    Unknown(i64),
}

impl DriveState {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => DriveState::EmptyClosed,
            1 => DriveState::EmptyOpen,
            2 => DriveState::Inserted,
            3 => DriveState::Loading,
            256 => DriveState::NoDrive,
            other => DriveState::Unknown(other),
        }
    }
}

/// One optical drive slot as listed by the tool
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriveInfo {
    pub index: u32,
    pub state: DriveState,
    pub flags: u32,
    pub drive_name: String,
    pub disc_name: String,
    pub device_path: String,
}

impl DriveInfo {
    pub fn has_disc(&self) -> bool {
        self.state == DriveState::Inserted
    }
}
