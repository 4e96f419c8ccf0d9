// Scan output parser
// Folds the robot-mode records of an `info` run into a DiscRecord

use super::tokenizer::{parse_record, RobotRecord};
use crate::models::{DiscRecord, DiscType, DriveInfo, DriveState, Resolution, Track, TrackDuration};
use log::debug;
use std::collections::BTreeMap;

// Attribute ids used in CINFO/TINFO/SINFO records
const ATTR_TYPE: i64 = 1;
const ATTR_NAME: i64 = 2;
const ATTR_CHAPTER_COUNT: i64 = 8;
const ATTR_DURATION: i64 = 9;
const ATTR_DISK_SIZE_BYTES: i64 = 11;
const ATTR_SOURCE_FILE_NAME: i64 = 16;
const ATTR_VIDEO_SIZE: i64 = 19;
const ATTR_VOLUME_NAME: i64 = 32;

// DRV flag bits describing the file systems found on the disc
const DRIVE_FLAG_DVD_FILES: u32 = 1;
const DRIVE_FLAG_BLURAY_FILES: u32 = 4;

const UHD_MIN_WIDTH: u32 = 3840;

#[derive(Default)]
struct ScanAccumulator {
    disc_type_text: Option<String>,
    disc_name: Option<String>,
    volume_name: Option<String>,
    drives: Vec<DriveInfo>,
    tracks: BTreeMap<u32, Track>,
}

impl ScanAccumulator {
    fn apply(&mut self, record: &RobotRecord<'_>) {
        match record.tag {
            "CINFO" => self.apply_disc_attr(record),
            "TINFO" => self.apply_track_attr(record),
            "SINFO" => self.apply_stream_attr(record),
            "DRV" => {
                if let Some(drive) = drive_from_record(record) {
                    self.drives.push(drive);
                }
            }
            _ => {}
        }
    }

    // CINFO:attr,code,value
    fn apply_disc_attr(&mut self, record: &RobotRecord<'_>) {
        let (Some(attr), Some(value)) = (record.int_field(0), record.field(2)) else {
            return;
        };

        match attr {
            ATTR_TYPE => self.disc_type_text = Some(value.to_string()),
            ATTR_NAME => self.disc_name = non_empty(value),
            ATTR_VOLUME_NAME => self.volume_name = non_empty(value),
            _ => {}
        }
    }

    // TINFO:title,attr,code,value
    fn apply_track_attr(&mut self, record: &RobotRecord<'_>) {
        let Some(title_id) = title_id(record) else {
            debug!("Skipping track record without a usable title id: {:?}", record.fields);
            return;
        };
        let track = self
            .tracks
            .entry(title_id)
            .or_insert_with(|| Track::new(title_id));

        let (Some(attr), Some(value)) = (record.int_field(1), record.field(3)) else {
            return;
        };

        match attr {
            ATTR_NAME => track.name = non_empty(value),
            ATTR_CHAPTER_COUNT => {
                if let Ok(count) = value.trim().parse() {
                    track.chapter_count = Some(count);
                }
            }
            ATTR_DURATION => match TrackDuration::parse(value) {
                Some(duration) => track.duration = duration,
                None => debug!("Ignoring malformed duration {:?} on title {}", value, title_id),
            },
            ATTR_DISK_SIZE_BYTES => match value.trim().parse() {
                Ok(size) => track.size_bytes = size,
                Err(_) => debug!("Ignoring malformed size {:?} on title {}", value, title_id),
            },
            ATTR_SOURCE_FILE_NAME => track.source_file_name = non_empty(value),
            ATTR_VIDEO_SIZE => set_resolution(track, value),
            _ => {}
        }
    }

    // SINFO:title,stream,attr,code,value
    fn apply_stream_attr(&mut self, record: &RobotRecord<'_>) {
        let Some(title_id) = title_id(record) else {
            return;
        };
        let (Some(attr), Some(value)) = (record.int_field(2), record.field(4)) else {
            return;
        };

        if attr == ATTR_VIDEO_SIZE {
            let track = self
                .tracks
                .entry(title_id)
                .or_insert_with(|| Track::new(title_id));
            set_resolution(track, value);
        }
    }

    fn disc_type(&self) -> DiscType {
        let text = self
            .disc_type_text
            .as_deref()
            .unwrap_or_default()
            .to_lowercase();
        let flags = self
            .drives
            .iter()
            .filter(|d| d.has_disc())
            .fold(0, |acc, d| acc | d.flags);

        let has_uhd_video = self
            .tracks
            .values()
            .filter_map(|t| t.resolution)
            .any(|r| r.width >= UHD_MIN_WIDTH);

        if has_uhd_video || text.contains("uhd") || text.contains("4k") {
            DiscType::Uhd
        } else if text.contains("blu-ray") || text.contains("bluray") || flags & DRIVE_FLAG_BLURAY_FILES != 0 {
            DiscType::Bluray
        } else {
            if !text.contains("dvd") && flags & DRIVE_FLAG_DVD_FILES == 0 {
                debug!("No disc type hint in scan output, assuming DVD");
            }
            DiscType::Dvd
        }
    }

    fn loaded_drive(&self) -> Option<&DriveInfo> {
        self.drives.iter().find(|d| d.has_disc())
    }

    fn finish(self) -> DiscRecord {
        let disc_type = self.disc_type();

        let loaded = self.loaded_drive();
        let volume_name = self
            .volume_name
            .clone()
            .or_else(|| self.disc_name.clone())
            .or_else(|| loaded.and_then(|d| non_empty(&d.disc_name)))
            .unwrap_or_default();
        let device_path = loaded
            .and_then(|d| non_empty(&d.device_path))
            .or_else(|| self.drives.iter().find_map(|d| non_empty(&d.device_path)))
            .unwrap_or_default();

        DiscRecord {
            disc_type,
            volume_name,
            device_path,
            tracks: self.tracks.into_values().collect(),
        }
    }
}

fn title_id(record: &RobotRecord<'_>) -> Option<u32> {
    u32::try_from(record.int_field(0)?).ok()
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// First video stream that reports a size wins
fn set_resolution(track: &mut Track, value: &str) {
    if track.resolution.is_none() {
        track.resolution = Resolution::parse(value);
    }
}

// DRV:index,state,enabled,flags,drive name,disc name,device path
fn drive_from_record(record: &RobotRecord<'_>) -> Option<DriveInfo> {
    let index = u32::try_from(record.int_field(0)?).ok()?;
    let state = DriveState::from_code(record.int_field(1)?);

    Some(DriveInfo {
        index,
        state,
        flags: record
            .int_field(3)
            .and_then(|f| u32::try_from(f).ok())
            .unwrap_or(0),
        drive_name: record.field(4).unwrap_or_default().trim().to_string(),
        disc_name: record.field(5).unwrap_or_default().trim().to_string(),
        device_path: record.field(6).unwrap_or_default().trim().to_string(),
    })
}

/// Parse the complete output of a scan run. Never fails: malformed lines and
/// values are skipped, and output without track records gives an empty list.
pub fn parse_scan_output(output: &str) -> DiscRecord {
    let mut acc = ScanAccumulator::default();

    for line in output.lines() {
        if let Some(record) = parse_record(line) {
            acc.apply(&record);
        }
    }

    acc.finish()
}

/// Parse the drive status lines of a scan run, skipping empty drive slots
pub fn parse_drive_list(output: &str) -> Vec<DriveInfo> {
    let mut drives: BTreeMap<u32, DriveInfo> = BTreeMap::new();

    for line in output.lines() {
        let Some(record) = parse_record(line) else {
            continue;
        };
        if record.tag != "DRV" {
            continue;
        }
        if let Some(drive) = drive_from_record(&record) {
            if drive.state != DriveState::NoDrive {
                drives.insert(drive.index, drive);
            }
        }
    }

    drives.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrackClass;
    use std::time::Duration;

    const BLURAY_SCAN: &str = r#"MSG:1005,0,1,"MakeMKV v1.17.7 linux(x64-release) started","%1 started","MakeMKV v1.17.7 linux(x64-release)"
DRV:0,2,999,12,"BD-RE HL-DT-ST BD-RE  WH16NS60 1.02","TEST_MOVIE","/dev/sr0"
DRV:1,256,999,0,"","",""
DRV:2,256,999,0,"","",""
MSG:3007,0,0,"Using direct disc access mode","Using direct disc access mode"
TCOUT:3
CINFO:1,6209,"Blu-ray disc"
CINFO:2,0,"Test Movie"
CINFO:28,0,"eng"
CINFO:32,0,"TEST_MOVIE"
TINFO:2,2,0,"Test Movie"
TINFO:2,8,0,"3"
TINFO:2,9,0,"0:02:05"
TINFO:2,10,0,"250.1 MB"
TINFO:2,11,0,"262254592"
TINFO:2,16,0,"00002.mpls"
TINFO:2,27,0,"Test_Movie_t02.mkv"
SINFO:2,0,1,6201,"Video"
SINFO:2,0,19,0,"1920x1080"
TINFO:0,2,0,"Test Movie"
TINFO:0,8,0,"32"
TINFO:0,9,0,"1:39:56"
TINFO:0,10,0,"10.6 GB"
TINFO:0,11,0,"11397666816"
TINFO:0,16,0,"00800.mpls"
SINFO:0,0,1,6201,"Video"
SINFO:0,0,19,0,"1920x1080"
SINFO:0,1,1,6202,"Audio"
SINFO:0,1,3,0,"eng"
TINFO:1,9,0,"0:21:30"
TINFO:1,11,0,"2050000000"
SINFO:1,0,19,0,"1920x1080"
"#;

    #[test]
    fn test_parses_bluray_disc() {
        let disc = parse_scan_output(BLURAY_SCAN);

        assert_eq!(disc.disc_type, DiscType::Bluray);
        assert_eq!(disc.volume_name, "TEST_MOVIE");
        assert_eq!(disc.device_path, "/dev/sr0");

        let ids: Vec<u32> = disc.tracks.iter().map(|t| t.title_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);

        let main = &disc.tracks[0];
        assert_eq!(main.duration.text, "1:39:56");
        assert_eq!(main.duration.length, Duration::from_secs(5996));
        assert_eq!(main.size_bytes, 11_397_666_816);
        assert_eq!(main.resolution, Some(Resolution { width: 1920, height: 1080 }));
        assert_eq!(main.chapter_count, Some(32));
        assert_eq!(main.name.as_deref(), Some("Test Movie"));
        assert_eq!(main.source_file_name.as_deref(), Some("00800.mpls"));
        assert_eq!(main.suggested_name, "title_t00.mkv");
        assert_eq!(main.classification, TrackClass::Unknown);

        assert_eq!(disc.tracks[2].suggested_name, "title_t02.mkv");
        assert_eq!(disc.tracks[2].size_bytes, 262_254_592);
    }

    #[test]
    fn test_no_track_records_gives_empty_list() {
        let output = r#"MSG:5010,0,0,"Failed to open disc","Failed to open disc"
TCOUT:0
"#;
        let disc = parse_scan_output(output);
        assert!(disc.tracks.is_empty());
        assert_eq!(disc.volume_name, "");

        assert!(parse_scan_output("").tracks.is_empty());
    }

    #[test]
    fn test_repeated_title_records_merge() {
        let output = r#"TINFO:3,9,0,"0:45:00"
TINFO:1,9,0,"0:10:00"
TINFO:3,11,0,"1000"
TINFO:1,11,0,"500"
TINFO:3,2,0,"Late name"
"#;
        let disc = parse_scan_output(output);
        let ids: Vec<u32> = disc.tracks.iter().map(|t| t.title_id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(disc.tracks[1].size_bytes, 1000);
        assert_eq!(disc.tracks[1].name.as_deref(), Some("Late name"));
    }

    #[test]
    fn test_malformed_values_are_skipped() {
        let output = r#"TINFO:0,9,0,"not a time"
TINFO:0,11,0,"lots"
TINFO:0,19,0,"wide"
TINFO:0,8,0,"12"
TINFO:x,9,0,"1:00:00"
TINFO:-1,9,0,"1:00:00"
TINFO:4
TINFO:0,9999,0,"unknown attribute"
garbage line without a tag
SINFO:0,0
"#;
        let disc = parse_scan_output(output);

        assert_eq!(disc.tracks.len(), 2);
        let track = &disc.tracks[0];
        assert_eq!(track.title_id, 0);
        assert_eq!(track.duration, TrackDuration::default());
        assert_eq!(track.size_bytes, 0);
        assert_eq!(track.resolution, None);
        assert_eq!(track.chapter_count, Some(12));
        assert_eq!(disc.tracks[1].title_id, 4);
    }

    #[test]
    fn test_disc_type_hints() {
        let dvd = r#"DRV:0,2,999,1,"DVD drive","SOME_DVD","/dev/sr1"
TINFO:0,9,0,"1:30:00"
"#;
        assert_eq!(parse_scan_output(dvd).disc_type, DiscType::Dvd);

        let bluray_flags = r#"DRV:0,2,999,12,"BD drive","MOVIE","/dev/sr0"
"#;
        assert_eq!(parse_scan_output(bluray_flags).disc_type, DiscType::Bluray);

        let uhd = r#"CINFO:1,6209,"Blu-ray disc"
SINFO:0,0,19,0,"3840x2160"
"#;
        assert_eq!(parse_scan_output(uhd).disc_type, DiscType::Uhd);

        assert_eq!(parse_scan_output("TCOUT:0").disc_type, DiscType::Dvd);
    }

    #[test]
    fn test_volume_name_falls_back_to_drive_disc_name() {
        let output = r#"DRV:0,0,999,0,"Empty drive","","/dev/sr0"
DRV:1,2,999,1,"DVD drive","HOLIDAY_DVD","/dev/sr1"
"#;
        let disc = parse_scan_output(output);
        assert_eq!(disc.volume_name, "HOLIDAY_DVD");
        assert_eq!(disc.device_path, "/dev/sr1");
    }

    #[test]
    fn test_parse_drive_list() {
        let drives = parse_drive_list(BLURAY_SCAN);
        assert_eq!(drives.len(), 1);
        assert_eq!(drives[0].index, 0);
        assert_eq!(drives[0].state, DriveState::Inserted);
        assert_eq!(drives[0].flags, 12);
        assert_eq!(drives[0].disc_name, "TEST_MOVIE");
        assert_eq!(drives[0].device_path, "/dev/sr0");
        assert!(drives[0].has_disc());
    }
}
