// Progress decoder for streamed rip output
use super::tokenizer::parse_record;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProgressKind {
    /// PRGC: progress of the current sub-operation
    CurrentOperation,
    /// PRGV: overall stacked progress
    Stacked,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressSample {
    pub percent: u8, // 0-100
    pub kind: ProgressKind,
    pub label: Option<String>,
}

fn percent_of(part: i64, whole: i64) -> u8 {
    if whole <= 0 || part <= 0 {
        return 0;
    }
    let percent = (part as f64 / whole as f64 * 100.0).round();
    percent.min(100.0) as u8
}

/// Decode one line of rip output into a progress sample.
///
/// `PRGC:current,total,"description"` gives round(current / total * 100) and
/// `PRGV:current,total,max` gives round(total / max * 100). Every other line,
/// including malformed progress records, gives `None`.
pub fn decode_progress(line: &str) -> Option<ProgressSample> {
    let record = parse_record(line)?;

    match record.tag {
        "PRGC" => {
            let current = record.int_field(0)?;
            let total = record.int_field(1)?;
            Some(ProgressSample {
                percent: percent_of(current, total),
                kind: ProgressKind::CurrentOperation,
                label: record
                    .field(2)
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(String::from),
            })
        }
        "PRGV" => {
            let total = record.int_field(1)?;
            let max = record.int_field(2)?;
            Some(ProgressSample {
                percent: percent_of(total, max),
                kind: ProgressKind::Stacked,
                label: None,
            })
        }
        _ => None,
    }
}

/// Human-readable text of a `MSG:code,flags,count,"message",...` record
pub fn message_text(line: &str) -> Option<String> {
    let record = parse_record(line)?;
    if record.tag != "MSG" {
        return None;
    }

    record
        .field(3)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stacked_progress() {
        let sample = decode_progress("PRGV:100,200,500").unwrap();
        assert_eq!(sample.percent, 40);
        assert_eq!(sample.kind, ProgressKind::Stacked);
        assert_eq!(sample.label, None);

        assert_eq!(decode_progress("PRGV:0,65536,65536").unwrap().percent, 100);
        assert_eq!(decode_progress("PRGV:0,1,3").unwrap().percent, 33);
        assert_eq!(decode_progress("PRGV:0,2,3").unwrap().percent, 67);
    }

    #[test]
    fn test_current_operation_progress() {
        let sample = decode_progress(r#"PRGC:1,5,"Copying title 1""#).unwrap();
        assert_eq!(sample.percent, 20);
        assert_eq!(sample.kind, ProgressKind::CurrentOperation);
        assert_eq!(sample.label.as_deref(), Some("Copying title 1"));
    }

    #[test]
    fn test_zero_denominators() {
        assert_eq!(decode_progress("PRGV:10,20,0").unwrap().percent, 0);
        assert_eq!(decode_progress(r#"PRGC:3,0,"Analyzing""#).unwrap().percent, 0);
    }

    #[test]
    fn test_percent_is_clamped() {
        assert_eq!(decode_progress("PRGV:0,900,500").unwrap().percent, 100);
    }

    #[test]
    fn test_other_lines_give_nothing() {
        assert!(decode_progress("MSG:1234,0,...").is_none());
        assert!(decode_progress(r#"DRV:0,2,999,1,"drive","disc","/dev/sr0""#).is_none());
        assert!(decode_progress(r#"PRGT:5018,0,"Saving to MKV file""#).is_none());
        assert!(decode_progress("PRGV:abc,def,ghi").is_none());
        assert!(decode_progress("PRGV:1").is_none());
        assert!(decode_progress("").is_none());
        assert!(decode_progress("plain log text").is_none());
    }

    #[test]
    fn test_message_text() {
        assert_eq!(
            message_text(r#"MSG:5003,0,0,"Failed to save title 0 to file /out/title_t00.mkv","Failed to save title %1 to file %2","0","/out/title_t00.mkv""#),
            Some("Failed to save title 0 to file /out/title_t00.mkv".to_string())
        );
        assert_eq!(message_text("MSG:1234,0,..."), None);
        assert_eq!(message_text("PRGV:1,2,3"), None);
    }
}
