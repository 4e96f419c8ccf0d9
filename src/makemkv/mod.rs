// makemkvcon robot-mode protocol: record tokenizer, scan parser,
// progress decoder and command builders
pub mod command;
pub mod progress;
pub mod scan_parser;
pub mod tokenizer;

pub use command::{build_rip_command, build_rip_command_with, build_scan_command, source_selector, DEFAULT_PROGRAM};
pub use progress::{decode_progress, message_text, ProgressKind, ProgressSample};
pub use scan_parser::{parse_drive_list, parse_scan_output};
pub use tokenizer::{parse_record, split_fields, RobotRecord};
