//! Conversation exporter.
//!
//! Renders a [`MessageLog`] as plain text, one `"{Role} > {content}"` block
//! per turn separated by [`DELIMITER`], and writes it with a single write
//! call.  Export never fails outward: every I/O problem ends up in the
//! returned [`ExportRecord`].

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{info, warn};

use toolchat_agent::MessageLog;

/// Separator line placed between rendered turns.
pub const DELIMITER: &str = "\n-----\n";

/// Suffix of generated export file names.
pub const FILE_NAME_SUFFIX: &str = "_AI_SAVED_CONVERSATION.txt";

/// Outcome of one export attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRecord {
    pub file_path: PathBuf,
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
    /// When the file was written.  Only set on success.
    pub timestamp: Option<DateTime<Local>>,
}

/// Render every turn of `log`, oldest first.
pub fn render(log: &MessageLog) -> String {
    log.messages()
        .iter()
        .map(|m| format!("{} > {}", m.role(), m.content()))
        .collect::<Vec<_>>()
        .join(DELIMITER)
}

/// Timestamp-derived file name, e.g. `20250101_093000_AI_SAVED_CONVERSATION.txt`.
pub fn default_file_name(at: DateTime<Local>) -> String {
    format!("{}{FILE_NAME_SUFFIX}", at.format("%Y%m%d_%H%M%S"))
}

/// Writes conversation logs into a directory.
#[derive(Debug, Clone)]
pub struct ConversationExporter {
    directory: PathBuf,
}

impl ConversationExporter {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Write `log` to `destination`, or to a timestamped file in the export
    /// directory when no destination is given.
    pub fn export(&self, log: &MessageLog, destination: Option<&Path>) -> ExportRecord {
        let file_path = match destination {
            Some(path) => path.to_path_buf(),
            None => self.directory.join(default_file_name(Local::now())),
        };

        match std::fs::write(&file_path, render(log)) {
            Ok(()) => {
                info!(path = %file_path.display(), turns = log.len(), "conversation exported");
                ExportRecord {
                    message: format!("Conversation saved to {}", file_path.display()),
                    file_path,
                    success: true,
                    timestamp: Some(Local::now()),
                }
            }
            Err(e) => {
                warn!(path = %file_path.display(), error = %e, "conversation export failed");
                ExportRecord {
                    message: format!(
                        "Failed to save conversation to {}: {e}",
                        file_path.display()
                    ),
                    file_path,
                    success: false,
                    timestamp: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use toolchat_agent::Message;

    use super::*;

    fn three_turn_log() -> MessageLog {
        let mut log = MessageLog::with_system_prompt("S");
        log.append(Message::user("hello")).unwrap();
        log.append(Message::assistant("hi there")).unwrap();
        log
    }

    #[test]
    fn export_splits_back_into_turns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.txt");
        let exporter = ConversationExporter::new(dir.path());

        let record = exporter.export(&three_turn_log(), Some(&path));

        assert!(record.success, "{}", record.message);
        assert_eq!(record.file_path, path);
        assert!(record.timestamp.is_some());

        let written = std::fs::read_to_string(&path).unwrap();
        let segments: Vec<&str> = written.split(DELIMITER).collect();
        assert_eq!(segments, ["System > S", "User > hello", "Assistant > hi there"]);
    }

    #[test]
    fn default_destination_is_timestamped_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = ConversationExporter::new(dir.path());

        let record = exporter.export(&three_turn_log(), None);

        assert!(record.success);
        assert_eq!(record.file_path.parent(), Some(dir.path()));
        let name = record.file_path.file_name().unwrap().to_str().unwrap();
        assert!(name.ends_with(FILE_NAME_SUFFIX));
        assert_eq!(name.len(), "YYYYMMDD_HHMMSS".len() + FILE_NAME_SUFFIX.len());
        assert!(record.file_path.exists());
    }

    #[test]
    fn io_failure_is_captured() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("chat.txt");

        let record = ConversationExporter::new(dir.path()).export(&three_turn_log(), Some(&path));

        assert!(!record.success);
        assert!(record.timestamp.is_none());
        assert_eq!(record.file_path, path);
        assert!(record.message.starts_with("Failed to save conversation"));
    }

    #[test]
    fn file_name_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(
            default_file_name(at),
            "20240309_070501_AI_SAVED_CONVERSATION.txt"
        );
    }

    #[test]
    fn empty_log_renders_empty() {
        assert_eq!(render(&MessageLog::new()), "");
    }
}
