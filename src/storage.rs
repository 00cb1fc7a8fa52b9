//! Local storage for call transcripts
//!
//! Saves the finalized transcript of each call to the user's Documents
//! folder. Only text is persisted; audio never touches disk.

use chrono::Local;
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Storage errors with contextual information
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Could not determine the Documents directory")]
    NoDocumentsDir,

    #[error("Failed to create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Get the call transcripts directory
fn transcripts_dir() -> Option<PathBuf> {
    dirs::document_dir().map(|d| d.join("Callassist").join("calls"))
}

/// Save a call transcript, returning the path to the saved file
pub fn save_transcript(phone_number: &str, transcript: &str) -> Result<PathBuf, StorageError> {
    let dir = transcripts_dir().ok_or(StorageError::NoDocumentsDir)?;
    if !dir.exists() {
        fs::create_dir_all(&dir).map_err(|e| StorageError::CreateDirectory {
            path: dir.clone(),
            source: e,
        })?;
    }

    let now = Local::now();
    let filename = format!(
        "call-{}-{}.md",
        sanitize_phone(phone_number),
        now.format("%Y-%m-%d-%H-%M-%S")
    );
    let filepath = dir.join(filename);

    let contents = render_transcript(
        phone_number,
        &now.format("%Y-%m-%d %H:%M:%S").to_string(),
        transcript,
    );
    fs::write(&filepath, contents).map_err(|e| StorageError::WriteFile {
        path: filepath.clone(),
        source: e,
    })?;

    info!("Saved call transcript to: {:?}", filepath);
    Ok(filepath)
}

/// Reduce a phone number to filename-safe characters
fn sanitize_phone(phone_number: &str) -> String {
    let cleaned: String = phone_number
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}

/// Render the saved transcript document
fn render_transcript(phone_number: &str, recorded_at: &str, transcript: &str) -> String {
    format!(
        "# Call transcript\n\n- Customer phone: {}\n- Recorded: {}\n\n{}\n",
        phone_number, recorded_at, transcript
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_phone_strips_punctuation() {
        assert_eq!(sanitize_phone("555-0100"), "5550100");
        assert_eq!(sanitize_phone("+1 (555) 010-0"), "15550100");
        assert_eq!(sanitize_phone("---"), "unknown");
    }

    #[test]
    fn test_render_transcript_includes_metadata_and_text() {
        let doc = render_transcript("555-0100", "2026-08-06 12:00:00", "Hello world");
        assert!(doc.contains("Customer phone: 555-0100"));
        assert!(doc.contains("Recorded: 2026-08-06 12:00:00"));
        assert!(doc.ends_with("Hello world\n"));
    }
}
