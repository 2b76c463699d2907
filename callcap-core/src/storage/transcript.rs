//! Markdown transcript export.

use std::fs;
use std::path::{Path, PathBuf};

use crate::models::error::CaptureError;

use super::wav::timestamped_path;

/// Write a transcript (and optional analysis) as a markdown file under
/// `dir`, named `transcript_%Y%m%d_%H%M%S.md`.
///
/// An empty transcript is refused with [`CaptureError::EmptyCapture`]
/// rather than producing a blank file.
pub fn save_transcript(
    dir: &Path,
    transcript: &str,
    analysis: Option<&str>,
) -> Result<PathBuf, CaptureError> {
    if transcript.trim().is_empty() {
        return Err(CaptureError::EmptyCapture);
    }

    fs::create_dir_all(dir)
        .map_err(|e| CaptureError::Storage(format!("failed to create directory: {}", e)))?;

    let path = timestamped_path(dir, "transcript", "md");
    let mut body = format!(
        "# Transcript\n\nRecorded: {}\n\n{}\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        transcript.trim()
    );
    if let Some(analysis) = analysis {
        if !analysis.trim().is_empty() {
            body.push_str(&format!("\n## Analysis\n\n{}\n", analysis.trim()));
        }
    }

    fs::write(&path, body)
        .map_err(|e| CaptureError::Storage(format!("failed to write transcript: {}", e)))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_transcript_with_analysis() {
        let dir = std::env::temp_dir().join(format!("callcap_transcript_{}", uuid::Uuid::new_v4()));
        let path = save_transcript(&dir, "hello world", Some("a short call")).unwrap();

        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.starts_with("# Transcript"));
        assert!(body.contains("hello world"));
        assert!(body.contains("## Analysis"));
        assert!(body.contains("a short call"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn refuses_empty_transcript() {
        let dir = std::env::temp_dir();
        assert_eq!(
            save_transcript(&dir, "   ", None),
            Err(CaptureError::EmptyCapture)
        );
    }
}
