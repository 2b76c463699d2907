use serde::Serialize;

/// Point-in-time snapshot of a pausable recording session.
///
/// All fields are read under the same lock the device callback uses, so the
/// snapshot is never torn across a pause boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordingStatus {
    /// A recording session is live (includes paused).
    pub recording: bool,
    pub paused: bool,
    /// Captured audio so far, including the in-flight segment.
    pub duration_secs: f64,
    pub pause_count: u32,
    /// Sealed segments plus the in-flight one, if any.
    pub segment_count: usize,
}

impl RecordingStatus {
    pub fn idle() -> Self {
        Self {
            recording: false,
            paused: false,
            duration_secs: 0.0,
            pause_count: 0,
            segment_count: 0,
        }
    }
}
