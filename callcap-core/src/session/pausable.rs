//! Pausable capture session with segment bookkeeping.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::config::CaptureConfig;
use crate::models::error::CaptureError;
use crate::models::state::CaptureState;
use crate::models::status::RecordingStatus;
use crate::processing::mixer;
use crate::storage::wav;
use crate::traits::stream_adapter::{FrameSink, StreamAdapter};

use super::concat_frames;

struct PausableShared {
    state: CaptureState,
    /// Sealed pause-bounded segments, in order.
    segments: Vec<Vec<f32>>,
    /// Frames of the in-flight segment.
    current: Vec<Vec<f32>>,
    current_samples: usize,
    sealed_secs: f64,
    pause_count: u32,
}

impl PausableShared {
    fn seal_current(&mut self, sample_rate: u32, channels: u16) {
        if self.current.is_empty() {
            return;
        }
        let segment = concat_frames(&self.current);
        self.sealed_secs += mixer::samples_to_secs(segment.len(), sample_rate, channels);
        self.segments.push(segment);
        self.current.clear();
        self.current_samples = 0;
    }

    fn duration_secs(&self, sample_rate: u32, channels: u16) -> f64 {
        self.sealed_secs + mixer::samples_to_secs(self.current_samples, sample_rate, channels)
    }
}

/// Capture session with pause/resume.
///
/// Pausing does not stop the device stream — reopening one on resume risks
/// latency and device contention. The callback keeps firing and frames are
/// discarded while paused, with the pause decision and the frame append
/// serialized by a single mutex: a frame can never land after a pause, and
/// none is lost to a race with an in-flight callback.
pub struct PausableSession<A: StreamAdapter> {
    adapter: A,
    config: CaptureConfig,
    shared: Arc<Mutex<PausableShared>>,
}

impl<A: StreamAdapter> PausableSession<A> {
    pub fn new(adapter: A, config: CaptureConfig) -> Self {
        Self {
            adapter,
            config,
            shared: Arc::new(Mutex::new(PausableShared {
                state: CaptureState::Idle,
                segments: Vec::new(),
                current: Vec::new(),
                current_samples: 0,
                sealed_secs: 0.0,
                pause_count: 0,
            })),
        }
    }

    pub fn start_recording(&mut self) -> Result<(), CaptureError> {
        self.config.validate().map_err(CaptureError::Config)?;
        {
            let mut shared = self.shared.lock();
            if shared.state.is_active() {
                log::warn!("start_recording ignored: session already active");
                return Ok(());
            }
            shared.segments.clear();
            shared.current.clear();
            shared.current_samples = 0;
            shared.sealed_secs = 0.0;
            shared.pause_count = 0;
            shared.state = CaptureState::Recording;
        }

        let shared = Arc::clone(&self.shared);
        let sink: FrameSink = Arc::new(move |frame: &[f32]| {
            let mut shared = shared.lock();
            if shared.state.is_recording() {
                shared.current_samples += frame.len();
                shared.current.push(frame.to_vec());
            }
        });

        if let Err(err) = self.adapter.start(sink) {
            self.shared.lock().state = CaptureState::Idle;
            return Err(err);
        }
        log::info!("recording started ({})", self.adapter.device_info().name);
        Ok(())
    }

    /// Seal the in-flight segment and stop capturing until resume.
    /// Returns false (no-op) when not recording or already paused.
    pub fn pause(&mut self) -> bool {
        let mut shared = self.shared.lock();
        if !shared.state.is_recording() {
            return false;
        }
        shared.seal_current(self.config.sample_rate, self.config.channels);
        shared.pause_count += 1;
        shared.state = CaptureState::Paused;
        log::info!("recording paused ({:.1}s so far)", shared.sealed_secs);
        true
    }

    /// Begin a fresh segment; the device stream was never interrupted.
    /// Returns false (no-op) when not paused.
    pub fn resume(&mut self) -> bool {
        let mut shared = self.shared.lock();
        if !shared.state.is_paused() {
            return false;
        }
        shared.state = CaptureState::Recording;
        log::info!("recording resumed");
        true
    }

    /// Seal any open segment, close the device, and return the
    /// concatenation of all segments in order. Idempotent; frames delivered
    /// while paused are excluded.
    pub fn stop_recording(&mut self) -> Vec<f32> {
        let was_active = {
            let mut shared = self.shared.lock();
            let active = shared.state.is_active();
            if active {
                shared.seal_current(self.config.sample_rate, self.config.channels);
                shared.state = CaptureState::Stopping;
            }
            active
        };

        if was_active {
            if let Err(err) = self.adapter.stop() {
                log::warn!("input stream failed to close cleanly: {}", err);
            }
        }

        let mut shared = self.shared.lock();
        shared.state = CaptureState::Idle;
        let audio = concat_frames(&shared.segments);
        if audio.is_empty() {
            log::warn!("no audio captured");
        } else if was_active {
            log::info!(
                "recording stopped ({:.2}s across {} segment(s), {} pause(s))",
                shared.sealed_secs,
                shared.segments.len(),
                shared.pause_count
            );
        }
        audio
    }

    /// Snapshot of the session, computed under the same lock the device
    /// callback uses so the fields are never torn across a pause boundary.
    pub fn status(&self) -> RecordingStatus {
        let shared = self.shared.lock();
        RecordingStatus {
            recording: shared.state.is_active(),
            paused: shared.state.is_paused(),
            duration_secs: shared.duration_secs(self.config.sample_rate, self.config.channels),
            pause_count: shared.pause_count,
            segment_count: shared.segments.len() + usize::from(shared.current_samples > 0),
        }
    }

    pub fn save(&self, samples: &[f32], path: Option<&Path>) -> Result<PathBuf, CaptureError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => wav::timestamped_path(&self.config.output_directory, "recording", "wav"),
        };
        wav::write_wav(&path, samples, self.config.sample_rate, self.config.channels)?;
        log::info!("audio saved to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::testing::{AdapterProbe, FakeAdapter};

    fn session() -> (PausableSession<FakeAdapter>, AdapterProbe) {
        let (adapter, probe) = FakeAdapter::new("test mic");
        (PausableSession::new(adapter, CaptureConfig::default()), probe)
    }

    #[test]
    fn paused_frames_are_excluded_in_delivery_order() {
        let (mut session, probe) = session();
        session.start_recording().unwrap();

        probe.feed(&[0.1, 0.1]);
        assert!(session.pause());
        probe.feed(&[0.9, 0.9, 0.9]); // discarded
        assert!(session.resume());
        probe.feed(&[0.2]);

        let audio = session.stop_recording();
        assert_eq!(audio, vec![0.1, 0.1, 0.2]);
    }

    #[test]
    fn repeated_pause_resume_cycles_accumulate_segments() {
        let (mut session, probe) = session();
        session.start_recording().unwrap();

        for value in [0.1f32, 0.2, 0.3] {
            probe.feed(&[value; 4]);
            session.pause();
            probe.feed(&[0.9; 8]);
            session.resume();
        }
        probe.feed(&[0.4; 4]);

        let audio = session.stop_recording();
        assert_eq!(audio.len(), 16);
        assert_eq!(&audio[..4], &[0.1; 4]);
        assert_eq!(&audio[12..], &[0.4; 4]);
    }

    #[test]
    fn pause_while_paused_is_a_no_op() {
        let (mut session, probe) = session();
        session.start_recording().unwrap();
        probe.feed(&[0.1; 4]);

        assert!(session.pause());
        assert!(!session.pause());
        assert_eq!(session.status().pause_count, 1);
    }

    #[test]
    fn resume_without_pause_is_a_no_op() {
        let (mut session, _probe) = session();
        session.start_recording().unwrap();
        assert!(!session.resume());
    }

    #[test]
    fn status_snapshot_reflects_segments_and_duration() {
        let (mut session, probe) = session();
        // 16 kHz mono: 1600 samples = 0.1 s.
        session.start_recording().unwrap();

        probe.feed(&[0.1; 1600]);
        session.pause();
        session.resume();
        probe.feed(&[0.2; 1600]);

        let status = session.status();
        assert!(status.recording);
        assert!(!status.paused);
        assert!((status.duration_secs - 0.2).abs() < 1e-9);
        assert_eq!(status.pause_count, 1);
        assert_eq!(status.segment_count, 2);
    }

    #[test]
    fn status_while_paused_counts_only_sealed_audio() {
        let (mut session, probe) = session();
        session.start_recording().unwrap();
        probe.feed(&[0.1; 1600]);
        session.pause();
        probe.feed(&[0.9; 1600]); // discarded

        let status = session.status();
        assert!(status.recording);
        assert!(status.paused);
        assert!((status.duration_secs - 0.1).abs() < 1e-9);
        assert_eq!(status.segment_count, 1);
    }

    #[test]
    fn stop_from_paused_seals_and_stops_once() {
        let (mut session, probe) = session();
        session.start_recording().unwrap();
        probe.feed(&[0.1; 8]);
        session.pause();

        let audio = session.stop_recording();
        assert_eq!(audio, vec![0.1; 8]);
        assert_eq!(probe.stops(), 1);

        let status = session.status();
        assert!(!status.recording);
        assert!(!status.paused);
    }

    #[test]
    fn stop_twice_returns_same_buffer() {
        let (mut session, probe) = session();
        session.start_recording().unwrap();
        probe.feed(&[0.3; 6]);

        let first = session.stop_recording();
        let second = session.stop_recording();
        assert_eq!(first, second);
        assert_eq!(probe.stops(), 1);
    }

    #[test]
    fn empty_recording_is_reported_not_raised() {
        let (mut session, _probe) = session();
        session.start_recording().unwrap();
        assert!(session.stop_recording().is_empty());
        assert_eq!(session.status(), RecordingStatus::idle());
    }
}
