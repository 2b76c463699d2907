//! Single-stream capture session.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::config::CaptureConfig;
use crate::models::error::CaptureError;
use crate::models::state::CaptureState;
use crate::processing::mixer;
use crate::storage::wav;
use crate::traits::stream_adapter::{FrameSink, StreamAdapter};

use super::concat_frames;

struct SingleShared {
    state: CaptureState,
    frames: Vec<Vec<f32>>,
}

/// Records one input stream end-to-end.
///
/// The device callback and the controlling thread share one mutex guarding
/// the recording flag and the frame buffer as a unit, so frames are never
/// appended after a stop decision.
pub struct CaptureSession<A: StreamAdapter> {
    adapter: A,
    config: CaptureConfig,
    shared: Arc<Mutex<SingleShared>>,
}

impl<A: StreamAdapter> CaptureSession<A> {
    pub fn new(adapter: A, config: CaptureConfig) -> Self {
        Self {
            adapter,
            config,
            shared: Arc::new(Mutex::new(SingleShared {
                state: CaptureState::Idle,
                frames: Vec::new(),
            })),
        }
    }

    /// Reset buffers and open the device. Starting while already recording
    /// is a logged no-op.
    pub fn start_recording(&mut self) -> Result<(), CaptureError> {
        self.config.validate().map_err(CaptureError::Config)?;
        {
            let mut shared = self.shared.lock();
            if !shared.state.is_idle() {
                log::warn!("start_recording ignored: session already active");
                return Ok(());
            }
            shared.frames.clear();
            shared.state = CaptureState::Recording;
        }

        let shared = Arc::clone(&self.shared);
        let sink: FrameSink = Arc::new(move |frame: &[f32]| {
            let mut shared = shared.lock();
            if shared.state.is_recording() {
                shared.frames.push(frame.to_vec());
            }
        });

        if let Err(err) = self.adapter.start(sink) {
            self.shared.lock().state = CaptureState::Idle;
            return Err(err);
        }
        log::info!("recording started ({})", self.adapter.device_info().name);
        Ok(())
    }

    /// Close the device and return the captured audio.
    ///
    /// Recording zero audio is a valid outcome: the result is an explicitly
    /// empty buffer, not an error. A failed stream close is logged and
    /// treated as best-effort. Idempotent — a second stop returns the same
    /// buffer without touching the device again.
    pub fn stop_recording(&mut self) -> Vec<f32> {
        let was_active = {
            let mut shared = self.shared.lock();
            let active = shared.state.is_active();
            if active {
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
        let audio = concat_frames(&shared.frames);
        if audio.is_empty() {
            log::warn!("no audio captured");
        } else if was_active {
            log::info!(
                "recording stopped ({:.2}s)",
                mixer::samples_to_secs(audio.len(), self.config.sample_rate, self.config.channels)
            );
        }
        audio
    }

    pub fn is_recording(&self) -> bool {
        self.shared.lock().state.is_recording()
    }

    /// Write `samples` as a 16-bit PCM WAV file. Auto-generates a
    /// timestamped name under the configured output directory when `path`
    /// is `None`; refuses an empty buffer with
    /// [`CaptureError::EmptyCapture`].
    pub fn save(&self, samples: &[f32], path: Option<&Path>) -> Result<PathBuf, CaptureError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => wav::timestamped_path(&self.config.output_directory, "recording", "wav"),
        };
        wav::write_wav(&path, samples, self.config.sample_rate, self.config.channels)?;
        log::info!("audio saved to {}", path.display());
        Ok(path)
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::testing::FakeAdapter;

    fn session() -> (CaptureSession<FakeAdapter>, crate::session::testing::AdapterProbe) {
        let (adapter, probe) = FakeAdapter::new("test mic");
        (CaptureSession::new(adapter, CaptureConfig::default()), probe)
    }

    #[test]
    fn captures_all_delivered_frames_in_order() {
        let (mut session, probe) = session();
        session.start_recording().unwrap();

        probe.feed(&[0.1, 0.2]);
        probe.feed(&[0.3]);
        probe.feed(&[0.4, 0.5, 0.6]);

        let audio = session.stop_recording();
        assert_eq!(audio, vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
    }

    #[test]
    fn zero_frames_yield_explicit_empty_buffer() {
        let (mut session, _probe) = session();
        session.start_recording().unwrap();

        let audio = session.stop_recording();
        assert!(audio.is_empty());
        assert_eq!(
            session.save(&audio, None),
            Err(CaptureError::EmptyCapture)
        );
    }

    #[test]
    fn stop_is_idempotent_and_never_double_closes() {
        let (mut session, probe) = session();
        session.start_recording().unwrap();
        probe.feed(&[0.5; 100]);

        let first = session.stop_recording();
        let second = session.stop_recording();
        assert_eq!(first, second);
        assert_eq!(probe.stops(), 1);
    }

    #[test]
    fn frames_after_stop_are_dropped() {
        let (mut session, probe) = session();
        session.start_recording().unwrap();
        probe.feed(&[0.1; 10]);
        session.stop_recording();

        probe.feed(&[0.9; 10]);
        assert_eq!(session.stop_recording().len(), 10);
    }

    #[test]
    fn start_resets_previous_capture() {
        let (mut session, probe) = session();
        session.start_recording().unwrap();
        probe.feed(&[0.1; 10]);
        session.stop_recording();

        session.start_recording().unwrap();
        probe.feed(&[0.2; 4]);
        assert_eq!(session.stop_recording(), vec![0.2; 4]);
    }

    #[test]
    fn failed_open_reports_device_error_and_stays_idle() {
        let (adapter, probe) = FakeAdapter::failing("busy mic");
        let mut session = CaptureSession::new(adapter, CaptureConfig::default());

        assert!(matches!(
            session.start_recording(),
            Err(CaptureError::Device(_))
        ));
        assert!(!session.is_recording());
        assert_eq!(probe.starts(), 0);
    }

    #[test]
    fn invalid_config_is_rejected_at_start() {
        let (adapter, probe) = FakeAdapter::new("test mic");
        let config = CaptureConfig {
            sample_rate: 0,
            ..Default::default()
        };
        let mut session = CaptureSession::new(adapter, config);

        assert!(matches!(
            session.start_recording(),
            Err(CaptureError::Config(_))
        ));
        assert_eq!(probe.starts(), 0);
    }

    #[test]
    fn double_start_is_a_no_op() {
        let (mut session, probe) = session();
        session.start_recording().unwrap();
        session.start_recording().unwrap();
        assert_eq!(probe.starts(), 1);
    }

    #[test]
    fn save_writes_wav_to_explicit_path() {
        let (mut session, probe) = session();
        session.start_recording().unwrap();
        probe.feed(&[0.25; 64]);
        let audio = session.stop_recording();

        let path = std::env::temp_dir().join(format!("callcap_single_{}.wav", uuid::Uuid::new_v4()));
        let written = session.save(&audio, Some(&path)).unwrap();
        assert_eq!(written, path);

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), wav::WAV_HEADER_SIZE + 64 * 2);
        std::fs::remove_file(&path).ok();
    }
}
