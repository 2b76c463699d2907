//! Dual-stream capture: microphone and system loopback with one logical
//! start/stop.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::audio::StreamRole;
use crate::models::config::CaptureConfig;
use crate::models::error::CaptureError;
use crate::models::recording::{DualCapture, RecordingMetadata, SavedRecordings};
use crate::models::state::CaptureState;
use crate::processing::mixer;
use crate::storage::{metadata, wav};
use crate::traits::stream_adapter::{FrameSink, StreamAdapter};

use super::collect_dual;

struct DualShared {
    state: CaptureState,
    mic_frames: Vec<Vec<f32>>,
    system_frames: Vec<Vec<f32>>,
}

/// Captures microphone and system-loopback audio concurrently.
///
/// Both adapters should be built from the same [`CaptureConfig`] so they
/// share an explicit block size — block-synchronized capture keeps the two
/// queues filling in comparable increments, which bounds drift between the
/// independently-clocked devices. Alignment stays approximate: no drift
/// correction or resampling is applied when one device's effective rate
/// strays from nominal.
pub struct DualSession<M: StreamAdapter, S: StreamAdapter> {
    mic: M,
    system: S,
    config: CaptureConfig,
    shared: Arc<Mutex<DualShared>>,
}

impl<M: StreamAdapter, S: StreamAdapter> DualSession<M, S> {
    pub fn new(mic: M, system: S, config: CaptureConfig) -> Self {
        Self {
            mic,
            system,
            config,
            shared: Arc::new(Mutex::new(DualShared {
                state: CaptureState::Idle,
                mic_frames: Vec::new(),
                system_frames: Vec::new(),
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
            shared.mic_frames.clear();
            shared.system_frames.clear();
            shared.state = CaptureState::Recording;
        }

        let shared = Arc::clone(&self.shared);
        let mic_sink: FrameSink = Arc::new(move |frame: &[f32]| {
            let mut shared = shared.lock();
            if shared.state.is_recording() {
                shared.mic_frames.push(frame.to_vec());
            }
        });
        let shared = Arc::clone(&self.shared);
        let system_sink: FrameSink = Arc::new(move |frame: &[f32]| {
            let mut shared = shared.lock();
            if shared.state.is_recording() {
                shared.system_frames.push(frame.to_vec());
            }
        });

        if let Err(err) = self.mic.start(mic_sink) {
            self.shared.lock().state = CaptureState::Idle;
            return Err(err);
        }
        if let Err(err) = self.system.start(system_sink) {
            // Release the stream we did manage to open.
            if let Err(stop_err) = self.mic.stop() {
                log::warn!("mic stream failed to close cleanly: {}", stop_err);
            }
            self.shared.lock().state = CaptureState::Idle;
            return Err(err);
        }

        log::info!(
            "dual-stream recording started (mic: {}, system: {})",
            self.mic.device_info().name,
            self.system.device_info().name
        );
        Ok(())
    }

    /// Stop both streams and return the time-aligned mix plus both
    /// originals. The shorter stream is zero-padded, never the longer one
    /// truncated. All three buffers are empty when either stream captured
    /// nothing. Idempotent.
    pub fn stop_recording(&mut self) -> DualCapture {
        let was_active = {
            let mut shared = self.shared.lock();
            let active = shared.state.is_active();
            if active {
                shared.state = CaptureState::Stopping;
            }
            active
        };

        if was_active {
            if let Err(err) = self.mic.stop() {
                log::warn!("mic stream failed to close cleanly: {}", err);
            }
            if let Err(err) = self.system.stop() {
                log::warn!("system stream failed to close cleanly: {}", err);
            }
        }

        let mut shared = self.shared.lock();
        shared.state = CaptureState::Idle;
        let capture = collect_dual(&shared.mic_frames, &shared.system_frames);
        if was_active && !capture.is_empty() {
            log::info!(
                "dual-stream recording stopped ({:.2}s combined)",
                mixer::samples_to_secs(
                    capture.combined.len(),
                    self.config.sample_rate,
                    self.config.channels
                )
            );
        }
        capture
    }

    pub fn is_recording(&self) -> bool {
        self.shared.lock().state.is_recording()
    }

    /// Save the mix and both originals as `<base>_combined.wav`,
    /// `<base>_mic.wav`, and `<base>_system.wav` under the output
    /// directory, with a timestamped base when none is given. Empty tracks
    /// are skipped; a metadata sidecar accompanies the combined file.
    pub fn save_all(
        &self,
        capture: &DualCapture,
        base: Option<&str>,
    ) -> Result<SavedRecordings, CaptureError> {
        if capture.is_empty() {
            return Err(CaptureError::EmptyCapture);
        }

        let base = match base {
            Some(base) => base.to_string(),
            None => format!("recording_{}", chrono::Local::now().format("%Y%m%d_%H%M%S")),
        };
        let dir = &self.config.output_directory;
        let mut saved = SavedRecordings::default();

        let combined_path = dir.join(format!("{}_combined.wav", base));
        wav::write_wav(
            &combined_path,
            &capture.combined,
            self.config.sample_rate,
            self.config.channels,
        )?;
        let meta = RecordingMetadata::new(
            mixer::samples_to_secs(
                capture.combined.len(),
                self.config.sample_rate,
                self.config.channels,
            ),
            self.config.sample_rate,
            self.config.channels,
            vec![StreamRole::Mic, StreamRole::System],
        );
        if let Err(err) = metadata::write_metadata(&meta, &combined_path) {
            log::error!("failed to write metadata sidecar: {}", err);
        }
        log::info!("combined audio saved to {}", combined_path.display());
        saved.combined = Some(combined_path);

        if !capture.mic.is_empty() {
            let path = dir.join(format!("{}_mic.wav", base));
            wav::write_wav(&path, &capture.mic, self.config.sample_rate, self.config.channels)?;
            saved.mic = Some(path);
        }
        if !capture.system.is_empty() {
            let path = dir.join(format!("{}_system.wav", base));
            wav::write_wav(
                &path,
                &capture.system,
                self.config.sample_rate,
                self.config.channels,
            )?;
            saved.system = Some(path);
        }
        Ok(saved)
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }
}
