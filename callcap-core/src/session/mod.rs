//! Capture sessions: single-stream, pausable, dual-stream, and streaming.
//!
//! Each session exclusively owns its stream adapter(s) and one mutex-guarded
//! state block shared with the device callback. Controllers drive sessions
//! from their own thread; the only call that waits is stop, bounded by the
//! chunk worker's poll timeout.

pub mod dual;
pub mod pausable;
pub mod single;
pub mod streaming;

use crate::models::recording::DualCapture;
use crate::processing::mixer;

/// Concatenate captured frames into one contiguous buffer.
pub(crate) fn concat_frames(frames: &[Vec<f32>]) -> Vec<f32> {
    let total = frames.iter().map(Vec::len).sum();
    let mut audio = Vec::with_capacity(total);
    for frame in frames {
        audio.extend_from_slice(frame);
    }
    audio
}

/// Equalize and mix the two halves of a dual capture.
///
/// The shorter stream is zero-padded at the tail to the longer one's length
/// (silence is a safer assumption than dropped speech), then mixed by
/// per-sample averaging. If either stream captured nothing, all three
/// buffers come back empty.
pub(crate) fn collect_dual(mic_frames: &[Vec<f32>], system_frames: &[Vec<f32>]) -> DualCapture {
    if mic_frames.is_empty() || system_frames.is_empty() {
        log::warn!("no audio captured from one or both streams");
        return DualCapture::default();
    }

    let mut mic = concat_frames(mic_frames);
    let mut system = concat_frames(system_frames);
    let len = mic.len().max(system.len());
    mixer::pad_to_length(&mut mic, len);
    mixer::pad_to_length(&mut system, len);
    let combined = mixer::mix_average(&mic, &system);

    DualCapture { combined, mic, system }
}
