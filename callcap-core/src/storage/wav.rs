//! 16-bit PCM WAV output.
//!
//! Recordings are written in a single pass: the full buffer is in memory by
//! the time a save happens, so the RIFF header is generated with its final
//! sizes up front and never patched afterwards.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::models::error::CaptureError;
use crate::processing::mixer;

/// Size of the standard RIFF/PCM header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

const BIT_DEPTH: u16 = 16;

/// Build the 44-byte RIFF header for a PCM payload of `data_size` bytes.
fn wav_header(sample_rate: u32, channels: u16, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let byte_rate = sample_rate * channels as u32 * BIT_DEPTH as u32 / 8;
    let block_align = channels * BIT_DEPTH / 8;

    let mut header = [0u8; WAV_HEADER_SIZE];
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&(36 + data_size).to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes()); // PCM format code
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&BIT_DEPTH.to_le_bytes());

    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());
    header
}

/// Write `samples` to `path` as a 16-bit PCM WAV file.
///
/// Samples are clamped to [-1, 1] before quantization. An empty buffer is
/// refused with [`CaptureError::EmptyCapture`] so a zero-length container is
/// never produced.
pub fn write_wav(
    path: &Path,
    samples: &[f32],
    sample_rate: u32,
    channels: u16,
) -> Result<(), CaptureError> {
    if samples.is_empty() {
        return Err(CaptureError::EmptyCapture);
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| CaptureError::Storage(format!("failed to create directory: {}", e)))?;
        }
    }

    let pcm = mixer::encode_pcm16(samples);
    let header = wav_header(sample_rate, channels, pcm.len() as u32);

    let mut file = File::create(path)
        .map_err(|e| CaptureError::Storage(format!("failed to create file: {}", e)))?;
    file.write_all(&header)
        .and_then(|_| file.write_all(&pcm))
        .map_err(|e| CaptureError::Storage(format!("failed to write file: {}", e)))?;
    Ok(())
}

/// `dir/stem_%Y%m%d_%H%M%S.ext`, the auto-generated name used when a caller
/// saves without a path.
pub fn timestamped_path(dir: &Path, stem: &str, ext: &str) -> PathBuf {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    dir.join(format!("{}_{}.{}", stem, timestamp, ext))
}
