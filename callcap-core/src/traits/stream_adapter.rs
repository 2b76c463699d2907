use std::sync::Arc;

use crate::models::audio::DeviceInfo;
use crate::models::error::CaptureError;

/// Callback invoked for every frame the device driver delivers.
///
/// Runs on the driver's real-time callback thread: implementations must only
/// enqueue a copy of the frame (or drop it) and return — no blocking I/O, no
/// unbounded work, and nothing that can panic across the boundary.
pub type FrameSink = Arc<dyn Fn(&[f32]) + Send + Sync + 'static>;

/// Interface over one hardware input stream.
///
/// An adapter owns the lifetime of a single device connection; it is never
/// shared between sessions. The trait is deliberately not `Send`: platform
/// stream handles are typically bound to the thread that opened them.
pub trait StreamAdapter {
    /// Open the device and begin delivering frames to `sink`.
    ///
    /// Fails with [`CaptureError::Device`] when the device cannot be opened
    /// (busy, not found, invalid parameters).
    fn start(&mut self, sink: FrameSink) -> Result<(), CaptureError>;

    /// Stop delivering frames and release the device.
    ///
    /// Abort-style: in-flight driver buffers are discarded rather than
    /// drained, so shutdown latency stays bounded. Idempotent, and safe to
    /// call even if `start` never succeeded.
    fn stop(&mut self) -> Result<(), CaptureError>;

    /// Information about the device backing this adapter.
    fn device_info(&self) -> DeviceInfo;
}
