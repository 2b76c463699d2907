//! # callcap-cpal
//!
//! cpal device backend for callcap.
//!
//! Provides:
//! - `CpalStreamAdapter` — one input stream (microphone or loopback) behind
//!   the core `StreamAdapter` trait
//! - `devices` — device enumeration, default-input lookup, and loopback
//!   discovery by name substring
//!
//! ## Usage
//! ```ignore
//! use callcap_core::{CaptureConfig, DualSession};
//! use callcap_cpal::CpalStreamAdapter;
//!
//! let config = CaptureConfig::default();
//! let mic = CpalStreamAdapter::for_mic(&config)?;
//! let system = CpalStreamAdapter::for_system(&config)?;
//! let mut session = DualSession::new(mic, system, config);
//! ```

pub mod adapter;
pub mod devices;

pub use adapter::CpalStreamAdapter;
pub use devices::{
    default_input_device, find_loopback_device, list_devices, DEFAULT_LOOPBACK_HINT,
};
