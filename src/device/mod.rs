//! Device control channel
//!
//! The one shared mutable resource in the system: a single input/capture
//! channel to the emulator. Everything above it speaks normalized 0..1
//! coordinates; implementations map them to physical pixels at dispatch
//! time. Channel failures are always fatal to the run; callers surface
//! them as an aborted outcome and never retry silently.

pub mod adb;

use std::time::Duration;

pub use adb::AdbDevice;

use crate::vision::{Frame, Point};

/// Errors from the device channel
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("adb command failed: {0}")]
    Adb(String),
    #[error("device io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode screen capture: {0}")]
    Decode(String),
    #[error("no device connected")]
    NotConnected,
}

/// Input and capture operations against the controlled emulator
pub trait DeviceControl {
    /// Capture the current screen contents
    fn capture_frame(&mut self) -> Result<Frame, DeviceError>;

    /// Press at a normalized point for the given duration
    fn tap(&mut self, point: Point, duration: Duration) -> Result<(), DeviceError>;

    /// Drag along a path of normalized points over the given total duration
    fn swipe(&mut self, path: &[Point], total: Duration) -> Result<(), DeviceError>;
}
