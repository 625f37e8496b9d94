//! RF transmitter collaborators
//!
//! The bridge hands each encoded frame to a [`Transmitter`]. In production
//! that is the external `sendook` program. Dry runs only log frames, and
//! tests record them.

use std::future::Future;
use std::process::Stdio;
use std::sync::{Arc, Mutex};

use ook_protocol::RawRfFrame;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::config::TransmitterConfig;
use crate::error::BridgeError;

/// Something that can put a frame on the air
pub trait Transmitter: Send + Sync {
    /// Transmit one frame, resolving once the transmission has finished
    fn transmit(&self, frame: &RawRfFrame) -> impl Future<Output = Result<(), BridgeError>> + Send;
}

/// Runs the configured transmitter program once per frame
///
/// Invoked directly (no shell) as
/// `<program> -f <frequency_hz> -0 <zero_pulse_us> -1 <one_pulse_us> <frame>`.
#[derive(Debug, Clone)]
pub struct SendOok {
    config: TransmitterConfig,
}

impl SendOok {
    pub fn new(config: TransmitterConfig) -> Self {
        Self { config }
    }

    /// Arguments passed to the program for `frame`
    pub fn args(&self, frame: &RawRfFrame) -> Vec<String> {
        vec![
            "-f".to_string(),
            self.config.frequency_hz.to_string(),
            "-0".to_string(),
            self.config.zero_pulse_us.to_string(),
            "-1".to_string(),
            self.config.one_pulse_us.to_string(),
            frame.to_string(),
        ]
    }
}

impl Transmitter for SendOok {
    async fn transmit(&self, frame: &RawRfFrame) -> Result<(), BridgeError> {
        debug!("Running {} for {}-symbol frame", self.config.program, frame.len());

        let output = Command::new(&self.config.program)
            .args(self.args(frame))
            .stdin(Stdio::null())
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stdout.trim().is_empty() {
            debug!("{} stdout: {}", self.config.program, stdout.trim());
        }

        if output.status.success() {
            if !stderr.trim().is_empty() {
                debug!("{} stderr: {}", self.config.program, stderr.trim());
            }
            Ok(())
        } else {
            error!(
                "{} exited with {}: {}",
                self.config.program,
                output.status,
                stderr.trim()
            );
            Err(BridgeError::TransmitFailure {
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            })
        }
    }
}

/// Logs frames instead of transmitting them
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingTransmitter;

impl Transmitter for LoggingTransmitter {
    async fn transmit(&self, frame: &RawRfFrame) -> Result<(), BridgeError> {
        info!("Dry run, not transmitting {}", frame);
        Ok(())
    }
}

/// Records frames instead of transmitting them
///
/// Clones share the same record, so a test can keep one handle while the
/// bridge owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransmitter {
    frames: Arc<Mutex<Vec<RawRfFrame>>>,
    fail: bool,
}

impl RecordingTransmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transmitter that records each frame and then reports failure
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Frames transmitted so far, oldest first
    pub fn frames(&self) -> Vec<RawRfFrame> {
        self.frames
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Transmitter for RecordingTransmitter {
    async fn transmit(&self, frame: &RawRfFrame) -> Result<(), BridgeError> {
        debug!("Recording frame {}", frame);
        self.frames
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(frame.clone());

        if self.fail {
            Err(BridgeError::TransmitFailure {
                status: "simulated".to_string(),
                stderr: String::new(),
            })
        } else {
            Ok(())
        }
    }
}
