// Audio error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Error code range for audio errors: 1101-1110
const CODE_PERMISSION_DENIED: i32 = 1101;
const CODE_DEVICE_ERROR: i32 = 1102;
const CODE_STREAM_OPEN_FAILED: i32 = 1103;
const CODE_STREAM_FAILURE: i32 = 1104;
const CODE_ALREADY_LISTENING: i32 = 1105;
const CODE_NOT_LISTENING: i32 = 1106;
const CODE_LOCK_POISONED: i32 = 1107;
const CODE_UNSUPPORTED_FORMAT: i32 = 1108;

/// Log an audio error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "Audio error in {}: code={}, component=CaptureEngine, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Audio-related errors
///
/// These errors cover microphone capture operations including stream
/// initialization, device access, and lifecycle management.
///
/// Error code range: 1101-1110
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// Microphone permission denied by the operating system
    PermissionDenied,

    /// No input device exists, or the device was lost mid-session
    DeviceError { details: String },

    /// Failed to open the capture stream
    StreamOpenFailed { reason: String },

    /// Capture stream disconnected or errored while running
    StreamFailure { reason: String },

    /// Capture is already running
    AlreadyListening,

    /// Capture is not running
    NotListening,

    /// Mutex/RwLock was poisoned
    LockPoisoned { component: String },

    /// The device offers a sample format the pipeline does not handle
    UnsupportedFormat { format: String },
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::PermissionDenied => CODE_PERMISSION_DENIED,
            AudioError::DeviceError { .. } => CODE_DEVICE_ERROR,
            AudioError::StreamOpenFailed { .. } => CODE_STREAM_OPEN_FAILED,
            AudioError::StreamFailure { .. } => CODE_STREAM_FAILURE,
            AudioError::AlreadyListening => CODE_ALREADY_LISTENING,
            AudioError::NotListening => CODE_NOT_LISTENING,
            AudioError::LockPoisoned { .. } => CODE_LOCK_POISONED,
            AudioError::UnsupportedFormat { .. } => CODE_UNSUPPORTED_FORMAT,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::PermissionDenied => {
                "Microphone permission denied. Please grant microphone access.".to_string()
            }
            AudioError::DeviceError { details } => {
                format!("Audio device error: {}", details)
            }
            AudioError::StreamOpenFailed { reason } => {
                format!("Failed to open capture stream: {}", reason)
            }
            AudioError::StreamFailure { reason } => {
                format!("Capture stream failed: {}", reason)
            }
            AudioError::AlreadyListening => {
                "Capture already running. Call stop_listening() first.".to_string()
            }
            AudioError::NotListening => {
                "Capture not running. Call start_listening() first.".to_string()
            }
            AudioError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
            AudioError::UnsupportedFormat { format } => {
                format!("Unsupported input sample format: {}", format)
            }
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AudioError (code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for AudioError {}

impl From<std::io::Error> for AudioError {
    fn from(err: std::io::Error) -> Self {
        AudioError::DeviceError {
            details: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_error_codes_are_distinct() {
        let errors = [
            AudioError::PermissionDenied,
            AudioError::DeviceError {
                details: "x".to_string(),
            },
            AudioError::StreamOpenFailed {
                reason: "x".to_string(),
            },
            AudioError::StreamFailure {
                reason: "x".to_string(),
            },
            AudioError::AlreadyListening,
            AudioError::NotListening,
            AudioError::LockPoisoned {
                component: "x".to_string(),
            },
            AudioError::UnsupportedFormat {
                format: "x".to_string(),
            },
        ];

        let mut codes: Vec<i32> = errors.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len(), "Error codes must be unique");
    }

    #[test]
    fn test_audio_error_messages() {
        let err = AudioError::PermissionDenied;
        assert!(err.message().contains("permission denied"));

        let err = AudioError::DeviceError {
            details: "no default input".to_string(),
        };
        assert_eq!(err.message(), "Audio device error: no default input");

        let err = AudioError::AlreadyListening;
        assert!(err.message().contains("already running"));

        let err = AudioError::NotListening;
        assert!(err.message().contains("not running"));
    }

    #[test]
    fn test_audio_error_display() {
        let err = AudioError::PermissionDenied;
        let display = format!("{}", err);
        assert!(display.contains("AudioError"));
        assert!(display.contains(&err.code().to_string()));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::other("test io error");
        let audio_err: AudioError = io_err.into();
        match audio_err {
            AudioError::DeviceError { details } => {
                assert!(details.contains("test io error"));
            }
            _ => panic!("Expected DeviceError"),
        }
    }
}
