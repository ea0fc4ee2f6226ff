//! Classification of acquisition failures into a closed taxonomy.
//!
//! Platform errors arrive in driver-specific shapes; the presentation layer
//! needs a small, stable vocabulary to act on. Classification is lossless for
//! the operator: the raw detail text rides along.

use crate::host::StreamError;

/// Closed taxonomy of acquisition failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The user or platform refused camera access.
    PermissionDenied,
    /// No camera exists on the device.
    DeviceNotFound,
    /// The environment cannot capture at all.
    NotSupported,
    /// Another application holds the camera.
    DeviceBusy,
    /// No device satisfied the requested constraints.
    ConstraintsNotSatisfiable,
    /// The capture configuration itself was invalid.
    ConfigurationError,
    /// Anything else.
    Unknown,
}

impl ErrorKind {
    /// Short operator-facing hint for this failure class.
    pub fn hint(&self) -> &'static str {
        match self {
            ErrorKind::PermissionDenied => "camera access was denied; grant permission and retry",
            ErrorKind::DeviceNotFound => "no camera was found on this device",
            ErrorKind::NotSupported => "camera capture is not supported in this environment",
            ErrorKind::DeviceBusy => "the camera is in use by another application",
            ErrorKind::ConstraintsNotSatisfiable => {
                "no camera configuration matched the requested constraints"
            }
            ErrorKind::ConfigurationError => "the capture configuration is invalid",
            ErrorKind::Unknown => "the camera could not be accessed",
        }
    }
}

/// A classified acquisition failure: taxonomy kind plus raw detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorClassification {
    /// Which class of failure this is.
    pub kind: ErrorKind,
    /// Free-text detail from the underlying platform error.
    pub detail: String,
}

impl ErrorClassification {
    /// Maps a raw platform error into the taxonomy.
    pub fn classify(error: &StreamError) -> Self {
        let (kind, detail) = match error {
            StreamError::AccessDenied(d) => (ErrorKind::PermissionDenied, d),
            StreamError::NoDevice(d) => (ErrorKind::DeviceNotFound, d),
            StreamError::Unsupported(d) => (ErrorKind::NotSupported, d),
            StreamError::Busy(d) => (ErrorKind::DeviceBusy, d),
            StreamError::Overconstrained(d) => (ErrorKind::ConstraintsNotSatisfiable, d),
            StreamError::InvalidConfig(d) => (ErrorKind::ConfigurationError, d),
            StreamError::Other(d) => (ErrorKind::Unknown, d),
        };
        Self {
            kind,
            detail: detail.clone(),
        }
    }
}

impl std::fmt::Display for ErrorClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.detail.is_empty() {
            write!(f, "{}", self.kind.hint())
        } else {
            write!(f, "{} ({})", self.kind.hint(), self.detail)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_covers_taxonomy() {
        let cases = [
            (
                StreamError::AccessDenied("x".into()),
                ErrorKind::PermissionDenied,
            ),
            (StreamError::NoDevice("x".into()), ErrorKind::DeviceNotFound),
            (StreamError::Unsupported("x".into()), ErrorKind::NotSupported),
            (StreamError::Busy("x".into()), ErrorKind::DeviceBusy),
            (
                StreamError::Overconstrained("x".into()),
                ErrorKind::ConstraintsNotSatisfiable,
            ),
            (
                StreamError::InvalidConfig("x".into()),
                ErrorKind::ConfigurationError,
            ),
            (StreamError::Other("x".into()), ErrorKind::Unknown),
        ];
        for (error, expected) in cases {
            assert_eq!(ErrorClassification::classify(&error).kind, expected);
        }
    }

    #[test]
    fn test_detail_preserved() {
        let class =
            ErrorClassification::classify(&StreamError::Busy("held by screen recorder".into()));
        assert_eq!(class.detail, "held by screen recorder");
        assert!(class.to_string().contains("another application"));
    }
}
