//! Device descriptors produced by enumeration.

use serde::{Deserialize, Serialize};

/// Camera orientation relative to the device body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Rear-facing camera, the default for evidence capture.
    #[default]
    Environment,
    /// Front-facing camera.
    User,
}

impl Facing {
    /// The opposite facing.
    pub fn flipped(self) -> Self {
        match self {
            Facing::Environment => Facing::User,
            Facing::User => Facing::Environment,
        }
    }
}

impl std::fmt::Display for Facing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Facing::Environment => write!(f, "environment"),
            Facing::User => write!(f, "user"),
        }
    }
}

/// Kind of media device reported by enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    /// A camera.
    VideoInput,
    /// A microphone.
    AudioInput,
    /// A speaker or headphone.
    AudioOutput,
}

/// One enumerated media device.
///
/// Read-only enumeration result, not a held resource. The label may be empty
/// when no stream has been granted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Stable platform identifier.
    pub id: String,
    /// Human-readable label; empty when unauthorized.
    pub label: String,
    /// What kind of device this is.
    pub kind: DeviceKind,
}

impl DeviceDescriptor {
    /// Builds a descriptor.
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: DeviceKind) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
        }
    }

    /// Facing inferred from the label, when determinable.
    pub fn inferred_facing(&self) -> Option<Facing> {
        let label = self.label.to_ascii_lowercase();
        if ["back", "rear", "environment"]
            .iter()
            .any(|w| label.contains(w))
        {
            Some(Facing::Environment)
        } else if ["front", "user", "face"].iter().any(|w| label.contains(w)) {
            Some(Facing::User)
        } else {
            None
        }
    }
}
