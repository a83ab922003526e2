use core::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of one enclosure controller on the message bus.
///
/// Every topic the device publishes or consumes is scoped by this id, so the
/// sensing side and the control side must agree on it.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random id, used when none is configured.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Configured id if present and non-blank, otherwise a generated one.
    pub fn configured_or_generate(configured: Option<&str>) -> Self {
        match configured.map(str::trim) {
            Some(id) if !id.is_empty() => Self::new(id),
            _ => Self::generate(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceId({})", self.0)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
