use std::fmt;

use serde::{Deserialize, Serialize};

/// Declares a UUID v7 entity identifier newtype.
///
/// All Siteline entities use time-ordered UUIDs so that freshly created
/// rows sort by creation time without a separate sequence column.
macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Generate a new time-ordered identifier (UUID v7).
            pub fn new() -> Self {
                Self(uuid::Uuid::now_v7())
            }

            /// Create from an existing UUID (e.g. a client-supplied id).
            pub fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// The underlying UUID.
            pub fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }

            /// Short representation (first 8 characters of the UUID).
            pub fn short_id(&self) -> String {
                self.0.to_string()[..8].to_string()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.short_id())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::error::TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|e| crate::error::TypeError::InvalidId(e.to_string()))
            }
        }
    };
}

uuid_id!(
    /// Identifier for a person: field worker, supervisor, or operator.
    UserId
);

uuid_id!(
    /// Identifier for a construction site.
    SiteId
);

uuid_id!(
    /// Identifier for a shift. Client-generated on offline starts so that
    /// replayed sync batches stay idempotent.
    ShiftId
);

uuid_id!(
    /// Identifier for a (worker, site) assignment.
    AssignmentId
);

uuid_id!(
    /// Identifier for a recorded sync conflict.
    ConflictId
);

/// Client-chosen identifier for a worker's device.
///
/// Devices mint their own identifier on install; the server treats it as
/// an opaque string keying the per-device sync cursor.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(raw: impl Into<String>) -> Result<Self, crate::error::TypeError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(crate::error::TypeError::InvalidId(
                "device id must not be empty".into(),
            ));
        }
        Ok(Self(trimmed.to_string()))
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
        write!(f, "{}", self.0)
    }
}
