use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use siteline_types::{GeoPoint, ShiftId, SiteId};

/// The shift operations a device can queue while offline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    StartShift,
    EndShift,
    UpdateNotes,
}

impl std::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::StartShift => "start_shift",
            Self::EndShift => "end_shift",
            Self::UpdateNotes => "update_notes",
        };
        write!(f, "{s}")
    }
}

/// One locally-made mutation replayed by a device.
///
/// The shift id is minted by the device (UUID v7) so the create is
/// idempotent; `base_updated_at` is the server version the device
/// believed was current when it queued the change — the staleness gate
/// compares it against the server row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeviceMutation {
    pub shift_id: ShiftId,
    pub kind: MutationKind,
    #[serde(default)]
    pub base_updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub site: Option<SiteId>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl DeviceMutation {
    pub fn start(shift_id: ShiftId, site: SiteId, location: Option<GeoPoint>) -> Self {
        Self {
            shift_id,
            kind: MutationKind::StartShift,
            base_updated_at: None,
            site: Some(site),
            location,
            notes: None,
        }
    }

    pub fn end(
        shift_id: ShiftId,
        base_updated_at: Option<DateTime<Utc>>,
        location: Option<GeoPoint>,
    ) -> Self {
        Self {
            shift_id,
            kind: MutationKind::EndShift,
            base_updated_at,
            site: None,
            location,
            notes: None,
        }
    }

    pub fn notes(
        shift_id: ShiftId,
        base_updated_at: Option<DateTime<Utc>>,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            shift_id,
            kind: MutationKind::UpdateNotes,
            base_updated_at,
            site: None,
            location: None,
            notes: Some(notes.into()),
        }
    }

    /// Shape check before any state is touched. A malformed mutation is
    /// dropped into the batch's error list, never applied.
    pub fn validate(&self) -> Result<(), String> {
        match self.kind {
            MutationKind::StartShift => {
                if self.site.is_none() {
                    return Err("start_shift requires a site id".into());
                }
            }
            MutationKind::EndShift => {}
            MutationKind::UpdateNotes => {
                if self.notes.is_none() {
                    return Err("update_notes requires a notes value".into());
                }
            }
        }
        Ok(())
    }
}

/// A mutation the coordinator applied (or recognized as already
/// applied, on replay). `updated_at` is the resulting server version.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppliedMutation {
    pub shift_id: ShiftId,
    pub kind: MutationKind,
    pub updated_at: DateTime<Utc>,
}

/// A mutation dropped from the batch: malformed, or rejected by a
/// ledger rule. The rest of the batch still processes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MutationRejection {
    pub shift_id: ShiftId,
    pub kind: MutationKind,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_requires_site() {
        let mut m = DeviceMutation::start(ShiftId::new(), SiteId::new(), None);
        m.validate().unwrap();
        m.site = None;
        assert!(m.validate().is_err());
    }

    #[test]
    fn notes_requires_payload() {
        let mut m = DeviceMutation::notes(ShiftId::new(), None, "welded trusses");
        m.validate().unwrap();
        m.notes = None;
        assert!(m.validate().is_err());
    }

    #[test]
    fn end_needs_nothing_extra() {
        DeviceMutation::end(ShiftId::new(), Some(Utc::now()), None)
            .validate()
            .unwrap();
    }

    #[test]
    fn wire_shape_is_snake_case() {
        let m = DeviceMutation::start(ShiftId::new(), SiteId::new(), None);
        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains("\"kind\":\"start_shift\""));
    }

    #[test]
    fn deserializes_with_missing_optionals() {
        let shift_id = ShiftId::new();
        let json = format!(r#"{{"shift_id":"{shift_id}","kind":"end_shift"}}"#);
        let m: DeviceMutation = serde_json::from_str(&json).unwrap();
        assert_eq!(m.kind, MutationKind::EndShift);
        assert!(m.base_updated_at.is_none());
        assert!(m.location.is_none());
    }
}
