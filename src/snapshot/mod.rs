//! Snapshot and restore for token machines.
//!
//! A snapshot captures the committed values of a machine as a versioned,
//! serializable record, so queries survive process restarts and can be
//! handed to and from the embedding application. Restoring replays the
//! binding through [`bind_values`](TokenStateMachine::bind_values) against a
//! template graph; live state (listeners, staged text) is deliberately not
//! captured.

use crate::core::{StateTemplate, TokenBinding};
use crate::machine::TokenStateMachine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod error;

pub use error::SnapshotError;

/// Version identifier for the snapshot format.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable capture of a machine's committed binding.
///
/// # Example
///
/// ```rust
/// use tokenstate::builder::TemplateBuilder;
/// use tokenstate::core::TokenValue;
/// use tokenstate::machine::TokenStateMachine;
/// use tokenstate::snapshot::Snapshot;
///
/// let root = TemplateBuilder::option_entry("Field", vec![TokenValue::new("First Name")])
///     .child(TemplateBuilder::value_entry("Enter a value"))
///     .build()
///     .unwrap();
///
/// let mut machine = TokenStateMachine::new(root.clone());
/// machine.state_mut().set_unboxed_value(Some("First Name".to_string()));
/// machine.transition().unwrap();
/// machine.state_mut().set_unboxed_value(Some("Joe".to_string()));
/// machine.transition().unwrap();
///
/// let snapshot = Snapshot::capture(&machine);
/// let json = snapshot.to_json().unwrap();
///
/// # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// # rt.block_on(async {
/// let restored = Snapshot::from_json(&json)
///     .unwrap()
///     .restore(root)
///     .await
///     .unwrap();
/// assert!(restored.is_complete());
/// # });
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    /// Snapshot format version
    pub version: u32,

    /// Unique snapshot identifier
    pub id: uuid::Uuid,

    /// Id of the machine the snapshot was captured from
    pub machine_id: uuid::Uuid,

    /// When the snapshot was captured
    pub created_at: DateTime<Utc>,

    /// The committed values, one step per grammar node
    pub binding: TokenBinding,
}

impl Snapshot {
    /// Capture the committed binding of a machine.
    pub fn capture(machine: &TokenStateMachine) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            id: uuid::Uuid::new_v4(),
            machine_id: machine.id(),
            created_at: Utc::now(),
            binding: machine.committed(),
        }
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string(self).map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    /// Deserialize from a JSON string, checking the format version.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Snapshot = serde_json::from_str(json)
            .map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))?;
        snapshot.validate_version()?;
        Ok(snapshot)
    }

    /// Serialize to a compact binary blob.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        bincode::serialize(self).map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    /// Deserialize from a binary blob, checking the format version.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Snapshot = bincode::deserialize(bytes)
            .map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))?;
        snapshot.validate_version()?;
        Ok(snapshot)
    }

    /// Replay the binding into a fresh machine walking `root`.
    pub async fn restore(
        &self,
        root: Arc<StateTemplate>,
    ) -> Result<TokenStateMachine, SnapshotError> {
        let mut machine = TokenStateMachine::new(root);
        machine
            .bind_values(&self.binding, false)
            .await
            .map_err(|e| SnapshotError::RestoreFailed(e.to_string()))?;
        Ok(machine)
    }

    fn validate_version(&self) -> Result<(), SnapshotError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: self.version,
                supported: SNAPSHOT_VERSION,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TemplateBuilder;
    use crate::core::TokenValue;

    fn name_grammar() -> Arc<StateTemplate> {
        TemplateBuilder::option_entry(
            "Choose a field",
            vec![TokenValue::new("First Name"), TokenValue::new("Last Name")],
        )
        .child(TemplateBuilder::value_entry("Enter a value"))
        .build()
        .unwrap()
    }

    fn completed_machine() -> TokenStateMachine {
        let mut machine = TokenStateMachine::new(name_grammar());
        machine
            .state_mut()
            .set_unboxed_value(Some("First Name".to_string()));
        machine.transition().unwrap();
        machine.state_mut().set_unboxed_value(Some("Joe".to_string()));
        machine.transition().unwrap();
        machine
    }

    #[test]
    fn capture_records_the_committed_binding() {
        let machine = completed_machine();
        let snapshot = Snapshot::capture(&machine);

        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
        assert_eq!(snapshot.machine_id, machine.id());
        assert_eq!(snapshot.binding.len(), 2);
    }

    #[test]
    fn json_round_trip() {
        let snapshot = Snapshot::capture(&completed_machine());
        let json = snapshot.to_json().unwrap();
        let back = Snapshot::from_json(&json).unwrap();

        assert_eq!(back.id, snapshot.id);
        assert_eq!(back.binding, snapshot.binding);
    }

    #[test]
    fn binary_round_trip() {
        let snapshot = Snapshot::capture(&completed_machine());
        let bytes = snapshot.to_bytes().unwrap();
        let back = Snapshot::from_bytes(&bytes).unwrap();

        assert_eq!(back.id, snapshot.id);
        assert_eq!(back.binding, snapshot.binding);
    }

    #[test]
    fn version_mismatch_is_rejected() {
        let mut snapshot = Snapshot::capture(&completed_machine());
        snapshot.version = 99;
        let json = snapshot.to_json().unwrap();

        let err = Snapshot::from_json(&json).unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::UnsupportedVersion {
                found: 99,
                supported: SNAPSHOT_VERSION,
            }
        ));
    }

    #[tokio::test]
    async fn restore_replays_into_a_complete_machine() {
        let snapshot = Snapshot::capture(&completed_machine());
        let restored = snapshot.restore(name_grammar()).await.unwrap();

        assert!(restored.is_complete());
        assert_eq!(restored.committed(), snapshot.binding);
    }

    #[tokio::test]
    async fn restore_rejects_bindings_the_grammar_cannot_walk() {
        let mut snapshot = Snapshot::capture(&completed_machine());
        snapshot.binding = TokenBinding::new().single(TokenValue::new("Middle Name"));

        let err = snapshot.restore(name_grammar()).await.unwrap_err();
        assert!(matches!(err, SnapshotError::RestoreFailed(_)));
    }
}
