//! Slice instances: the runtime counterpart of a placement plan
//! (`spec.md` §3, "Slice instance").

use std::{collections::HashMap, sync::Mutex};

use serde::{Deserialize, Serialize};

use crate::PlanFingerprint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SliceId(pub uuid_like::Uuid);

/// A small dependency-free UUID v4 generator backed by the crate's CSPRNG
/// so `mano-core` does not need to pull in the `uuid` crate just for
/// slice identifiers.
pub mod uuid_like {
    use std::{fmt, str::FromStr};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Uuid([u8; 16]);

    #[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
    #[error("malformed UUID string {0:?}")]
    pub struct ParseUuidError(pub(crate) ());

    impl Uuid {
        #[must_use]
        pub fn new_v4() -> Self {
            let mut bytes = crate::csprng::random_bytes::<16>();
            bytes[6] = (bytes[6] & 0x0f) | 0x40;
            bytes[8] = (bytes[8] & 0x3f) | 0x80;
            Self(bytes)
        }
    }

    impl fmt::Display for Uuid {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            for (i, byte) in self.0.iter().enumerate() {
                if matches!(i, 4 | 6 | 8 | 10) {
                    write!(f, "-")?;
                }
                write!(f, "{byte:02x}")?;
            }
            Ok(())
        }
    }

    impl FromStr for Uuid {
        type Err = ParseUuidError;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            let hex: String = s.chars().filter(|c| *c != '-').collect();
            if hex.len() != 32 {
                return Err(ParseUuidError(()));
            }
            let mut bytes = [0u8; 16];
            for (i, byte) in bytes.iter_mut().enumerate() {
                *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|_| ParseUuidError(()))?;
            }
            Ok(Self(bytes))
        }
    }
}

impl SliceId {
    #[must_use]
    pub fn new() -> Self {
        Self(uuid_like::Uuid::new_v4())
    }
}

impl Default for SliceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SliceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SliceId {
    type Err = uuid_like::ParseUuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl Serialize for SliceId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SliceId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SliceState {
    Pending,
    Scheduling,
    Running,
    Succeeded,
    Failed,
    Terminating,
}

impl SliceState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Valid transitions per the state machine in `spec.md` §4.4.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Scheduling)
                | (Self::Pending, Self::Terminating)
                | (Self::Scheduling, Self::Running)
                | (Self::Scheduling, Self::Failed)
                | (Self::Scheduling, Self::Terminating)
                | (Self::Running, Self::Terminating)
                | (Self::Running, Self::Failed)
                | (Self::Terminating, Self::Succeeded)
                | (Self::Terminating, Self::Failed)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadStatus {
    Pending,
    Applying,
    Ready,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasuredQos {
    pub throughput_mbps: f64,
    pub rtt_ms: f64,
    pub loss_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QosViolation {
    pub step: String,
    pub reason: String,
    pub attempt: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceInstance {
    pub id: SliceId,
    pub plan_fingerprint: PlanFingerprint,
    pub state: SliceState,
    pub workload_status: HashMap<String, WorkloadStatus>,
    pub measured_qos: Option<MeasuredQos>,
    pub violations: Vec<QosViolation>,
}

impl SliceInstance {
    #[must_use]
    pub fn new(plan_fingerprint: PlanFingerprint) -> Self {
        Self {
            id: SliceId::new(),
            plan_fingerprint,
            state: SliceState::Pending,
            workload_status: HashMap::new(),
            measured_qos: None,
            violations: Vec::new(),
        }
    }

    /// Enforces invariant (c) in `spec.md` §3: never transition out of a
    /// terminal state.
    pub fn transition(&mut self, next: SliceState) -> Result<(), SliceTransitionError> {
        if self.state.is_terminal() {
            return Err(SliceTransitionError::TerminalState { from: self.state });
        }
        if !self.state.can_transition_to(next) {
            return Err(SliceTransitionError::IllegalTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
pub enum SliceTransitionError {
    #[error("slice is in terminal state {from:?}, cannot transition further")]
    TerminalState { from: SliceState },
    #[error("illegal transition {from:?} -> {to:?}")]
    IllegalTransition { from: SliceState, to: SliceState },
}

/// Exclusive owner of slice instances; the orchestrator is the sole
/// writer, agents and the package generator get read-only views
/// (`spec.md` §3).
#[derive(Default)]
pub struct SliceRegistry {
    slices: Mutex<HashMap<SliceId, SliceInstance>>,
}

impl SliceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, instance: SliceInstance) {
        self.slices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(instance.id, instance);
    }

    #[must_use]
    pub fn get(&self, id: SliceId) -> Option<SliceInstance> {
        self.slices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned()
    }

    pub fn update<F: FnOnce(&mut SliceInstance)>(&self, id: SliceId, f: F) -> bool {
        let mut slices = self.slices.lock().unwrap_or_else(|e| e.into_inner());
        let Some(instance) = slices.get_mut(&id) else {
            return false;
        };
        f(instance);
        true
    }

    #[must_use]
    pub fn list(&self) -> Vec<SliceInstance> {
        self.slices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_state_rejects_further_transitions() {
        let mut instance = SliceInstance::new(PlanFingerprint([0; 32]));
        instance.transition(SliceState::Scheduling).unwrap();
        instance.transition(SliceState::Failed).unwrap();
        assert_eq!(
            instance.transition(SliceState::Running),
            Err(SliceTransitionError::TerminalState {
                from: SliceState::Failed
            })
        );
    }

    #[test]
    fn uuids_are_distinct() {
        assert_ne!(SliceId::new(), SliceId::new());
    }

    #[test]
    fn slice_id_round_trips_through_display_and_from_str() {
        let id = SliceId::new();
        let parsed: SliceId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn slice_id_round_trips_through_json() {
        let id = SliceId::new();
        let json = serde_json::to_string(&id).unwrap();
        let parsed: SliceId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn slice_id_rejects_malformed_string() {
        assert!("not-a-uuid".parse::<SliceId>().is_err());
    }
}
