//! HTB root qdisc and per-slice classes on a single interface
//! (`spec.md` §4.7.1).

use std::{collections::HashMap, sync::Mutex};

use mano_core::{QosDescriptor, SliceId, TcPolicyRecord};
use mano_subprocess::SecureExecutor;
use tracing::warn;

use crate::error::TcError;

const ROOT_HANDLE: &str = "1:";
const DEFAULT_CLASS_MINOR: u16 = 0xffff;

struct InterfaceState {
    root_installed: bool,
    next_minor: u16,
    slices: HashMap<SliceId, (u16, TcPolicyRecord)>,
}

impl InterfaceState {
    fn new() -> Self {
        Self {
            root_installed: false,
            next_minor: 10,
            slices: HashMap::new(),
        }
    }
}

pub struct TcManager {
    executor: SecureExecutor,
    interfaces: Mutex<HashMap<String, InterfaceState>>,
}

impl Default for TcManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TcManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            executor: SecureExecutor::new(),
            interfaces: Mutex::new(HashMap::new()),
        }
    }

    fn validate_interface_name(&self, interface: &str) -> Result<(), TcError> {
        mano_subprocess::validate_single("tc", 0, interface)?;
        Ok(())
    }

    async fn ensure_root_qdisc(&self, interface: &str) -> Result<(), TcError> {
        let already_installed = self
            .interfaces
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(interface)
            .is_some_and(|state| state.root_installed);
        if already_installed {
            return Ok(());
        }

        self.executor
            .execute(
                "tc",
                &to_args([
                    "qdisc", "add", "dev", interface, "root", "handle", ROOT_HANDLE, "htb",
                    "default", "ffff",
                ]),
            )
            .await?;
        self.executor
            .execute(
                "tc",
                &to_args([
                    "class", "add", "dev", interface, "parent", ROOT_HANDLE, "classid",
                    &format!("1:{DEFAULT_CLASS_MINOR:x}"),
                    "htb", "rate", "1000000kbit", "ceil", "1000000kbit",
                ]),
            )
            .await?;

        self.interfaces
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(interface.to_owned())
            .or_insert_with(InterfaceState::new)
            .root_installed = true;
        Ok(())
    }

    /// Installs or atomically replaces the HTB class (and optional netem
    /// child) shaping `slice_id`'s traffic on `interface`. On failure the
    /// caller must report `ShapingLost` to the TN manager (`spec.md`
    /// §4.7.1).
    pub async fn update_shaping(
        &self,
        interface: &str,
        slice_id: SliceId,
        descriptor: &QosDescriptor,
    ) -> Result<TcPolicyRecord, TcError> {
        self.validate_interface_name(interface)?;
        self.ensure_root_qdisc(interface).await?;

        let minor = {
            let mut interfaces = self.interfaces.lock().unwrap_or_else(|e| e.into_inner());
            let state = interfaces.entry(interface.to_owned()).or_insert_with(InterfaceState::new);
            state.slices.get(&slice_id).map_or_else(
                || {
                    let minor = state.next_minor;
                    state.next_minor += 1;
                    minor
                },
                |(minor, _)| *minor,
            )
        };

        let had_existing = self
            .interfaces
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(interface)
            .is_some_and(|state| state.slices.contains_key(&slice_id));

        if had_existing {
            if let Err(err) = self.teardown_class(interface, minor).await {
                return Err(TcError::ShapingLost {
                    interface: interface.to_owned(),
                    message: err.to_string(),
                });
            }
        }

        let record = TcPolicyRecord::new(interface.to_owned(), slice_id, descriptor);
        if let Err(err) = self.apply_class(interface, minor, &record).await {
            return Err(TcError::ShapingLost {
                interface: interface.to_owned(),
                message: err.to_string(),
            });
        }

        self.interfaces
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(interface.to_owned())
            .or_insert_with(InterfaceState::new)
            .slices
            .insert(slice_id, (minor, record.clone()));

        Ok(record)
    }

    async fn apply_class(&self, interface: &str, minor: u16, record: &TcPolicyRecord) -> Result<(), TcError> {
        let classid = format!("1:{minor:x}");
        self.executor
            .execute(
                "tc",
                &to_args([
                    "class", "add", "dev", interface, "parent", ROOT_HANDLE, "classid", &classid,
                    "htb", "rate", &format!("{}kbit", record.class.rate_kbit), "ceil",
                    &format!("{}kbit", record.class.ceil_kbit),
                ]),
            )
            .await?;

        if let Some(netem) = record.netem {
            let handle = format!("{minor:x}0:");
            let mut netem_args: Vec<String> = to_args([
                "qdisc", "add", "dev", interface, "parent", &classid, "handle", &handle,
                "netem", "delay",
            ]);
            netem_args.push(format!("{}ms", netem.latency_ms.round() as u64));
            if netem.loss_ratio > 0.0 {
                netem_args.push("loss".to_owned());
                netem_args.push(format!("{}%", (netem.loss_ratio * 100.0).round() as u64));
            }
            self.executor.execute("tc", &netem_args).await?;
        }

        Ok(())
    }

    async fn teardown_class(&self, interface: &str, minor: u16) -> Result<(), TcError> {
        let classid = format!("1:{minor:x}");
        let handle = format!("{minor:x}0:");
        // netem qdisc removal failing with "no such" is tolerated; the
        // class itself disappears on parent class deletion regardless.
        let _ = self
            .executor
            .execute("tc", &to_args(["qdisc", "del", "dev", interface, "parent", &classid, "handle", &handle]))
            .await;
        self.executor
            .execute("tc", &to_args(["class", "del", "dev", interface, "classid", &classid]))
            .await?;
        Ok(())
    }

    pub async fn remove_shaping(&self, interface: &str, slice_id: SliceId) -> Result<(), TcError> {
        self.validate_interface_name(interface)?;
        let minor = {
            let mut interfaces = self.interfaces.lock().unwrap_or_else(|e| e.into_inner());
            interfaces
                .get_mut(interface)
                .and_then(|state| state.slices.remove(&slice_id))
                .map(|(minor, _)| minor)
        };
        let Some(minor) = minor else {
            return Ok(());
        };
        if let Err(err) = self.teardown_class(interface, minor).await {
            warn!(interface, slice_id = %slice_id, error = %err, "shaping teardown failed");
            return Err(err);
        }
        Ok(())
    }

    #[must_use]
    pub fn status(&self, interface: &str, slice_id: SliceId) -> Option<TcPolicyRecord> {
        self.interfaces
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(interface)?
            .slices
            .get(&slice_id)
            .map(|(_, record)| record.clone())
    }
}

fn to_args<const N: usize>(parts: [&str; N]) -> Vec<String> {
    parts.iter().map(|s| (*s).to_owned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_of_unknown_slice_is_none() {
        let manager = TcManager::new();
        assert!(manager.status("eth0", SliceId::new()).is_none());
    }

    #[tokio::test]
    async fn rejects_malformed_interface_name() {
        let manager = TcManager::new();
        let descriptor = QosDescriptor::new(
            mano_core::SliceClass::Balanced,
            10.0,
            20.0,
            5.0,
            0.001,
            None,
            5,
            "default".to_owned(),
        )
        .unwrap();
        let result = manager
            .update_shaping("eth0; rm -rf /", SliceId::new(), &descriptor)
            .await;
        assert!(result.is_err());
    }
}
