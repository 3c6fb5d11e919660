//! Per-agent VXLAN tunnel lifecycle (`spec.md` §4.6): the tunnel map is
//! keyed by VNI, operations are serialised per VNI through the map's
//! write guard, and distinct VNIs run concurrently under a 10-slot
//! worker pool.

use std::{
    collections::HashMap,
    net::Ipv4Addr,
    sync::Mutex,
    time::Duration,
};

use mano_core::{SliceId, TunnelState, Vni, VxlanTunnelRecord, overlay_ip, validate_overlay_ip};
use mano_subprocess::{SecureExecutor, validate_ip_link_add_vxlan};
use tokio::sync::Semaphore;
use tracing::{instrument, warn};

use crate::error::VxlanError;

const WORKER_POOL_CAP: usize = 10;
const SLOT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct VxlanManager {
    tunnels: Mutex<HashMap<Vni, VxlanTunnelRecord>>,
    semaphore: Semaphore,
    executor: SecureExecutor,
    command_cache: mano_core::cache::TtlLru<String, ()>,
}

impl Default for VxlanManager {
    fn default() -> Self {
        Self::new()
    }
}

impl VxlanManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tunnels: Mutex::new(HashMap::new()),
            semaphore: Semaphore::new(WORKER_POOL_CAP),
            executor: SecureExecutor::new(),
            command_cache: mano_core::cache::TtlLru::new(100, Duration::from_secs(10)),
        }
    }

    async fn acquire_slot(&self) -> Result<tokio::sync::SemaphorePermit<'_>, VxlanError> {
        tokio::time::timeout(SLOT_ACQUIRE_TIMEOUT, self.semaphore.acquire())
            .await
            .map_err(|_| VxlanError::OperationTimeout(SLOT_ACQUIRE_TIMEOUT))?
            .map_err(|_| VxlanError::OperationTimeout(SLOT_ACQUIRE_TIMEOUT))
    }

    /// Runs `args` through the command cache: an identical command line
    /// observed within the TTL window is treated as already applied and
    /// skipped (`spec.md` §4.6c).
    async fn run_ip_link_add_vxlan(
        &self,
        args: &[String],
    ) -> Result<(), mano_subprocess::SubprocessError> {
        let cache_key = format!("ip {}", args.join(" "));
        if self.command_cache.get(&cache_key).is_some() {
            return Ok(());
        }
        self.executor
            .execute_with_validator("ip", &validate_ip_link_add_vxlan, args)
            .await?;
        self.command_cache.put(cache_key, ());
        Ok(())
    }

    /// Idempotent create: a no-op over an existing `Active` tunnel, a
    /// delete-then-recreate over a `Failed` one (`spec.md` §4.6).
    #[instrument(skip(self, remote_underlay_ips), fields(vni = vni.get()))]
    pub async fn create_tunnel(
        &self,
        vni: Vni,
        slice_id: SliceId,
        local_underlay_ip: Ipv4Addr,
        remote_underlay_ips: Vec<Ipv4Addr>,
        phys_interface: &str,
    ) -> Result<VxlanTunnelRecord, VxlanError> {
        let existing_state = {
            let tunnels = self.tunnels.lock().unwrap_or_else(|e| e.into_inner());
            tunnels.get(&vni).map(|t| t.state)
        };

        match existing_state {
            Some(TunnelState::Active) => {
                let tunnels = self.tunnels.lock().unwrap_or_else(|e| e.into_inner());
                return Ok(tunnels.get(&vni).expect("checked present above").clone());
            }
            Some(TunnelState::Failed) => {
                match self.delete_tunnel_internal(vni, phys_interface).await {
                    Ok(()) => {}
                    Err(err) if err.is_permission_denied() => return Err(err),
                    Err(_) => {
                        // "device not found" and similar: proceed with creation.
                    }
                }
            }
            _ => {}
        }

        let _permit = self.acquire_slot().await?;

        let iface_name = format!("vxlan{}", vni.get());
        let mut args = vec![
            "link".to_owned(),
            "add".to_owned(),
            iface_name.clone(),
            "type".to_owned(),
            "vxlan".to_owned(),
            "id".to_owned(),
            vni.get().to_string(),
            "dev".to_owned(),
            phys_interface.to_owned(),
            "local".to_owned(),
            local_underlay_ip.to_string(),
        ];
        if let Some(first_remote) = remote_underlay_ips.first() {
            args.push("remote".to_owned());
            args.push(first_remote.to_string());
        }
        args.push("dstport".to_owned());
        args.push("4789".to_owned());

        classify(self.run_ip_link_add_vxlan(&args).await, vni)?;

        classify(
            self.executor
                .execute("ip", &["link".to_owned(), "set".to_owned(), iface_name.clone(), "up".to_owned()])
                .await,
            vni,
        )?;

        let overlay = overlay_ip(vni, local_underlay_ip);
        validate_overlay_ip(overlay).map_err(|source| VxlanError::InvalidOverlay { vni: vni.get(), source })?;

        self.program_fdb(&iface_name, &remote_underlay_ips).await;

        let mut record = VxlanTunnelRecord::new(vni, slice_id, local_underlay_ip, remote_underlay_ips);
        record.state = TunnelState::Active;

        self.tunnels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(vni, record.clone());

        Ok(record)
    }

    /// FDB entries for multiple remotes are added in parallel; an
    /// individual failure is a warning, never an error (`spec.md`
    /// §4.6d).
    async fn program_fdb(&self, iface_name: &str, remotes: &[Ipv4Addr]) {
        let jobs = remotes.iter().map(|remote| {
            let iface_name = iface_name.to_owned();
            let remote = *remote;
            async move {
                let args = vec![
                    "fdb".to_owned(),
                    "append".to_owned(),
                    "00:00:00:00:00:00".to_owned(),
                    "dev".to_owned(),
                    iface_name,
                    "dst".to_owned(),
                    remote.to_string(),
                    "self".to_owned(),
                ];
                self.executor.execute("bridge", &args).await
            }
        });
        for (remote, result) in remotes.iter().zip(futures::future::join_all(jobs).await) {
            if let Err(err) = result {
                warn!(remote = %remote, error = %err, "FDB programming failed for remote, continuing");
            }
        }
    }

    /// Reprograms FDB entries for `vni`'s tunnel against a new remote
    /// peer set and records it on the tunnel (`spec.md` §4.7.2,
    /// `PUT /vxlan/peers`).
    pub async fn update_peers(&self, vni: Vni, remotes: Vec<Ipv4Addr>) -> Result<(), VxlanError> {
        let iface_name = format!("vxlan{}", vni.get());
        self.program_fdb(&iface_name, &remotes).await;
        let mut tunnels = self.tunnels.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(record) = tunnels.get_mut(&vni) {
            record.remote_underlay_ips = remotes;
        }
        Ok(())
    }

    #[instrument(skip(self), fields(vni = vni.get()))]
    pub async fn delete_tunnel(&self, vni: Vni, phys_interface: &str) -> Result<(), VxlanError> {
        self.delete_tunnel_internal(vni, phys_interface).await
    }

    async fn delete_tunnel_internal(&self, vni: Vni, _phys_interface: &str) -> Result<(), VxlanError> {
        let exists = self.tunnels.lock().unwrap_or_else(|e| e.into_inner()).contains_key(&vni);
        if !exists {
            // Unknown VNI: deletion is a no-op that returns success.
            return Ok(());
        }

        let _permit = self.acquire_slot().await?;

        let iface_name = format!("vxlan{}", vni.get());
        let result = self
            .executor
            .execute("ip", &["link".to_owned(), "delete".to_owned(), iface_name])
            .await;

        match result {
            Ok(_) => {
                self.tunnels.lock().unwrap_or_else(|e| e.into_inner()).remove(&vni);
                Ok(())
            }
            Err(mano_subprocess::SubprocessError::ExitNonZero { ref stderr, .. })
                if stderr_indicates_permission_denied(stderr) =>
            {
                Err(VxlanError::PermissionDenied {
                    vni: vni.get(),
                    message: stderr.clone(),
                })
            }
            Err(mano_subprocess::SubprocessError::ExitNonZero { ref stderr, .. })
                if stderr_indicates_device_missing(stderr) =>
            {
                self.tunnels.lock().unwrap_or_else(|e| e.into_inner()).remove(&vni);
                Ok(())
            }
            Err(other) => Err(VxlanError::KernelError {
                vni: vni.get(),
                message: other.to_string(),
            }),
        }
    }

    #[must_use]
    pub fn status(&self, vni: Vni) -> Option<VxlanTunnelRecord> {
        self.tunnels.lock().unwrap_or_else(|e| e.into_inner()).get(&vni).cloned()
    }

    #[must_use]
    pub fn list_active(&self) -> Vec<VxlanTunnelRecord> {
        self.tunnels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|t| t.state == TunnelState::Active)
            .cloned()
            .collect()
    }

    /// Removes every `Failed`/`Deleting` entry that is no longer backed
    /// by a live interface.
    pub async fn cleanup(&self) {
        let stale: Vec<Vni> = self
            .tunnels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|(_, t)| matches!(t.state, TunnelState::Failed | TunnelState::Deleting))
            .map(|(vni, _)| *vni)
            .collect();

        for vni in stale {
            if let Err(err) = self.delete_tunnel_internal(vni, "").await {
                warn!(vni = vni.get(), error = %err, "cleanup delete failed, leaving entry for next pass");
            }
        }
    }

    /// Refreshes byte/packet/error counters for an Active tunnel by
    /// reading `/sys/class/net/<iface>/statistics/*`, validated against
    /// the allow-listed sysfs directory (`spec.md` §4.6e).
    pub async fn refresh_stats(&self, vni: Vni) -> Result<(), VxlanError> {
        let iface_name = format!("vxlan{}", vni.get());
        let Some(counters) = crate::stats::read_interface_counters(&iface_name).await else {
            return Ok(());
        };
        let mut tunnels = self.tunnels.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(record) = tunnels.get_mut(&vni) {
            record.counters = counters;
            record.last_used = std::time::Instant::now();
        }
        Ok(())
    }
}

fn stderr_indicates_permission_denied(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    lower.contains("permission denied") || lower.contains("operation not permitted")
}

fn stderr_indicates_device_missing(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    lower.contains("cannot find device") || lower.contains("no such device")
}

/// Classifies a raw [`mano_subprocess::SubprocessError`] into the
/// VXLAN-specific failure kinds the orchestrator distinguishes on.
fn classify<T>(result: Result<T, mano_subprocess::SubprocessError>, vni: Vni) -> Result<T, VxlanError> {
    result.map_err(|err| match &err {
        mano_subprocess::SubprocessError::ExitNonZero { stderr, .. }
            if stderr_indicates_permission_denied(stderr) =>
        {
            VxlanError::PermissionDenied {
                vni: vni.get(),
                message: stderr.clone(),
            }
        }
        mano_subprocess::SubprocessError::ExitNonZero { stderr, .. } => VxlanError::KernelError {
            vni: vni.get(),
            message: stderr.clone(),
        },
        other => VxlanError::KernelError {
            vni: vni.get(),
            message: other.to_string(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deleting_unknown_vni_is_a_no_op() {
        let manager = VxlanManager::new();
        let vni = Vni::new(42).unwrap();
        assert!(manager.delete_tunnel(vni, "eth0").await.is_ok());
    }

    #[test]
    fn status_of_unknown_vni_is_none() {
        let manager = VxlanManager::new();
        let vni = Vni::new(7).unwrap();
        assert!(manager.status(vni).is_none());
    }

    #[test]
    fn list_active_starts_empty() {
        let manager = VxlanManager::new();
        assert!(manager.list_active().is_empty());
    }

    #[test]
    fn classifies_permission_denied_stderr() {
        assert!(stderr_indicates_permission_denied("RTNETLINK answers: Permission denied"));
        assert!(!stderr_indicates_permission_denied("Cannot find device \"vxlan1\""));
    }

    #[test]
    fn classifies_device_missing_stderr() {
        assert!(stderr_indicates_device_missing("Cannot find device \"vxlan1\""));
        assert!(stderr_indicates_device_missing("No such device"));
    }
}
