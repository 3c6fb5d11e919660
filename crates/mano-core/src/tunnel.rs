//! VXLAN tunnel records, owned exclusively by a single agent's VXLAN
//! manager (`spec.md` §3, "VXLAN tunnel record").

use std::{
    net::Ipv4Addr,
    time::{Instant, SystemTime},
};

use serde::{Deserialize, Serialize};

/// 24-bit VXLAN network identifier, validated at construction
/// (`spec.md` §6, "VNI 1-16777215").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Vni(u32);

const MAX_VNI: u32 = 16_777_215;

#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
pub enum VniError {
    #[error("VNI must be within 1..={MAX_VNI}, got {0}")]
    OutOfRange(u32),
}

impl Vni {
    pub fn new(value: u32) -> Result<Self, VniError> {
        if value == 0 || value > MAX_VNI {
            return Err(VniError::OutOfRange(value));
        }
        Ok(Self(value))
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// `true` for non-critical batching eligibility (`spec.md` §4.6b).
    #[must_use]
    pub const fn is_batchable(self) -> bool {
        self.0 > 1000
    }
}

impl std::fmt::Display for Vni {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TunnelState {
    Creating,
    Active,
    Failed,
    Deleting,
}

pub const TUNNEL_MTU: u16 = 1450;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TunnelCounters {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_packets: u64,
    pub tx_packets: u64,
    pub errors: u64,
}

#[derive(Debug, Clone)]
pub struct VxlanTunnelRecord {
    pub vni: Vni,
    pub slice_id: crate::SliceId,
    pub local_underlay_ip: Ipv4Addr,
    pub remote_underlay_ips: Vec<Ipv4Addr>,
    pub mtu: u16,
    pub state: TunnelState,
    pub created_at: SystemTime,
    pub last_used: Instant,
    pub counters: TunnelCounters,
}

impl VxlanTunnelRecord {
    #[must_use]
    pub fn new(
        vni: Vni,
        slice_id: crate::SliceId,
        local_underlay_ip: Ipv4Addr,
        remote_underlay_ips: Vec<Ipv4Addr>,
    ) -> Self {
        Self {
            vni,
            slice_id,
            local_underlay_ip,
            remote_underlay_ips,
            mtu: TUNNEL_MTU,
            state: TunnelState::Creating,
            created_at: SystemTime::now(),
            last_used: Instant::now(),
            counters: TunnelCounters::default(),
        }
    }
}

/// Deterministic overlay IPv4 derived from the VNI (`spec.md` §4.6,
/// "Generated overlay IP"): `10.(VNI/256 mod 256).(VNI mod 256).<last
/// octet of local underlay>`.
#[must_use]
pub fn overlay_ip(vni: Vni, local_underlay_ip: Ipv4Addr) -> Ipv4Addr {
    let v = vni.get();
    let second = ((v / 256) % 256) as u8;
    let third = (v % 256) as u8;
    let fourth = local_underlay_ip.octets()[3];
    Ipv4Addr::new(10, second, third, fourth)
}

#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
pub enum OverlayIpError {
    #[error("overlay address {0} is not in a private range")]
    NotPrivate(Ipv4Addr),
    #[error("overlay address {0} is the /24 network address")]
    NetworkAddress(Ipv4Addr),
    #[error("overlay address {0} is the /24 broadcast address")]
    BroadcastAddress(Ipv4Addr),
}

/// Validates the testable property in `spec.md` §8: the overlay address
/// lies in a private range and is neither the network nor broadcast
/// address of its enclosing /24.
pub fn validate_overlay_ip(addr: Ipv4Addr) -> Result<(), OverlayIpError> {
    if !addr.is_private() {
        return Err(OverlayIpError::NotPrivate(addr));
    }
    let octets = addr.octets();
    if octets[3] == 0 {
        return Err(OverlayIpError::NetworkAddress(addr));
    }
    if octets[3] == 255 {
        return Err(OverlayIpError::BroadcastAddress(addr));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vni_zero_is_rejected() {
        assert!(Vni::new(0).is_err());
    }

    #[test]
    fn vni_max_is_accepted() {
        assert!(Vni::new(MAX_VNI).is_ok());
    }

    #[test]
    fn vni_over_max_is_rejected() {
        assert!(Vni::new(MAX_VNI + 1).is_err());
    }

    #[test]
    fn overlay_ip_is_deterministic_and_private() {
        let vni = Vni::new(500).unwrap();
        let local = Ipv4Addr::new(192, 168, 1, 7);
        let overlay = overlay_ip(vni, local);
        assert_eq!(overlay, Ipv4Addr::new(10, 1, 244, 7));
        assert!(validate_overlay_ip(overlay).is_ok());
    }

    #[test]
    fn overlay_ip_rejects_broadcast_last_octet() {
        let vni = Vni::new(256 * 255).unwrap_or_else(|_| Vni::new(MAX_VNI).unwrap());
        let local = Ipv4Addr::new(10, 0, 0, 255);
        let overlay = overlay_ip(vni, local);
        assert_eq!(validate_overlay_ip(overlay), Err(OverlayIpError::BroadcastAddress(overlay)));
    }
}
