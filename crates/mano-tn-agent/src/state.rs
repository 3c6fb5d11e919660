//! Shared state every handler reads or mutates through, mirroring the
//! teacher's `Arc<ConfigRepo>`-as-`State` idiom.

use std::{collections::HashMap, net::Ipv4Addr, sync::Mutex};

use mano_core::{QosDescriptor, SliceId, Vni};
use mano_tn_tc::TcManager;
use mano_tn_vxlan::VxlanManager;

/// What this agent knows about a slice it is hosting: the tunnel
/// binding it owns plus the descriptor shaping its traffic class.
#[derive(Debug, Clone)]
pub struct SliceBinding {
    pub vni: Vni,
    pub descriptor: QosDescriptor,
}

pub struct AgentState {
    pub vxlan: VxlanManager,
    pub tc: TcManager,
    pub local_underlay_ip: Ipv4Addr,
    pub phys_interface: String,
    pub slices: Mutex<HashMap<SliceId, SliceBinding>>,
}

impl AgentState {
    #[must_use]
    pub fn new(local_underlay_ip: Ipv4Addr, phys_interface: String) -> Self {
        Self {
            vxlan: VxlanManager::new(),
            tc: TcManager::new(),
            local_underlay_ip,
            phys_interface,
            slices: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn binding(&self, slice_id: SliceId) -> Option<SliceBinding> {
        self.slices.lock().unwrap_or_else(|e| e.into_inner()).get(&slice_id).cloned()
    }

    pub fn bind(&self, slice_id: SliceId, binding: SliceBinding) {
        self.slices.lock().unwrap_or_else(|e| e.into_inner()).insert(slice_id, binding);
    }

    pub fn unbind(&self, slice_id: SliceId) -> Option<SliceBinding> {
        self.slices.lock().unwrap_or_else(|e| e.into_inner()).remove(&slice_id)
    }
}

#[cfg(test)]
mod tests {
    use mano_core::{QosDescriptor, SliceClass, Vni};

    use super::*;

    fn descriptor() -> QosDescriptor {
        QosDescriptor::new(SliceClass::Embb, 50.0, 20.0, 2.0, 0.001, None, 5, "video".to_owned()).unwrap()
    }

    #[test]
    fn unbound_slice_has_no_binding() {
        let state = AgentState::new("10.0.0.1".parse().unwrap(), "eth0".to_owned());
        assert!(state.binding(SliceId::new()).is_none());
    }

    #[test]
    fn bind_then_unbind_round_trips() {
        let state = AgentState::new("10.0.0.1".parse().unwrap(), "eth0".to_owned());
        let slice_id = SliceId::new();
        let vni = Vni::new(500).unwrap();
        state.bind(slice_id, SliceBinding { vni, descriptor: descriptor() });
        assert_eq!(state.binding(slice_id).unwrap().vni, vni);
        let removed = state.unbind(slice_id).unwrap();
        assert_eq!(removed.vni, vni);
        assert!(state.binding(slice_id).is_none());
    }
}
