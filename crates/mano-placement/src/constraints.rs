//! Operator-supplied placement constraints (`spec.md` §4.3, "Inputs").

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlacementConstraints {
    pub region: Option<String>,
    pub cost_ceiling: Option<f64>,
    pub forbidden_sites: Vec<String>,
}

impl PlacementConstraints {
    #[must_use]
    pub fn allows(&self, cluster: &mano_core::ClusterRecord) -> bool {
        if self.forbidden_sites.iter().any(|id| id == &cluster.id) {
            return false;
        }
        if let Some(region) = &self.region {
            if &cluster.region != region {
                return false;
            }
        }
        true
    }
}
