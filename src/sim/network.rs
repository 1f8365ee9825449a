//! Capacitated tree network feeding the parking spots.
//!
//! The topology is an arena of nodes referencing their children by index.
//! Nodes are stored so that every child has a larger index than its parent,
//! which lets [`Topology::compute`] aggregate loads with a single reverse
//! sweep instead of recursion.
//!
//! Load convention: all values are non-negative kW. Solar at a spot offsets
//! that spot's own charging demand first and can never push current back up
//! the tree.

use super::types::{CABLE_COUNT, SPOT_COUNT, SpotId};

/// Identifier of one of the [`CABLE_COUNT`] cables.
pub type CableId = usize;

/// Role of a node in the distribution tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Root transformer; its load is the facility total.
    Transformer,
    /// Synthetic aggregation point merging sibling spots.
    Junction,
    /// Physical parking spot with its own charging demand.
    Spot(SpotId),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    cable: Option<CableId>,
    children: Vec<usize>,
}

/// Instantaneous network load derived from channel occupancy and solar input.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkLoad {
    /// Load on every cable, indexed by cable id.
    pub cables: [f64; CABLE_COUNT],
    /// Load at the root transformer.
    pub transformer: f64,
    /// Solar output actually offset against local demand, per spot.
    pub solar_used: [f64; SPOT_COUNT],
}

impl NetworkLoad {
    /// Load vector of an idle facility.
    pub fn zero() -> Self {
        Self {
            cables: [0.0; CABLE_COUNT],
            transformer: 0.0,
            solar_used: [0.0; SPOT_COUNT],
        }
    }

    /// Sum of every cable's excess above `threshold_kw`.
    pub fn total_overload(&self, threshold_kw: f64) -> f64 {
        self.cables
            .iter()
            .map(|&load| (load - threshold_kw).max(0.0))
            .sum()
    }

    /// Returns `true` when any cable carries more than `threshold_kw`.
    pub fn any_overloaded(&self, threshold_kw: f64) -> bool {
        self.cables.iter().any(|&load| load > threshold_kw)
    }
}

/// Immutable distribution tree built once per run.
#[derive(Debug, Clone)]
pub struct Topology {
    nodes: Vec<Node>,
    charging_rate_kw: f64,
}

impl Topology {
    /// Builds the facility's fixed seven-spot tree.
    ///
    /// ```text
    /// transformer
    /// ├── junction A (cable 0)
    /// │   ├── P1 (cable 1)
    /// │   ├── P2 (cable 2)
    /// │   └── P3 (cable 3)
    /// └── P4 (cable 4)
    ///     ├── junction B (cable 6)
    ///     │   ├── P5 (cable 7)
    ///     │   └── P6 (cable 8)
    ///     └── P7 (cable 5)
    /// ```
    pub fn standard(charging_rate_kw: f64) -> Self {
        let node = |kind, cable, children: &[usize]| Node {
            kind,
            cable,
            children: children.to_vec(),
        };
        let nodes = vec![
            node(NodeKind::Transformer, None, &[1, 5]),
            node(NodeKind::Junction, Some(0), &[2, 3, 4]),
            node(NodeKind::Spot(0), Some(1), &[]),
            node(NodeKind::Spot(1), Some(2), &[]),
            node(NodeKind::Spot(2), Some(3), &[]),
            node(NodeKind::Spot(3), Some(4), &[6, 9]),
            node(NodeKind::Junction, Some(6), &[7, 8]),
            node(NodeKind::Spot(4), Some(7), &[]),
            node(NodeKind::Spot(5), Some(8), &[]),
            node(NodeKind::Spot(6), Some(5), &[]),
        ];
        Self {
            nodes,
            charging_rate_kw,
        }
    }

    pub fn charging_rate_kw(&self) -> f64 {
        self.charging_rate_kw
    }

    /// Cable feeding `spot`.
    pub fn spot_cable(&self, spot: SpotId) -> Option<CableId> {
        self.nodes
            .iter()
            .find(|n| n.kind == NodeKind::Spot(spot))
            .and_then(|n| n.cable)
    }

    /// Computes every cable load for the given channel counts and solar input.
    ///
    /// # Arguments
    ///
    /// * `charging` - Active charging channels per spot
    /// * `solar_kw` - Solar generation currently available per spot
    pub fn compute(&self, charging: &[u32; SPOT_COUNT], solar_kw: &[f64; SPOT_COUNT]) -> NetworkLoad {
        let mut residual = vec![0.0_f64; self.nodes.len()];
        let mut load = NetworkLoad::zero();

        for idx in (0..self.nodes.len()).rev() {
            let node = &self.nodes[idx];
            let mut net: f64 = node.children.iter().map(|&c| residual[c]).sum();

            if let NodeKind::Spot(spot) = node.kind {
                let demand = f64::from(charging[spot]) * self.charging_rate_kw;
                let used = demand.min(solar_kw[spot].max(0.0));
                load.solar_used[spot] = used;
                net += demand - used;
            }

            residual[idx] = net;
            match node.cable {
                Some(cable) => load.cables[cable] = net,
                None => load.transformer = net,
            }
        }

        load
    }

    /// Whether one more channel at `spot` keeps total overload from growing.
    ///
    /// Compares the overload under `charging` with the overload after adding
    /// one channel at `spot`. The test is greedy and not strictly improving:
    /// a car may be admitted even if it creates new overload on some cable,
    /// as long as the facility-wide total does not increase.
    pub fn can_charge_without_overload(
        &self,
        spot: SpotId,
        charging: &[u32; SPOT_COUNT],
        solar_kw: &[f64; SPOT_COUNT],
        threshold_kw: f64,
    ) -> bool {
        let before = self.compute(charging, solar_kw).total_overload(threshold_kw);

        let mut hypothetical = *charging;
        hypothetical[spot] += 1;
        let after = self
            .compute(&hypothetical, solar_kw)
            .total_overload(threshold_kw);

        after <= before
    }
}
