//! Authoritative tower state management utilities.

use std::collections::BTreeMap;

use rampart_core::{config::TowerRole, TowerId, Vec2};

/// Fraction of the build cost refunded when a tower is sold.
pub(crate) const SELL_REFUND: f32 = 0.6;

/// Distance between a barracks rally point and each soldier's post.
pub(crate) const FORMATION_RADIUS: f32 = 10.0;

/// Snapshot of a tower stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct TowerState {
    /// Identifier allocated by the world for the tower.
    pub(crate) id: TowerId,
    /// Catalog identifier of the tower type.
    pub(crate) kind: String,
    /// Role of the tower type.
    pub(crate) role: TowerRole,
    /// Tower spot the tower occupies.
    pub(crate) spot: usize,
    /// World position of the spot.
    pub(crate) position: Vec2,
    /// Gold paid to build the tower.
    pub(crate) cost: u32,
    /// Rally point of the squad, for barracks.
    pub(crate) rally: Option<Vec2>,
}

impl TowerState {
    /// Gold returned when the tower is sold.
    pub(crate) fn refund(&self) -> u32 {
        (self.cost as f32 * SELL_REFUND).floor() as u32
    }
}

/// Registry that stores towers and manages identifier allocation.
#[derive(Debug)]
pub(crate) struct TowerRegistry {
    entries: BTreeMap<TowerId, TowerState>,
    next_tower_id: TowerId,
}

impl TowerRegistry {
    /// Creates an empty tower registry with a reset identifier counter.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_tower_id: TowerId::new(0),
        }
    }

    /// Reserves the identifier for the next tower.
    pub(crate) fn allocate(&mut self) -> TowerId {
        let id = self.next_tower_id;
        self.next_tower_id = TowerId::new(id.get().wrapping_add(1));
        id
    }

    pub(crate) fn insert(&mut self, state: TowerState) {
        let _ = self.entries.insert(state.id, state);
    }

    pub(crate) fn remove(&mut self, tower: TowerId) -> Option<TowerState> {
        self.entries.remove(&tower)
    }

    pub(crate) fn get_mut(&mut self, tower: TowerId) -> Option<&mut TowerState> {
        self.entries.get_mut(&tower)
    }

    /// Tower standing on `spot`, if any.
    pub(crate) fn occupant(&self, spot: usize) -> Option<TowerId> {
        self.entries
            .values()
            .find(|state| state.spot == spot)
            .map(|state| state.id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &TowerState> {
        self.entries.values()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.next_tower_id = TowerId::new(0);
    }
}

/// Post of the `index`-th soldier of a squad of `size` around `rally`.
pub(crate) fn formation_slot(rally: Vec2, index: u32, size: u32) -> Vec2 {
    if size <= 1 {
        return rally;
    }
    let angle = std::f32::consts::TAU * index as f32 / size as f32;
    rally + Vec2::from_angle(angle) * FORMATION_RADIUS
}
