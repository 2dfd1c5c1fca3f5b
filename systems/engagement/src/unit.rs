//! Heroes and soldiers that fight enemies in melee.

use log::debug;
use rampart_core::{
    config::UnitStats, Cooldown, EnemyId, Mobile, MobileId, MobileStore, Targetable, TowerId,
    UnitId, Vec2,
};
use rampart_system_enemies::EnemyRoster;
use rampart_system_motion::{MotionError, MotionResolver};

/// Who a unit answers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnitRole {
    /// The player-commanded hero.
    Hero,
    /// A soldier trained by a barracks.
    Soldier {
        /// Barracks the soldier belongs to.
        barracks: TowerId,
    },
}

/// Melee state derived during the last engagement pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EngagementState {
    /// No opponent; idling at or walking back to the gather point.
    #[default]
    Unengaged,
    /// Linked to an opponent that is still out of strike range.
    Engaging,
    /// Linked to an opponent within strike range and trading blows.
    Fighting,
}

/// A hero or soldier.
#[derive(Clone, Debug)]
pub struct Unit {
    pub(crate) id: UnitId,
    kind: String,
    role: UnitRole,
    pub(crate) stats: UnitStats,
    position: Vec2,
    hp: f32,
    pub(crate) cooldown: Cooldown,
    gather: Vec2,
    home: Vec2,
    pub(crate) opponent: Option<EnemyId>,
    pub(crate) state: EngagementState,
    respawn_in: Option<f32>,
}

impl Unit {
    /// Identifier of the unit.
    #[must_use]
    pub fn id(&self) -> UnitId {
        self.id
    }

    /// Catalog identifier of the unit type.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Who the unit answers to.
    #[must_use]
    pub fn role(&self) -> UnitRole {
        self.role
    }

    /// Validated stats of the unit.
    #[must_use]
    pub fn stats(&self) -> &UnitStats {
        &self.stats
    }

    /// Point the unit returns to when idle.
    #[must_use]
    pub fn gather_point(&self) -> Vec2 {
        self.gather
    }

    /// Point the unit revives at.
    #[must_use]
    pub fn home(&self) -> Vec2 {
        self.home
    }

    /// Enemy the unit is linked to, if any.
    #[must_use]
    pub fn opponent(&self) -> Option<EnemyId> {
        self.opponent
    }

    /// Melee state after the last engagement pass.
    #[must_use]
    pub fn state(&self) -> EngagementState {
        self.state
    }

    /// Seconds until a fallen unit revives.
    #[must_use]
    pub fn respawn_in(&self) -> Option<f32> {
        self.respawn_in
    }

    fn revive(&mut self) {
        self.hp = self.stats.max_hp;
        self.position = self.home;
        self.cooldown = Cooldown::ready();
        self.opponent = None;
        self.state = EngagementState::Unengaged;
        self.respawn_in = None;
    }
}

impl Mobile for Unit {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    fn is_alive(&self) -> bool {
        self.hp > 0.0
    }

    fn is_pinned(&self) -> bool {
        false
    }
}

impl Targetable for Unit {
    fn health(&self) -> f32 {
        self.hp
    }

    fn apply_damage(&mut self, amount: f32) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.hp -= amount;
        !self.is_alive()
    }
}

/// Owns every hero and soldier in registration order.
#[derive(Debug, Default)]
pub struct UnitRoster {
    pub(crate) units: Vec<Unit>,
    next_id: u32,
}

impl UnitRoster {
    /// Creates an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a unit at `home` and registers it with the motion resolver.
    ///
    /// The unit walks to `gather` on the next engagement pass.
    pub fn enlist(
        &mut self,
        kind: &str,
        role: UnitRole,
        stats: UnitStats,
        home: Vec2,
        gather: Vec2,
        motion: &mut MotionResolver,
    ) -> Result<UnitId, MotionError> {
        let id = UnitId::new(self.next_id);
        let unit = Unit {
            id,
            kind: kind.to_owned(),
            role,
            stats,
            position: home,
            hp: stats.max_hp,
            cooldown: Cooldown::ready(),
            gather,
            home,
            opponent: None,
            state: EngagementState::Unengaged,
            respawn_in: None,
        };
        motion.register(MobileId::Unit(id), &unit, stats.speed, 0.0)?;
        self.next_id = self.next_id.wrapping_add(1);
        self.units.push(unit);
        Ok(id)
    }

    /// Removes a unit, unregistering it and releasing any enemy it holds.
    pub fn discharge(
        &mut self,
        id: UnitId,
        motion: &mut MotionResolver,
        enemies: &mut EnemyRoster,
    ) -> Option<Unit> {
        let index = self.index(id)?;
        let unit = self.units.remove(index);
        if let Some(enemy) = unit.opponent.and_then(|enemy| enemies.get_mut(enemy)) {
            if enemy.engaged_by() == Some(id) {
                enemy.release();
            }
        }
        let _ = motion.unregister(MobileId::Unit(id));
        Some(unit)
    }

    /// Removes every unit and clears their motion records.
    pub fn clear(&mut self, motion: &mut MotionResolver) {
        for unit in self.units.drain(..) {
            let _ = motion.unregister(MobileId::Unit(unit.id));
        }
        self.next_id = 0;
    }

    /// Moves the point a unit returns to when idle.
    pub fn set_gather_point(&mut self, id: UnitId, gather: Vec2) {
        match self.get_mut(id) {
            Some(unit) => unit.gather = gather,
            None => debug!("ignoring gather point for unknown unit {id:?}"),
        }
    }

    /// Counts down fallen units and revives those whose timer expired.
    ///
    /// Revived units reappear at home with full health and are appended to
    /// `revived`.
    pub fn recover(&mut self, dt: f32, motion: &mut MotionResolver, revived: &mut Vec<UnitId>) {
        for unit in &mut self.units {
            if unit.is_alive() {
                continue;
            }
            let timer = unit.respawn_in.get_or_insert(unit.stats.respawn);
            *timer -= dt;
            if *timer > 0.0 {
                continue;
            }
            unit.revive();
            motion.stop(MobileId::Unit(unit.id), true);
            revived.push(unit.id);
        }
    }

    /// Units in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter()
    }

    /// Looks up a unit.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.index(id).map(|index| &self.units[index])
    }

    /// Looks up a unit mutably.
    #[must_use]
    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.index(id).map(|index| &mut self.units[index])
    }

    fn index(&self, id: UnitId) -> Option<usize> {
        self.units.binary_search_by_key(&id, |unit| unit.id).ok()
    }

    /// The hero, if one was enlisted.
    #[must_use]
    pub fn hero(&self) -> Option<&Unit> {
        self.units.iter().find(|unit| unit.role == UnitRole::Hero)
    }

    /// Soldiers belonging to a barracks.
    pub fn squad(&self, barracks: TowerId) -> impl Iterator<Item = &Unit> {
        self.units
            .iter()
            .filter(move |unit| unit.role == UnitRole::Soldier { barracks })
    }

    /// Number of enlisted units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Reports whether no unit is enlisted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl MobileStore for UnitRoster {
    fn mobile_mut(&mut self, id: MobileId) -> Option<&mut dyn Mobile> {
        match id {
            MobileId::Unit(unit) => self.get_mut(unit).map(|unit| unit as &mut dyn Mobile),
            MobileId::Enemy(_) => None,
        }
    }
}
