#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Motion resolver that arbitrates movement requests by priority.
//!
//! The resolver is the single source of truth for where every registered
//! mobile is heading and how fast. Callers issue requests with
//! [`MotionResolver::set_target`]; a request is silently dropped while the
//! entity is still moving under a strictly higher priority. Each tick advances
//! every moving, living, unpinned entity in a straight line and reports
//! arrivals as typed [`Arrival`] values.

use std::collections::BTreeMap;

use log::debug;
use rampart_core::{
    geometry::is_finite_point, Mobile, MobileId, MobileStore, MoveCategory, Priority, Vec2,
};
use thiserror::Error;

/// Errors raised when registering a mobile entity.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum MotionError {
    /// The entity's coordinates are not finite numbers.
    #[error("mobile {id:?} has non-finite position {position}")]
    NonFinitePosition {
        /// Handle of the rejected entity.
        id: MobileId,
        /// Offending position.
        position: Vec2,
    },
    /// The requested speed is negative or not a finite number.
    #[error("mobile {id:?} has invalid speed {speed}")]
    InvalidSpeed {
        /// Handle of the rejected entity.
        id: MobileId,
        /// Offending speed.
        speed: f32,
    },
}

/// Parameters accompanying a movement request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MoveRequest {
    /// Priority tier of the request.
    pub priority: Priority,
    /// Reason the request was issued.
    pub category: MoveCategory,
    /// Arrival tolerance; `None` keeps the distance chosen at registration.
    pub stop_distance: Option<f32>,
    /// Whether arriving should be reported through [`Arrival`].
    pub notify: bool,
}

impl MoveRequest {
    /// Creates a request with the registered stop distance and no notification.
    #[must_use]
    pub const fn new(priority: Priority, category: MoveCategory) -> Self {
        Self {
            priority,
            category,
            stop_distance: None,
            notify: false,
        }
    }

    /// Low-priority walk back to a gather point.
    #[must_use]
    pub const fn gather() -> Self {
        Self::new(Priority::GATHER, MoveCategory::Gather)
    }

    /// Combat-priority approach that stops once within `strike_range`.
    #[must_use]
    pub const fn combat(strike_range: f32) -> Self {
        Self::new(Priority::COMBAT, MoveCategory::Combat).with_stop_distance(strike_range)
    }

    /// Player order that reports its arrival.
    #[must_use]
    pub const fn order() -> Self {
        Self::new(Priority::ORDER, MoveCategory::Order).notify_on_arrival()
    }

    /// Overrides the arrival tolerance for this request.
    #[must_use]
    pub const fn with_stop_distance(mut self, stop_distance: f32) -> Self {
        self.stop_distance = Some(stop_distance);
        self
    }

    /// Requests an [`Arrival`] report once the target is reached.
    #[must_use]
    pub const fn notify_on_arrival(mut self) -> Self {
        self.notify = true;
        self
    }
}

/// Movement state owned by the resolver for a single entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MovementRecord {
    /// Position the entity is heading towards.
    pub target: Vec2,
    /// Travel speed in world units per second.
    pub speed: f32,
    /// Arrival tolerance of the active request.
    pub stop_distance: f32,
    /// Arrival tolerance chosen at registration.
    pub default_stop_distance: f32,
    /// Priority of the active request.
    pub priority: Priority,
    /// Category of the active request.
    pub category: MoveCategory,
    /// Whether the entity is currently travelling.
    pub moving: bool,
    /// Whether the active request reports its arrival.
    pub notify: bool,
}

/// Report emitted when a notifying request reaches its target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Arrival {
    /// Entity that arrived.
    pub id: MobileId,
    /// Category of the completed request.
    pub category: MoveCategory,
    /// Position the entity snapped to.
    pub position: Vec2,
}

/// Arbitrates competing movement requests and advances positions.
#[derive(Debug, Default)]
pub struct MotionResolver {
    records: BTreeMap<MobileId, MovementRecord>,
}

impl MotionResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entity, using its current position as the initial target.
    ///
    /// Registering an already known handle replaces its record.
    pub fn register<M>(
        &mut self,
        id: MobileId,
        entity: &M,
        speed: f32,
        stop_distance: f32,
    ) -> Result<(), MotionError>
    where
        M: Mobile + ?Sized,
    {
        let position = entity.position();
        if !is_finite_point(position) {
            return Err(MotionError::NonFinitePosition { id, position });
        }
        if !speed.is_finite() || speed < 0.0 {
            return Err(MotionError::InvalidSpeed { id, speed });
        }

        let stop_distance = if stop_distance.is_finite() {
            stop_distance.max(0.0)
        } else {
            0.0
        };
        let record = MovementRecord {
            target: position,
            speed,
            stop_distance,
            default_stop_distance: stop_distance,
            priority: Priority::IDLE,
            category: MoveCategory::Gather,
            moving: false,
            notify: false,
        };
        if self.records.insert(id, record).is_some() {
            debug!("re-registered mobile {id:?}");
        }
        Ok(())
    }

    /// Forgets an entity and returns its final record.
    pub fn unregister(&mut self, id: MobileId) -> Option<MovementRecord> {
        self.records.remove(&id)
    }

    /// Requests that an entity travel to `to`.
    ///
    /// The request is dropped when the entity is still moving under a strictly
    /// higher priority. A completed or stopped record accepts any priority.
    pub fn set_target(&mut self, id: MobileId, to: Vec2, request: MoveRequest) {
        let Some(record) = self.records.get_mut(&id) else {
            debug!("ignoring move request for unregistered mobile {id:?}");
            return;
        };
        if !is_finite_point(to) {
            debug!("ignoring non-finite move target {to} for mobile {id:?}");
            return;
        }
        if record.moving && record.priority > request.priority {
            debug!(
                "dropping {:?} request for mobile {id:?}: busy with {:?}",
                request.category, record.category
            );
            return;
        }

        record.target = to;
        record.priority = request.priority;
        record.category = request.category;
        record.stop_distance = request
            .stop_distance
            .filter(|distance| distance.is_finite())
            .map_or(record.default_stop_distance, |distance| distance.max(0.0));
        record.notify = request.notify;
        record.moving = true;
    }

    /// Halts an entity, optionally dropping it to the lowest priority tier.
    pub fn stop(&mut self, id: MobileId, reset_priority: bool) {
        let Some(record) = self.records.get_mut(&id) else {
            debug!("ignoring stop for unregistered mobile {id:?}");
            return;
        };
        record.moving = false;
        record.notify = false;
        if reset_priority {
            record.priority = Priority::IDLE;
        }
    }

    /// Changes the travel speed of an entity.
    pub fn set_speed(&mut self, id: MobileId, speed: f32) {
        match self.records.get_mut(&id) {
            Some(record) if speed.is_finite() && speed >= 0.0 => record.speed = speed,
            Some(_) => debug!("ignoring invalid speed {speed} for mobile {id:?}"),
            None => debug!("ignoring speed change for unregistered mobile {id:?}"),
        }
    }

    /// Advances every moving entity by `dt` seconds.
    ///
    /// Dead and pinned entities keep their position. Arrivals of notifying
    /// requests are appended to `out` exactly once.
    pub fn tick<S>(&mut self, dt: f32, store: &mut S, out: &mut Vec<Arrival>)
    where
        S: MobileStore + ?Sized,
    {
        if !dt.is_finite() || dt < 0.0 {
            return;
        }

        for (&id, record) in &mut self.records {
            if !record.moving {
                continue;
            }
            let Some(entity) = store.mobile_mut(id) else {
                continue;
            };
            if !entity.is_alive() || entity.is_pinned() {
                continue;
            }

            let position = entity.position();
            let offset = record.target - position;
            let distance = offset.length();

            if distance <= record.stop_distance {
                entity.set_position(record.target);
                record.moving = false;
                record.priority = Priority::IDLE;
                if record.notify {
                    record.notify = false;
                    out.push(Arrival {
                        id,
                        category: record.category,
                        position: record.target,
                    });
                }
                continue;
            }

            let step = record.speed * dt;
            if step >= distance {
                entity.set_position(record.target);
            } else {
                entity.set_position(position + offset / distance * step);
            }
        }
    }

    /// Returns the record stored for an entity.
    #[must_use]
    pub fn record(&self, id: MobileId) -> Option<&MovementRecord> {
        self.records.get(&id)
    }

    /// Reports whether an entity is currently travelling.
    #[must_use]
    pub fn is_moving(&self, id: MobileId) -> bool {
        self.records.get(&id).map_or(false, |record| record.moving)
    }

    /// Number of registered entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Reports whether no entity is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_constructors_pick_expected_tiers() {
        assert_eq!(MoveRequest::gather().priority, Priority::GATHER);
        assert_eq!(MoveRequest::order().priority, Priority::ORDER);
        assert!(MoveRequest::order().notify);

        let combat = MoveRequest::combat(5.0);
        assert_eq!(combat.priority, Priority::COMBAT);
        assert_eq!(combat.category, MoveCategory::Combat);
        assert_eq!(combat.stop_distance, Some(5.0));
        assert!(!combat.notify);
    }

    #[test]
    fn unregistered_operations_are_no_ops() {
        let mut resolver = MotionResolver::new();
        let id = MobileId::Unit(rampart_core::UnitId::new(1));

        resolver.set_target(id, Vec2::ONE, MoveRequest::gather());
        resolver.stop(id, true);
        resolver.set_speed(id, 10.0);

        assert!(resolver.is_empty());
        assert!(!resolver.is_moving(id));
    }
}
