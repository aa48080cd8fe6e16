use crate::entity::Position;
use crate::id::{EntityId, LinkId};

/// Height at which link paths are drawn above the floor.
pub const PATH_HEIGHT: f64 = 1.4;

/// Delay between consecutive units of one batch, for staggered playback.
pub const UNIT_STAGGER: f64 = 0.15;

/// A point on a link's drawn path.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PathPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl PathPoint {
    fn at(p: Position) -> Self {
        Self {
            x: p.x,
            y: PATH_HEIGHT,
            z: p.z,
        }
    }
}

/// A directed transport relation between two entities.
///
/// Links hold entity ids only; the entities hold the matching back-references
/// in their `input_links` / `output_links`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub from: Option<EntityId>,
    pub to: Option<EntityId>,
    /// Units moved per activation. Always at least 1.
    pub volume: u32,
    /// Intermediate path points, presentation-only.
    pub waypoints: Vec<Position>,
}

impl Link {
    pub fn new(id: LinkId) -> Self {
        Self {
            id,
            from: None,
            to: None,
            volume: 1,
            waypoints: Vec::new(),
        }
    }

    /// Both endpoints, if the link is fully wired.
    pub fn endpoints(&self) -> Option<(EntityId, EntityId)> {
        Some((self.from?, self.to?))
    }

    /// Drawn path: origin, waypoints, destination.
    pub fn path(&self, from: Position, to: Position) -> Vec<PathPoint> {
        let mut path = Vec::with_capacity(self.waypoints.len() + 2);
        path.push(PathPoint::at(from));
        path.extend(self.waypoints.iter().copied().map(PathPoint::at));
        path.push(PathPoint::at(to));
        path
    }
}

/// Playback delay for the `unit`-th item of a batch.
pub fn delay_offset(unit: u32) -> f64 {
    unit as f64 * UNIT_STAGGER
}
