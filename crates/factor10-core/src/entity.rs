use crate::id::{EntityId, LinkId};
use crate::sink::SinkState;
use crate::source::SourceState;

/// A point on the factory floor. `z` is the second planar axis; the script
/// sets it with `setY`.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Position {
    pub x: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, z: f64) -> Self {
        Self { x, z }
    }
}

/// A visual asset attached to an entity. Presentation-only.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AssetPlacement {
    pub name: String,
    /// Offset from the entity position.
    pub offset: Position,
    /// Rotation around the vertical axis, in radians.
    pub rotation: f64,
    pub scale: f64,
}

/// Behavior carried by an entity. Dispatched by `match`; visuals have none.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum EntityKind {
    Source(SourceState),
    Sink(SinkState),
    Visual,
}

impl EntityKind {
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Source(_) => "source",
            EntityKind::Sink(_) => "sink",
            EntityKind::Visual => "visual",
        }
    }
}

/// A node of the factory graph.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub position: Position,
    /// Links leaving this entity, in the order they were attached.
    pub output_links: Vec<LinkId>,
    /// Links arriving at this entity, in the order they were attached.
    pub input_links: Vec<LinkId>,
    pub assets: Vec<AssetPlacement>,
    pub kind: EntityKind,
}

impl Entity {
    pub const DEFAULT_NAME: &'static str = "Entity";

    pub fn new(id: EntityId, kind: EntityKind) -> Self {
        Self {
            id,
            name: Self::DEFAULT_NAME.to_string(),
            position: Position::default(),
            output_links: Vec::new(),
            input_links: Vec::new(),
            assets: Vec::new(),
            kind,
        }
    }

    pub fn as_source(&self) -> Option<&SourceState> {
        match &self.kind {
            EntityKind::Source(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_source_mut(&mut self) -> Option<&mut SourceState> {
        match &mut self.kind {
            EntityKind::Source(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sink(&self) -> Option<&SinkState> {
        match &self.kind {
            EntityKind::Sink(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sink_mut(&mut self) -> Option<&mut SinkState> {
        match &mut self.kind {
            EntityKind::Sink(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_sink(&self) -> bool {
        matches!(self.kind, EntityKind::Sink(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_entity_defaults() {
        let e = Entity::new(EntityId(2), EntityKind::Visual);
        assert_eq!(e.name, "Entity");
        assert_eq!(e.position, Position::new(0.0, 0.0));
        assert!(e.input_links.is_empty());
        assert!(e.output_links.is_empty());
        assert_eq!(e.kind.label(), "visual");
    }

    #[test]
    fn variant_accessors() {
        let mut src = Entity::new(EntityId(0), EntityKind::Source(SourceState::new()));
        let sink = Entity::new(EntityId(1), EntityKind::Sink(SinkState::new()));
        assert!(src.as_source().is_some());
        assert!(src.as_sink().is_none());
        assert!(src.as_source_mut().is_some());
        assert!(sink.is_sink());
        assert!(!src.is_sink());
    }
}
