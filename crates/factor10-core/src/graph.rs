//! The factory graph: products, entities and links, plus the per-tick
//! transitions that move units between them.
//!
//! Entities, links and products live in plain vectors indexed by their
//! sequential ids. Links refer to entities by id; entities keep the ids of
//! the links attached to them, in attachment order.

use crate::entity::{Entity, EntityKind};
use crate::event::{Event, EventBus, SinkVisual, SourceVisual};
use crate::id::{EntityId, LinkId, ProductId};
use crate::link::{Link, delay_offset};
use crate::product::Product;
use crate::rng::SimRng;
use crate::sink::{ReceiveOutcome, RejectReason, SinkState};
use crate::source::SourceState;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during graph operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),
    #[error("link not found: {0}")]
    LinkNotFound(LinkId),
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),
}

/// Name shown for entities without a product.
pub const NO_PRODUCT_NAME: &str = "None";

// ---------------------------------------------------------------------------
// FactoryGraph
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FactoryGraph {
    products: Vec<Product>,
    entities: Vec<Entity>,
    links: Vec<Link>,
}

impl FactoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty() && self.entities.is_empty() && self.links.is_empty()
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    /// Create a product with the next product id.
    pub fn add_product(&mut self) -> ProductId {
        let id = ProductId(self.products.len() as u32);
        self.products.push(Product::new(id));
        id
    }

    /// Create an entity with the next entity id. Sources, sinks and visuals
    /// share one id sequence.
    pub fn add_entity(&mut self, kind: EntityKind) -> EntityId {
        let id = EntityId(self.entities.len() as u32);
        self.entities.push(Entity::new(id, kind));
        id
    }

    pub fn add_source(&mut self) -> EntityId {
        self.add_entity(EntityKind::Source(SourceState::new()))
    }

    pub fn add_sink(&mut self) -> EntityId {
        self.add_entity(EntityKind::Sink(SinkState::new()))
    }

    pub fn add_visual(&mut self) -> EntityId {
        self.add_entity(EntityKind::Visual)
    }

    /// Create an unwired link with the next link id.
    pub fn add_link(&mut self) -> LinkId {
        let id = LinkId(self.links.len() as u32);
        self.links.push(Link::new(id));
        id
    }

    /// Set the link's origin. A previous origin loses its back-reference.
    pub fn set_link_from(&mut self, link: LinkId, entity: EntityId) -> Result<(), GraphError> {
        self.entity(entity).ok_or(GraphError::EntityNotFound(entity))?;
        let l = self
            .links
            .get_mut(link.index())
            .ok_or(GraphError::LinkNotFound(link))?;
        let previous = l.from.replace(entity);

        if let Some(old) = previous {
            let outputs = &mut self.entities[old.index()].output_links;
            if let Some(pos) = outputs.iter().position(|&id| id == link) {
                outputs.remove(pos);
            }
        }
        self.entities[entity.index()].output_links.push(link);
        Ok(())
    }

    /// Set the link's destination. A previous destination loses its
    /// back-reference.
    pub fn set_link_to(&mut self, link: LinkId, entity: EntityId) -> Result<(), GraphError> {
        self.entity(entity).ok_or(GraphError::EntityNotFound(entity))?;
        let l = self
            .links
            .get_mut(link.index())
            .ok_or(GraphError::LinkNotFound(link))?;
        let previous = l.to.replace(entity);

        if let Some(old) = previous {
            let inputs = &mut self.entities[old.index()].input_links;
            if let Some(pos) = inputs.iter().position(|&id| id == link) {
                inputs.remove(pos);
            }
        }
        self.entities[entity.index()].input_links.push(link);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Access
    // -----------------------------------------------------------------------

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.get(id.index())
    }

    pub fn product_mut(&mut self, id: ProductId) -> Option<&mut Product> {
        self.products.get_mut(id.index())
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.index())
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id.index())
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id.index())
    }

    pub fn link_mut(&mut self, id: LinkId) -> Option<&mut Link> {
        self.links.get_mut(id.index())
    }

    pub fn source(&self, id: EntityId) -> Option<&SourceState> {
        self.entity(id)?.as_source()
    }

    pub fn sink(&self, id: EntityId) -> Option<&SinkState> {
        self.entity(id)?.as_sink()
    }

    fn source_mut(&mut self, id: EntityId) -> Option<&mut SourceState> {
        self.entities.get_mut(id.index())?.as_source_mut()
    }

    /// Display name of an optional product, `"None"` when unset.
    pub fn product_name(&self, product: Option<ProductId>) -> String {
        product
            .and_then(|p| self.product(p))
            .map_or_else(|| NO_PRODUCT_NAME.to_string(), |p| p.name.clone())
    }

    // -----------------------------------------------------------------------
    // Finalize
    // -----------------------------------------------------------------------

    /// Announce the finished graph: every entity, then every link, so link
    /// paths see final entity positions. Links missing an endpoint are
    /// skipped.
    pub fn finalize(&self, events: &mut EventBus) {
        for entity in &self.entities {
            match &entity.kind {
                EntityKind::Source(source) => {
                    events.emit(Event::SourceConfigured {
                        entity: entity.id,
                        product_name: self.product_name(source.product),
                        duration: source.duration,
                    });
                    self.emit_source_update(entity.id, events);
                }
                EntityKind::Sink(sink) => {
                    events.emit(Event::SinkConfigured {
                        entity: entity.id,
                        product_name: self.product_name(sink.product),
                    });
                    self.emit_sink_update(entity.id, events);
                }
                EntityKind::Visual => {}
            }
        }

        for link in &self.links {
            let Some((from, to)) = link.endpoints() else {
                continue;
            };
            let (Some(from), Some(to)) = (self.entity(from), self.entity(to)) else {
                continue;
            };
            events.emit(Event::LinkPathCreated {
                link: link.id,
                path: link.path(from.position, to.position),
                volume: link.volume,
            });
        }
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Run one entity's per-tick transition.
    pub fn tick_entity(&mut self, id: EntityId, rng: &mut SimRng, events: &mut EventBus) {
        let (is_source, is_sink) = match self.entity(id) {
            Some(entity) => (entity.as_source().is_some(), entity.is_sink()),
            None => return,
        };
        if is_source {
            self.tick_source(id, rng, events);
        } else if is_sink {
            // Sinks only change when something is delivered or withdrawn.
            self.emit_sink_update(id, events);
        }
    }

    fn tick_source(&mut self, id: EntityId, rng: &mut SimRng, events: &mut EventBus) {
        let Some(source) = self.source_mut(id) else {
            return;
        };
        let Some(product) = source.product else {
            source.wait();
            return;
        };

        if source.is_broken {
            source.continue_repair();
            self.emit_source_update(id, events);
            return;
        }

        if !source.is_processing && rng.chance(source.break_freq) {
            source.break_down();
            self.emit_source_update(id, events);
            return;
        }

        if source.is_processing {
            source.advance();
        } else if !source.can_start() {
            source.wait();
        } else {
            match self.input_demand(id) {
                Some(demand) => {
                    self.pull_inputs(id, &demand, events);
                    if let Some(source) = self.source_mut(id) {
                        source.begin_processing();
                    }
                }
                None => {
                    if let Some(source) = self.source_mut(id) {
                        source.wait();
                    }
                }
            }
        }

        let Some(source) = self.source_mut(id) else {
            return;
        };
        if source.try_complete() {
            let is_fail = rng.chance(source.fail_freq);
            self.push_outputs(id, product, is_fail, events);
        }
        self.emit_source_update(id, events);
    }

    /// Units each upstream sink must supply for `id` to start a batch, or
    /// `None` if any input link cannot be satisfied. Demands of several links
    /// on the same sink are summed so the check and the withdrawal agree.
    fn input_demand(&self, id: EntityId) -> Option<Vec<(EntityId, u64)>> {
        let mut demand: Vec<(EntityId, u64)> = Vec::new();
        for &link_id in &self.entity(id)?.input_links {
            let link = self.link(link_id)?;
            let from = link.from?;
            self.sink(from)?;
            match demand.iter_mut().find(|(sink, _)| *sink == from) {
                Some((_, units)) => *units += link.volume as u64,
                None => demand.push((from, link.volume as u64)),
            }
        }

        for &(sink, units) in &demand {
            if self.sink(sink)?.current_stock < units {
                return None;
            }
        }
        Some(demand)
    }

    /// Withdraw the inputs computed by [`Self::input_demand`] and play the
    /// pull animations. Must run without any other entity ticking between
    /// the check and this call.
    fn pull_inputs(&mut self, id: EntityId, demand: &[(EntityId, u64)], events: &mut EventBus) {
        for &(sink_id, units) in demand {
            if let Some(sink) = self.entities[sink_id.index()].as_sink_mut() {
                let withdrawn = sink.withdraw(units);
                debug_assert!(withdrawn, "input demand checked before withdrawal");
            }
            self.emit_sink_update(sink_id, events);
        }

        let inputs = self.entities[id.index()].input_links.clone();
        for link_id in inputs {
            let link = &self.links[link_id.index()];
            let volume = link.volume;
            let product = link
                .from
                .and_then(|from| self.sink(from))
                .and_then(|sink| sink.product);
            let Some(product) = product else {
                continue;
            };
            for unit in 0..volume {
                self.transport(link_id, product, false, true, delay_offset(unit), events);
            }
        }
    }

    /// Send `volume` units of `product` down every output link of `id`.
    fn push_outputs(
        &mut self,
        id: EntityId,
        product: ProductId,
        is_fail: bool,
        events: &mut EventBus,
    ) {
        let outputs = self.entities[id.index()].output_links.clone();
        for link_id in outputs {
            let volume = self.links[link_id.index()].volume;
            for unit in 0..volume {
                self.transport(link_id, product, is_fail, false, delay_offset(unit), events);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Transport
    // -----------------------------------------------------------------------

    /// Move one unit along a link. Pushes are delivered to a sink
    /// destination; pulls only animate. Either way presentation is told.
    pub fn transport(
        &mut self,
        link: LinkId,
        product: ProductId,
        is_fail: bool,
        is_pull: bool,
        delay_offset: f64,
        events: &mut EventBus,
    ) {
        let Some(to) = self.link(link).map(|l| l.to) else {
            return;
        };
        if !is_pull {
            if let Some(to) = to {
                self.deliver(to, product, is_fail, events);
            }
        }
        events.emit(Event::ItemTransported {
            link,
            product,
            is_fail,
            is_pull,
            delay_offset,
        });
    }

    /// Hand one unit to `to` if it is a sink. Returns `None` when `to` is not
    /// a sink or the product does not exist.
    pub fn deliver(
        &mut self,
        to: EntityId,
        product: ProductId,
        is_fail: bool,
        events: &mut EventBus,
    ) -> Option<ReceiveOutcome> {
        let incoming = self.products.get(product.index())?;
        let Entity { name, kind, .. } = self.entities.get_mut(to.index())?;
        let EntityKind::Sink(sink) = kind else {
            return None;
        };
        let assigned = sink.product.and_then(|p| self.products.get(p.index()));
        let outcome = sink.receive(assigned, incoming, is_fail);

        match &outcome {
            ReceiveOutcome::Rejected(RejectReason::NoProduct) => {
                tracing::debug!(sink = %name, product = %incoming.name, "sink has no product, unit dropped");
            }
            ReceiveOutcome::Rejected(RejectReason::ProductMismatch { expected, received }) => {
                tracing::warn!(
                    sink = %name,
                    "sink rejected product {received}, expected {expected}"
                );
            }
            _ => self.emit_sink_update(to, events),
        }
        Some(outcome)
    }

    // -----------------------------------------------------------------------
    // Visual updates
    // -----------------------------------------------------------------------

    fn emit_source_update(&self, id: EntityId, events: &mut EventBus) {
        let Some(source) = self.source(id) else {
            return;
        };
        events.emit(Event::SourceUpdated(SourceVisual {
            entity: id,
            product_name: self.product_name(source.product),
            duration: source.duration,
            progress: source.progress_ratio(),
            repair: source.repair_ratio(),
            broken: source.is_broken,
        }));
    }

    fn emit_sink_update(&self, id: EntityId, events: &mut EventBus) {
        let Some(sink) = self.sink(id) else {
            return;
        };
        events.emit(Event::SinkUpdated(SinkVisual {
            entity: id,
            product_name: self.product_name(sink.product),
            stock: sink.current_stock,
            capacity: sink.capacity,
            fail: sink.fail,
            loss: sink.loss,
        }));
    }
}
