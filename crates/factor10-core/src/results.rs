//! Read-only results snapshot.
//!
//! Owned copies only -- no references into engine storage -- so a snapshot
//! can be kept in a history, serialized, or compared across runs.

use crate::fixed::{Fixed64, Ticks};
use crate::graph::FactoryGraph;
use crate::id::EntityId;
use crate::source::SourceStatus;

/// One source's row in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SourceResult {
    pub id: EntityId,
    pub name: String,
    pub state: SourceStatus,
}

/// One sink's row in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SinkResult {
    pub id: EntityId,
    pub name: String,
    /// Units received minus units withdrawn.
    pub elements: i64,
    pub fail: u64,
    pub loss: u64,
    /// `(elements - 2*fail - 2*loss) * price`.
    pub profit: Fixed64,
}

/// Aggregated results at one tick. Sources and sinks appear in creation
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SimResults {
    pub tick: Ticks,
    pub sources: Vec<SourceResult>,
    pub sinks: Vec<SinkResult>,
}

impl SimResults {
    /// Build a snapshot of `graph` at `tick`.
    pub fn capture(tick: Ticks, graph: &FactoryGraph) -> Self {
        let mut results = SimResults {
            tick,
            ..Default::default()
        };

        for entity in graph.entities() {
            if let Some(source) = entity.as_source() {
                results.sources.push(SourceResult {
                    id: entity.id,
                    name: entity.name.clone(),
                    state: source.status,
                });
            } else if let Some(sink) = entity.as_sink() {
                let price = sink
                    .product
                    .and_then(|p| graph.product(p))
                    .map_or(Fixed64::ZERO, |p| p.price);
                results.sinks.push(SinkResult {
                    id: entity.id,
                    name: entity.name.clone(),
                    elements: sink.elements(),
                    fail: sink.fail,
                    loss: sink.loss,
                    profit: sink.profit(price),
                });
            }
        }

        results
    }

    pub fn source(&self, id: EntityId) -> Option<&SourceResult> {
        self.sources.iter().find(|s| s.id == id)
    }

    pub fn sink(&self, id: EntityId) -> Option<&SinkResult> {
        self.sinks.iter().find(|s| s.id == id)
    }

    /// Sum of all sink profits.
    pub fn total_profit(&self) -> Fixed64 {
        self.sinks
            .iter()
            .fold(Fixed64::ZERO, |acc, s| acc.saturating_add(s.profit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_splits_sources_and_sinks_in_creation_order() {
        let mut graph = FactoryGraph::new();
        let cube = graph.add_product();
        graph.product_mut(cube).unwrap().price = Fixed64::from_num(4);
        let sink = graph.add_sink();
        graph.add_visual();
        let source = graph.add_source();
        {
            let s = graph.entity_mut(sink).unwrap();
            s.name = "Stock".into();
            let state = s.as_sink_mut().unwrap();
            state.product = Some(cube);
            state.in_count = 3;
            state.current_stock = 3;
        }

        let results = SimResults::capture(7, &graph);
        assert_eq!(results.tick, 7);
        assert_eq!(results.sources.len(), 1);
        assert_eq!(results.sources[0].id, source);
        assert_eq!(results.sources[0].state, SourceStatus::Waiting);
        let row = results.sink(sink).unwrap();
        assert_eq!(row.name, "Stock");
        assert_eq!(row.elements, 3);
        assert_eq!(row.profit, Fixed64::from_num(12));
        assert_eq!(results.total_profit(), Fixed64::from_num(12));
    }

    #[test]
    fn sink_without_product_has_zero_profit() {
        let mut graph = FactoryGraph::new();
        let sink = graph.add_sink();
        graph.entity_mut(sink).unwrap().as_sink_mut().unwrap().loss = 5;
        let results = SimResults::capture(0, &graph);
        assert_eq!(results.sinks[0].profit, Fixed64::ZERO);
    }

    #[test]
    fn snapshot_serializes() {
        let graph = FactoryGraph::new();
        let json = serde_json::to_string(&SimResults::capture(1, &graph)).unwrap();
        assert!(json.contains("\"tick\":1"));
    }
}
