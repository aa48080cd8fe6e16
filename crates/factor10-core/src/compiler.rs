//! Script-to-graph compilation.
//!
//! A script runs against a [`GraphBuilder`], which owns a fresh staging
//! graph and its own event buffer. Nothing outside the builder is touched, so
//! a failed compile can simply be dropped.

use crate::config::SimConfig;
use crate::entity::{AssetPlacement, EntityKind, Position};
use crate::event::{Event, EventBus};
use crate::fixed::{Fixed64, Ticks, try_f64_to_fixed64};
use crate::graph::FactoryGraph;
use crate::id::{EntityId, LinkId, ProductId};
use crate::script::{self, CompileError, ObjectRef, ScriptHost, Value};

/// Script loaded into a new project.
pub const DEFAULT_SCRIPT: &str = "// Factor10 Simulation Script
var product = createProduct();
product.setName('Simple Cube');
product.setPrice(10);
product.addAsset('pyramid', 0, 0, 0, 1);

var stock = createSink();
stock.setName('Stock');
stock.setProduct(product);
stock.setCapacity(100);
stock.addAsset('cube', 0, 0, 0, 0.5);
stock.setX(5);
stock.setY(0);

var machine = createSource();
machine.setName('Machine');
machine.setProduct(product);
machine.setDuration(5);
machine.addAsset('cube', 0, 0, 0, 0.5);
machine.setX(-5);
machine.setY(0);

var link = createLink();
link.setFrom(machine);
link.setTo(stock);
link.setVolume(1);
link.addPosition(0, 2);
";

const GLOBALS: &[&str] = &[
    "createProduct",
    "createSource",
    "createSink",
    "createLink",
    "createVisual",
    "log",
];

/// Output of a successful compile, ready to be committed.
#[derive(Debug)]
pub struct CompiledFactory {
    pub graph: FactoryGraph,
    /// Construction and finalize notifications, in emission order.
    pub events: Vec<Event>,
    /// Lines written by the script's `log()` calls.
    pub log: Vec<String>,
}

/// Compile `src` into a staging graph.
pub fn compile(src: &str, config: &SimConfig) -> Result<CompiledFactory, CompileError> {
    let mut builder = GraphBuilder::new();
    script::execute(src, &mut builder, config.max_script_steps)?;
    Ok(builder.finish())
}

// ---------------------------------------------------------------------------
// Argument conversion
// ---------------------------------------------------------------------------

fn arg(args: &[Value], index: usize) -> &Value {
    args.get(index).unwrap_or(&Value::Undefined)
}

fn number(method: &str, args: &[Value], index: usize) -> Result<f64, String> {
    match arg(args, index) {
        Value::Number(n) if n.is_finite() => Ok(*n),
        Value::Number(n) => Err(format!("{method}(): argument {} must be finite, got {n}", index + 1)),
        other => Err(format!(
            "{method}(): argument {} must be a number, got {}",
            index + 1,
            other.type_name()
        )),
    }
}

fn number_or(method: &str, args: &[Value], index: usize, default: f64) -> Result<f64, String> {
    match arg(args, index) {
        Value::Undefined | Value::Null => Ok(default),
        _ => number(method, args, index),
    }
}

fn text(method: &str, args: &[Value], index: usize) -> Result<String, String> {
    match arg(args, index) {
        v @ (Value::Str(_) | Value::Number(_) | Value::Bool(_)) => Ok(v.to_string()),
        other => Err(format!(
            "{method}(): argument {} must be a string, got {}",
            index + 1,
            other.type_name()
        )),
    }
}

/// Largest count a script can pass: the biggest integer an f64 holds
/// exactly.
pub const MAX_COUNT_ARG: f64 = 9_007_199_254_740_991.0;

/// Non-negative tick count, rounded up.
fn ticks(method: &str, args: &[Value], index: usize) -> Result<Ticks, String> {
    let n = number(method, args, index)?;
    if n < 0.0 {
        return Err(format!("{method}(): value must not be negative, got {n}"));
    }
    let n = n.ceil();
    if n > MAX_COUNT_ARG {
        return Err(format!("{method}(): value too large, got {n}"));
    }
    Ok(n as Ticks)
}

fn probability(method: &str, args: &[Value], index: usize) -> Result<Fixed64, String> {
    let n = number(method, args, index)?;
    if !(0.0..=1.0).contains(&n) {
        return Err(format!("{method}(): probability must lie in [0, 1], got {n}"));
    }
    try_f64_to_fixed64(n).ok_or_else(|| format!("{method}(): invalid probability {n}"))
}

fn product(method: &str, args: &[Value], index: usize) -> Result<Option<ProductId>, String> {
    match arg(args, index) {
        Value::Undefined | Value::Null => Ok(None),
        Value::Object(ObjectRef::Product(id)) => Ok(Some(*id)),
        other => Err(format!("{method}(): expected a product, got {}", other.type_name())),
    }
}

fn entity(method: &str, args: &[Value], index: usize) -> Result<EntityId, String> {
    match arg(args, index) {
        Value::Object(ObjectRef::Entity(id)) => Ok(*id),
        other => Err(format!("{method}(): expected an entity, got {}", other.type_name())),
    }
}

/// `addAsset(name, x, z, rot, scale = 1)` with rotation in degrees.
fn asset(args: &[Value]) -> Result<AssetPlacement, String> {
    const METHOD: &str = "addAsset";
    Ok(AssetPlacement {
        name: text(METHOD, args, 0)?,
        offset: Position::new(number_or(METHOD, args, 1, 0.0)?, number_or(METHOD, args, 2, 0.0)?),
        rotation: number_or(METHOD, args, 3, 0.0)?.to_radians(),
        scale: number_or(METHOD, args, 4, 1.0)?,
    })
}

// ---------------------------------------------------------------------------
// GraphBuilder
// ---------------------------------------------------------------------------

/// The host a factory script runs against.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    graph: FactoryGraph,
    events: EventBus,
    log: Vec<String>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph(&self) -> &FactoryGraph {
        &self.graph
    }

    /// Finalize the graph and hand over everything built so far.
    pub fn finish(mut self) -> CompiledFactory {
        self.graph.finalize(&mut self.events);
        CompiledFactory {
            graph: self.graph,
            events: self.events.drain(),
            log: self.log,
        }
    }

    fn create_entity(&mut self, kind: EntityKind) -> Value {
        let label = kind.label();
        let id = self.graph.add_entity(kind);
        tracing::trace!(%id, kind = label, "entity created");
        self.events.emit(Event::NodeCreated {
            entity: id,
            position: Position::default(),
        });
        Value::Object(ObjectRef::Entity(id))
    }

    fn product_method(&mut self, id: ProductId, method: &str, args: &[Value]) -> Result<(), String> {
        let product = self
            .graph
            .product_mut(id)
            .ok_or_else(|| format!("unknown product {id}"))?;
        match method {
            "setName" => product.name = text(method, args, 0)?,
            "setPrice" => {
                let price = number(method, args, 0)?;
                product.price = try_f64_to_fixed64(price)
                    .ok_or_else(|| format!("setPrice(): {price} is out of range"))?;
            }
            "setColor" => {
                product.color = match arg(args, 0) {
                    Value::Undefined | Value::Null => None,
                    v => Some(v.to_string()),
                };
            }
            "addAsset" => {
                let placement = asset(args)?;
                product.set_asset(placement.name, placement.scale);
            }
            _ => return Err(format!("product has no method '{method}'")),
        }
        Ok(())
    }

    fn entity_method(&mut self, id: EntityId, method: &str, args: &[Value]) -> Result<(), String> {
        let entity = self
            .graph
            .entity_mut(id)
            .ok_or_else(|| format!("unknown entity {id}"))?;

        match method {
            "setName" => entity.name = text(method, args, 0)?,
            "setX" | "setY" => {
                let v = number(method, args, 0)?;
                if method == "setX" {
                    entity.position.x = v;
                } else {
                    entity.position.z = v;
                }
                self.events.emit(Event::NodeMoved {
                    entity: id,
                    position: entity.position,
                });
            }
            "addAsset" => {
                let placement = asset(args)?;
                entity.assets.push(placement.clone());
                self.events.emit(Event::NodeAssetAdded {
                    entity: id,
                    asset: placement,
                });
            }
            _ => match &mut entity.kind {
                EntityKind::Source(source) => match method {
                    "setProduct" => source.product = product(method, args, 0)?,
                    "setDuration" => source.duration = ticks(method, args, 0)?,
                    "setFailFrequence" | "setFailFrequency" => {
                        source.fail_freq = probability(method, args, 0)?;
                    }
                    "setBreakFrequence" | "setBreakFrequency" => {
                        source.break_freq = probability(method, args, 0)?;
                    }
                    "setBreakDuration" => source.break_duration = ticks(method, args, 0)?,
                    _ => return Err(format!("source has no method '{method}'")),
                },
                EntityKind::Sink(sink) => match method {
                    "setProduct" => sink.product = product(method, args, 0)?,
                    "setCapacity" => sink.capacity = ticks(method, args, 0)?,
                    _ => return Err(format!("sink has no method '{method}'")),
                },
                EntityKind::Visual => return Err(format!("visual has no method '{method}'")),
            },
        }
        Ok(())
    }

    fn link_method(&mut self, id: LinkId, method: &str, args: &[Value]) -> Result<(), String> {
        match method {
            "setFrom" => {
                let from = entity(method, args, 0)?;
                self.graph.set_link_from(id, from).map_err(|e| e.to_string())
            }
            "setTo" => {
                let to = entity(method, args, 0)?;
                self.graph.set_link_to(id, to).map_err(|e| e.to_string())
            }
            "setVolume" => {
                let volume = ticks(method, args, 0)?;
                let volume = u32::try_from(volume)
                    .ok()
                    .filter(|&v| v >= 1)
                    .ok_or_else(|| format!("setVolume(): volume must be at least 1, got {volume}"))?;
                self.link_mut(id)?.volume = volume;
                Ok(())
            }
            "addPosition" => {
                let point = Position::new(number(method, args, 0)?, number(method, args, 1)?);
                self.link_mut(id)?.waypoints.push(point);
                Ok(())
            }
            _ => Err(format!("link has no method '{method}'")),
        }
    }

    fn link_mut(&mut self, id: LinkId) -> Result<&mut crate::link::Link, String> {
        self.graph
            .link_mut(id)
            .ok_or_else(|| format!("unknown link {id}"))
    }
}

impl ScriptHost for GraphBuilder {
    fn has_function(&self, name: &str) -> bool {
        GLOBALS.contains(&name)
    }

    fn call_function(&mut self, name: &str, args: &[Value]) -> Result<Value, String> {
        match name {
            "createProduct" => Ok(Value::Object(ObjectRef::Product(self.graph.add_product()))),
            "createSource" => Ok(self.create_entity(EntityKind::Source(Default::default()))),
            "createSink" => Ok(self.create_entity(EntityKind::Sink(Default::default()))),
            "createVisual" => Ok(self.create_entity(EntityKind::Visual)),
            "createLink" => Ok(Value::Object(ObjectRef::Link(self.graph.add_link()))),
            "log" => {
                let line = args
                    .iter()
                    .map(Value::to_string)
                    .collect::<Vec<_>>()
                    .join(" ");
                tracing::info!(target: "factor10::script", "{line}");
                self.log.push(line);
                Ok(Value::Undefined)
            }
            _ => Err(format!("{name} is not defined")),
        }
    }

    fn call_method(
        &mut self,
        receiver: ObjectRef,
        method: &str,
        args: &[Value],
    ) -> Result<Value, String> {
        match receiver {
            ObjectRef::Product(id) => self.product_method(id, method, args)?,
            ObjectRef::Entity(id) => self.entity_method(id, method, args)?,
            ObjectRef::Link(id) => self.link_method(id, method, args)?,
        }
        Ok(Value::Undefined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::script::Span;

    fn build(src: &str) -> Result<CompiledFactory, CompileError> {
        compile(src, &SimConfig::default())
    }

    #[test]
    fn default_script_builds_machine_stock_and_link() {
        let factory = build(DEFAULT_SCRIPT).unwrap();
        let graph = &factory.graph;
        assert_eq!(graph.products().len(), 1);
        assert_eq!(graph.entities().len(), 2);
        assert_eq!(graph.links().len(), 1);

        let cube = &graph.products()[0];
        assert_eq!(cube.name, "Simple Cube");
        assert_eq!(cube.price, Fixed64::from_num(10));

        let stock = graph.entity(EntityId(0)).unwrap();
        assert_eq!(stock.name, "Stock");
        assert_eq!(stock.position, Position::new(5.0, 0.0));
        assert_eq!(stock.input_links, vec![LinkId(0)]);
        assert_eq!(graph.sink(EntityId(0)).unwrap().capacity, 100);

        let machine = graph.source(EntityId(1)).unwrap();
        assert_eq!(machine.duration, 5);
        assert_eq!(machine.product, Some(ProductId(0)));

        let link = graph.link(LinkId(0)).unwrap();
        assert_eq!(link.endpoints(), Some((EntityId(1), EntityId(0))));
        assert_eq!(link.waypoints, vec![Position::new(0.0, 2.0)]);
    }

    #[test]
    fn events_put_construction_before_finalize() {
        let factory = build(DEFAULT_SCRIPT).unwrap();
        let kinds: Vec<EventKind> = factory.events.iter().map(Event::kind).collect();
        assert_eq!(kinds[0], EventKind::NodeCreated);
        let first_setup = kinds
            .iter()
            .position(|k| *k == EventKind::SinkConfigured)
            .unwrap();
        assert!(kinds[..first_setup].iter().all(|k| matches!(
            k,
            EventKind::NodeCreated | EventKind::NodeMoved | EventKind::NodeAssetAdded
        )));
        assert_eq!(kinds.last(), Some(&EventKind::LinkPathCreated));
    }

    #[test]
    fn entity_assets_convert_degrees_and_default_scale() {
        let factory = build("var v = createVisual();\nv.addAsset('tree', 1, 2, 180);").unwrap();
        let asset = &factory.graph.entity(EntityId(0)).unwrap().assets[0];
        assert_eq!(asset.name, "tree");
        assert_eq!(asset.offset, Position::new(1.0, 2.0));
        assert!((asset.rotation - std::f64::consts::PI).abs() < 1e-12);
        assert_eq!(asset.scale, 1.0);
    }

    #[test]
    fn tick_counts_round_up() {
        let factory = build(
            "var s = createSource(); s.setDuration(2.1); s.setBreakDuration(0.5)\n\
             var k = createSink(); k.setCapacity(0)",
        )
        .unwrap();
        let source = factory.graph.source(EntityId(0)).unwrap();
        assert_eq!(source.duration, 3);
        assert_eq!(source.break_duration, 1);
        assert!(factory.graph.sink(EntityId(1)).unwrap().is_unlimited());
    }

    #[test]
    fn frequency_spellings_are_aliases() {
        let factory = build(
            "var s = createSource(); s.setFailFrequency(0.25); s.setBreakFrequence(0.5)",
        )
        .unwrap();
        let source = factory.graph.source(EntityId(0)).unwrap();
        assert_eq!(source.fail_freq, Fixed64::from_num(0.25));
        assert_eq!(source.break_freq, Fixed64::from_num(0.5));
    }

    #[test]
    fn invalid_arguments_are_runtime_errors() {
        for src in [
            "createSource().setDuration(-1)",
            "createSource().setDuration(1e300)",
            "createSource().setBreakDuration(9007199254740993)",
            "createSink().setCapacity(1e300)",
            "createLink().setVolume(1e300)",
            "createSource().setFailFrequence(1.5)",
            "createLink().setVolume(0)",
            "createSink().setCapacity('lots')",
            "createProduct().setPrice(1e20)",
            "createLink().setFrom(createProduct())",
        ] {
            let err = build(src).unwrap_err();
            assert!(matches!(err, CompileError::Runtime { .. }), "{src}: {err}");
        }
    }

    #[test]
    fn largest_exact_count_is_accepted() {
        let factory = build("var s = createSink(); s.setCapacity(9007199254740991)").unwrap();
        let sink = factory.graph.sink(EntityId(0)).unwrap();
        assert_eq!(sink.capacity, 9_007_199_254_740_991);
    }

    #[test]
    fn methods_are_checked_against_the_entity_kind() {
        let err = build("var k = createSink();\nk.setDuration(3)").unwrap_err();
        assert_eq!(
            err,
            CompileError::Runtime {
                span: Span::new(2, 3),
                message: "sink has no method 'setDuration'".into(),
            }
        );
    }

    #[test]
    fn retargeting_moves_back_references() {
        let factory = build(
            "var a = createSink(); var b = createSink(); var s = createSource();\n\
             var l = createLink(); l.setFrom(a); l.setFrom(b); l.setTo(s)",
        )
        .unwrap();
        let graph = &factory.graph;
        assert!(graph.entity(EntityId(0)).unwrap().output_links.is_empty());
        assert_eq!(graph.entity(EntityId(1)).unwrap().output_links, vec![LinkId(0)]);
    }

    #[test]
    fn log_lines_are_collected() {
        let factory = build("log('hello', 42)\nlog(createSink())").unwrap();
        assert_eq!(factory.log, vec!["hello 42", "[entity 0]"]);
    }

    #[test]
    fn dangling_links_emit_no_path() {
        let factory = build("var l = createLink(); l.setTo(createSink())").unwrap();
        assert!(
            !factory
                .events
                .iter()
                .any(|e| e.kind() == EventKind::LinkPathCreated)
        );
    }
}
