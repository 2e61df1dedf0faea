//! End-to-end behaviour of the engine through its public API.

use serde::{Deserialize, Serialize};
use serde_json::json;
use venus_component::{
    Component, ComponentError, ComponentTypeId, EntityId, Payload, Requirements, decode_payload,
    encode_payload,
};
use venus_engine::{
    Batch, Context, Engine, EngineConfig, EngineError, EntityRecord, Snapshot, Subsystem,
    SubsystemBuilder,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Velocity {
    dx: f32,
    dy: f32,
}

/// Runtime-only marker without a payload form.
#[derive(Debug)]
struct Selected;

macro_rules! serde_component {
    ($ty:ty, $name:literal) => {
        impl Component for $ty {
            fn type_name() -> &'static str {
                $name
            }

            fn to_payload(&self) -> Result<Payload, ComponentError> {
                encode_payload(self)
            }

            fn from_payload(payload: &Payload) -> Result<Self, ComponentError> {
                decode_payload(payload)
            }
        }
    };
}

serde_component!(Position, "Position");
serde_component!(Velocity, "Velocity");

impl Component for Selected {
    fn type_name() -> &'static str {
        "Selected"
    }
}

fn kind<T: Component>() -> ComponentTypeId {
    T::component_type_id()
}

fn engine_with_prototypes() -> Engine {
    let mut engine = Engine::new();
    engine.register_prototype::<Position>().unwrap();
    engine.register_prototype::<Velocity>().unwrap();
    engine
}

/// Two moving entities in layer 0, one static entity in layer 2.
fn populated() -> (Engine, [EntityId; 3]) {
    let mut engine = engine_with_prototypes();
    let a = engine
        .make_entity(0)
        .add_component(Position { x: 0.0, y: 0.0 })
        .add_component(Velocity { dx: 1.0, dy: 2.0 })
        .id();
    let b = engine
        .make_entity(0)
        .add_component(Position { x: 5.0, y: 5.0 })
        .add_component(Velocity { dx: -1.0, dy: 0.0 })
        .id();
    let c = engine
        .make_entity(2)
        .add_component(Position { x: 9.0, y: 9.0 })
        .id();
    (engine, [a, b, c])
}

#[derive(Debug, Default)]
struct Movement;

impl Subsystem for Movement {
    fn step(&mut self, ctx: &mut Context<'_>, batch: &Batch<'_>) {
        for &id in batch.entities {
            let Some(velocity) = ctx.component::<Velocity>(id).copied() else {
                continue;
            };
            if let Some(position) = ctx.component_mut::<Position>(id) {
                position.x += velocity.dx * batch.dt as f32;
                position.y += velocity.dy * batch.dt as f32;
            }
        }
    }
}

#[test]
fn index_follows_every_add_and_remove() {
    let mut engine = Engine::new();
    let id = engine.make_entity(0).id();

    engine.entity_mut(id, None).unwrap().add_component(Position { x: 0.0, y: 0.0 });
    assert!(engine.get_entity(id, None).unwrap().has_component("Position"));
    assert!(engine.world().index().contains(kind::<Position>(), id));

    engine.entity_mut(id, None).unwrap().remove_component("Position");
    assert!(!engine.get_entity(id, None).unwrap().has_component("Position"));
    assert!(!engine.world().index().contains(kind::<Position>(), id));

    // Removing again is tolerated and changes nothing.
    assert!(engine.entity_mut(id, None).unwrap().remove_component("Position").is_none());
    assert!(engine.world().index().is_known(kind::<Position>()));
}

#[test]
fn filter_intersects_and_never_seen_kind_is_empty() {
    let (mut engine, [a, b, _]) = populated();
    let only_position = engine
        .make_entity(0)
        .add_component(Position { x: 1.0, y: 1.0 })
        .id();

    assert_eq!(
        engine.filter_entities(&[kind::<Position>(), kind::<Velocity>()], 0),
        vec![a, b]
    );
    assert_eq!(
        engine.filter_entities(&[kind::<Position>()], 0),
        vec![a, b, only_position]
    );
    assert!(
        engine
            .filter_entities(&[kind::<Position>(), ComponentTypeId::from_name("Z")], 0)
            .is_empty()
    );
}

#[test]
fn destroy_drops_entity_from_filters() {
    let (mut engine, [a, b, _]) = populated();
    assert!(engine.destroy_entity(a));
    assert_eq!(engine.filter_entities(&[kind::<Position>()], 0), vec![b]);
    assert!(engine.get_entity(a, None).is_none());
    assert!(!engine.world().index().contains(kind::<Velocity>(), a));
}

#[test]
fn movement_updates_only_matching_entities() {
    let (mut engine, [a, b, c]) = populated();
    engine
        .make_subsystem(
            SubsystemBuilder::new("movement", Movement)
                .requirements(Requirements::all([kind::<Position>(), kind::<Velocity>()])),
        )
        .unwrap();

    let report = engine.step(0.5);
    // One call per layer, layers 0..=2.
    assert_eq!(report.invocations, 3);

    let position = |id| *engine.get_entity(id, None).unwrap().get::<Position>().unwrap();
    assert_eq!(position(a), Position { x: 0.5, y: 1.0 });
    assert_eq!(position(b), Position { x: 4.5, y: 5.0 });
    assert_eq!(position(c), Position { x: 9.0, y: 9.0 });
}

#[derive(Debug, Default)]
struct GroupLog {
    calls: Vec<(usize, usize, Vec<EntityId>)>,
}

impl Subsystem for GroupLog {
    fn step(&mut self, _ctx: &mut Context<'_>, batch: &Batch<'_>) {
        self.calls
            .push((batch.layer, batch.group, batch.entities.to_vec()));
    }
}

#[test]
fn each_group_gets_its_own_step() {
    let mut engine = Engine::new();
    let both = engine
        .make_entity(0)
        .add_component(Position { x: 0.0, y: 0.0 })
        .add_component(Velocity { dx: 0.0, dy: 0.0 })
        .id();
    let handle = engine
        .make_subsystem(
            SubsystemBuilder::new("log", GroupLog::default())
                .requirements(Requirements::named_groups([vec!["Position"], vec!["Velocity"]])),
        )
        .unwrap();

    engine.step(1.0);
    assert_eq!(
        engine.subsystem(&handle).unwrap().state().calls,
        vec![(0, 0, vec![both]), (0, 1, vec![both])]
    );
}

#[test]
fn each_group_gets_its_own_step_when_nothing_matches() {
    let mut engine = Engine::new();
    engine
        .make_entity(0)
        .add_component(Velocity { dx: 0.0, dy: 0.0 });
    let handle = engine
        .make_subsystem(
            SubsystemBuilder::new("log", GroupLog::default())
                .requirements(Requirements::named_groups([vec!["Position"], vec!["Ghost"]])),
        )
        .unwrap();

    engine.step(1.0);
    assert_eq!(
        engine.subsystem(&handle).unwrap().state().calls,
        vec![(0, 0, vec![]), (0, 1, vec![])]
    );
}

#[test]
fn single_matching_entity_gets_single_step() {
    let mut engine = Engine::new();
    let e1 = engine
        .make_entity(0)
        .add_component(Position { x: 0.0, y: 0.0 })
        .add_component(Velocity { dx: 0.0, dy: 0.0 })
        .id();
    let handle = engine
        .make_subsystem(
            SubsystemBuilder::new("s", GroupLog::default())
                .requirements(Requirements::named(["Position", "Velocity"])),
        )
        .unwrap();

    engine.step(1.0);
    assert_eq!(
        engine.subsystem(&handle).unwrap().state().calls,
        vec![(0, 0, vec![e1])]
    );
}

#[derive(Debug, Default)]
struct Collider {
    heard: Vec<Payload>,
}

impl Subsystem for Collider {
    fn step(&mut self, ctx: &mut Context<'_>, _batch: &Batch<'_>) {
        ctx.emit("collision", json!({ "force": 3 }));
    }
}

#[derive(Debug, Default)]
struct Listener {
    heard: Vec<(Payload, u64)>,
}

impl Subsystem for Listener {}

#[test]
fn emitted_message_reaches_every_binding_including_emitter() {
    let mut engine = Engine::new();
    engine.make_entity(0);
    let collider = engine
        .make_subsystem(
            SubsystemBuilder::new("collider", Collider::default())
                .on("collision", |state: &mut Collider, _ctx, data| {
                    state.heard.push(data.clone());
                }),
        )
        .unwrap();
    let listener = engine
        .make_subsystem(
            SubsystemBuilder::new("listener", Listener::default()).on(
                "collision",
                |state: &mut Listener, ctx, data| {
                    state.heard.push((data.clone(), ctx.tick_id()));
                },
            ),
        )
        .unwrap();

    let report = engine.step(0.1);
    assert_eq!(report.messages_delivered, 2);
    assert_eq!(
        engine.subsystem(&collider).unwrap().state().heard,
        vec![json!({ "force": 3 })]
    );
    assert_eq!(
        engine.subsystem(&listener).unwrap().state().heard,
        vec![(json!({ "force": 3 }), 1)]
    );
}

#[test]
fn rebinding_replaces_handler() {
    let mut engine = Engine::new();
    let handle = engine
        .make_subsystem(
            SubsystemBuilder::new("listener", Listener::default())
                .on("ping", |state: &mut Listener, _ctx, _data| {
                    state.heard.push((json!("first"), 0));
                }),
        )
        .unwrap();
    engine
        .subsystem_mut(&handle)
        .unwrap()
        .on("ping", |state: &mut Listener, _ctx, _data| {
            state.heard.push((json!("second"), 0));
        });

    assert_eq!(engine.subsystem_emit("ping", Payload::Null), 1);
    assert_eq!(
        engine.subsystem(&handle).unwrap().state().heard,
        vec![(json!("second"), 0)]
    );
}

#[derive(Debug, Default)]
struct Spawner {
    spawned: Option<EntityId>,
    visible_during_step: bool,
    batch_sizes: Vec<usize>,
}

impl Subsystem for Spawner {
    fn step(&mut self, ctx: &mut Context<'_>, batch: &Batch<'_>) {
        self.batch_sizes.push(batch.entities.len());
        if self.spawned.is_none() {
            let id = ctx.spawn(0);
            ctx.add_component(id, Position { x: 1.0, y: 1.0 });
            self.visible_during_step = ctx.entity(id).is_some();
            self.spawned = Some(id);
        }
    }
}

#[test]
fn structural_changes_apply_at_end_of_tick() {
    let mut engine = Engine::new();
    let existing = engine.make_entity(0).id();
    let handle = engine
        .make_subsystem(SubsystemBuilder::new("spawner", Spawner::default()))
        .unwrap();

    let report = engine.step(0.1);
    assert_eq!(report.commands_applied, 2);

    let state = engine.subsystem(&handle).unwrap().state();
    let spawned = state.spawned.unwrap();
    assert!(!state.visible_during_step);
    assert_ne!(spawned, existing);
    assert!(engine.entity_is_in_layer(spawned, 0));
    assert_eq!(engine.filter_entities(&[kind::<Position>()], 0), vec![spawned]);

    engine.step(0.1);
    assert_eq!(engine.subsystem(&handle).unwrap().state().batch_sizes, vec![1, 2]);
}

#[derive(Debug, Default)]
struct Echo {
    received: u32,
}

impl Subsystem for Echo {
    fn step(&mut self, ctx: &mut Context<'_>, _batch: &Batch<'_>) {
        ctx.emit("ping", json!(0));
    }
}

#[test]
fn message_cycles_stop_at_wave_bound() {
    let mut engine = Engine::with_config(EngineConfig::default().with_max_message_waves(4));
    engine.make_entity(0);
    let handle = engine
        .make_subsystem(
            SubsystemBuilder::new("echo", Echo::default()).on(
                "ping",
                |state: &mut Echo, ctx, data| {
                    state.received += 1;
                    ctx.emit("ping", data.clone());
                },
            ),
        )
        .unwrap();

    let report = engine.step(0.1);
    assert_eq!(report.messages_delivered, 4);
    assert_eq!(report.messages_dropped, 1);
    assert_eq!(engine.subsystem(&handle).unwrap().state().received, 4);
}

#[test]
fn snapshot_round_trips_through_json_and_msgpack() {
    let (engine, [a, _, c]) = populated();
    let snapshot = engine.serialize().unwrap();
    assert_eq!(snapshot.entities.len(), 3);
    assert!(snapshot.entities[1].is_empty());
    assert_eq!(snapshot.entities[2][&c].layer, 2);

    let from_json = Snapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
    let from_msgpack = Snapshot::from_msgpack(&snapshot.to_msgpack().unwrap()).unwrap();

    for decoded in [from_json, from_msgpack] {
        let mut restored = engine_with_prototypes();
        restored.deserialize(&decoded).unwrap();
        assert_eq!(restored.serialize().unwrap(), snapshot);
        assert_eq!(
            restored.filter_entities(&[kind::<Position>(), kind::<Velocity>()], 0),
            engine.filter_entities(&[kind::<Position>(), kind::<Velocity>()], 0)
        );
        assert_eq!(
            restored.get_entity(a, Some(0)).unwrap().get::<Velocity>(),
            Some(&Velocity { dx: 1.0, dy: 2.0 })
        );
        // New ids continue after the restored ones.
        assert_eq!(restored.make_entity(0).id(), EntityId(3));
    }
}

#[test]
fn serialize_fails_for_component_without_payload_form() {
    let (mut engine, [a, _, _]) = populated();
    engine.entity_mut(a, None).unwrap().add_component(Selected);
    match engine.serialize() {
        Err(EngineError::Component(err)) => assert_eq!(err.component(), "Selected"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn failed_restore_leaves_engine_untouched() {
    let (mut engine, [a, b, c]) = populated();
    let before = engine.serialize().unwrap();

    let mut snapshot = before.clone();
    snapshot.entities[0]
        .get_mut(&a)
        .unwrap()
        .components
        .insert("Ghost".to_string(), json!({}));

    match engine.deserialize(&snapshot) {
        Err(EngineError::UnknownComponentType(name)) => assert_eq!(name, "Ghost"),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(engine.serialize().unwrap(), before);
    assert!(!engine.catalogs().is_sealed());
    for id in [a, b, c] {
        assert!(engine.get_entity(id, None).is_some());
    }
}

#[test]
fn restore_rejects_repeated_ids() {
    let (mut engine, [a, _, _]) = populated();
    let mut snapshot = engine.serialize().unwrap();
    let mut copy = snapshot.entities[0][&a].clone();
    copy.layer = 1;
    snapshot.entities[1].insert(a, copy);

    assert!(matches!(
        engine.deserialize(&snapshot),
        Err(EngineError::DuplicateEntity(id)) if id == a
    ));
}

#[test]
fn restore_rejects_records_filed_under_another_id_or_layer() {
    let mut engine = engine_with_prototypes();
    let original = engine
        .make_entity(0)
        .add_component(Position { x: 1.0, y: 1.0 })
        .id();

    let wrong_id =
        Snapshot::from_json(r#"{"entities":[{"5":{"id":7,"layer":0,"components":{}}}]}"#).unwrap();
    assert!(matches!(
        engine.deserialize(&wrong_id),
        Err(EngineError::MisplacedRecord { key, id, .. })
            if key == EntityId::from_raw(5) && id == EntityId::from_raw(7)
    ));

    let wrong_layer =
        Snapshot::from_json(r#"{"entities":[{"5":{"id":5,"layer":3,"components":{}}}]}"#).unwrap();
    assert!(matches!(
        engine.deserialize(&wrong_layer),
        Err(EngineError::MisplacedRecord { slot: 0, layer: 3, .. })
    ));

    let huge_layer = Snapshot::from_json(&format!(
        r#"{{"entities":[{{"5":{{"id":5,"layer":{},"components":{{}}}}}}]}}"#,
        1u64 << 62
    ))
    .unwrap();
    assert!(matches!(
        engine.deserialize(&huge_layer),
        Err(EngineError::MisplacedRecord { slot: 0, .. })
    ));

    assert_eq!(engine.world().layer_count(), 1);
    assert_eq!(engine.world().entity_count(), 1);
    assert!(engine.get_entity(original, Some(0)).is_some());
}

#[test]
fn catalogs_seal_after_first_restore() {
    let (mut engine, _) = populated();
    engine.add_constant("GOOD", None).unwrap();
    let snapshot = engine.serialize().unwrap();
    engine.deserialize(&snapshot).unwrap();

    assert!(matches!(
        engine.add_constant("LATE", None),
        Err(EngineError::RegistrySealed(_))
    ));
    assert!(matches!(
        engine.register_prototype::<Selected>(),
        Err(EngineError::RegistrySealed(_))
    ));
    assert_eq!(engine.constant("GOOD"), Some("GOOD"));

    engine.reset_catalogs();
    engine.register_prototype::<Position>().unwrap();
    assert_eq!(engine.constant("GOOD"), None);
}

#[test]
fn single_record_restores_under_fresh_id() {
    let mut engine = engine_with_prototypes();
    engine.make_entity(0);
    let record = EntityRecord {
        id: EntityId(40),
        layer: 1,
        components: [("Position".to_string(), json!({ "x": 2.0, "y": 3.0 }))]
            .into_iter()
            .collect(),
    };

    let id = engine.deserialize_entity(&record).unwrap();
    assert_eq!(id, EntityId(1));
    assert!(engine.entity_is_in_layer(id, 1));
    assert_eq!(engine.filter_entities(&[kind::<Position>()], 1), vec![id]);
    assert_eq!(
        engine.get_entity(id, Some(1)).unwrap().get::<Position>(),
        Some(&Position { x: 2.0, y: 3.0 })
    );
}

#[test]
fn subsystems_read_catalogs() {
    let mut engine = Engine::new();
    engine.add_constant("SPEED", Some("fast")).unwrap();
    engine.add_global("gravity", 9.5_f64).unwrap();
    engine.make_entity(0);

    let handle = engine
        .make_subsystem(
            SubsystemBuilder::new("reader", Listener::default()).on(
                "read",
                |state: &mut Listener, ctx, _data| {
                    let speed = ctx.constant("SPEED").unwrap_or_default().to_string();
                    let gravity = ctx.global::<f64>("gravity").copied().unwrap_or_default();
                    state.heard.push((json!([speed, gravity]), ctx.tick_id()));
                },
            ),
        )
        .unwrap();

    engine.subsystem_emit("read", Payload::Null);
    assert_eq!(
        engine.subsystem(&handle).unwrap().state().heard,
        vec![(json!(["fast", 9.5]), 0)]
    );
}
