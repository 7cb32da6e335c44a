//! Full client/server round trip over the scene types: a client
//! session records constructions and mutations, the log crosses the
//! "wire" as JSON, and a fresh server session replays it into a
//! structurally equivalent object graph under the same identities.

use gsp_core::object;
use gsp_core::{ManagedObject as _, ProtocolError, Replayer, SchemaRegistry, Session};
use gsp_protocol::{CommandLog, Oid, wire};
use gsp_scene::{Buffer, Canvas, Transform, Viewport, schema_registry};

/// Record a small scene: a canvas, a viewport on it, a buffer with a
/// payload, and a transform, with a few mutations.
fn record_scene(session: &mut Session, schemas: &SchemaRegistry) {
    let canvas = Canvas::create(session, schemas, 512.0, 512.0, 100.0, 1.0).unwrap();
    let viewport = Viewport::create(session, schemas, &canvas, 0.0, 0.0, 512.0, 512.0).unwrap();
    let buffer = Buffer::create(session, schemas, &[3, 3], "u8").unwrap();
    let transform = Transform::create(session, schemas, &[0; 8]).unwrap();

    Canvas::set_size(session, schemas, &canvas, 256.0, 256.0).unwrap();
    Viewport::set_position(session, schemas, &viewport, 16.0, 16.0).unwrap();
    Buffer::set_data(session, schemas, &buffer, 0, &[1, 2, 3, 4, 5]).unwrap();
    Transform::set_data(session, schemas, &transform, &[9; 8]).unwrap();
}

fn replay_into_server(schemas: &SchemaRegistry, log: &CommandLog) -> Session {
    let mut server = Session::server();
    Replayer::new(schemas).replay(&mut server, log).unwrap();
    server
}

#[test]
fn replay_equivalence_over_the_json_wire() {
    let schemas = schema_registry();
    let mut client = Session::client();
    record_scene(&mut client, &schemas);
    assert_eq!(client.log().len(), 8);

    // Cross the wire: serialize, parse back, replay.
    let json = wire::to_json(client.log()).unwrap();
    let delivered = wire::from_json(&json).unwrap();
    assert_eq!(&delivered, client.log());

    let server = replay_into_server(&schemas, &delivered);
    assert_eq!(server.registry().len(), 4);
    assert!(client.registry().matches(server.registry()));
    assert!(client.registry().matches_ignoring_ids(server.registry()));
}

#[test]
fn replayed_objects_keep_client_identities_and_final_state() {
    let schemas = schema_registry();
    let mut client = Session::client();
    record_scene(&mut client, &schemas);

    let server = replay_into_server(&schemas, client.log());
    assert_eq!(
        server.registry().oids().collect::<Vec<_>>(),
        vec![Oid::new(1), Oid::new(2), Oid::new(3), Oid::new(4)]
    );

    let canvas = server.registry().lookup(Oid::new(1)).unwrap();
    let guard = object::lock(&canvas);
    let canvas = guard.as_any().downcast_ref::<Canvas>().unwrap();
    assert_eq!(canvas.width(), 256.0);
    assert_eq!(canvas.height(), 256.0);

    let viewport = server.registry().lookup(Oid::new(2)).unwrap();
    let guard = object::lock(&viewport);
    let viewport = guard.as_any().downcast_ref::<Viewport>().unwrap();
    assert_eq!(viewport.canvas(), Oid::new(1));
    assert_eq!(viewport.x(), 16.0);

    let buffer = server.registry().lookup(Oid::new(3)).unwrap();
    let guard = object::lock(&buffer);
    let buffer = guard.as_any().downcast_ref::<Buffer>().unwrap();
    assert_eq!(buffer.data(), &[1, 2, 3, 4, 5]);

    let transform = server.registry().lookup(Oid::new(4)).unwrap();
    let guard = object::lock(&transform);
    let transform = guard.as_any().downcast_ref::<Transform>().unwrap();
    assert_eq!(transform.data(), &[9; 8]);
}

#[test]
fn the_canonical_resize_scenario() {
    let schemas = schema_registry();
    let mut client = Session::client();

    let canvas = Canvas::create(&mut client, &schemas, 512.0, 512.0, 100.0, 1.0).unwrap();
    Canvas::set_size(&mut client, &schemas, &canvas, 256.0, 256.0).unwrap();

    let construct = client.log().get(0).unwrap();
    assert_eq!(construct.method.to_string(), "Canvas");
    assert_eq!(construct.target_oid(), Some(Oid::new(1)));
    let resize = client.log().get(1).unwrap();
    assert_eq!(resize.method.to_string(), "Canvas/set_size");
    assert_eq!(resize.target_oid(), Some(Oid::new(1)));
    assert!(construct.cid < resize.cid);

    let server = replay_into_server(&schemas, client.log());
    assert_eq!(server.registry().len(), 1);
    let replayed = server.registry().lookup(Oid::new(1)).unwrap();
    let guard = object::lock(&replayed);
    let replayed = guard.as_any().downcast_ref::<Canvas>().unwrap();
    assert_eq!((replayed.width(), replayed.height()), (256.0, 256.0));
    drop(guard);
    assert!(client.registry().matches(server.registry()));
}

#[test]
fn dangling_reference_fails_the_replay() {
    let schemas = schema_registry();
    let mut client = Session::client();
    record_scene(&mut client, &schemas);

    // Drop the canvas construction; the viewport's reference dangles.
    let truncated: CommandLog = client.log().iter().skip(1).cloned().collect();

    let mut server = Session::server();
    let err = Replayer::new(&schemas)
        .replay(&mut server, &truncated)
        .unwrap_err();
    assert!(matches!(err, ProtocolError::UnresolvedReference(oid) if oid == Oid::new(1)));
}

#[test]
fn linter_matches_the_replayer_verdict() {
    let schemas = schema_registry();
    let mut client = Session::client();
    record_scene(&mut client, &schemas);

    // Everything the recorder produced passes the linter.
    assert!(gsp_core::lint::lint_log(&schemas, client.log()).is_empty());

    // A log missing its first construction does not.
    let truncated: CommandLog = client.log().iter().skip(1).cloned().collect();
    let issues = gsp_core::lint::lint_log(&schemas, &truncated);
    assert!(!issues.is_empty());
    assert!(gsp_core::lint::check_log(&schemas, &truncated).is_err());
}

#[test]
fn unknown_type_and_operation_fail_the_replay() {
    let schemas = schema_registry();
    let mut client = Session::client();
    let canvas = Canvas::create(&mut client, &schemas, 1.0, 1.0, 1.0, 1.0).unwrap();
    Canvas::set_dpi(&mut client, &schemas, &canvas, 96.0).unwrap();

    // Replay against a registry that only knows Buffer.
    let mut poor = SchemaRegistry::new();
    poor.register(Buffer::schema()).unwrap();
    let mut server = Session::server();
    let err = Replayer::new(&poor)
        .replay(&mut server, client.log())
        .unwrap_err();
    assert!(matches!(err, ProtocolError::UnknownType(name) if name == "Canvas"));

    // Replay a mutation whose operation the schema does not declare.
    let mut renamed = client.take_log();
    let mut envelopes: Vec<_> = renamed.iter().cloned().collect();
    envelopes[1].method.operation = Some("set_zoom".to_string());
    renamed = CommandLog::from(envelopes);

    let mut server = Session::server();
    let err = Replayer::new(&schemas)
        .replay(&mut server, &renamed)
        .unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::UnknownOperation { operation, .. } if operation == "set_zoom"
    ));
}

#[test]
fn replaying_twice_collides_on_identifiers() {
    let schemas = schema_registry();
    let mut client = Session::client();
    record_scene(&mut client, &schemas);

    let mut server = Session::server();
    let mut replayer = Replayer::new(&schemas);
    replayer.replay(&mut server, client.log()).unwrap();
    let err = replayer.replay(&mut server, client.log()).unwrap_err();
    assert!(matches!(err, ProtocolError::DuplicateIdentifier(_)));
}

#[test]
fn server_reset_then_empty_replay_yields_an_empty_registry() {
    let schemas = schema_registry();
    let mut client = Session::client();
    record_scene(&mut client, &schemas);

    let mut server = replay_into_server(&schemas, client.log());
    assert!(!server.registry().is_empty());

    server.reset();
    Replayer::new(&schemas)
        .replay(&mut server, &CommandLog::new())
        .unwrap();
    assert!(server.registry().is_empty());
}
