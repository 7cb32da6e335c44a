//! End-to-end engine tests with a minimal self-contained schema:
//! record a construction and a mutation on a client session, replay
//! the log into a fresh server session, and verify the protocol
//! guarantees without any concrete scene types involved.

use std::any::Any;

use gsp_core::object::{self, ObjectHandle};
use gsp_core::schema::{OperationSchema, ParamSpec, TypeSchema};
use gsp_core::{
    Args, CallOptions, ManagedObject, Mode, ModeOptions, ProtocolError, Replayer, SchemaRegistry,
    Session,
};
use gsp_protocol::{Oid, Value};

#[derive(Debug)]
struct Widget {
    oid: Oid,
    width: f64,
    height: f64,
}

impl ManagedObject for Widget {
    fn oid(&self) -> Oid {
        self.oid
    }
    fn set_oid(&mut self, oid: Oid) {
        self.oid = oid;
    }
    fn type_name(&self) -> &'static str {
        "Widget"
    }
    fn state_eq(&self, other: &dyn ManagedObject) -> bool {
        other
            .as_any()
            .downcast_ref::<Widget>()
            .is_some_and(|other| other.width == self.width && other.height == self.height)
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn schemas() -> SchemaRegistry {
    let mut schemas = SchemaRegistry::new();
    let schema = TypeSchema::new(
        "Widget",
        vec![ParamSpec::number("width"), ParamSpec::number("height")],
        |args| {
            Ok(object::handle(Widget {
                oid: Oid::UNSET,
                width: args.f64("width")?,
                height: args.f64("height")?,
            }))
        },
    )
    .with_operation(OperationSchema::new(
        "resize",
        vec![ParamSpec::number("width"), ParamSpec::number("height")],
        |receiver, args| {
            let widget = object::downcast_mut::<Widget>(receiver, "Widget")?;
            widget.width = args.f64("width")?;
            widget.height = args.f64("height")?;
            Ok(())
        },
    ));
    schemas.register(schema).unwrap();
    schemas
}

fn construct_and_resize(session: &mut Session, schemas: &SchemaRegistry) -> ObjectHandle {
    let widget = session
        .create(
            schemas,
            "Widget",
            Args::new().with("width", 512.0).with("height", 512.0),
        )
        .unwrap();
    session
        .call(
            schemas,
            &widget,
            "resize",
            Args::new().with("width", 256.0).with("height", 256.0),
        )
        .unwrap();
    widget
}

#[test]
fn replay_reconstructs_an_equivalent_graph() {
    let schemas = schemas();
    let mut client = Session::client();
    let widget = construct_and_resize(&mut client, &schemas);

    assert_eq!(object::lock(&widget).oid(), Oid::new(1));
    assert_eq!(client.log().len(), 2);

    let mut server = Session::server();
    let applied = Replayer::new(&schemas)
        .replay(&mut server, client.log())
        .unwrap();
    assert_eq!(applied, 2);
    assert_eq!(server.registry().len(), 1);
    assert!(client.registry().matches(server.registry()));

    let replayed = server.registry().lookup(Oid::new(1)).unwrap();
    let replayed = object::lock(&replayed);
    let replayed = replayed.as_any().downcast_ref::<Widget>().unwrap();
    assert_eq!(replayed.width, 256.0);
    assert_eq!(replayed.height, 256.0);
}

#[test]
fn replayed_ids_ignore_the_server_allocator() {
    let schemas = schemas();
    let mut client = Session::client();
    construct_and_resize(&mut client, &schemas);

    // Burn some server-side ids before the replay; the replayed object
    // must still adopt the id recorded by the client.
    let mut server = Session::server();
    let noise = server
        .create(&schemas, "Widget", Args::new().with("width", 1).with("height", 1))
        .unwrap();
    assert_eq!(object::lock(&noise).oid(), Oid::new(1));
    // Server mode does not track recorder-side constructions.
    assert!(server.registry().is_empty());

    Replayer::new(&schemas)
        .replay(&mut server, client.log())
        .unwrap();
    assert_eq!(
        server.registry().oids().collect::<Vec<_>>(),
        vec![Oid::new(1)]
    );
}

#[test]
fn envelope_shape_matches_the_wire_contract() {
    let schemas = schemas();
    let mut client = Session::client();
    construct_and_resize(&mut client, &schemas);

    let construct = client.log().get(0).unwrap();
    assert_eq!(construct.method.type_name, "Widget");
    assert!(construct.method.is_construction());
    assert_eq!(construct.target_oid(), Some(Oid::new(1)));
    let keys: Vec<&str> = construct.parameters.iter().map(|(name, _)| name).collect();
    assert_eq!(keys, ["id", "width", "height"]);

    let resize = client.log().get(1).unwrap();
    assert_eq!(resize.method.operation.as_deref(), Some("resize"));
    assert_eq!(resize.target_oid(), Some(Oid::new(1)));
    assert_eq!(resize.parameters.get("width"), Some(&Value::Float(256.0)));
    assert!(resize.cid > construct.cid);
}

#[test]
fn mutation_before_construction_fails() {
    let schemas = schemas();
    let mut client = Session::client();
    construct_and_resize(&mut client, &schemas);

    let reversed: Vec<_> = client.log().iter().rev().cloned().collect();
    let reversed = gsp_protocol::CommandLog::from(reversed);

    let mut server = Session::server();
    let err = Replayer::new(&schemas)
        .replay(&mut server, &reversed)
        .unwrap_err();
    assert!(matches!(err, ProtocolError::UnknownObject(oid) if oid == Oid::new(1)));
}

#[test]
fn strict_order_rejects_reordered_ids() {
    let schemas = schemas();
    let mut client = Session::client();
    construct_and_resize(&mut client, &schemas);
    construct_and_resize(&mut client, &schemas);

    // Swap the two middle envelopes: constructions still precede their
    // mutations, but the cid sequence dips.
    let mut envelopes: Vec<_> = client.log().iter().cloned().collect();
    envelopes.swap(1, 2);
    let shuffled = gsp_protocol::CommandLog::from(envelopes);

    let mut lenient = Session::server();
    Replayer::new(&schemas)
        .replay(&mut lenient, &shuffled)
        .unwrap();

    let mut strict = Session::server();
    let err = Replayer::new(&schemas)
        .strict_order(true)
        .replay(&mut strict, &shuffled)
        .unwrap_err();
    assert!(matches!(err, ProtocolError::OutOfOrderCommand { .. }));
}

#[test]
fn tolerant_replay_skips_failures() {
    let schemas = schemas();
    let mut client = Session::client();
    construct_and_resize(&mut client, &schemas);

    let reversed: Vec<_> = client.log().iter().rev().cloned().collect();
    let reversed = gsp_protocol::CommandLog::from(reversed);

    let mut server = Session::server();
    let applied = Replayer::new(&schemas)
        .halt_on_error(false)
        .replay(&mut server, &reversed)
        .unwrap();
    // The mutation is skipped, the construction still lands.
    assert_eq!(applied, 1);
    assert_eq!(server.registry().len(), 1);
}

#[test]
fn failed_validation_mutates_nothing_and_records_nothing() {
    let schemas = schemas();
    let mut client = Session::client();
    let widget = construct_and_resize(&mut client, &schemas);
    let recorded = client.log().len();

    let err = client
        .call(
            &schemas,
            &widget,
            "resize",
            Args::new().with("width", "wide").with("height", 128.0),
        )
        .unwrap_err();
    assert!(matches!(err, ProtocolError::TypeMismatch { .. }));
    assert_eq!(client.log().len(), recorded);

    let widget = object::lock(&widget);
    let widget = widget.as_any().downcast_ref::<Widget>().unwrap();
    assert_eq!(widget.width, 256.0);
}

#[test]
fn per_call_overrides_beat_session_settings() {
    let schemas = schemas();
    let mut client = Session::client();

    // check=off lets an undeclared-type argument reach the handler,
    // which still rejects it on access; record=off drops the envelope.
    let widget = client
        .create_with(
            &schemas,
            "Widget",
            Args::new().with("width", 10.0).with("height", 10.0),
            CallOptions {
                record: Some(false),
                ..CallOptions::default()
            },
        )
        .unwrap();
    assert!(client.log().is_empty());

    let err = client
        .call_with(
            &schemas,
            &widget,
            "resize",
            Args::new().with("width", "wide").with("height", 1.0),
            CallOptions {
                check: Some(false),
                ..CallOptions::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, ProtocolError::TypeMismatch { .. }));
    assert!(client.log().is_empty());
}

#[test]
fn unrecorded_client_objects_still_get_ids() {
    let schemas = schemas();
    let mut client = Session::client();
    client.set_mode(
        Mode::Client,
        ModeOptions {
            record: Some(false),
            output: Some(false),
            ..ModeOptions::default()
        },
    );

    let first = client
        .create(&schemas, "Widget", Args::new().with("width", 1).with("height", 1))
        .unwrap();
    assert_eq!(object::lock(&first).oid(), Oid::new(1));
    assert_eq!(client.registry().len(), 1);
    assert!(client.log().is_empty());
}

#[test]
fn reset_empties_the_registry_idempotently() {
    let schemas = schemas();
    let mut client = Session::client();
    construct_and_resize(&mut client, &schemas);
    assert!(!client.registry().is_empty());

    client.set_mode(Mode::Server, ModeOptions::default());
    assert!(client.registry().is_empty());

    let empty = gsp_protocol::CommandLog::new();
    let mut replayer = Replayer::new(&schemas);
    replayer.replay(&mut client, &empty).unwrap();
    assert!(client.registry().is_empty());

    client.set_mode(Mode::Server, ModeOptions::default());
    assert!(client.registry().is_empty());
}

#[test]
fn output_sink_receives_serialized_envelopes() {
    let schemas = schemas();
    let mut client = Session::client();
    let (tx, rx) = std::sync::mpsc::channel::<String>();
    client.set_output_sink(Box::new(move |text| {
        let _ = tx.send(text.to_string());
    }));

    construct_and_resize(&mut client, &schemas);
    let emitted: Vec<String> = rx.try_iter().collect();
    assert_eq!(emitted.len(), 2);
    assert!(emitted[0].contains("\"method\":\"Widget\""));
    assert!(emitted[1].contains("\"method\":\"Widget/resize\""));
}
