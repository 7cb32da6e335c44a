use std::any::Any;

use gsp_core::object::{self, ObjectHandle};
use gsp_core::schema::{OperationSchema, ParamSpec, TypeSchema};
use gsp_core::{Args, ManagedObject, ProtocolError, SchemaRegistry, Session};
use gsp_protocol::Oid;

use crate::canvas::Canvas;

/// A rectangular region of a [`Canvas`].
///
/// Holds its canvas by identity; the canvas argument travels as an
/// object reference on the wire and is resolved through the registry
/// on replay.
#[derive(Debug)]
pub struct Viewport {
    oid: Oid,
    canvas: Oid,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl Viewport {
    pub const TYPE: &'static str = "Viewport";

    pub fn canvas(&self) -> Oid {
        self.canvas
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn create(
        session: &mut Session,
        schemas: &SchemaRegistry,
        canvas: &ObjectHandle,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<ObjectHandle, ProtocolError> {
        session.create(
            schemas,
            Self::TYPE,
            Args::new()
                .with_object("canvas", canvas)
                .with("x", x)
                .with("y", y)
                .with("width", width)
                .with("height", height),
        )
    }

    pub fn set_position(
        session: &mut Session,
        schemas: &SchemaRegistry,
        viewport: &ObjectHandle,
        x: f64,
        y: f64,
    ) -> Result<(), ProtocolError> {
        session.call(
            schemas,
            viewport,
            "set_position",
            Args::new().with("x", x).with("y", y),
        )
    }

    pub fn set_size(
        session: &mut Session,
        schemas: &SchemaRegistry,
        viewport: &ObjectHandle,
        width: f64,
        height: f64,
    ) -> Result<(), ProtocolError> {
        session.call(
            schemas,
            viewport,
            "set_size",
            Args::new().with("width", width).with("height", height),
        )
    }

    pub fn schema() -> TypeSchema {
        TypeSchema::new(
            Self::TYPE,
            vec![
                ParamSpec::reference("canvas", Canvas::TYPE),
                ParamSpec::number("x"),
                ParamSpec::number("y"),
                ParamSpec::number("width"),
                ParamSpec::number("height"),
            ],
            |args| {
                Ok(object::handle(Viewport {
                    oid: Oid::UNSET,
                    canvas: args.oid("canvas")?,
                    x: args.f64("x")?,
                    y: args.f64("y")?,
                    width: args.f64("width")?,
                    height: args.f64("height")?,
                }))
            },
        )
        .with_operation(OperationSchema::new(
            "set_position",
            vec![ParamSpec::number("x"), ParamSpec::number("y")],
            |receiver, args| {
                let viewport = object::downcast_mut::<Viewport>(receiver, Viewport::TYPE)?;
                viewport.x = args.f64("x")?;
                viewport.y = args.f64("y")?;
                Ok(())
            },
        ))
        .with_operation(OperationSchema::new(
            "set_size",
            vec![ParamSpec::number("width"), ParamSpec::number("height")],
            |receiver, args| {
                let viewport = object::downcast_mut::<Viewport>(receiver, Viewport::TYPE)?;
                viewport.width = args.f64("width")?;
                viewport.height = args.f64("height")?;
                Ok(())
            },
        ))
    }
}

impl ManagedObject for Viewport {
    fn oid(&self) -> Oid {
        self.oid
    }

    fn set_oid(&mut self, oid: Oid) {
        self.oid = oid;
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE
    }

    fn state_eq(&self, other: &dyn ManagedObject) -> bool {
        other
            .as_any()
            .downcast_ref::<Viewport>()
            .is_some_and(|other| {
                other.canvas == self.canvas
                    && other.x == self.x
                    && other.y == self.y
                    && other.width == self.width
                    && other.height == self.height
            })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
