use std::any::Any;

use gsp_core::object::{self, ObjectHandle};
use gsp_core::schema::{OperationSchema, ParamSpec, TypeSchema};
use gsp_core::{Args, ManagedObject, ProtocolError, SchemaRegistry, Session};
use gsp_protocol::Oid;

/// A drawing surface with a physical size, dots-per-inch, and device
/// pixel ratio.
#[derive(Debug)]
pub struct Canvas {
    oid: Oid,
    width: f64,
    height: f64,
    dpi: f64,
    dpr: f64,
}

impl Canvas {
    pub const TYPE: &'static str = "Canvas";

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn dpi(&self) -> f64 {
        self.dpi
    }

    pub fn dpr(&self) -> f64 {
        self.dpr
    }

    /// Client-side constructor: builds, registers, and records.
    pub fn create(
        session: &mut Session,
        schemas: &SchemaRegistry,
        width: f64,
        height: f64,
        dpi: f64,
        dpr: f64,
    ) -> Result<ObjectHandle, ProtocolError> {
        session.create(
            schemas,
            Self::TYPE,
            Args::new()
                .with("width", width)
                .with("height", height)
                .with("dpi", dpi)
                .with("dpr", dpr),
        )
    }

    pub fn set_size(
        session: &mut Session,
        schemas: &SchemaRegistry,
        canvas: &ObjectHandle,
        width: f64,
        height: f64,
    ) -> Result<(), ProtocolError> {
        session.call(
            schemas,
            canvas,
            "set_size",
            Args::new().with("width", width).with("height", height),
        )
    }

    pub fn set_dpi(
        session: &mut Session,
        schemas: &SchemaRegistry,
        canvas: &ObjectHandle,
        dpi: f64,
    ) -> Result<(), ProtocolError> {
        session.call(schemas, canvas, "set_dpi", Args::new().with("dpi", dpi))
    }

    pub fn set_dpr(
        session: &mut Session,
        schemas: &SchemaRegistry,
        canvas: &ObjectHandle,
        dpr: f64,
    ) -> Result<(), ProtocolError> {
        session.call(schemas, canvas, "set_dpr", Args::new().with("dpr", dpr))
    }

    /// The schema this provider contributes to the dispatch registry.
    pub fn schema() -> TypeSchema {
        TypeSchema::new(
            Self::TYPE,
            vec![
                ParamSpec::number("width"),
                ParamSpec::number("height"),
                ParamSpec::number("dpi"),
                ParamSpec::number("dpr"),
            ],
            |args| {
                Ok(object::handle(Canvas {
                    oid: Oid::UNSET,
                    width: args.f64("width")?,
                    height: args.f64("height")?,
                    dpi: args.f64("dpi")?,
                    dpr: args.f64("dpr")?,
                }))
            },
        )
        .with_operation(OperationSchema::new(
            "set_size",
            vec![ParamSpec::number("width"), ParamSpec::number("height")],
            |receiver, args| {
                let canvas = object::downcast_mut::<Canvas>(receiver, Canvas::TYPE)?;
                canvas.width = args.f64("width")?;
                canvas.height = args.f64("height")?;
                Ok(())
            },
        ))
        .with_operation(OperationSchema::new(
            "set_dpi",
            vec![ParamSpec::number("dpi")],
            |receiver, args| {
                let canvas = object::downcast_mut::<Canvas>(receiver, Canvas::TYPE)?;
                canvas.dpi = args.f64("dpi")?;
                Ok(())
            },
        ))
        .with_operation(OperationSchema::new(
            "set_dpr",
            vec![ParamSpec::number("dpr")],
            |receiver, args| {
                let canvas = object::downcast_mut::<Canvas>(receiver, Canvas::TYPE)?;
                canvas.dpr = args.f64("dpr")?;
                Ok(())
            },
        ))
    }
}

impl ManagedObject for Canvas {
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
        other.as_any().downcast_ref::<Canvas>().is_some_and(|other| {
            other.width == self.width
                && other.height == self.height
                && other.dpi == self.dpi
                && other.dpr == self.dpr
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
