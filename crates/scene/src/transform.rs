use std::any::Any;

use gsp_core::object::{self, ObjectHandle};
use gsp_core::schema::{OperationSchema, ParamSpec, TypeSchema};
use gsp_core::{Args, ManagedObject, ProtocolError, SchemaRegistry, Session};
use gsp_protocol::Oid;

/// A fixed-size raw coefficient block (e.g. a packed matrix).
///
/// The payload's length is fixed at construction; `set_data` replaces
/// the coefficients in place and rejects a payload of any other length.
#[derive(Debug)]
pub struct Transform {
    oid: Oid,
    data: Vec<u8>,
}

impl Transform {
    pub const TYPE: &'static str = "Transform";

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn create(
        session: &mut Session,
        schemas: &SchemaRegistry,
        data: &[u8],
    ) -> Result<ObjectHandle, ProtocolError> {
        session.create(schemas, Self::TYPE, Args::new().with("data", data))
    }

    pub fn set_data(
        session: &mut Session,
        schemas: &SchemaRegistry,
        transform: &ObjectHandle,
        data: &[u8],
    ) -> Result<(), ProtocolError> {
        session.call(schemas, transform, "set_data", Args::new().with("data", data))
    }

    pub fn schema() -> TypeSchema {
        TypeSchema::new(Self::TYPE, vec![ParamSpec::bytes("data")], |args| {
            Ok(object::handle(Transform {
                oid: Oid::UNSET,
                data: args.bytes("data")?.to_vec(),
            }))
        })
        .with_operation(OperationSchema::new(
            "set_data",
            vec![ParamSpec::bytes("data")],
            |receiver, args| {
                let payload = args.bytes("data")?;
                let transform = object::downcast_mut::<Transform>(receiver, Transform::TYPE)?;
                if payload.len() != transform.data.len() {
                    return Err(ProtocolError::InvalidValue {
                        parameter: "data".to_string(),
                        reason: format!(
                            "length {} does not match the transform's {}",
                            payload.len(),
                            transform.data.len()
                        ),
                    });
                }
                transform.data.copy_from_slice(payload);
                Ok(())
            },
        ))
    }
}

impl ManagedObject for Transform {
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
            .downcast_ref::<Transform>()
            .is_some_and(|other| other.data == self.data)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
