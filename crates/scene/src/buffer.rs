use std::any::Any;

use gsp_core::object::{self, ObjectHandle};
use gsp_core::schema::{OperationSchema, ParamSpec, TypeSchema};
use gsp_core::{Args, ManagedObject, ProtocolError, SchemaRegistry, Session};
use gsp_protocol::{Oid, Value};

/// A typed n-dimensional storage buffer.
///
/// `set_data` carries an opaque binary payload: the bytes travel
/// text-safe on the wire and come back verbatim on replay.
#[derive(Debug)]
pub struct Buffer {
    oid: Oid,
    shape: Vec<i64>,
    dtype: String,
    data: Vec<u8>,
}

impl Buffer {
    pub const TYPE: &'static str = "Buffer";

    pub fn shape(&self) -> &[i64] {
        &self.shape
    }

    pub fn dtype(&self) -> &str {
        &self.dtype
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn create(
        session: &mut Session,
        schemas: &SchemaRegistry,
        shape: &[i64],
        dtype: &str,
    ) -> Result<ObjectHandle, ProtocolError> {
        let shape: Vec<Value> = shape.iter().map(|n| Value::Int(*n)).collect();
        session.create(
            schemas,
            Self::TYPE,
            Args::new().with("shape", shape).with("dtype", dtype),
        )
    }

    /// Splice raw bytes into the buffer at a byte offset, growing it
    /// as needed.
    pub fn set_data(
        session: &mut Session,
        schemas: &SchemaRegistry,
        buffer: &ObjectHandle,
        offset: i64,
        data: &[u8],
    ) -> Result<(), ProtocolError> {
        session.call(
            schemas,
            buffer,
            "set_data",
            Args::new().with("offset", offset).with("data", data),
        )
    }

    pub fn schema() -> TypeSchema {
        TypeSchema::new(
            Self::TYPE,
            vec![ParamSpec::list("shape"), ParamSpec::str("dtype")],
            |args| {
                let mut shape = Vec::new();
                for item in args.list("shape")? {
                    let extent = item.as_i64().ok_or_else(|| ProtocolError::InvalidValue {
                        parameter: "shape".to_string(),
                        reason: format!("extent {item:?} is not an integer"),
                    })?;
                    if extent < 0 {
                        return Err(ProtocolError::InvalidValue {
                            parameter: "shape".to_string(),
                            reason: format!("negative extent {extent}"),
                        });
                    }
                    shape.push(extent);
                }
                Ok(object::handle(Buffer {
                    oid: Oid::UNSET,
                    shape,
                    dtype: args.str("dtype")?.to_string(),
                    data: Vec::new(),
                }))
            },
        )
        .with_operation(OperationSchema::new(
            "set_data",
            vec![ParamSpec::int("offset"), ParamSpec::bytes("data")],
            |receiver, args| {
                let offset = args.i64("offset")?;
                if offset < 0 {
                    return Err(ProtocolError::InvalidValue {
                        parameter: "offset".to_string(),
                        reason: format!("negative offset {offset}"),
                    });
                }
                let payload = args.bytes("data")?;
                let buffer = object::downcast_mut::<Buffer>(receiver, Buffer::TYPE)?;
                let offset = offset as usize;
                let end = offset + payload.len();
                if buffer.data.len() < end {
                    buffer.data.resize(end, 0);
                }
                buffer.data[offset..end].copy_from_slice(payload);
                Ok(())
            },
        ))
    }
}

impl ManagedObject for Buffer {
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
        other.as_any().downcast_ref::<Buffer>().is_some_and(|other| {
            other.shape == self.shape && other.dtype == self.dtype && other.data == self.data
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splice_grows_and_overwrites() {
        let schemas = crate::schema_registry();
        let mut session = Session::client();

        let buffer = Buffer::create(&mut session, &schemas, &[3, 3], "u8").unwrap();
        Buffer::set_data(&mut session, &schemas, &buffer, 0, &[1, 2, 3]).unwrap();
        Buffer::set_data(&mut session, &schemas, &buffer, 2, &[9, 9]).unwrap();

        let guard = object::lock(&buffer);
        let buffer = guard.as_any().downcast_ref::<Buffer>().unwrap();
        assert_eq!(buffer.data(), &[1, 2, 9, 9]);
        assert_eq!(buffer.shape(), &[3, 3]);
        assert_eq!(buffer.dtype(), "u8");
    }

    #[test]
    fn payload_is_tagged_bytes_on_the_wire() {
        let schemas = crate::schema_registry();
        let mut session = Session::client();

        let buffer = Buffer::create(&mut session, &schemas, &[4], "u8").unwrap();
        Buffer::set_data(&mut session, &schemas, &buffer, 0, &[0, 255, 1, 128]).unwrap();

        let envelope = session.log().get(1).unwrap();
        assert_eq!(
            envelope.parameters.get("data"),
            Some(&Value::Bytes(vec![0, 255, 1, 128]))
        );
        let json = gsp_protocol::wire::envelope_to_json(envelope).unwrap();
        assert!(json.contains("$bytes"));
    }

    #[test]
    fn negative_offset_is_rejected_without_mutation() {
        let schemas = crate::schema_registry();
        let mut session = Session::client();

        let buffer = Buffer::create(&mut session, &schemas, &[4], "u8").unwrap();
        let err = Buffer::set_data(&mut session, &schemas, &buffer, -1, &[1]).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidValue { .. }));

        let guard = object::lock(&buffer);
        let buffer = guard.as_any().downcast_ref::<Buffer>().unwrap();
        assert!(buffer.data().is_empty());
        // The failed call recorded nothing.
        assert_eq!(session.log().len(), 1);
    }

    #[test]
    fn fractional_shape_extent_is_rejected() {
        let schemas = crate::schema_registry();
        let mut session = Session::client();
        let err = session
            .create(
                &schemas,
                Buffer::TYPE,
                Args::new()
                    .with("shape", vec![Value::Float(1.5)])
                    .with("dtype", "u8"),
            )
            .unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidValue { .. }));
    }
}
