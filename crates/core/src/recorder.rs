//! Recording entry points.
//!
//! Each constructor or mutator invocation goes through an explicit
//! call here (no interception): validate the arguments, execute the
//! wrapped operation exactly once, then build one envelope from the
//! operation's inputs and append/emit it according to the session
//! settings. A failed validation or a failed handler records nothing.

use gsp_protocol::{Envelope, Method, Oid, Params, TARGET_PARAM, Value};

use crate::codec::{self, Args};
use crate::error::ProtocolError;
use crate::object::{self, ManagedObject as _, ObjectHandle};
use crate::schema::{self, SchemaRegistry};
use crate::session::Session;

/// Per-call overrides of the session's record/output/check switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallOptions {
    pub record: Option<bool>,
    pub output: Option<bool>,
    pub check: Option<bool>,
}

impl Session {
    /// Construct a new instance of `type_name` through its schema,
    /// register it (when tracking is on), and record one construction
    /// envelope.
    pub fn create(
        &mut self,
        schemas: &SchemaRegistry,
        type_name: &str,
        args: Args,
    ) -> Result<ObjectHandle, ProtocolError> {
        self.create_with(schemas, type_name, args, CallOptions::default())
    }

    pub fn create_with(
        &mut self,
        schemas: &SchemaRegistry,
        type_name: &str,
        args: Args,
        options: CallOptions,
    ) -> Result<ObjectHandle, ProtocolError> {
        let schema = schemas.get(type_name)?;
        if options.check.unwrap_or(self.settings().check) {
            schema::validate(schema.params(), &args)?;
        }

        let handle = schema.build(&args)?;
        let oid = self.allocate_oid();
        object::lock(&handle).set_oid(oid);
        self.track(oid, handle.clone())?;

        self.write(Method::construct(schema.name()), oid, &args, options);
        log::debug!("created {}{oid}", schema.name());
        Ok(handle)
    }

    /// Invoke a named mutator on a registered object and record one
    /// mutation envelope. The operation runs synchronously before the
    /// envelope is built, so the recorded parameters are the
    /// operation's inputs, never post-mutation state.
    pub fn call(
        &mut self,
        schemas: &SchemaRegistry,
        receiver: &ObjectHandle,
        operation: &str,
        args: Args,
    ) -> Result<(), ProtocolError> {
        self.call_with(schemas, receiver, operation, args, CallOptions::default())
    }

    pub fn call_with(
        &mut self,
        schemas: &SchemaRegistry,
        receiver: &ObjectHandle,
        operation: &str,
        args: Args,
        options: CallOptions,
    ) -> Result<(), ProtocolError> {
        let (type_name, target) = {
            let receiver = object::lock(receiver);
            (receiver.type_name(), receiver.oid())
        };
        let (_, op) = schemas.operation(type_name, operation)?;
        if options.check.unwrap_or(self.settings().check) {
            schema::validate(op.params(), &args)?;
        }

        {
            let mut receiver = object::lock(receiver);
            op.apply(&mut *receiver, &args)?;
        }

        self.write(Method::operation(type_name, op.name()), target, &args, options);
        log::debug!("applied {type_name}/{} to {target}", op.name());
        Ok(())
    }

    /// Build the envelope and route it. The command id is consumed for
    /// every successful call, recorded or not, so ids always reflect
    /// write order.
    fn write(&mut self, method: Method, target: Oid, args: &Args, options: CallOptions) {
        let record = options.record.unwrap_or(self.settings().record);
        let output = options.output.unwrap_or(self.settings().output);

        let mut parameters = Params::new();
        parameters.insert(TARGET_PARAM, Value::Int(target.get() as i64));
        codec::encode_args(args, &mut parameters);

        let cid = self.allocate_cid();
        let envelope = Envelope::new(method, cid, parameters);
        if output {
            self.emit(&envelope);
        }
        if record {
            self.append(envelope);
        }
    }
}
