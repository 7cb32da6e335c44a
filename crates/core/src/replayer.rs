//! Log replay.
//!
//! Consumes a command log envelope by envelope and rebuilds the object
//! graph in a session's registry. Each envelope is applied atomically:
//! either the construction/mutation and its registration happen, or
//! nothing does. The replayer performs no buffering or reordering;
//! the transport must deliver the log in write order.

use gsp_protocol::{Cid, CommandLog, Envelope, TARGET_PARAM};

use crate::codec;
use crate::error::ProtocolError;
use crate::object::{self, ManagedObject as _};
use crate::schema::SchemaRegistry;
use crate::session::Session;

pub struct Replayer<'a> {
    schemas: &'a SchemaRegistry,
    strict_order: bool,
    halt_on_error: bool,
    last_cid: Option<Cid>,
}

impl<'a> Replayer<'a> {
    pub fn new(schemas: &'a SchemaRegistry) -> Self {
        Self {
            schemas,
            strict_order: false,
            halt_on_error: true,
            last_cid: None,
        }
    }

    /// Require strictly increasing command ids, failing with
    /// [`ProtocolError::OutOfOrderCommand`] before touching any state.
    pub fn strict_order(mut self, on: bool) -> Self {
        self.strict_order = on;
        self
    }

    /// When disabled, a failed envelope is logged and skipped instead
    /// of halting the replay. The registry may then be inconsistent
    /// with the producer's; callers opt into that explicitly.
    pub fn halt_on_error(mut self, on: bool) -> Self {
        self.halt_on_error = on;
        self
    }

    /// Apply one envelope to the session.
    pub fn process(
        &mut self,
        session: &mut Session,
        envelope: &Envelope,
    ) -> Result<(), ProtocolError> {
        if self.strict_order
            && let Some(last) = self.last_cid
            && envelope.cid <= last
        {
            return Err(ProtocolError::OutOfOrderCommand {
                last,
                found: envelope.cid,
            });
        }

        let mut parameters = envelope.parameters.clone();
        let target = parameters
            .remove(TARGET_PARAM)
            .and_then(|value| value.as_oid())
            .ok_or(ProtocolError::MissingTargetId)?;
        let args = codec::resolve(&parameters, session.registry())?;

        match &envelope.method.operation {
            // Construction: build, adopt the producer's identity,
            // register unconditionally.
            None => {
                let schema = self.schemas.get(&envelope.method.type_name)?;
                let handle = schema.build(&args)?;
                object::lock(&handle).set_oid(target);
                session.adopt(target, handle)?;
                log::debug!("replayed {}{target}", envelope.method.type_name);
            }
            // Mutation: the object must already exist.
            Some(operation) => {
                let handle = session.registry().lookup(target)?;
                let (_, op) = self
                    .schemas
                    .operation(&envelope.method.type_name, operation)?;
                let mut receiver = object::lock(&handle);
                op.apply(&mut *receiver, &args)?;
                log::debug!(
                    "replayed {}/{operation} on {target}",
                    envelope.method.type_name
                );
            }
        }

        self.last_cid = Some(envelope.cid);
        Ok(())
    }

    /// Apply a whole log in order; returns the number of envelopes
    /// applied. With `halt_on_error` (the default), the first failure
    /// stops the replay so the caller never proceeds with a registry
    /// known to be inconsistent.
    pub fn replay(
        &mut self,
        session: &mut Session,
        log: &CommandLog,
    ) -> Result<usize, ProtocolError> {
        let mut applied = 0;
        for envelope in log {
            match self.process(session, envelope) {
                Ok(()) => applied += 1,
                Err(err) if !self.halt_on_error => {
                    log::warn!("skipping command {}: {err}", envelope.cid);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(applied)
    }
}
