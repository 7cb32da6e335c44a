//! Reference and payload rewriting between the runtime and the wire.
//!
//! Encode direction (record time): object arguments become their
//! identifiers; everything else passes through. Binary payloads stay a
//! first-class value and only become text-safe at the JSON layer.
//! Decode direction (replay time): reference values are looked up in
//! the registry, the primary integrity check that the log is being
//! replayed in causal order.

use gsp_protocol::{Oid, Params, Value};

use crate::error::ProtocolError;
use crate::object::{self, ManagedObject as _, ObjectHandle};
use crate::registry::Registry;

/// A runtime-side argument: either a plain wire value or a live object.
#[derive(Clone)]
pub enum Arg {
    Value(Value),
    Object(ObjectHandle),
}

impl Arg {
    /// Category name for validation messages.
    pub fn kind_name(&self) -> String {
        match self {
            Arg::Value(value) => value.kind().to_string(),
            Arg::Object(handle) => format!("ref to {}", object::lock(handle).type_name()),
        }
    }
}

impl std::fmt::Debug for Arg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arg::Value(value) => value.fmt(f),
            Arg::Object(handle) => write!(f, "Object({})", object::lock(handle).oid()),
        }
    }
}

/// Ordered named arguments of one constructor or mutator invocation,
/// in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Args(Vec<(String, Arg)>);

impl Args {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a plain value argument.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.push((name.into(), Arg::Value(value.into())));
        self
    }

    /// Append an object argument; it will travel as its identifier.
    pub fn with_object(mut self, name: impl Into<String>, handle: &ObjectHandle) -> Self {
        self.0.push((name.into(), Arg::Object(handle.clone())));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arg> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, arg)| arg)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arg)> {
        self.0.iter().map(|(key, arg)| (key.as_str(), arg))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn require(&self, name: &str) -> Result<&Arg, ProtocolError> {
        self.get(name)
            .ok_or_else(|| ProtocolError::MissingParameter(name.to_string()))
    }

    fn mismatch(&self, name: &str, expected: &str, arg: &Arg) -> ProtocolError {
        ProtocolError::TypeMismatch {
            parameter: name.to_string(),
            expected: expected.to_string(),
            actual: arg.kind_name(),
        }
    }

    /// Numeric accessor accepting both integers and floats.
    pub fn f64(&self, name: &str) -> Result<f64, ProtocolError> {
        let arg = self.require(name)?;
        match arg {
            Arg::Value(value) => value
                .as_f64()
                .ok_or_else(|| self.mismatch(name, "number", arg)),
            Arg::Object(_) => Err(self.mismatch(name, "number", arg)),
        }
    }

    pub fn i64(&self, name: &str) -> Result<i64, ProtocolError> {
        let arg = self.require(name)?;
        match arg {
            Arg::Value(value) => value
                .as_i64()
                .ok_or_else(|| self.mismatch(name, "int", arg)),
            Arg::Object(_) => Err(self.mismatch(name, "int", arg)),
        }
    }

    pub fn str(&self, name: &str) -> Result<&str, ProtocolError> {
        let arg = self.require(name)?;
        match arg {
            Arg::Value(value) => value
                .as_str()
                .ok_or_else(|| self.mismatch(name, "str", arg)),
            Arg::Object(_) => Err(self.mismatch(name, "str", arg)),
        }
    }

    pub fn bytes(&self, name: &str) -> Result<&[u8], ProtocolError> {
        let arg = self.require(name)?;
        match arg {
            Arg::Value(value) => value
                .as_bytes()
                .ok_or_else(|| self.mismatch(name, "bytes", arg)),
            Arg::Object(_) => Err(self.mismatch(name, "bytes", arg)),
        }
    }

    pub fn list(&self, name: &str) -> Result<&[Value], ProtocolError> {
        let arg = self.require(name)?;
        match arg {
            Arg::Value(value) => value
                .as_list()
                .ok_or_else(|| self.mismatch(name, "list", arg)),
            Arg::Object(_) => Err(self.mismatch(name, "list", arg)),
        }
    }

    /// Resolved object argument.
    pub fn object(&self, name: &str) -> Result<ObjectHandle, ProtocolError> {
        let arg = self.require(name)?;
        match arg {
            Arg::Object(handle) => Ok(handle.clone()),
            Arg::Value(_) => Err(self.mismatch(name, "ref", arg)),
        }
    }

    /// Identity of an object argument, without locking it into a
    /// concrete type. Accepts a live object or a raw reference value.
    pub fn oid(&self, name: &str) -> Result<Oid, ProtocolError> {
        let arg = self.require(name)?;
        match arg {
            Arg::Object(handle) => Ok(object::lock(handle).oid()),
            Arg::Value(Value::Ref(oid)) => Ok(*oid),
            Arg::Value(_) => Err(self.mismatch(name, "ref", arg)),
        }
    }
}

/// Encode arguments into wire parameters, substituting each object
/// argument with its identifier. Entry order is preserved.
pub fn encode_args(args: &Args, params: &mut Params) {
    for (name, arg) in args.iter() {
        let value = match arg {
            Arg::Value(value) => value.clone(),
            Arg::Object(handle) => Value::Ref(object::lock(handle).oid()),
        };
        params.insert(name, value);
    }
}

/// Resolve wire parameters back into runtime arguments, looking every
/// reference up in the registry. Fails with
/// [`ProtocolError::UnresolvedReference`] when a referee is absent.
pub fn resolve(params: &Params, registry: &Registry) -> Result<Args, ProtocolError> {
    let mut args = Args::new();
    for (name, value) in params.iter() {
        let arg = match value {
            Value::Ref(oid) => {
                let handle = registry
                    .get(*oid)
                    .ok_or(ProtocolError::UnresolvedReference(*oid))?;
                Arg::Object(handle)
            }
            other => Arg::Value(other.clone()),
        };
        args.0.push((name.to_string(), arg));
    }
    Ok(args)
}
