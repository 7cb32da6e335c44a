use gsp_protocol::{Cid, Oid, WireError};
use thiserror::Error;

/// Failures of the recording and replay pipeline.
///
/// All of these are local, synchronous failures surfaced to the direct
/// caller of the recording or replay entry point; nothing is retried
/// internally, and a failed command leaves no partial envelope or state.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A parameter's value is outside its declared allowed-type set.
    /// Raised before the wrapped operation runs, so a rejected command
    /// never mutates state and never emits an envelope.
    #[error("wrong type for parameter `{parameter}`: expected {expected}, got {actual}")]
    TypeMismatch {
        parameter: String,
        expected: String,
        actual: String,
    },

    /// A declared parameter was not supplied.
    #[error("missing parameter `{0}`")]
    MissingParameter(String),

    /// A supplied parameter is not declared by the operation.
    #[error("parameter `{0}` is not declared by the operation")]
    UndeclaredParameter(String),

    /// The envelope lacks the mandatory `"id"` entry identifying its
    /// target or resulting object.
    #[error("envelope has no usable `id` parameter")]
    MissingTargetId,

    /// A handler's domain-level validation rejected a value that passed
    /// the declared-type check.
    #[error("invalid value for parameter `{parameter}`: {reason}")]
    InvalidValue { parameter: String, reason: String },

    /// Registry collision: the identifier is already bound to a
    /// different instance. Indicates allocator or registry misuse.
    #[error("object {0} is already registered to a different instance")]
    DuplicateIdentifier(Oid),

    /// No object is registered under the identifier. During replay this
    /// signals an out-of-order or incomplete log.
    #[error("no object registered under {0}")]
    UnknownObject(Oid),

    /// A reference-typed parameter names an object absent from the
    /// registry. This is the primary integrity check that the log is
    /// being replayed in causal order.
    #[error("parameter references unknown object {0}")]
    UnresolvedReference(Oid),

    /// The schema registry has no type by that name.
    #[error("unknown type `{0}`")]
    UnknownType(String),

    /// The type exists but declares no such operation.
    #[error("type `{type_name}` has no operation `{operation}`")]
    UnknownOperation {
        type_name: String,
        operation: String,
    },

    /// A schema provider registered the same type name twice.
    #[error("type `{0}` is already registered")]
    DuplicateType(String),

    /// Strict-order replay check: command ids must strictly increase.
    #[error("command {found} arrived after command {last}")]
    OutOfOrderCommand { last: Cid, found: Cid },

    /// A handler received an object of the wrong concrete type.
    #[error("receiver is not a `{expected}`")]
    WrongReceiver { expected: &'static str },

    #[error("wire: {0}")]
    Wire(#[from] WireError),
}
