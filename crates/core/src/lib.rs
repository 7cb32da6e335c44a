pub mod codec;
pub mod error;
pub mod lint;
pub mod object;
pub mod recorder;
pub mod registry;
pub mod replayer;
pub mod schema;
pub mod session;

pub use codec::{Arg, Args};
pub use error::ProtocolError;
pub use object::{ManagedObject, ObjectHandle};
pub use recorder::CallOptions;
pub use registry::Registry;
pub use replayer::Replayer;
pub use schema::{OperationSchema, ParamKind, ParamSpec, SchemaRegistry, TypeSchema};
pub use session::{Mode, ModeOptions, Session, Settings};
