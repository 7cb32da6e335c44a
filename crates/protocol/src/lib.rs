pub mod envelope;
pub mod ids;
pub mod log;
pub mod value;
pub mod wire;

pub use envelope::{Envelope, Method, Params, TARGET_PARAM};
pub use ids::{Cid, Oid};
pub use log::CommandLog;
pub use value::{Value, ValueKind};
pub use wire::WireError;
