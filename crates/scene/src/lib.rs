//! Reference scene types for the replication protocol.
//!
//! These are schema providers in the protocol's sense: each type
//! declares its constructor and operation parameters, supplies the
//! handlers the engine dispatches to, and offers typed client-side
//! wrappers that funnel into [`Session::create`] and [`Session::call`].
//! The engine itself never special-cases any of them.
//!
//! [`Session::create`]: gsp_core::Session
//! [`Session::call`]: gsp_core::Session

pub mod buffer;
pub mod canvas;
pub mod transform;
pub mod viewport;

pub use buffer::Buffer;
pub use canvas::Canvas;
pub use transform::Transform;
pub use viewport::Viewport;

use gsp_core::{ProtocolError, SchemaRegistry};

/// Install every scene schema into a registry.
pub fn register_schemas(schemas: &mut SchemaRegistry) -> Result<(), ProtocolError> {
    schemas.register(Canvas::schema())?;
    schemas.register(Viewport::schema())?;
    schemas.register(Buffer::schema())?;
    schemas.register(Transform::schema())?;
    Ok(())
}

/// A registry holding exactly the scene schemas.
pub fn schema_registry() -> SchemaRegistry {
    let mut schemas = SchemaRegistry::new();
    // The registry starts empty; duplicates are impossible here.
    let _ = register_schemas(&mut schemas);
    schemas
}
