use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use gsp_protocol::Oid;

use crate::error::ProtocolError;

/// An instance participating in the protocol.
///
/// Exactly one [`Oid`] per object for its lifetime; only the replayer
/// reassigns it, to adopt the identity carried by a construction
/// envelope. `state_eq` defines structural equivalence over the
/// declared fields, ignoring id allocation mechanics: two objects
/// built through different code paths compare equal when their field
/// values (including nested references, by id) match.
pub trait ManagedObject: Any + fmt::Debug + Send {
    fn oid(&self) -> Oid;

    fn set_oid(&mut self, oid: Oid);

    /// Runtime type name, as it appears in envelope methods.
    fn type_name(&self) -> &'static str;

    /// Structural equality over declared fields, excluding the oid.
    fn state_eq(&self, other: &dyn ManagedObject) -> bool;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Shared handle to a managed object.
///
/// Application code and the registry co-own instances. The protocol is
/// single-writer; the mutex makes that explicit for a multi-threaded
/// host.
pub type ObjectHandle = Arc<Mutex<dyn ManagedObject>>;

/// Wrap a freshly built object into a handle.
pub fn handle<T: ManagedObject>(object: T) -> ObjectHandle {
    Arc::new(Mutex::new(object))
}

/// Lock a handle, recovering from poisoning (a panicked writer cannot
/// leave the object graph unreadable).
pub fn lock(handle: &ObjectHandle) -> MutexGuard<'_, dyn ManagedObject> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Downcast a trait object to its concrete type inside a handler.
pub fn downcast_mut<'a, T: ManagedObject>(
    object: &'a mut dyn ManagedObject,
    expected: &'static str,
) -> Result<&'a mut T, ProtocolError> {
    object
        .as_any_mut()
        .downcast_mut::<T>()
        .ok_or(ProtocolError::WrongReceiver { expected })
}

/// Immutable counterpart of [`downcast_mut`].
pub fn downcast_ref<'a, T: ManagedObject>(
    object: &'a dyn ManagedObject,
    expected: &'static str,
) -> Result<&'a T, ProtocolError> {
    object
        .as_any()
        .downcast_ref::<T>()
        .ok_or(ProtocolError::WrongReceiver { expected })
}
