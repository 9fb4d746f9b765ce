//! Transactional sessions around a call.

use daedalus_core::ServiceError;

/// Opens one session per request.
///
/// The dispatcher begins a session before the call and, once the request
/// is processed, commits it when the response succeeded and rolls it back
/// otherwise.
pub trait SessionProvider: Send + Sync {
    /// Begins a session.
    fn begin(&self) -> Result<Box<dyn Session>, ServiceError>;
}

/// An open session.
pub trait Session: Send {
    /// Makes the work of the request durable.
    fn commit(self: Box<Self>) -> Result<(), ServiceError>;

    /// Discards the work of the request.
    fn rollback(self: Box<Self>);
}
