//! Callback registrations and inbound event routing.
//!
//! - [`ExtPhoneCallback`] - what an application implements
//! - [`ClientRegistry`] - `Client` handles and their delivery queues
//! - [`CallbackRouter`] - targeted vs broadcast fan-out

mod listener;
mod registry;
mod router;

pub use listener::ExtPhoneCallback;
pub use registry::ClientRegistry;
pub use router::CallbackRouter;
