//! Domain atoms for the Tarefas+ backend.
//!
//! Each atom owns a model, a service layer that talks to a [`store::DocumentStore`],
//! and (where it is exposed over HTTP) thin response wrappers.

pub mod comments;
pub mod http;
pub mod session;
pub mod share;
pub mod store;
pub mod tasks;
