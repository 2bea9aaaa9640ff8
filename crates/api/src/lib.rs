//! Hirewatch control server library.
//!
//! Exposes the building blocks (config, state, control service, error
//! handling, routes, WebSocket log stream) so integration tests and the
//! binary entrypoint can both access them.

pub mod config;
pub mod control;
pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
pub mod ws;
