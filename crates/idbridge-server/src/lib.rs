//! HTTP front end for the idbridge federation engine.
//!
//! Exposes the login handshake (`/login`, `/login/{provider}`,
//! `/callback/{provider}`), the verification endpoints (`/pubkey`, `/token`)
//! and the liveness plumbing around them. All federation semantics live in
//! `idbridge-core`; this crate only adapts them to HTTP.

pub mod bootstrap;
pub mod handlers;
pub mod observability;
pub mod server;
pub mod templates;

pub use bootstrap::{AppState, build_state};
pub use server::{IdbridgeServer, build_app};
