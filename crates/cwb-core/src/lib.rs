//! Core domain + application logic for the clinic wait bot.
//!
//! This crate is intentionally framework-agnostic. The chat transport, the
//! clinic status portal and session persistence live behind ports (traits)
//! implemented in adapter crates or in [`store`].

pub mod config;
pub mod conversation;
pub mod domain;
pub mod errors;
pub mod locks;
pub mod logging;
pub mod messages;
pub mod messaging;
pub mod poller;
pub mod policy;
pub mod session;
pub mod status;
pub mod store;

pub use errors::{Error, Result};
