//! payload-debug library
//!
//! Core of the payload debug client:
//! - `args`: free-form argument text -> typed JSON mapping
//! - `crashlog`: append-only crash/event log + process panic hook
//! - `normalize`: heterogeneous agent responses -> one text block
//! - `agent`: HTTP execution client (probe, list, execute, status, info)
//! - `config`: layered client configuration

pub mod agent;
pub mod args;
pub mod config;
pub mod crashlog;
pub mod error;
pub mod normalize;
pub mod utils;
