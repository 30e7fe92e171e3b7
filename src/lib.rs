//! Long-polling publish/subscribe relay.
//!
//! `GET /sub` holds the response open; `GET /pub` sends every held
//! subscriber one notification and closes it.

pub mod app;
pub mod cli;
pub mod config;
pub mod errors;
pub mod routes;
pub mod services;
pub mod state;
