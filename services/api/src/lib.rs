//! Study Scaffold API Library Crate
//!
//! This library contains the web-facing half of the study plan service:
//! configuration, application state, API handlers, document extraction and
//! routing. The `api` binary is a thin wrapper around this library.

pub mod config;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod state;
