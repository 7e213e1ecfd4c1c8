//! Client for a prompt-driven news aggregation backend.
//!
//! Users author prompts; the backend periodically turns each prompt into
//! summarized news items. This crate talks to that backend: a single request
//! pipeline ([`api::ApiClient`]) with an injected session ([`session`]),
//! typed services per resource ([`services`]), and the read-access rules for
//! shared prompts ([`access`]) and pages ([`routes`]).

pub mod access;
pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;
