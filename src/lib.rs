//! Bill splitting with shareable payment links.
//!
//! A total is divided among a number of people in one of four modes (equal, percentage,
//! custom amounts, or equal with a tip). Valid results are persisted as expiring records
//! and addressed by an opaque id, so a `/pay/{id}` link can be handed to each participant.
//!
//! # Modules
//!
//! - [`split`] - Split modes, requests and the pure calculator.
//! - [`record`] - Persisted split records, their ids and payment link construction.
//! - [`store`] - Expiring key-value storage (Redis or in-memory) and the record store on top.
//! - [`service`] - [`SplitService`](service::SplitService), tying validation, storage and links together.
//! - [`proto`] - HTTP request and response bodies.
//! - [`handlers`] - Axum routes for `/api/split` and `/health`.
//! - [`config`] - Server configuration from a JSON file and environment variables.
//! - [`util`] - Telemetry setup and shutdown signal handling.

pub mod config;
pub mod handlers;
pub mod proto;
pub mod record;
pub mod service;
pub mod split;
pub mod store;
pub mod util;
