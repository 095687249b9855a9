//! Split server HTTP entrypoint.
//!
//! Endpoints:
//! - `GET /api/split` – Description of the create endpoint
//! - `POST /api/split` – Compute a split and return a payment link
//! - `GET /api/split/{id}` – Look up a stored split
//! - `GET /health` – Liveness probe
//!
//! Environment:
//! - `.env` values loaded at startup
//! - `HOST`, `PORT` control binding address
//! - `REDIS_URL` selects the Redis store; without it records live in memory
//! - `OTEL_*` variables enable trace export when built with the `telemetry` feature

mod run;

use std::process;

use crate::run::run;

#[tokio::main]
async fn main() {
    let result = run().await;
    if let Err(e) = result {
        println!("{e}");
        process::exit(1)
    }
}
