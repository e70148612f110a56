// Library surface for headless/integration tests and reuse.
// The binary in main.rs only wires terminal, logging and CLI around it.
pub mod app;
pub mod app_dirs;
pub mod config;
pub mod controller;
pub mod countdown;
pub mod error;
pub mod quote;
pub mod race;
pub mod runtime;
pub mod ui;

/// Redraw cadence of the event loop.
pub const TICK_RATE_MS: u64 = 100;
