// Server module entry point
// Listener setup, connection tracking, per-connection serving and the accept loop

pub mod connection;
pub mod listener;
pub mod signal;
pub mod tracker;

// `loop` is a keyword, so the module is named server_loop
#[path = "loop.rs"]
pub mod server_loop;

pub use listener::bind_listener;
pub use server_loop::run;
pub use signal::shutdown_signal;
pub use tracker::{ConnectionGuard, ConnectionTracker};
