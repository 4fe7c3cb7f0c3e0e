//! Integration tests for sequencer-kit.
//!
//! These tests run the client against an in-process mock sequencer bound to
//! an ephemeral local port.
//!
//! Run with: `cargo test --test integration`

mod game_flow_integration;
mod mock_sequencer;
mod reconciliation_integration;
mod withdrawal_integration;

/// Install a test subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
