//! Integration tests for the vglog-filter core.
//!
//! Run with: `cargo test --test integration`

mod cli_surface;
