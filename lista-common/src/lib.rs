//! # Lista Common Library
//!
//! Shared code for the listing assistant:
//! - Error type used across crates
//! - Typed TOML configuration and working-tree layout
//! - Best-effort filesystem helpers (sizes, cleanup, moves)

pub mod config;
pub mod error;
pub mod fs_utils;

pub use error::{Error, Result};
