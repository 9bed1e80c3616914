//! Shared utilities

pub mod config;
pub mod context;
pub mod fs;
pub mod hash;
pub mod process;

pub use config::Config;
pub use context::KtpackContext;
pub use process::{ProcessBuilder, ProcessOutput};
