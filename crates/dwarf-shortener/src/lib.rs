//! URL shortener service implementation.
//!
//! This crate provides the [`ShortenerService`](service::ShortenerService)
//! orchestrator and the code generators it allocates from. Core types are
//! re-exported from `dwarf_core`.

pub mod generator;
pub mod service;

pub use dwarf_core::{CreateParams, ExpirationPolicy, Shortener, ShortenerError};
pub use generator::Generator;
pub use service::ShortenerService;
