//! pdfqa-core
//!
//! Domain types, error taxonomy, capability traits, configuration, and the
//! first two pipeline stages: the PDF loader and the sliding-window chunker.

pub mod chunker;
pub mod config;
pub mod error;
pub mod loader;
pub mod retry;
pub mod traits;
pub mod types;

pub use error::{CapabilityError, DocumentParseError, Error, Result};
