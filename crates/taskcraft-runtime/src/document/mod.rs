//! Job document loading, parsing, and structural validation. See
//! [`crate::config`] for the engine's own (non-document) configuration.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::load_document;
pub use schema::{Document, RawDocument};
pub use validation::validate_document;
