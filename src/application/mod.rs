// Application layer: use cases and derived views.
// The service owns every mutation; analytics are pure functions over a record slice.

pub mod analytics;
pub mod error;
pub mod service;

pub use error::*;
pub use service::*;
