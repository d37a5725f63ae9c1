//! Source schema readers
//!
//! Boundary components that turn upstream data (relational result sets,
//! JSON documents) into engine rows. Fetching the data is the driver's
//! job; binding extraction — especially nested-array fan-out — is part
//! of the engine because it determines output correctness.

mod json;
mod sql;

pub use json::{ShapeError, ShapeResult, ShapeTemplate};
pub use sql::SqlResultReader;
