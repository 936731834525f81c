//! Client for a remote code evaluation service plus a cache-addressed,
//! paginated image gallery over dynamically listed paths.

pub mod config;
pub mod error;
pub mod gallery;
pub mod printer;
pub mod query;
pub mod resource;
pub mod tui;
pub mod utils;
pub mod webeval;

pub use error::{EvalError, EVALUATION_ERROR_PREFIX};
pub use webeval::{EvalClient, EvaluationResult};
