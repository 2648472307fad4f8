//! Request-shaped entry points over `orgassess_core`.
//!
//! Each function opens its own connection, runs one use case and folds the
//! outcome into an `ApiResponse` envelope carrying an HTTP-style status.

pub mod api;

pub use api::*;
