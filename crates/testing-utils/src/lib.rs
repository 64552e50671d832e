//! Shared test support for the dispatch workspace: entity builders, scripted
//! collaborators and helpers for seeding the in-memory store.
//!
//! ```toml
//! [dev-dependencies]
//! dispatch-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod helpers;
pub mod mocks;

pub use builders::*;
pub use helpers::*;
pub use mocks::*;
