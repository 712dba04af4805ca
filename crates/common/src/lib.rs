//! Shared error plumbing and naming helpers used across all sleuth crates.

pub mod error;
pub mod naming;

pub use {
    error::{Context, Message},
    naming::{to_snake_case, to_type_name},
};
