//! HTTP-backed browser capability for transforms.
//!
//! [`HttpPageLoader`] fetches a page and reduces it to its title, visible
//! text and links. Wrapped in a [`sleuth_plugins::BrowserPool`] it becomes
//! the `browser()` capability of an execution context.

pub mod error;
pub mod extract;
pub mod loader;

pub use {
    error::BrowserError,
    extract::PageExtractor,
    loader::{HttpPageLoader, browser_pool},
};
