//! Utility functions for tubegate

pub mod url;

pub use url::*;
