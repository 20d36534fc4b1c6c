//! Byte relay between upstream CDNs and the caller

pub mod media;

pub use media::*;
