//! Credential bootstrap and private API access

pub mod bootstrap;
pub mod client;
pub mod innertube;
pub mod player;

pub use bootstrap::*;
pub use client::*;
pub use innertube::*;
pub use player::*;
