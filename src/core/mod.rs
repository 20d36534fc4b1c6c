//! Core domain objects and the gateway facade

pub mod gateway;
pub mod model;

pub use gateway::*;
pub use model::*;
