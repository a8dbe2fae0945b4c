//! Presentation layer - HTTP routes, handlers and rendering

pub mod dto;
pub mod handlers;
pub mod metrics;
pub mod render;
pub mod router;
pub mod state;

pub use router::gate_router;
pub use state::GateState;
