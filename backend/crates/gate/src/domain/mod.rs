//! Domain layer - entities, policies and store traits

pub mod directory;
pub mod policy;
pub mod session;
pub mod store;
pub mod upstream;
