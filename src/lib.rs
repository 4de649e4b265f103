// Public API for integration tests and library usage

pub mod coordinator;
pub mod protocol;
pub mod state;
pub mod store;
pub mod types;
