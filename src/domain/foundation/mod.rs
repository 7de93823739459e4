//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, enums, and error types
//! that form the vocabulary of the telemetry layer.

mod connection_status;
mod errors;
mod game;
mod ids;
mod state_machine;
mod timestamp;

pub use connection_status::ConnectionStatus;
pub use errors::ValidationError;
pub use game::Game;
pub use ids::ConnectionId;
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
