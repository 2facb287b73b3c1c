//! Turn-taking: deciding when a stream of transcripts becomes one utterance.

pub mod coordinator;

pub use coordinator::{TurnCoordinator, TurnState};
