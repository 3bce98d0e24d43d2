//! Agent state and behavior rules for the orgsim simulation engine.
//!
//! Each node of a topology hosts one agent. A [`Behavior`] decides how an
//! agent's state is initialized and how it changes in a step, given the
//! pre-step states of its neighbors. Rules are pure: they never see the
//! model, the RNG (after initialization), or other agents' in-step writes.
//!
//! # Modules
//!
//! - [`state`] -- Agent records and per-behavior state
//! - [`behavior`] -- Closed enum dispatching to the concrete rules
//! - [`social_influence`] -- Opinion averaging rule and opinion statistics
//! - [`diffusion`] -- Threshold adoption rule and adoption statistics
//! - [`error`] -- Parameter and state errors ([`AgentError`])

pub mod behavior;
pub mod diffusion;
pub mod error;
pub mod social_influence;
pub mod state;

// Re-export primary types at crate root.
pub use behavior::Behavior;
pub use diffusion::DiffusionParams;
pub use error::AgentError;
pub use social_influence::SocialInfluenceParams;
pub use state::{AgentState, DiffusionState, SocialInfluenceState, VariantState};
