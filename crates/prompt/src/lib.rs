//! Prompt system for critiq.
//!
//! Defines the system instruction for each reasoning role and the
//! Handlebars-rendered request messages each pipeline stage sends to its
//! role.

pub mod builder;
pub mod roles;

pub use builder::{build_critic_request, build_summary_request, build_verify_request};
pub use roles::AgentRole;
