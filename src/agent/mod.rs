//! Agent module - the session driver and its loop state
//!
//! Contains the agent logic that coordinates model calls and browser actions.

pub mod driver;
pub mod loop_state;

pub use driver::{AgentSession, StepReceiver, StepSink};
pub use loop_state::{AgentLoopState, Observation};
