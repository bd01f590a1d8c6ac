//! Agent module - the run loop, its transcript model and its prompts.
//!
//! An agent runs a "think, extract, act" loop:
//! 1. Ask the model what to do, given the task, context and tool table
//! 2. Scan the free-text reply for a trigger phrase naming a tool
//! 3. On a match, invoke that tool with the reply as its query;
//!    otherwise close the run as satisfied without one
//! 4. Record the outcome and retry on failure until the round budget
//!    is spent

mod prompt;
mod reasoner;
mod runtime;
mod selector;
pub mod types;

pub use prompt::{build_think_prompt, default_system_prompt};
pub use reasoner::{Reasoner, NO_MODEL_MESSAGE};
pub use runtime::{Agent, AgentProfile, NO_TOOL_MESSAGE};
pub use selector::{ActionSelector, SelectedAction, TriggerPhraseSelector};
pub use types::{
    ActionResult, AgentStatus, AgentStatusReport, AgentThought, StepKind, TaskContext,
    TaskPriority, ThoughtStep,
};
