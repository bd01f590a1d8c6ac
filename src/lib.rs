//! # Trinity Agents
//!
//! A small multi-agent orchestration service: three personas (an
//! architecture/code agent, a business-planning agent, a
//! research/synthesis agent), each wrapping a language-model call with a
//! fixed system prompt, a table of named tools and a bounded run loop,
//! exposed over HTTP.
//!
//! ## Architecture
//!
//! Each run follows the "think, extract, act" pattern:
//! 1. Ask the model what to do, given the task, context and tool schemas
//! 2. Scan the free-text reply for a trigger phrase naming a tool
//! 3. Invoke that tool, or close the run as satisfied when none is named
//! 4. Retry on failure until the iteration budget is spent
//!
//! Failure never crosses the `run` boundary: provider errors, unknown
//! tools and handler failures all surface inside the returned transcript.
//!
//! ## Example
//!
//! ```rust,ignore
//! use trinity_agents::{api, config::Config};
//!
//! let config = Config::from_env()?;
//! api::serve(config).await?;
//! ```

pub mod agent;
pub mod agents;
pub mod api;
pub mod config;
pub mod engine;
pub mod llm;
pub mod memory;
pub mod tools;

pub use config::Config;
