//! # lokql-agent
//!
//! The conversational loop: user text goes in, the model decides whether to
//! invoke the Loki query tool, and a natural-language answer comes back.

mod agent;

pub use agent::{Agent, AgentConfig, SYSTEM_PROMPT};
