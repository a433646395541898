//! Event Q&A: picks the parts of an event a question is about and forwards
//! them to the assistant.

mod assistant;
mod context;

pub use assistant::{system_prompt, AssistantError, AssistantService};
pub use context::{
    build_context, rank_schedule, select_sections, tokenize, ChatContext, ContextLimits,
    ContextSection, ScheduledProgram,
};
