//! Business logic services for the ops assistant.
//!
//! # Services
//!
//! - `assistant` - Assistant thread events, user messages and approval clicks

pub mod assistant;

pub use assistant::{
    AssistantService, GREETING, INTERPRET_PREFIX, SOMETHING_WENT_WRONG, SKIP_WORKFLOW,
};
