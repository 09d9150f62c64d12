//! Turns suspended runs into Slack approval prompts and back.
//!
//! The prompt's button value is an encoded [`ResumptionToken`]. Slack hands
//! it back verbatim on click; [`ApprovalBridge::from_token`] decodes it and
//! checks that the chain and run still exist before resuming.

mod bridge;
mod error;
mod token;

pub use bridge::{
    APPROVAL_BLOCK_ID, ActionablePrompt, ApprovalBridge, PromptContext, RESUME_ACTION_ID,
    ResumeRequest,
};
pub use error::ApprovalError;
pub use token::{MAX_TOKEN_LEN, ResumptionToken, TokenError};
