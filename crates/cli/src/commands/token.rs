//! Resumption token inspection.
//!
//! # Usage
//!
//! ```bash
//! ktomg-cli token inspect 'runId=...&workflow=restartVmWorkflow&...'
//! ```

use ktomg_ops::approval::{ResumptionToken, TokenError};

/// Decode a token and print its fields.
///
/// # Errors
///
/// Returns error if the value is not a well-formed resumption token.
pub fn inspect(raw: &str) -> Result<(), TokenError> {
    let token = ResumptionToken::decode(raw)?;

    #[allow(clippy::print_stdout)]
    {
        for line in describe(&token) {
            println!("{line}");
        }
    }
    Ok(())
}

fn describe(token: &ResumptionToken) -> Vec<String> {
    let mut lines = vec![
        format!("run:      {}", token.run_id),
        format!("workflow: {}", token.workflow),
        format!("step:     {}", token.step_id),
        format!("thread:   {}", token.thread_id),
        format!("resource: {}", token.resource_id),
    ];
    lines.extend(
        token
            .context
            .iter()
            .map(|(key, value)| format!("context.{key} = {value}")),
    );
    lines
}
