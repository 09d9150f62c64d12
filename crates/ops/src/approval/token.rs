//! Resumption token wire format.
//!
//! A URL query string:
//!
//! ```text
//! runId=<uuid>&workflow=<chain>&stepId=<step>&threadId=<t>&resourceId=<r>&context.approvedVmId=<id>
//! ```
//!
//! Values are form-encoded. `context.<name>` keys become resume data; names
//! are restricted to `[A-Za-z0-9_]`.

use std::collections::BTreeMap;

use ktomg_core::{ChainId, RunId};
use thiserror::Error;

/// Slack's limit on a button value.
pub const MAX_TOKEN_LEN: usize = 2000;

const RUN_ID: &str = "runId";
const WORKFLOW: &str = "workflow";
const STEP_ID: &str = "stepId";
const THREAD_ID: &str = "threadId";
const RESOURCE_ID: &str = "resourceId";
const CONTEXT_PREFIX: &str = "context.";

/// Token decoding and encoding errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed resumption token: {0}")]
    Malformed(String),

    #[error("invalid context key `{0}`")]
    InvalidContextKey(String),

    #[error("resumption token is {0} bytes, limit is {MAX_TOKEN_LEN}")]
    TooLong(usize),
}

/// Everything needed to find and resume a suspended run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumptionToken {
    pub run_id: RunId,
    pub workflow: ChainId,
    pub step_id: String,
    pub thread_id: String,
    pub resource_id: String,
    /// Resume-time overrides, keyed by context field name.
    pub context: BTreeMap<String, String>,
}

fn valid_context_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl ResumptionToken {
    /// Encode as a query string.
    ///
    /// # Errors
    ///
    /// Returns `InvalidContextKey` for a context name outside `[A-Za-z0-9_]`
    /// and `TooLong` if the result exceeds [`MAX_TOKEN_LEN`].
    pub fn encode(&self) -> Result<String, TokenError> {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        serializer
            .append_pair(RUN_ID, &self.run_id.to_string())
            .append_pair(WORKFLOW, self.workflow.as_str())
            .append_pair(STEP_ID, &self.step_id)
            .append_pair(THREAD_ID, &self.thread_id)
            .append_pair(RESOURCE_ID, &self.resource_id);

        for (key, value) in &self.context {
            if !valid_context_key(key) {
                return Err(TokenError::InvalidContextKey(key.clone()));
            }
            serializer.append_pair(&format!("{CONTEXT_PREFIX}{key}"), value);
        }

        let encoded = serializer.finish();
        if encoded.len() > MAX_TOKEN_LEN {
            return Err(TokenError::TooLong(encoded.len()));
        }
        Ok(encoded)
    }

    /// Decode a raw button value.
    ///
    /// # Errors
    ///
    /// Returns `Malformed` if a required key is missing, empty (for run,
    /// workflow and step) or repeated, a key is unknown, or the run id is not
    /// a UUID. Returns `InvalidContextKey` and `TooLong` as for `encode`.
    pub fn decode(raw: &str) -> Result<Self, TokenError> {
        if raw.len() > MAX_TOKEN_LEN {
            return Err(TokenError::TooLong(raw.len()));
        }

        let mut fields: BTreeMap<&'static str, String> = BTreeMap::new();
        let mut context = BTreeMap::new();

        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            if let Some(name) = key.strip_prefix(CONTEXT_PREFIX) {
                if !valid_context_key(name) {
                    return Err(TokenError::InvalidContextKey(name.to_string()));
                }
                if context
                    .insert(name.to_string(), value.into_owned())
                    .is_some()
                {
                    return Err(TokenError::Malformed(format!("duplicate key {key}")));
                }
                continue;
            }

            let known = match key.as_ref() {
                RUN_ID => RUN_ID,
                WORKFLOW => WORKFLOW,
                STEP_ID => STEP_ID,
                THREAD_ID => THREAD_ID,
                RESOURCE_ID => RESOURCE_ID,
                other => return Err(TokenError::Malformed(format!("unknown key {other}"))),
            };
            if fields.insert(known, value.into_owned()).is_some() {
                return Err(TokenError::Malformed(format!("duplicate key {known}")));
            }
        }

        let mut take = |key: &'static str| {
            fields
                .remove(key)
                .ok_or_else(|| TokenError::Malformed(format!("missing key {key}")))
        };
        let run_id = take(RUN_ID)?;
        let workflow = take(WORKFLOW)?;
        let step_id = take(STEP_ID)?;
        let thread_id = take(THREAD_ID)?;
        let resource_id = take(RESOURCE_ID)?;

        if workflow.is_empty() || step_id.is_empty() {
            return Err(TokenError::Malformed(
                "workflow and stepId must not be empty".to_string(),
            ));
        }
        let run_id = run_id
            .parse::<RunId>()
            .map_err(|e| TokenError::Malformed(format!("invalid runId: {e}")))?;

        Ok(Self {
            run_id,
            workflow: ChainId::new(workflow),
            step_id,
            thread_id,
            resource_id,
            context,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> ResumptionToken {
        ResumptionToken {
            run_id: RunId::new(),
            workflow: ChainId::from("restartVmWorkflow"),
            step_id: "review-vm".to_string(),
            thread_id: "C123".to_string(),
            resource_id: "U456".to_string(),
            context: BTreeMap::from([("approvedVmId".to_string(), "abc 1/2&x".to_string())]),
        }
    }

    #[test]
    fn test_round_trip_with_special_characters() {
        let original = token();
        let encoded = original.encode().expect("encode");

        assert!(encoded.starts_with("runId="));
        assert!(encoded.contains("context.approvedVmId=abc+1%2F2%26x"));
        assert_eq!(ResumptionToken::decode(&encoded).expect("decode"), original);
    }

    #[test]
    fn test_empty_thread_and_resource_allowed() {
        let mut original = token();
        original.thread_id.clear();
        original.resource_id.clear();
        let decoded = ResumptionToken::decode(&original.encode().expect("encode")).expect("decode");
        assert_eq!(decoded.thread_id, "");
        assert_eq!(decoded.resource_id, "");
    }

    #[test]
    fn test_missing_key_is_malformed() {
        let raw = format!("runId={}&workflow=w&stepId=s&threadId=t", RunId::new());
        let err = ResumptionToken::decode(&raw).expect_err("missing resourceId");
        assert_eq!(err, TokenError::Malformed("missing key resourceId".to_string()));
    }

    #[test]
    fn test_garbage_is_malformed() {
        for raw in ["", "not a token", "runId=nope&workflow=w&stepId=s&threadId=&resourceId="] {
            assert!(
                matches!(ResumptionToken::decode(raw), Err(TokenError::Malformed(_))),
                "{raw:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_duplicate_and_unknown_keys() {
        let base = token().encode().expect("encode");

        let err = ResumptionToken::decode(&format!("{base}&stepId=other")).expect_err("dup");
        assert!(matches!(err, TokenError::Malformed(reason) if reason.contains("duplicate")));

        let err = ResumptionToken::decode(&format!("{base}&extra=1")).expect_err("unknown");
        assert!(matches!(err, TokenError::Malformed(reason) if reason.contains("unknown")));
    }

    #[test]
    fn test_context_key_restrictions() {
        let mut bad = token();
        bad.context.insert("vm-id".to_string(), "x".to_string());
        assert_eq!(
            bad.encode(),
            Err(TokenError::InvalidContextKey("vm-id".to_string()))
        );

        let raw = format!("{}&context.a%20b=1", token().encode().expect("encode"));
        assert!(matches!(
            ResumptionToken::decode(&raw),
            Err(TokenError::InvalidContextKey(_))
        ));
    }

    #[test]
    fn test_length_limit() {
        let mut big = token();
        big.context.insert("blob".to_string(), "x".repeat(MAX_TOKEN_LEN));
        assert!(matches!(big.encode(), Err(TokenError::TooLong(_))));
        assert!(matches!(
            ResumptionToken::decode(&"a".repeat(MAX_TOKEN_LEN + 1)),
            Err(TokenError::TooLong(_))
        ));
    }
}
