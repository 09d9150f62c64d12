//! Typed field contracts for step inputs, step outputs and trigger data.

use std::fmt;

use serde_json::Value;

use super::Record;

/// JSON type a field must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Bool,
    Number,
    Object,
    Array,
    /// Any non-null value.
    Any,
}

impl FieldKind {
    fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Bool => value.is_boolean(),
            Self::Number => value.is_number(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
            Self::Any => !value.is_null(),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Bool => "boolean",
            Self::Number => "number",
            Self::Object => "object",
            Self::Array => "array",
            Self::Any => "any",
        };
        f.write_str(name)
    }
}

/// One declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    pub description: String,
}

/// A field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractViolation {
    pub field: String,
    pub reason: String,
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field `{}` {}", self.field, self.reason)
    }
}

/// The set of fields a record is expected to carry.
///
/// Fields not declared in the contract are allowed and passed through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contract {
    fields: Vec<FieldSpec>,
}

impl Contract {
    /// An empty contract; accepts any object.
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Declare a required field.
    #[must_use]
    pub fn required(mut self, name: &str, kind: FieldKind, description: &str) -> Self {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            kind,
            required: true,
            description: description.to_string(),
        });
        self
    }

    /// Declare an optional field.
    #[must_use]
    pub fn optional(mut self, name: &str, kind: FieldKind, description: &str) -> Self {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            kind,
            required: false,
            description: description.to_string(),
        });
        self
    }

    /// Declared fields, in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Whether `name` is a declared field.
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|field| field.name == name)
    }

    /// Check a record against the contract.
    ///
    /// # Errors
    ///
    /// Returns the first violated field: a required field that is missing or
    /// null, or any present field with the wrong JSON type.
    pub fn validate(&self, record: &Record) -> Result<(), ContractViolation> {
        for field in &self.fields {
            match record.get(&field.name) {
                None | Some(Value::Null) if field.required => {
                    return Err(ContractViolation {
                        field: field.name.clone(),
                        reason: "is required".to_string(),
                    });
                }
                None | Some(Value::Null) => {}
                Some(value) if !field.kind.matches(value) => {
                    return Err(ContractViolation {
                        field: field.name.clone(),
                        reason: format!("must be {}", field.kind),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}
