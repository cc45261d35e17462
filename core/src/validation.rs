//! Pre-flight structural checks for mutating payloads.
//!
//! A [`Validator`] holds an ordered list of [`FieldRule`]s and reports the
//! first rule a payload breaks. It is fail-fast: one message, naming one
//! field, in declaration order. Read operations are never validated.

use serde_json::Value;

use crate::types::Payload;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
}

/// Primitive JSON kind a field must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    String,
    Boolean,
}

impl FieldKind {
    fn matches(self, value: &Value) -> bool {
        match self {
            FieldKind::Integer => value.is_i64() || value.is_u64(),
            FieldKind::String => value.is_string(),
            FieldKind::Boolean => value.is_boolean(),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            FieldKind::Integer => "an integer",
            FieldKind::String => "a string",
            FieldKind::Boolean => "a boolean",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    pub name: &'static str,
    pub presence: Presence,
    pub kind: FieldKind,
    /// Maximum length in characters, for string fields.
    pub max_len: Option<usize>,
}

impl FieldRule {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            presence: Presence::Required,
            kind,
            max_len: None,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            presence: Presence::Optional,
            kind,
            max_len: None,
        }
    }

    pub const fn max_len(mut self, max_len: usize) -> Self {
        self.max_len = Some(max_len);
        self
    }

    fn check(&self, payload: &Payload) -> Result<(), String> {
        let value = match payload.get(self.name) {
            None | Some(Value::Null) => {
                return match self.presence {
                    Presence::Required => Err(format!("`{}` is required", self.name)),
                    Presence::Optional => Ok(()),
                };
            }
            Some(value) => value,
        };

        if !self.kind.matches(value) {
            return Err(format!("`{}` must be {}", self.name, self.kind.describe()));
        }

        if let (Some(max), Value::String(s)) = (self.max_len, value) {
            if s.chars().count() > max {
                return Err(format!(
                    "`{}` must be at most {max} characters",
                    self.name
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validator {
    rules: Vec<FieldRule>,
    require_non_empty: bool,
}

impl Validator {
    pub fn new(rules: impl Into<Vec<FieldRule>>) -> Self {
        Self {
            rules: rules.into(),
            require_non_empty: false,
        }
    }

    /// Reject empty payloads before any field rule runs.
    pub fn non_empty(mut self) -> Self {
        self.require_non_empty = true;
        self
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    /// Check `payload` against the rules in order. Returns the message for
    /// the first unmet rule.
    pub fn validate(&self, payload: &Payload) -> Result<(), String> {
        if self.require_non_empty && payload.is_empty() {
            return Err("payload must not be empty".to_string());
        }
        self.rules.iter().try_for_each(|rule| rule.check(payload))
    }
}
