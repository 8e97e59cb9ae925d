//! Template parse/match/extract/expand (spec §4.3).

use std::collections::HashMap;

use serde_json::Value;

use crate::grammar::{parse_placeholder, TypeTag, ValidationKind};

/// A fully parsed template: alternating static literal parts and
/// placeholders, with `|static_parts| == |param_names| + 1` (spec §3
/// invariant).
#[derive(Debug, Clone)]
pub struct ParsedTemplate {
    pub template_uri: String,
    pub static_parts: Vec<String>,
    pub param_names: Vec<String>,
    pub validations: Vec<crate::grammar::Validation>,
}

/// Errors from extraction or expansion.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TemplateError {
    #[error("missing required parameter: {0}")]
    MissingRequired(String),
    #[error("type mismatch for parameter {0}")]
    TypeMismatch(String),
    #[error("no match")]
    NoMatch,
}

/// Parses a template string into its static parts, parameter names, and
/// validations. Returns `None` on any grammar failure — parse failures never
/// poison any shared cache (spec §4.3 "Failure semantics").
#[must_use]
pub fn parse_template(uri: &str) -> Option<ParsedTemplate> {
    let mut static_parts = Vec::new();
    let mut param_names = Vec::new();
    let mut validations = Vec::new();

    let mut current_static = String::new();
    let mut chars = uri.char_indices().peekable();
    while let Some((_, ch)) = chars.next() {
        if ch == '{' {
            let mut inner = String::new();
            let mut closed = false;
            for (_, c) in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                inner.push(c);
            }
            if !closed {
                return None;
            }
            let placeholder = parse_placeholder(&inner).ok()?;
            static_parts.push(std::mem::take(&mut current_static));
            param_names.push(placeholder.name);
            validations.push(placeholder.validation);
        } else {
            current_static.push(ch);
        }
    }
    static_parts.push(current_static);

    debug_assert_eq!(static_parts.len(), param_names.len() + 1);
    Some(ParsedTemplate {
        template_uri: uri.to_string(),
        static_parts,
        param_names,
        validations,
    })
}

fn coerce(raw: &str, validation: &crate::grammar::Validation) -> Result<Value, TemplateError> {
    match &validation.kind {
        ValidationKind::String => Ok(Value::String(raw.to_string())),
        ValidationKind::Typed(TypeTag::String) => Ok(Value::String(raw.to_string())),
        ValidationKind::Typed(TypeTag::Int) => {
            let n: i64 = raw.parse().map_err(|_| TemplateError::TypeMismatch(raw.to_string()))?;
            if let Some((min, max)) = validation.range {
                if (n as f64) < min || (n as f64) > max {
                    return Err(TemplateError::TypeMismatch(raw.to_string()));
                }
            }
            Ok(Value::from(n))
        }
        ValidationKind::Typed(TypeTag::Float) => {
            let f: f64 = raw.parse().map_err(|_| TemplateError::TypeMismatch(raw.to_string()))?;
            if let Some((min, max)) = validation.range {
                if f < min || f > max {
                    return Err(TemplateError::TypeMismatch(raw.to_string()));
                }
            }
            Ok(serde_json::json!(f))
        }
        ValidationKind::Typed(TypeTag::Bool) => match raw {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            _ => Err(TemplateError::TypeMismatch(raw.to_string())),
        },
        ValidationKind::Pattern(glob) => {
            if glob.is_match(raw) {
                Ok(Value::String(raw.to_string()))
            } else {
                Err(TemplateError::TypeMismatch(raw.to_string()))
            }
        }
    }
}

impl ParsedTemplate {
    /// Extracts typed parameter values from a concrete URI, walking
    /// left-to-right and greedily matching the *leftmost* occurrence of each
    /// next static part (spec §4.3 "Extract").
    pub fn extract(&self, uri: &str) -> Result<HashMap<String, Value>, TemplateError> {
        let first = &self.static_parts[0];
        if !uri.starts_with(first.as_str()) {
            return Err(TemplateError::NoMatch);
        }
        let mut cursor = first.len();
        let mut out = HashMap::new();

        for (i, name) in self.param_names.iter().enumerate() {
            let next_static = &self.static_parts[i + 1];
            let remaining = &uri[cursor..];
            let match_pos = if next_static.is_empty() {
                remaining.len()
            } else {
                remaining.find(next_static.as_str()).ok_or(TemplateError::NoMatch)?
            };
            let raw_value = &remaining[..match_pos];
            let validation = &self.validations[i];

            if raw_value.is_empty() {
                if validation.required {
                    return Err(TemplateError::MissingRequired(name.clone()));
                }
                if let Some(default) = &validation.default {
                    out.insert(name.clone(), coerce(default, validation)?);
                }
            } else {
                out.insert(name.clone(), coerce(raw_value, validation)?);
            }
            cursor += match_pos + next_static.len();
        }

        if cursor != uri.len() {
            return Err(TemplateError::NoMatch);
        }
        Ok(out)
    }

    /// Returns whether `uri` is derivable from this template, without
    /// exposing the captured values (spec §4.3 "Match").
    #[must_use]
    pub fn matches(&self, uri: &str) -> bool {
        self.extract(uri).is_ok()
    }

    /// Produces a concrete URI from a key→value map, failing with
    /// `missing_required`/`type_mismatch` per spec §4.3 "Expand".
    pub fn expand(&self, values: &HashMap<String, Value>) -> Result<String, TemplateError> {
        let mut out = self.static_parts[0].clone();
        for (i, name) in self.param_names.iter().enumerate() {
            let validation = &self.validations[i];
            let value = match values.get(name) {
                Some(v) => Some(v.clone()),
                None => validation
                    .default
                    .as_ref()
                    .map(|d| coerce(d, validation))
                    .transpose()?,
            };
            match value {
                Some(v) => {
                    validate_value_type(&v, validation)?;
                    out.push_str(&value_to_uri_segment(&v));
                }
                None if validation.required => {
                    return Err(TemplateError::MissingRequired(name.clone()));
                }
                None => {}
            }
            out.push_str(&self.static_parts[i + 1]);
        }
        Ok(out)
    }
}

fn validate_value_type(
    value: &Value,
    validation: &crate::grammar::Validation,
) -> Result<(), TemplateError> {
    match &validation.kind {
        ValidationKind::Typed(TypeTag::Int) => {
            if !(value.is_i64() || value.is_u64()) {
                return Err(TemplateError::TypeMismatch("expected int".to_string()));
            }
        }
        ValidationKind::Typed(TypeTag::Float) => {
            if !value.is_number() {
                return Err(TemplateError::TypeMismatch("expected float".to_string()));
            }
        }
        ValidationKind::Typed(TypeTag::Bool) => {
            if !value.is_boolean() {
                return Err(TemplateError::TypeMismatch("expected bool".to_string()));
            }
        }
        ValidationKind::Pattern(glob) => {
            if let Some(s) = value.as_str() {
                if !glob.is_match(s) {
                    return Err(TemplateError::TypeMismatch("pattern mismatch".to_string()));
                }
            }
        }
        _ => {}
    }
    Ok(())
}

fn value_to_uri_segment(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string().trim_matches('"').to_string(),
    }
}
