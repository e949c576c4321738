use crate::error::SpecificationError;
use crate::literal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structured description of the part to build, produced once per run
/// from the natural-language prompt and read-only thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specification {
    pub part_name: String,
    pub description: String,
    pub cad_operations: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Map<String, Value>>,
}

impl Specification {
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).expect("specification always serializes")
    }
}

/// Which parsing tier accepted the raw text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseTier {
    StrictJson,
    PythonLiteral,
}

/// The ordered parsing chain. Model output is not guaranteed to be strict
/// JSON, so after stripping code fences each strategy is tried in turn:
/// strict JSON first, then the tolerant Python-literal tier re-serialized
/// into strict form. Collapsing this to a single strict parse would
/// reject a large share of otherwise usable responses.
pub fn parse_specification(raw: &str) -> Result<Specification, SpecificationError> {
    let (value, _tier) = parse_value(raw)?;
    validate_structure(&value)?;
    serde_json::from_value(value).map_err(|e| SpecificationError::InvalidField(e.to_string()))
}

/// Runs the fence-strip and tier chain, reporting which tier succeeded so
/// tests can target each one independently.
pub fn parse_value(raw: &str) -> Result<(Value, ParseTier), SpecificationError> {
    let cleaned = strip_code_fences(raw);
    if cleaned.is_empty() {
        return Err(SpecificationError::EmptyResponse);
    }

    let strict_err = match strict_json(cleaned) {
        Ok(value) => return Ok((value, ParseTier::StrictJson)),
        Err(e) => e,
    };

    match python_literal(cleaned) {
        Ok(value) => Ok((value, ParseTier::PythonLiteral)),
        Err(literal_err) => Err(SpecificationError::Syntax(format!(
            "strict JSON: {strict_err}; python literal: {literal_err}"
        ))),
    }
}

fn strict_json(input: &str) -> Result<Value, String> {
    serde_json::from_str(input).map_err(|e| e.to_string())
}

/// Tolerant tier: accept Python-literal looseness, then round-trip
/// through strict serialization so downstream consumers only ever see
/// valid JSON values.
fn python_literal(input: &str) -> Result<Value, String> {
    let value = literal::parse(input)?;
    let strict = serde_json::to_string(&value).map_err(|e| e.to_string())?;
    serde_json::from_str(&strict).map_err(|e| e.to_string())
}

fn validate_structure(value: &Value) -> Result<(), SpecificationError> {
    let map = value.as_object().ok_or(SpecificationError::NotAMapping)?;

    for key in ["part_name", "description", "cad_operations"] {
        if !map.contains_key(key) {
            return Err(SpecificationError::MissingKey(key));
        }
    }

    match map.get("cad_operations") {
        Some(Value::Array(ops)) if !ops.is_empty() => Ok(()),
        _ => Err(SpecificationError::EmptyOperations),
    }
}

/// Strips a surrounding markdown code fence (with or without a language
/// tag) and trims whitespace. Text without fences passes through trimmed.
pub fn strip_code_fences(input: &str) -> &str {
    let trimmed = input.trim();
    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let content_start = match after.find('\n') {
            Some(newline) => newline + 1,
            None => 0,
        };
        if let Some(end) = after[content_start..].find("```") {
            return after[content_start..content_start + end].trim();
        }
    }
    trimmed
}
