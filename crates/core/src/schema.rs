//! JSON Schema validation.
//!
//! Wraps the `jsonschema` crate behind a small compiled-schema type used for
//! both tool argument validation and final-output contracts.

use serde_json::Value;

use crate::error::SchemaError;

/// A JSON Schema compiled once and validated against many instances.
pub struct CompiledSchema {
    raw: Value,
    validator: jsonschema::Validator,
}

impl CompiledSchema {
    /// Compile a schema document.
    pub fn compile(raw: Value) -> Result<Self, SchemaError> {
        let validator =
            jsonschema::validator_for(&raw).map_err(|e| SchemaError::Compile(e.to_string()))?;
        Ok(Self { raw, validator })
    }

    /// The original schema document (sent to the model alongside requests).
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Validate an instance, returning the first violation as a message.
    pub fn validate(&self, instance: &Value) -> Result<(), String> {
        self.validator
            .validate(instance)
            .map_err(|e| e.to_string())
    }

    /// Cheap validity check without error details.
    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validator.is_valid(instance)
    }
}

impl std::fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSchema").field("raw", &self.raw).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn weather_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "city": { "type": "string" },
                "temperature_c": { "type": "number" }
            },
            "required": ["city", "temperature_c"]
        })
    }

    #[test]
    fn accepts_conforming_instance() {
        let schema = CompiledSchema::compile(weather_schema()).unwrap();
        let instance = json!({"city": "Oslo", "temperature_c": -3.5});
        assert!(schema.validate(&instance).is_ok());
        assert!(schema.is_valid(&instance));
    }

    #[test]
    fn rejects_missing_required_field() {
        let schema = CompiledSchema::compile(weather_schema()).unwrap();
        let instance = json!({"city": "Oslo"});
        let err = schema.validate(&instance).unwrap_err();
        assert!(err.contains("temperature_c"), "unexpected message: {err}");
    }

    #[test]
    fn rejects_wrong_type() {
        let schema = CompiledSchema::compile(weather_schema()).unwrap();
        assert!(!schema.is_valid(&json!({"city": 7, "temperature_c": 1.0})));
    }

    #[test]
    fn invalid_schema_fails_to_compile() {
        let result = CompiledSchema::compile(json!({"type": "not-a-type"}));
        assert!(result.is_err());
    }
}
