//! Resolución de settings por capas.
//!
//! Orden de precedencia (de menor a mayor):
//! defaults del esquema < plataforma (injectors) < proyecto < overrides.
//! Todas las violaciones se acumulan y se reportan juntas.
use std::collections::BTreeMap;

use serde_json::Value;

use super::{SettingsSchema, Settings};
use crate::errors::{FieldViolation, SettingsValidationError};
use crate::injection::merge_json;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsLayers {
    pub platform: Value,
    pub project: Value,
    pub overrides: Value,
}

impl SettingsLayers {
    /// Valor crudo de las capas (sin defaults), para identificar nodos cuyos
    /// settings no validan.
    pub fn raw(&self) -> Value {
        serde_json::json!({
            "platform": self.platform,
            "project": self.project,
            "overrides": self.overrides,
        })
    }
}

pub fn resolve_settings(schema: &SettingsSchema, layers: &SettingsLayers) -> Result<Settings, SettingsValidationError> {
    let mut violations = Vec::new();
    let mut merged = schema.defaults();
    for (label, layer) in [("platform", &layers.platform), ("project", &layers.project), ("overrides", &layers.overrides)] {
        match layer {
            Value::Null => {}
            Value::Object(_) => merged = merge_json(&merged, layer),
            other => violations.push(FieldViolation::new(format!("<{label}>"), format!("settings layer must be a mapping, got {other}"))),
        }
    }

    let mut values = BTreeMap::new();
    let mut extra = BTreeMap::new();
    if let Value::Object(map) = merged {
        for (name, value) in map {
            match schema.field_spec(&name) {
                Some(spec) => {
                    if value.is_null() {
                        continue;
                    }
                    match spec.check(&value) {
                        Ok(v) => {
                            values.insert(name, v);
                        }
                        Err(msg) => violations.push(FieldViolation::new(name, msg)),
                    }
                }
                None => {
                    extra.insert(name, value);
                }
            }
        }
    }

    for (_, rule) in schema.rules() {
        violations.extend(rule(&mut values));
    }

    for spec in schema.fields().iter().filter(|f| f.required) {
        if !values.contains_key(&spec.name) && !violations.iter().any(|v| v.field == spec.name) {
            violations.push(FieldViolation::new(spec.name.clone(), "required field is missing"));
        }
    }

    if violations.is_empty() {
        Ok(Settings::from_parts(schema.flow().to_string(), values, extra))
    } else {
        Err(SettingsValidationError { flow: schema.flow().to_string(),
                                      violations })
    }
}
