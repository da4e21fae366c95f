//! Esquema declarativo de settings.
//!
//! Cada flujo declara sus campos con tipo, default y rango. `SettingsSchema::common`
//! aporta los campos compartidos por todos los flujos; un flujo puede
//! redefinir un campo común (p.ej. otro default) declarándolo de nuevo.
//! Las reglas cruzadas (`CrossFieldRule`) corren después de normalizar cada
//! campo y pueden derivar valores o reportar violaciones.
use std::collections::BTreeMap;
use std::path::Path;

use eda_domain::units::{mhz_to_period_ns, parse_freq_mhz, parse_time_ns, period_ns_to_mhz};
use serde_json::{json, Map, Value};

use crate::errors::FieldViolation;

/// Rango numérico inclusivo (o estricto en el mínimo).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NumRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub strict_min: bool,
}

impl NumRange {
    fn check(&self, v: f64) -> Result<(), String> {
        if let Some(min) = self.min {
            if self.strict_min && v <= min {
                return Err(format!("must be greater than {min}"));
            }
            if !self.strict_min && v < min {
                return Err(format!("must be at least {min}"));
            }
        }
        if let Some(max) = self.max {
            if v > max {
                return Err(format!("must be at most {max}"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Bool,
    Integer,
    Float,
    Text,
    Choice(Vec<String>),
    Path { must_exist: bool },
    TextList,
    Map,
    /// Número en ns o string con unidad; se normaliza a ns.
    Time,
    /// Número en MHz o string con unidad; se normaliza a MHz.
    Frequency,
    Any,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub ty: FieldType,
    pub default: Option<Value>,
    pub required: bool,
    pub range: NumRange,
    pub description: String,
}

impl FieldSpec {
    fn of(name: &str, ty: FieldType) -> Self {
        Self { name: name.to_string(),
               ty,
               default: None,
               required: false,
               range: NumRange::default(),
               description: String::new() }
    }

    pub fn bool(name: &str, default: bool) -> Self {
        Self::of(name, FieldType::Bool).default(json!(default))
    }
    pub fn integer(name: &str) -> Self {
        Self::of(name, FieldType::Integer)
    }
    pub fn float(name: &str) -> Self {
        Self::of(name, FieldType::Float)
    }
    pub fn text(name: &str) -> Self {
        Self::of(name, FieldType::Text)
    }
    pub fn choice(name: &str, options: &[&str]) -> Self {
        Self::of(name, FieldType::Choice(options.iter().map(|o| o.to_string()).collect()))
    }
    pub fn path(name: &str) -> Self {
        Self::of(name, FieldType::Path { must_exist: false })
    }
    pub fn text_list(name: &str) -> Self {
        Self::of(name, FieldType::TextList).default(json!([]))
    }
    pub fn map(name: &str) -> Self {
        Self::of(name, FieldType::Map).default(json!({}))
    }
    pub fn time(name: &str) -> Self {
        Self::of(name, FieldType::Time)
    }
    pub fn frequency(name: &str) -> Self {
        Self::of(name, FieldType::Frequency)
    }
    pub fn any(name: &str) -> Self {
        Self::of(name, FieldType::Any)
    }

    pub fn default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn describe(mut self, text: &str) -> Self {
        self.description = text.to_string();
        self
    }

    pub fn at_least(mut self, min: f64) -> Self {
        self.range.min = Some(min);
        self.range.strict_min = false;
        self
    }

    pub fn at_most(mut self, max: f64) -> Self {
        self.range.max = Some(max);
        self
    }

    /// Estrictamente mayor que cero.
    pub fn positive(mut self) -> Self {
        self.range.min = Some(0.0);
        self.range.strict_min = true;
        self
    }

    pub fn must_exist(mut self) -> Self {
        if let FieldType::Path { must_exist } = &mut self.ty {
            *must_exist = true;
        }
        self
    }

    /// Valida un valor presente y devuelve su forma normalizada.
    pub fn check(&self, value: &Value) -> Result<Value, String> {
        match &self.ty {
            FieldType::Bool => as_bool(value).map(Value::Bool),
            FieldType::Integer => {
                let n = as_integer(value)?;
                self.range.check(n as f64)?;
                Ok(json!(n))
            }
            FieldType::Float => self.finite(as_float(value)?),
            FieldType::Time => self.finite(parse_time_ns(value).map_err(|e| e.to_string())?),
            FieldType::Frequency => self.finite(parse_freq_mhz(value).map_err(|e| e.to_string())?),
            FieldType::Text => value.as_str()
                                    .map(|s| Value::String(s.to_string()))
                                    .ok_or_else(|| format!("expected a string, got {value}")),
            FieldType::Choice(options) => {
                let s = value.as_str().ok_or_else(|| format!("expected a string, got {value}"))?;
                if options.iter().any(|o| o == s) {
                    Ok(Value::String(s.to_string()))
                } else {
                    Err(format!("{s:?} is not one of [{}]", options.join(", ")))
                }
            }
            FieldType::Path { must_exist } => {
                let s = value.as_str().ok_or_else(|| format!("expected a path string, got {value}"))?;
                if *must_exist && !Path::new(s).exists() {
                    return Err(format!("path {s} does not exist"));
                }
                Ok(Value::String(s.to_string()))
            }
            FieldType::TextList => match value {
                // un string suelto se acepta como lista de un elemento
                Value::String(s) => Ok(json!([s])),
                Value::Array(items) => {
                    let mut out = Vec::with_capacity(items.len());
                    for (i, it) in items.iter().enumerate() {
                        match it.as_str() {
                            Some(s) => out.push(Value::String(s.to_string())),
                            None => return Err(format!("item {i} is not a string")),
                        }
                    }
                    Ok(Value::Array(out))
                }
                other => Err(format!("expected a list of strings, got {other}")),
            },
            FieldType::Map => match value {
                Value::Object(_) => Ok(value.clone()),
                other => Err(format!("expected a mapping, got {other}")),
            },
            FieldType::Any => Ok(value.clone()),
        }
    }

    fn finite(&self, v: f64) -> Result<Value, String> {
        if !v.is_finite() {
            return Err("must be a finite number".to_string());
        }
        self.range.check(v)?;
        Ok(json!(v))
    }
}

fn as_bool(value: &Value) -> Result<bool, String> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) if n.as_u64() == Some(0) => Ok(false),
        Value::Number(n) if n.as_u64() == Some(1) => Ok(true),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(format!("expected a boolean, got {s:?}")),
        },
        other => Err(format!("expected a boolean, got {other}")),
    }
}

fn as_integer(value: &Value) -> Result<i64, String> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
                _ => Err(format!("expected an integer, got {n}")),
            }
        }
        Value::String(s) => s.trim().parse().map_err(|_| format!("expected an integer, got {s:?}")),
        other => Err(format!("expected an integer, got {other}")),
    }
}

fn as_float(value: &Value) -> Result<f64, String> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| format!("expected a number, got {n}")),
        Value::String(s) => s.trim().parse().map_err(|_| format!("expected a number, got {s:?}")),
        other => Err(format!("expected a number, got {other}")),
    }
}

/// Regla cruzada entre campos ya normalizados.
pub type CrossFieldRule = fn(&mut BTreeMap<String, Value>) -> Vec<FieldViolation>;

#[derive(Debug, Clone)]
pub struct SettingsSchema {
    flow: String,
    fields: Vec<FieldSpec>,
    rules: Vec<(&'static str, CrossFieldRule)>,
}

impl SettingsSchema {
    pub fn new(flow: &str) -> Self {
        Self { flow: flow.to_string(),
               fields: Vec::new(),
               rules: Vec::new() }
    }

    /// Campos comunes a todos los flujos.
    pub fn common(flow: &str) -> Self {
        Self::new(flow).field(FieldSpec::bool("verbose", false))
                       .field(FieldSpec::bool("debug", false))
                       .field(FieldSpec::bool("quiet", false))
                       .field(FieldSpec::integer("timeout_seconds").default(json!(7200))
                                                                   .at_least(1.0)
                                                                   .describe("wall-clock limit of the tool process"))
                       .field(FieldSpec::integer("nthreads").at_least(1.0))
                       .field(FieldSpec::bool("fail_on_critical_warning", false))
                       .field(FieldSpec::bool("fail_on_timing", false))
                       .rule("quiet_vs_verbose", quiet_vs_verbose)
    }

    /// Agrega (o reemplaza) un campo.
    pub fn field(mut self, spec: FieldSpec) -> Self {
        match self.fields.iter_mut().find(|f| f.name == spec.name) {
            Some(existing) => *existing = spec,
            None => self.fields.push(spec),
        }
        self
    }

    pub fn rule(mut self, name: &'static str, rule: CrossFieldRule) -> Self {
        self.rules.push((name, rule));
        self
    }

    /// Campos `clock_period` (ns) / `clock_frequency` (MHz) mutuamente derivados.
    pub fn with_clock_fields(self) -> Self {
        self.field(FieldSpec::time("clock_period").positive().describe("target clock period"))
            .field(FieldSpec::frequency("clock_frequency").positive().describe("target clock frequency"))
            .rule("clock_period_frequency", derive_clock)
    }

    pub fn flow(&self) -> &str {
        &self.flow
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field_spec(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub(crate) fn rules(&self) -> &[(&'static str, CrossFieldRule)] {
        &self.rules
    }

    /// Objeto con todos los defaults declarados.
    pub fn defaults(&self) -> Value {
        let map: Map<String, Value> = self.fields
                                          .iter()
                                          .filter_map(|f| f.default.clone().map(|d| (f.name.clone(), d)))
                                          .collect();
        Value::Object(map)
    }
}

fn quiet_vs_verbose(values: &mut BTreeMap<String, Value>) -> Vec<FieldViolation> {
    let on = |k: &str| values.get(k).and_then(Value::as_bool).unwrap_or(false);
    if on("quiet") && (on("verbose") || on("debug")) {
        values.insert("quiet".to_string(), Value::Bool(false));
    }
    Vec::new()
}

fn derive_clock(values: &mut BTreeMap<String, Value>) -> Vec<FieldViolation> {
    let period = values.get("clock_period").and_then(Value::as_f64);
    let freq = values.get("clock_frequency").and_then(Value::as_f64);
    match (period, freq) {
        // el periodo manda cuando vienen ambos
        (Some(p), _) => {
            values.insert("clock_frequency".to_string(), json!(period_ns_to_mhz(p)));
        }
        (None, Some(f)) => {
            values.insert("clock_period".to_string(), json!(mhz_to_period_ns(f)));
        }
        (None, None) => {}
    }
    Vec::new()
}
