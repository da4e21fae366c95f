//! Conversión de unidades de tiempo y frecuencia.
//!
//! Los settings aceptan números "desnudos" (ns para tiempos, MHz para
//! frecuencias) o strings con sufijo de unidad: `"5ns"`, `"2500 ps"`,
//! `"200MHz"`, `"0.1 GHz"`.
use serde_json::Value;

use crate::errors::DomainError;

fn split_unit(raw: &str) -> (&str, &str) {
    let raw = raw.trim();
    let idx = raw.find(|c: char| c.is_ascii_alphabetic()).unwrap_or(raw.len());
    (raw[..idx].trim(), raw[idx..].trim())
}

fn parse_scaled(v: &Value, scale: fn(&str) -> Option<f64>) -> Result<f64, DomainError> {
    match v {
        Value::Number(n) => n.as_f64().ok_or_else(|| DomainError::InvalidUnit(n.to_string())),
        Value::String(s) => {
            let (num, unit) = split_unit(s);
            let factor = scale(&unit.to_ascii_lowercase()).ok_or_else(|| DomainError::InvalidUnit(s.clone()))?;
            let n: f64 = num.parse().map_err(|_| DomainError::InvalidUnit(s.clone()))?;
            Ok(n * factor)
        }
        other => Err(DomainError::InvalidUnit(other.to_string())),
    }
}

/// Tiempo en nanosegundos.
pub fn parse_time_ns(v: &Value) -> Result<f64, DomainError> {
    parse_scaled(v, |unit| match unit {
        "" | "ns" => Some(1.0),
        "ps" => Some(1e-3),
        "fs" => Some(1e-6),
        "us" => Some(1e3),
        "ms" => Some(1e6),
        "s" => Some(1e9),
        _ => None,
    })
}

/// Frecuencia en MHz.
pub fn parse_freq_mhz(v: &Value) -> Result<f64, DomainError> {
    parse_scaled(v, |unit| match unit {
        "" | "mhz" => Some(1.0),
        "hz" => Some(1e-6),
        "khz" => Some(1e-3),
        "ghz" => Some(1e3),
        _ => None,
    })
}

pub fn period_ns_to_mhz(period_ns: f64) -> f64 {
    1000.0 / period_ns
}

pub fn mhz_to_period_ns(freq_mhz: f64) -> f64 {
    1000.0 / freq_mhz
}
