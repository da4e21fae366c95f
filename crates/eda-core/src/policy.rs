//! Contrato de políticas de resultado.
//!
//! Tras PARSE, el engine pregunta a la política si las métricas registradas
//! convierten un éxito del proceso en FAILED. `StandardPolicy` es la
//! política por defecto del engine; las variantes configurables viven en
//! `eda-policies`.
use std::fmt::{self, Debug};

use serde::{Deserialize, Serialize};

use crate::model::keys;
use crate::report::ParsedReport;
use crate::settings::Settings;

/// Motivo por el que una política rechaza un resultado.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum PolicyReason {
    ToolErrors { count: u64 },
    CriticalWarnings { count: u64 },
    TimingNotMet { wns: f64 },
    TestsFailed { count: u64 },
    BlacklistedResource { resource: String, used: f64 },
}

impl fmt::Display for PolicyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyReason::ToolErrors { count } => write!(f, "tool reported {count} error(s)"),
            PolicyReason::CriticalWarnings { count } => write!(f, "{count} critical warning(s)"),
            PolicyReason::TimingNotMet { wns } => write!(f, "timing not met (wns = {wns} ns)"),
            PolicyReason::TestsFailed { count } => write!(f, "{count} test(s) failed"),
            PolicyReason::BlacklistedResource { resource, used } => {
                write!(f, "blacklisted resource `{resource}` used {used} time(s)")
            }
        }
    }
}

pub trait OutcomePolicy: Send + Sync + Debug {
    /// Lista vacía = aceptar.
    fn evaluate(&self, settings: &Settings, report: &ParsedReport) -> Vec<PolicyReason>;
}

/// Valor entero no negativo de una métrica de conteo (0 si falta).
pub fn count_metric(report: &ParsedReport, key: &str) -> u64 {
    report.metric_f64(key).filter(|v| *v > 0.0).map_or(0, |v| v.round() as u64)
}

/// Política por defecto.
///
/// - errores reportados en el log siempre rechazan;
/// - critical warnings rechazan con `fail_on_critical_warning`;
/// - `wns` negativo rechaza con `fail_on_timing`;
/// - tests fallidos siempre rechazan.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardPolicy;

impl OutcomePolicy for StandardPolicy {
    fn evaluate(&self, settings: &Settings, report: &ParsedReport) -> Vec<PolicyReason> {
        let mut reasons = Vec::new();
        let errors = count_metric(report, keys::ERRORS);
        if errors > 0 {
            reasons.push(PolicyReason::ToolErrors { count: errors });
        }
        let critical = count_metric(report, keys::CRITICAL_WARNINGS);
        if critical > 0 && settings.get_bool("fail_on_critical_warning") {
            reasons.push(PolicyReason::CriticalWarnings { count: critical });
        }
        if settings.get_bool("fail_on_timing") {
            if let Some(wns) = report.metric_f64(keys::WNS).filter(|w| *w < 0.0) {
                reasons.push(PolicyReason::TimingNotMet { wns });
            }
        }
        let failed = count_metric(report, keys::TESTS_FAILED);
        if failed > 0 {
            reasons.push(PolicyReason::TestsFailed { count: failed });
        }
        reasons
    }
}

/// Acepta todo: sólo se registran métricas.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordOnly;

impl OutcomePolicy for RecordOnly {
    fn evaluate(&self, _settings: &Settings, _report: &ParsedReport) -> Vec<PolicyReason> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{resolve_settings, SettingsLayers, SettingsSchema};
    use serde_json::json;

    fn settings(overrides: serde_json::Value) -> Settings {
        resolve_settings(&SettingsSchema::common("impl"),
                         &SettingsLayers { overrides,
                                           ..Default::default() }).unwrap()
    }

    fn report(metrics: &[(&str, f64)]) -> ParsedReport {
        let mut r = ParsedReport::new();
        for (k, v) in metrics {
            r.set_metric(k, *v);
        }
        r
    }

    #[test]
    fn log_errors_reject_a_clean_exit() {
        let r = report(&[(keys::ERRORS, 1.0), (keys::WARNINGS, 4.0)]);
        assert_eq!(StandardPolicy.evaluate(&settings(json!({})), &r), vec![PolicyReason::ToolErrors { count: 1 }]);
    }

    #[test]
    fn flags_gate_timing_and_critical_warnings() {
        let r = report(&[(keys::WNS, -2.5), (keys::CRITICAL_WARNINGS, 2.0)]);
        assert!(StandardPolicy.evaluate(&settings(json!({})), &r).is_empty());
        assert_eq!(StandardPolicy.evaluate(&settings(json!({"fail_on_timing": true, "fail_on_critical_warning": true})), &r),
                   vec![PolicyReason::CriticalWarnings { count: 2 }, PolicyReason::TimingNotMet { wns: -2.5 }]);
    }

    #[test]
    fn failed_tests_reject() {
        let r = report(&[(keys::TESTS_PASSED, 3.0), (keys::TESTS_FAILED, 1.0)]);
        assert_eq!(StandardPolicy.evaluate(&settings(json!({})), &r), vec![PolicyReason::TestsFailed { count: 1 }]);
        assert!(RecordOnly.evaluate(&settings(json!({})), &r).is_empty());
    }
}
