//! eda-policies – políticas de resultado basadas en métricas
//!
//! Un proceso que termina con código 0 no implica un resultado aceptable:
//! errores reportados en el log, timing no cumplido o recursos prohibidos
//! convierten el nodo en FAILED. Cada rechazo queda tipado como
//! `PolicyReason` para que el reporte del run lo explique.

use eda_core::model::keys;
use eda_core::policy::count_metric;
use eda_core::{OutcomePolicy, ParsedReport, PolicyReason, Settings};
use serde::{Deserialize, Serialize};

/// Umbrales fijos de la política. Los flags por flujo
/// (`fail_on_timing`, `fail_on_critical_warning`, `blacklisted_resources`)
/// se leen de los settings resueltos de cada nodo.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MetricsPolicyParams {
    /// Errores tolerados antes de rechazar.
    pub max_errors: u64,
    /// Holgura negativa tolerada (ns) cuando `fail_on_timing` está activo.
    pub timing_tolerance: f64,
    pub check_hold: bool,
}

impl Default for MetricsPolicyParams {
    fn default() -> Self {
        Self { max_errors: 0,
               timing_tolerance: 0.0,
               check_hold: true }
    }
}

/// Política del binario `edaflow`: `StandardPolicy` más tolerancias,
/// chequeo de hold y recursos prohibidos.
#[derive(Clone, Debug, Default)]
pub struct MetricsPolicy {
    params: MetricsPolicyParams,
}

impl MetricsPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: MetricsPolicyParams) -> Self {
        Self { params }
    }

    pub fn id(&self) -> &'static str {
        "metrics"
    }

    pub fn params(&self) -> &MetricsPolicyParams {
        &self.params
    }

    fn timing(&self, settings: &Settings, report: &ParsedReport) -> Option<PolicyReason> {
        if !settings.get_bool("fail_on_timing") {
            return None;
        }
        let mut worst = report.metric_f64(keys::WNS);
        if self.params.check_hold {
            if let Some(whs) = report.metric_f64(keys::WHS) {
                worst = Some(worst.map_or(whs, |w| w.min(whs)));
            }
        }
        worst.filter(|w| *w < -self.params.timing_tolerance)
             .map(|wns| PolicyReason::TimingNotMet { wns })
    }
}

/// Métrica que cuenta el uso de un recurso de la lista negra.
fn resource_metric(resource: &str) -> &str {
    match resource {
        "bram" | "ram" | "block_ram" => keys::BRAM_TILE,
        "dsps" | "mult" => keys::DSP,
        "latches" => keys::LATCH,
        other => other,
    }
}

impl OutcomePolicy for MetricsPolicy {
    fn evaluate(&self, settings: &Settings, report: &ParsedReport) -> Vec<PolicyReason> {
        let mut reasons = Vec::new();

        let errors = count_metric(report, keys::ERRORS);
        if errors > self.params.max_errors {
            reasons.push(PolicyReason::ToolErrors { count: errors });
        }
        let critical = count_metric(report, keys::CRITICAL_WARNINGS);
        if critical > 0 && settings.get_bool("fail_on_critical_warning") {
            reasons.push(PolicyReason::CriticalWarnings { count: critical });
        }
        if let Some(reason) = self.timing(settings, report) {
            reasons.push(reason);
        }
        let failed = count_metric(report, keys::TESTS_FAILED);
        if failed > 0 {
            reasons.push(PolicyReason::TestsFailed { count: failed });
        }
        for resource in settings.get_str_list("blacklisted_resources") {
            let metric = resource_metric(&resource);
            match report.metric_f64(metric) {
                Some(used) if used > 0.0 => reasons.push(PolicyReason::BlacklistedResource { resource, used }),
                Some(_) => {}
                None => log::debug!("{}: no `{metric}` metric to check blacklisted `{resource}`", settings.flow()),
            }
        }
        reasons
    }
}
