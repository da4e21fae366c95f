//! Búsqueda de la frecuencia máxima (Fmax) de un flujo de implementación.
//!
//! Cada iteración lanza varios candidatos en paralelo con `clock_period`
//! sobreescrito y estrecha el rango alrededor del mejor que cumple timing.
//! Todos los pedidos pasan por el mismo engine y comparten su cache: repetir
//! un barrido no relanza herramientas.
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::core::FlowEngine;
use crate::errors::CoreEngineError;
use crate::model::{keys, Fingerprint, NodeStatus};
use crate::resolver::FlowRequest;
use crate::supervisor::CancellationToken;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FmaxOptions {
    pub low_mhz: f64,
    pub high_mhz: f64,
    /// El barrido termina cuando el rango restante es menor que esto.
    pub resolution_mhz: f64,
    /// Candidatos por iteración; 0 = `jobs` del engine.
    pub points: usize,
    pub max_iterations: usize,
    /// Iteraciones seguidas sin mejorar antes de abandonar.
    pub max_no_improvement: usize,
    /// Timeout de cada ejecución candidata (`timeout_seconds`).
    pub run_timeout_seconds: Option<u64>,
    /// Rechaza candidatos que usan más LUTs.
    pub max_luts: Option<f64>,
}

impl Default for FmaxOptions {
    fn default() -> Self {
        Self { low_mhz: 10.0,
               high_mhz: 500.0,
               resolution_mhz: 0.09,
               points: 0,
               max_iterations: 16,
               max_no_improvement: 4,
               run_timeout_seconds: None,
               max_luts: None }
    }
}

/// Una ejecución del barrido.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FmaxPoint {
    pub iteration: usize,
    /// Periodo pedido (ns, múltiplo de 1 ps).
    pub clock_period: f64,
    pub frequency_mhz: f64,
    pub status: NodeStatus,
    /// Éxito con slack no negativo y dentro del límite de LUTs.
    pub accepted: bool,
    pub wns: Option<f64>,
    pub lut: Option<f64>,
    pub ff: Option<f64>,
    pub run_id: Uuid,
    pub fingerprint: Fingerprint,
    pub run_dir: Option<PathBuf>,
}

impl FmaxPoint {
    fn timing_failed(&self) -> bool {
        !self.accepted && self.wns.is_some_and(|w| w < 0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FmaxOutcome {
    pub flow: String,
    pub best: Option<FmaxPoint>,
    pub points: Vec<FmaxPoint>,
    pub iterations: usize,
}

impl FmaxOutcome {
    pub fn best_frequency(&self) -> Option<f64> {
        self.best.as_ref().map(|b| b.frequency_mhz)
    }

    pub fn accepted(&self) -> impl Iterator<Item = &FmaxPoint> {
        self.points.iter().filter(|p| p.accepted)
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn write_json(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)
    }
}

/// Periodo en ps enteros de una frecuencia en MHz.
fn period_ps(frequency_mhz: f64) -> u64 {
    (1.0e6 / frequency_mhz).round() as u64
}

/// Candidatos equiespaciados en `[low, high]`, sin repetir periodos ya
/// probados, de menor a mayor frecuencia.
fn candidates(low: f64, high: f64, points: usize, tried: &BTreeSet<u64>) -> Vec<u64> {
    let step = (high - low) / (points.max(2) - 1) as f64;
    let periods: BTreeSet<u64> = (0..points.max(2)).map(|i| low + step * i as f64)
                                                   .filter(|f| *f > 0.0)
                                                   .map(period_ps)
                                                   .filter(|ps| *ps > 0 && !tried.contains(ps))
                                                   .collect();
    periods.into_iter().rev().collect()
}

struct FmaxSearch<'a> {
    engine: &'a FlowEngine,
    request: &'a FlowRequest,
    options: &'a FmaxOptions,
    cancel: &'a CancellationToken,
}

impl FmaxSearch<'_> {
    fn request_for(&self, ps: u64) -> FlowRequest {
        let mut overrides = match &self.request.overrides {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        overrides.remove("clock_frequency");
        overrides.insert("clock_period".to_string(), json!(ps as f64 / 1000.0));
        if let Some(secs) = self.options.run_timeout_seconds {
            overrides.insert("timeout_seconds".to_string(), json!(secs.max(1)));
        }
        FlowRequest { overrides: Value::Object(overrides),
                      ..self.request.clone() }
    }

    fn attempt(&self, iteration: usize, ps: u64) -> Result<FmaxPoint, CoreEngineError> {
        let report = self.engine.run_with_cancel(&self.request_for(ps), self.cancel)?;
        let root = report.root_result()
                         .ok_or_else(|| CoreEngineError::Internal(format!("run {} has no root result", report.run_id)))?;
        let wns = root.metric_f64(keys::WNS);
        let lut = root.metric_f64(keys::LUT);
        let within_luts = match (self.options.max_luts, lut) {
            (Some(max), Some(used)) => used <= max,
            _ => true,
        };
        let accepted = root.status == NodeStatus::Succeeded && wns.is_some_and(|w| w >= 0.0) && within_luts;
        let clock_period = ps as f64 / 1000.0;
        Ok(FmaxPoint { iteration,
                       clock_period,
                       frequency_mhz: 1000.0 / clock_period,
                       status: root.status,
                       accepted,
                       wns,
                       lut,
                       ff: root.metric_f64(keys::FF),
                       run_id: report.run_id,
                       fingerprint: root.fingerprint.clone(),
                       run_dir: root.run_dir.clone() })
    }

    fn run_batch(&self, iteration: usize, batch: &[u64]) -> Result<Vec<FmaxPoint>, CoreEngineError> {
        thread::scope(|s| {
            let handles: Vec<_> = batch.iter().map(|ps| s.spawn(move || self.attempt(iteration, *ps))).collect();
            handles.into_iter()
                   .map(|h| h.join().unwrap_or_else(|_| Err(CoreEngineError::Internal("fmax candidate panicked".into()))))
                   .collect()
        })
    }

    fn run(self) -> Result<FmaxOutcome, CoreEngineError> {
        let opts = self.options;
        let points = (if opts.points == 0 { self.engine.config().jobs } else { opts.points }).max(2);
        let resolution = opts.resolution_mhz.max(1e-3);
        let (mut low, mut high) = (opts.low_mhz.max(1e-3), opts.high_mhz);

        let mut tried = BTreeSet::new();
        let mut all: Vec<FmaxPoint> = Vec::new();
        let mut best: Option<FmaxPoint> = None;
        let mut no_improvement = 0usize;
        let mut iterations = 0usize;

        while iterations < opts.max_iterations && !self.cancel.is_cancelled() {
            if high - low < resolution {
                log::debug!("fmax: range [{low:.3}, {high:.3}] closed");
                break;
            }
            let step = (high - low) / (points - 1) as f64;
            let batch = candidates(low, high, points, &tried);
            if batch.is_empty() {
                break;
            }
            iterations += 1;
            tried.extend(batch.iter().copied());
            log::info!("fmax iteration {iterations}: {} candidate(s) in [{low:.3}, {high:.3}] MHz", batch.len());
            all.extend(self.run_batch(iterations, &batch)?);

            let previous = best.as_ref().map(|b| b.frequency_mhz);
            best = all.iter()
                      .filter(|p| p.accepted)
                      .max_by(|a, b| a.frequency_mhz.total_cmp(&b.frequency_mhz))
                      .cloned();
            let floor = best.as_ref().map_or(0.0, |b| b.frequency_mhz);
            let ceiling = all.iter()
                             .filter(|p| p.timing_failed() && p.frequency_mhz > floor)
                             .map(|p| p.frequency_mhz)
                             .min_by(f64::total_cmp);

            match (&best, previous) {
                (Some(b), prev) if prev.map_or(true, |p| b.frequency_mhz > p) => {
                    log::info!("fmax: {:.3} MHz meets timing (wns={:?})", b.frequency_mhz, b.wns);
                    no_improvement = 0;
                }
                _ => {
                    no_improvement += 1;
                    if no_improvement > opts.max_no_improvement {
                        log::info!("fmax: no improvement after {no_improvement} iteration(s)");
                        break;
                    }
                }
            }
            if step < resolution / 2.0 {
                break;
            }

            match &best {
                Some(b) => {
                    low = b.frequency_mhz + resolution / 2.0;
                    high = match ceiling {
                        Some(c) => c - resolution / 2.0,
                        None => {
                            // sin cota superior: el slack positivo estima la frecuencia alcanzable
                            let estimate = b.wns
                                            .filter(|w| *w > 0.0 && b.clock_period - w > 0.0)
                                            .map_or(b.frequency_mhz, |w| 1000.0 / (b.clock_period - w));
                            estimate.max(b.frequency_mhz + step) + resolution
                        }
                    };
                }
                None => {
                    high = low - resolution / 2.0;
                    low /= 2.0;
                }
            }
        }

        match &best {
            Some(b) => log::info!("fmax of `{}`: {:.3} MHz ({} run(s))", self.request.flow, b.frequency_mhz, all.len()),
            None => log::warn!("fmax of `{}`: no candidate met timing ({} run(s))", self.request.flow, all.len()),
        }
        Ok(FmaxOutcome { flow: self.request.flow.clone(),
                         best,
                         points: all,
                         iterations })
    }
}

impl FlowEngine {
    /// Busca la mayor frecuencia a la que `request` cumple timing.
    pub fn fmax_sweep(&self, request: &FlowRequest, options: &FmaxOptions) -> Result<FmaxOutcome, CoreEngineError> {
        self.fmax_sweep_with_cancel(request, options, &CancellationToken::new())
    }

    pub fn fmax_sweep_with_cancel(&self,
                                  request: &FlowRequest,
                                  options: &FmaxOptions,
                                  cancel: &CancellationToken)
                                  -> Result<FmaxOutcome, CoreEngineError> {
        if options.low_mhz.is_nan() || options.high_mhz.is_nan() || options.high_mhz <= options.low_mhz {
            return Err(CoreEngineError::InvalidSearch(format!("range [{}, {}] MHz is empty", options.low_mhz, options.high_mhz)));
        }
        FmaxSearch { engine: self,
                     request,
                     options,
                     cancel }.run()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn periods_are_whole_picoseconds() {
        assert_eq!(period_ps(100.0), 10_000);
        assert_eq!(period_ps(150.0), 6_667);
    }

    #[test]
    fn candidates_skip_tried_periods() {
        let tried: BTreeSet<u64> = [10_000].into();
        let c = candidates(50.0, 100.0, 3, &tried);
        assert_eq!(c, vec![20_000, 13_333]);
    }

    #[test]
    fn close_frequencies_collapse_to_one_period() {
        let c = candidates(100.0, 100.0001, 4, &BTreeSet::new());
        assert_eq!(c, vec![10_000]);
    }
}
