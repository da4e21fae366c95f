//! nextpnr: `--report` JSON (utilización y fmax) con respaldo en el log.
use std::collections::BTreeMap;

use eda_core::model::keys;
use eda_core::report::text::{extract_number_from_line, number_after, record_timing, SeverityPatterns};
use eda_core::{ParsedReport, Table};
use serde::Deserialize;

pub const NEXTPNR_SEVERITY: SeverityPatterns = SeverityPatterns { error: &["ERROR:"],
                                                                  critical_warning: &[],
                                                                  warning: &["Warning:"] };

#[derive(Debug, Deserialize)]
struct NextpnrReport {
    #[serde(default)]
    utilization: BTreeMap<String, ResourceUse>,
    #[serde(default)]
    fmax: BTreeMap<String, ClockFmax>,
}

#[derive(Debug, Deserialize)]
struct ResourceUse {
    used: u64,
    available: u64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct ClockFmax {
    achieved: f64,
    constraint: Option<f64>,
}

/// Nombre normalizado de los bels que se reportan como métricas.
fn resource_metric(bel: &str) -> Option<&'static str> {
    match bel {
        "TRELLIS_COMB" | "TRELLIS_SLICE" | "ICESTORM_LC" => Some(keys::LUT),
        "TRELLIS_FF" => Some(keys::FF),
        "DP16KD" | "ICESTORM_RAM" => Some(keys::BRAM_TILE),
        "MULT18X18D" | "ICESTORM_DSP" => Some(keys::DSP),
        _ => None,
    }
}

/// Parsea el JSON de `--report`. `Err` si no es JSON válido.
pub fn parse_report_json(text: &str, clock_period: Option<f64>, report: &mut ParsedReport) -> Result<(), serde_json::Error> {
    let parsed: NextpnrReport = serde_json::from_str(text)?;
    let mut table = Table::new(["resource", "used", "available"]);
    for (bel, usage) in &parsed.utilization {
        table.push_row([bel.clone(), usage.used.to_string(), usage.available.to_string()]);
        if let Some(metric) = resource_metric(bel) {
            // TRELLIS_SLICE sólo cuenta si no hay TRELLIS_COMB
            if bel == "TRELLIS_SLICE" && parsed.utilization.contains_key("TRELLIS_COMB") {
                continue;
            }
            report.set_metric(metric, usage.used);
        }
    }
    if !table.is_empty() {
        report.add_table("utilization", table);
    }
    record_worst_clock(parsed.fmax.into_values(), clock_period, report);
    Ok(())
}

/// Respaldo: última línea `Max frequency for clock '<clk>': F MHz (PASS at C MHz)`
/// de cada clock.
pub fn parse_log_fmax(log: &str, clock_period: Option<f64>, report: &mut ParsedReport) -> bool {
    let mut clocks: BTreeMap<&str, ClockFmax> = BTreeMap::new();
    for line in log.lines() {
        let Some(idx) = line.find("Max frequency for clock '") else { continue };
        let rest = &line[idx + "Max frequency for clock '".len()..];
        let Some((name, tail)) = rest.split_once("':") else { continue };
        if let Some(achieved) = extract_number_from_line(tail) {
            clocks.insert(name, ClockFmax { achieved,
                                            constraint: number_after(tail, " at ") });
        }
    }
    if clocks.is_empty() {
        return false;
    }
    record_worst_clock(clocks.into_values(), clock_period, report);
    true
}

/// El clock más lento decide: slack = periodo objetivo - periodo alcanzado.
fn record_worst_clock(clocks: impl Iterator<Item = ClockFmax>, clock_period: Option<f64>, report: &mut ParsedReport) {
    let Some(worst) = clocks.filter(|c| c.achieved > 0.0).min_by(|a, b| a.achieved.total_cmp(&b.achieved)) else {
        return;
    };
    let target = worst.constraint.filter(|c| *c > 0.0).map(|c| 1000.0 / c).or(clock_period);
    match target {
        Some(period) => record_timing(report, period - 1000.0 / worst.achieved, Some(period)),
        None => report.set_metric(keys::FMAX_MHZ, worst.achieved),
    }
}
