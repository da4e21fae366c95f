//! Reportes de texto de Vivado: `report_timing_summary` y
//! `report_utilization`.
use eda_core::model::keys;
use eda_core::report::text::{extract_number_from_line, parse_pipe_table, record_timing, SeverityPatterns};
use eda_core::{ParsedReport, Table};

pub const VIVADO_SEVERITY: SeverityPatterns = SeverityPatterns { error: &["ERROR:"],
                                                                 critical_warning: &["CRITICAL WARNING:"],
                                                                 warning: &["WARNING:"] };

/// Filas de utilización que se exportan como métricas, en orden de
/// preferencia (7-series primero, UltraScale después).
const UTILIZATION_FIELDS: &[(&str, &[&str])] = &[(keys::LUT, &["Slice LUTs*", "Slice LUTs", "CLB LUTs*", "CLB LUTs"]),
                                                 ("lut_logic", &["LUT as Logic"]),
                                                 ("lut_mem", &["LUT as Memory"]),
                                                 (keys::FF, &["Register as Flip Flop", "CLB Registers"]),
                                                 (keys::LATCH, &["Register as Latch"]),
                                                 ("slice", &["Slice", "CLB"]),
                                                 (keys::BRAM_TILE, &["Block RAM Tile"]),
                                                 (keys::DSP, &["DSPs"])];

/// Design Timing Summary (WNS/TNS/WHS/THS) y el periodo del primer clock
/// del Clock Summary. Sin periodo en el reporte se usa `clock_period`.
pub fn parse_timing_summary(text: &str, clock_period: Option<f64>, report: &mut ParsedReport) -> bool {
    let mut lines = text.lines().map(str::trim);
    if lines.by_ref().find(|l| l.contains("WNS(ns)") && l.contains("TNS(ns)")).is_none() {
        return false;
    }
    let Some(values) = lines.find(|l| !l.is_empty() && !l.starts_with('-')) else {
        return false;
    };
    let nums: Vec<f64> = values.split_whitespace().filter_map(|t| t.parse().ok()).collect();
    if nums.len() < 8 {
        return false;
    }
    report.set_metric(keys::TNS, nums[1]);
    report.set_metric("failing_endpoints", nums[2]);
    report.set_metric(keys::WHS, nums[4]);
    report.set_metric("ths", nums[5]);
    report.set_metric("hold_failing_endpoints", nums[6]);
    let period = clock_summary_period(text).or(clock_period);
    record_timing(report, nums[0], period);
    true
}

fn clock_summary_period(text: &str) -> Option<f64> {
    let mut lines = text.lines().map(str::trim).skip_while(|l| *l != "Clock Summary");
    lines.next()?;
    lines.find(|l| l.starts_with("Clock") && l.contains("Period"))?;
    let row = lines.find(|l| !l.is_empty() && !l.starts_with('-'))?;
    // la forma de onda `{0.000 2.500}` va antes del periodo
    let after_wave = row.split_once('}').map(|(_, rest)| rest)?;
    extract_number_from_line(after_wave)
}

/// Tablas `Site Type` de cada sección numerada (`1. Slice Logic`, ...).
pub fn parse_utilization(text: &str, report: &mut ParsedReport) -> bool {
    let lines: Vec<&str> = text.lines().collect();
    let headings: Vec<(usize, String)> = lines.iter()
                                              .enumerate()
                                              .filter_map(|(i, l)| section_heading(l).map(|h| (i, h)))
                                              .collect();
    let mut tables: Vec<(String, Table)> = Vec::new();
    for (n, (start, name)) in headings.iter().enumerate() {
        let end = headings.get(n + 1).map(|(i, _)| *i).unwrap_or(lines.len());
        let body = lines[start + 1..end].join("\n");
        if let Some(table) = parse_pipe_table(&body, "Site Type").filter(|t| !t.is_empty()) {
            tables.push((name.clone(), table));
        }
    }
    if tables.is_empty() {
        return false;
    }
    for (metric, rows) in UTILIZATION_FIELDS {
        let used = rows.iter()
                       .find_map(|row| tables.iter().find_map(|(_, t)| t.lookup(row, "Used")))
                       .and_then(|v| v.trim().parse::<f64>().ok());
        if let Some(v) = used {
            report.set_metric(metric, v);
        }
    }
    for (name, table) in tables {
        report.add_table(&format!("utilization.{name}"), table);
    }
    true
}

fn section_heading(line: &str) -> Option<String> {
    let (num, title) = line.trim().split_once(". ")?;
    if num.is_empty() || !num.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(title.trim().to_ascii_lowercase().replace(' ', "_"))
}
