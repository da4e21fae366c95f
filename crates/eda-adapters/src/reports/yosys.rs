//! Salida de Yosys: log y estadística de celdas (`stat`).
use eda_core::model::keys;
use eda_core::report::text::SeverityPatterns;
use eda_core::{ParsedReport, Table};

pub const YOSYS_SEVERITY: SeverityPatterns = SeverityPatterns { error: &["ERROR:"],
                                                                critical_warning: &[],
                                                                warning: &["Warning:"] };

/// Lee el último bloque de celdas de `stat` (el del top o el resumen de
/// jerarquía). Acepta el formato clásico (`Number of cells: N` + `NAME N`)
/// y el nuevo (`N cells` + `N NAME`).
pub fn parse_stat(text: &str, report: &mut ParsedReport) -> bool {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let Some(start) = lines.iter().rposition(|l| cell_total(l).is_some()) else {
        return false;
    };
    let total = cell_total(lines[start]).unwrap_or_default();
    let mut table = Table::new(["cell", "count"]);
    let (mut lut, mut ff, mut bram, mut dsp) = (0u64, 0u64, 0u64, 0u64);
    for line in &lines[start + 1..] {
        let Some((name, count)) = cell_row(line) else { break };
        let upper = name.to_ascii_uppercase();
        if upper.contains("LUT") || upper.ends_with("_LC") {
            lut += count;
        } else if upper.contains("FF") || upper.starts_with("FD") {
            ff += count;
        } else if upper.contains("RAM") || upper.starts_with("DP16K") {
            bram += count;
        } else if upper.contains("DSP") || upper.contains("MULT") || upper.contains("MAC16") {
            dsp += count;
        }
        table.push_row([name.to_string(), count.to_string()]);
    }
    report.set_metric(keys::CELLS, total);
    report.set_metric(keys::LUT, lut);
    report.set_metric(keys::FF, ff);
    report.set_metric(keys::BRAM_TILE, bram);
    report.set_metric(keys::DSP, dsp);
    report.add_table("cells", table);
    true
}

fn cell_total(line: &str) -> Option<u64> {
    if let Some(rest) = line.strip_prefix("Number of cells:") {
        return rest.trim().parse().ok();
    }
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(n), Some("cells"), None) => n.parse().ok(),
        _ => None,
    }
}

fn cell_row(line: &str) -> Option<(&str, u64)> {
    let mut parts = line.split_whitespace();
    let (a, b) = (parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Err(_), Ok(n)) => Some((a, n)),
        (Ok(n), Err(_)) => Some((b, n)),
        _ => None,
    }
}
