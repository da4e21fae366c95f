//! Helpers de texto para parsers de logs y reportes.
use crate::model::{keys, Table};
use crate::report::ParsedReport;

/// Prefijos de línea que identifican la severidad de un mensaje.
#[derive(Debug, Clone, Copy)]
pub struct SeverityPatterns {
    pub error: &'static [&'static str],
    pub critical_warning: &'static [&'static str],
    pub warning: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeverityCounts {
    pub errors: u64,
    pub critical_warnings: u64,
    pub warnings: u64,
}

impl SeverityCounts {
    pub fn record(&self, report: &mut ParsedReport) {
        report.set_metric(keys::ERRORS, self.errors);
        report.set_metric(keys::CRITICAL_WARNINGS, self.critical_warnings);
        report.set_metric(keys::WARNINGS, self.warnings);
    }
}

/// Cuenta líneas por severidad. La severidad crítica se evalúa antes que la
/// de warning.
pub fn count_severities(log: &str, patterns: &SeverityPatterns) -> SeverityCounts {
    let mut counts = SeverityCounts::default();
    for line in log.lines() {
        let line = line.trim_start();
        let starts = |ps: &[&str]| ps.iter().any(|p| line.starts_with(p));
        if starts(patterns.critical_warning) {
            counts.critical_warnings += 1;
        } else if starts(patterns.error) {
            counts.errors += 1;
        } else if starts(patterns.warning) {
            counts.warnings += 1;
        }
    }
    counts
}

/// Primer número (con signo y decimales) que aparece en la línea.
pub fn extract_number_from_line(line: &str) -> Option<f64> {
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        let starts_number = c.is_ascii_digit()
                            || ((c == b'-' || c == b'.') && bytes.get(i + 1).map(|n| n.is_ascii_digit()).unwrap_or(false));
        if starts_number {
            let mut j = i + 1;
            while j < bytes.len() && (bytes[j].is_ascii_digit() || bytes[j] == b'.') {
                j += 1;
            }
            if let Ok(v) = line[i..j].trim_end_matches('.').parse::<f64>() {
                return Some(v);
            }
            i = j;
        } else {
            i += 1;
        }
    }
    None
}

/// Número que sigue a `key` en la primera línea que lo contiene.
pub fn number_after(text: &str, key: &str) -> Option<f64> {
    text.lines()
        .find_map(|l| l.find(key).and_then(|idx| extract_number_from_line(&l[idx + key.len()..])))
}

/// Parsea la primera tabla estilo `| a | b |` cuya cabecera contiene
/// `header_hint`. Las líneas separadoras (`+---+`) se saltan y la tabla
/// termina en la primera línea que no es de tabla.
pub fn parse_pipe_table(text: &str, header_hint: &str) -> Option<Table> {
    let mut lines = text.lines().map(str::trim).skip_while(|l| !(l.starts_with('|') && l.contains(header_hint)));
    let header = split_pipe_row(lines.next()?);
    let mut table = Table::new(header);
    for line in lines {
        if line.starts_with('+') {
            continue;
        }
        if !line.starts_with('|') {
            break;
        }
        table.push_row(split_pipe_row(line));
    }
    Some(table)
}

fn split_pipe_row(line: &str) -> Vec<String> {
    line.trim_matches('|').split('|').map(|c| c.trim().to_string()).collect()
}

/// CSV simple con cabecera; comillas exteriores se eliminan.
pub fn parse_csv(text: &str) -> Option<Table> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let split = |l: &str| -> Vec<String> { l.split(',').map(|c| c.trim().trim_matches('"').to_string()).collect() };
    let mut table = Table::new(split(lines.next()?));
    for line in lines {
        table.push_row(split(line));
    }
    Some(table)
}

/// Registra `wns` y, si hay periodo objetivo, `fmax_mhz = 1000 / (period - wns)`.
pub fn record_timing(report: &mut ParsedReport, wns: f64, clock_period: Option<f64>) {
    report.set_metric(keys::WNS, wns);
    if let Some(period) = clock_period {
        report.set_metric(keys::CLOCK_PERIOD, period);
        let achieved = period - wns;
        if achieved > 0.0 {
            report.set_metric(keys::FMAX_MHZ, 1000.0 / achieved);
        }
    }
}
