//! Logs de simulación (GHDL, Icarus/vvp y el resumen de cocotb).
use eda_core::model::keys;
use eda_core::report::text::{number_after, SeverityCounts};
use eda_core::ParsedReport;

/// Cuenta errores, warnings y aserciones fallidas del log de simulación.
pub fn parse_sim_log(log: &str, report: &mut ParsedReport) {
    let mut counts = SeverityCounts::default();
    let mut failed_assertions = 0u64;
    for line in log.lines() {
        let lower = line.trim_start().to_ascii_lowercase();
        if lower.contains("(assertion failure)") || lower.contains("(assertion error)") {
            failed_assertions += 1;
        } else if lower.contains("(assertion warning)") || lower.contains("warning:") {
            counts.warnings += 1;
        } else if lower.contains("error:") || lower.starts_with("fatal") || lower.contains(": syntax error") {
            counts.errors += 1;
        }
    }
    counts.record(report);

    // resumen de cocotb: "** TESTS=3 PASS=2 FAIL=1 SKIP=0"
    let passed = number_after(log, "PASS=");
    let failed = number_after(log, "FAIL=").unwrap_or(0.0) as u64;
    if let Some(p) = passed {
        report.set_metric(keys::TESTS_PASSED, p);
    }
    report.set_metric(keys::TESTS_FAILED, failed + failed_assertions);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ghdl_assertions() {
        let log = "tb.vhd:40:9:@120ns:(assertion error): mismatch\n\
                   tb.vhd:41:9:@130ns:(assertion warning): slow\n\
                   tb.vhd:50:5:@1us:(report note): done\n";
        let mut r = ParsedReport::new();
        parse_sim_log(log, &mut r);
        assert_eq!(r.metric_f64(keys::TESTS_FAILED), Some(1.0));
        assert_eq!(r.metric_f64(keys::WARNINGS), Some(1.0));
        assert_eq!(r.metric_f64(keys::ERRORS), Some(0.0));
    }

    #[test]
    fn compile_errors_and_cocotb_summary() {
        let log = "top.v:3: syntax error\nERROR: tb.v:10: check failed\n** TESTS=3 PASS=2 FAIL=1 SKIP=0\n";
        let mut r = ParsedReport::new();
        parse_sim_log(log, &mut r);
        assert_eq!(r.metric_f64(keys::ERRORS), Some(2.0));
        assert_eq!(r.metric_f64(keys::TESTS_PASSED), Some(2.0));
        assert_eq!(r.metric_f64(keys::TESTS_FAILED), Some(1.0));
    }

    #[test]
    fn clean_log_has_zero_counts() {
        let mut r = ParsedReport::new();
        parse_sim_log("hello\nsimulation finished @1000ns\n", &mut r);
        assert_eq!(r.metric_f64(keys::ERRORS), Some(0.0));
        assert_eq!(r.metric_f64(keys::TESTS_FAILED), Some(0.0));
        assert_eq!(r.metric_f64(keys::TESTS_PASSED), None);
    }
}
