//! Flujo `vivado_synth`: síntesis Vivado en modo batch (non-project).
//!
//! El script Tcl lee las fuentes, aplica `clock.xdc` (generado desde
//! `clock_period` y el clock principal del diseño), sintetiza y escribe los
//! reportes de timing y utilización en `reports/`.
use std::fmt::Write as _;
use std::fs;

use eda_core::report::text::count_severities;
use eda_core::settings::FieldSpec;
use eda_core::{Artifact, ArtifactKind, ExpectedArtifact, FlowDescriptor, NodeError, ParseContext, ParsedReport, Settings,
               SettingsSchema, SetupContext, ToolIdentity, ToolInvocation};
use eda_domain::{Design, SourceKind};
use serde_json::json;

use crate::reports::read_text;
use crate::reports::vivado::{parse_timing_summary, parse_utilization, VIVADO_SEVERITY};
use crate::script::{banner, param_literal, tcl_quote, with_part_fields};

pub const KIND: &str = "vivado_synth";
const SCRIPT: &str = "vivado_synth.tcl";
const CLOCK_XDC: &str = "clock.xdc";
const TIMING_RPT: &str = "reports/timing_summary.rpt";
const UTIL_RPT: &str = "reports/utilization.rpt";
const CHECKPOINT: &str = "outputs/post_synth.dcp";
const NETLIST: &str = "outputs/post_synth.v";

#[derive(Debug, Clone, Copy, Default)]
pub struct VivadoSynthFlow;

impl VivadoSynthFlow {
    /// Restricciones de clock; `None` sin periodo o sin clock declarado.
    pub fn render_clock_xdc(design: &Design, settings: &Settings) -> Option<String> {
        let period = settings.get_f64("clock_period")?;
        let clock = design.main_clock()?;
        let mut out = banner("#", KIND, design);
        let _ = writeln!(out,
                         "create_clock -period {period:.3} -name {} [get_ports {{{}}}]",
                         clock.name,
                         clock.port);
        if let Some(delay) = settings.get_f64("input_delay") {
            let _ = writeln!(out,
                             "set_input_delay -clock {} {delay:.3} [get_ports -filter {{DIRECTION == IN && NAME != {}}}]",
                             clock.name,
                             clock.port);
        }
        if let Some(delay) = settings.get_f64("output_delay") {
            let _ = writeln!(out, "set_output_delay -clock {} {delay:.3} [all_outputs]", clock.name);
        }
        Some(out)
    }

    pub fn render_tcl(design: &Design, settings: &Settings, with_clock_xdc: bool) -> String {
        let s = settings;
        let part = s.get_str("fpga_part").unwrap_or_default();
        let mut out = banner("#", KIND, design);
        if let Some(n) = s.get_u64("nthreads") {
            let _ = writeln!(out, "set_param general.maxThreads {}", n.min(32));
        }
        let _ = writeln!(out, "set_part {}", tcl_quote(part));
        for src in &design.sources {
            let path = tcl_quote(&src.path.display().to_string());
            let _ = match src.kind() {
                SourceKind::Vhdl => writeln!(out, "read_vhdl -vhdl2008 {path}"),
                SourceKind::Verilog => writeln!(out, "read_verilog {path}"),
                SourceKind::SystemVerilog => writeln!(out, "read_verilog -sv {path}"),
                SourceKind::Other if src.path.extension().map(|e| e == "xdc").unwrap_or(false) => {
                    writeln!(out, "read_xdc {path}")
                }
                SourceKind::Other => Ok(()),
            };
        }
        for xdc in s.get_str_list("xdc_files") {
            let _ = writeln!(out, "read_xdc {}", tcl_quote(&xdc));
        }
        if with_clock_xdc {
            let _ = writeln!(out, "read_xdc {CLOCK_XDC}");
        }

        let mut synth = format!("synth_design -top {} -part {}", design.top, tcl_quote(part));
        if let Some(directive) = s.get_str("synth_directive") {
            let _ = write!(synth, " -directive {directive}");
        }
        if s.get_bool("out_of_context") {
            synth.push_str(" -mode out_of_context");
        }
        let blacklist = s.get_str_list("blacklisted_resources");
        if blacklist.iter().any(|r| r == "bram" || r == "bram_tile") {
            synth.push_str(" -max_bram 0");
        }
        if blacklist.iter().any(|r| r == "dsp") {
            synth.push_str(" -max_dsp 0");
        }
        for (k, v) in &design.parameters {
            let _ = write!(synth, " -generic {k}={}", param_literal(v));
        }
        let _ = writeln!(out, "{synth}");
        if s.get_bool("opt_design") {
            let _ = writeln!(out, "opt_design");
        }
        let _ = writeln!(out, "report_timing_summary -max_paths 10 -file {TIMING_RPT}");
        let _ = writeln!(out, "report_utilization -file {UTIL_RPT}");
        if s.get_bool("write_checkpoint") {
            let _ = writeln!(out, "write_checkpoint -force {CHECKPOINT}");
        }
        if s.get_bool("write_netlist") {
            let _ = writeln!(out, "write_verilog -force -mode funcsim {NETLIST}");
        }
        out
    }
}

impl FlowDescriptor for VivadoSynthFlow {
    fn kind(&self) -> &str {
        KIND
    }

    fn schema(&self) -> SettingsSchema {
        let schema = SettingsSchema::common(KIND).with_clock_fields()
                                                 .field(FieldSpec::text("vivado").default(json!("vivado")))
                                                 .field(FieldSpec::text("synth_directive"))
                                                 .field(FieldSpec::bool("opt_design", true))
                                                 .field(FieldSpec::bool("out_of_context", false))
                                                 .field(FieldSpec::time("input_delay").at_least(0.0))
                                                 .field(FieldSpec::time("output_delay").at_least(0.0))
                                                 .field(FieldSpec::bool("write_checkpoint", false))
                                                 .field(FieldSpec::bool("write_netlist", false))
                                                 .field(FieldSpec::text_list("xdc_files"))
                                                 .field(FieldSpec::text_list("blacklisted_resources")
                                                            .describe("resources that must not be inferred: latch, dsp, bram"));
        with_part_fields(schema, true)
    }

    fn tool(&self, settings: &Settings) -> ToolIdentity {
        ToolIdentity::new("vivado", settings.get_str("vivado").unwrap_or("vivado"))
    }

    fn expected_artifacts(&self, settings: &Settings) -> Vec<ExpectedArtifact> {
        let mut out = Vec::new();
        if settings.get_bool("write_checkpoint") {
            out.push(ExpectedArtifact::new(ArtifactKind::Checkpoint, CHECKPOINT));
        }
        if settings.get_bool("write_netlist") {
            out.push(ExpectedArtifact::new(ArtifactKind::Netlist, NETLIST));
        }
        out
    }

    fn setup(&self, ctx: &SetupContext<'_>) -> Result<ToolInvocation, NodeError> {
        let xdc = Self::render_clock_xdc(ctx.design, ctx.settings);
        match &xdc {
            Some(text) => fs::write(ctx.run_dir.path().join(CLOCK_XDC), text).map_err(NodeError::io)?,
            None => log::warn!("{}: no clock constraint (clock_period or main clock missing)", ctx.design.name),
        }
        let tcl = Self::render_tcl(ctx.design, ctx.settings, xdc.is_some());
        Ok(ToolInvocation::new(ctx.settings.get_str("vivado").unwrap_or("vivado")).args(["-nojournal",
                                                                                          "-nolog",
                                                                                          "-mode",
                                                                                          "batch",
                                                                                          "-source",
                                                                                          SCRIPT,
                                                                                          "-notrace"])
                                                                                   .script(SCRIPT, tcl))
    }

    fn parse(&self, ctx: &ParseContext<'_>) -> ParsedReport {
        let mut report = ParsedReport::new();
        count_severities(ctx.log, &VIVADO_SEVERITY).record(&mut report);

        let timing = ctx.run_dir.path().join(TIMING_RPT);
        match read_text(&timing) {
            Some(text) => {
                report.add_artifact(Artifact::new(ArtifactKind::Report, &timing));
                let period = ctx.settings.get_f64("clock_period");
                if !parse_timing_summary(&text, period, &mut report) && period.is_some() {
                    report.mark_partial(format!("no design timing summary in {}", timing.display()));
                }
            }
            None => report.mark_partial(format!("{} not found", timing.display())),
        }

        let util = ctx.run_dir.path().join(UTIL_RPT);
        match read_text(&util) {
            Some(text) => {
                report.add_artifact(Artifact::new(ArtifactKind::Report, &util));
                if !parse_utilization(&text, &mut report) {
                    report.mark_partial(format!("no utilization tables in {}", util.display()));
                }
            }
            None => report.mark_partial(format!("{} not found", util.display())),
        }
        report
    }
}
