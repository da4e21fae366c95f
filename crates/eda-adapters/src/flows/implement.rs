//! Flujo `impl`: place & route con nextpnr sobre el netlist de `synth`.
//!
//! La dependencia recibe sólo lo que este flujo mapea explícitamente
//! (`fpga_part`, `clock_period`, `yosys`); nada más se hereda.
use std::fmt::Write as _;

use eda_core::report::text::count_severities;
use eda_core::settings::FieldSpec;
use eda_core::{Artifact, ArtifactKind, DependencySpec, ExpectedArtifact, FlowDescriptor, NodeError, ParseContext, ParsedReport,
               Settings, SettingsSchema, SetupContext, ToolIdentity, ToolInvocation};
use serde_json::{Map, Value};

use crate::flows::synth;
use crate::fpga::FpgaPart;
use crate::reports::nextpnr::{parse_log_fmax, parse_report_json, NEXTPNR_SEVERITY};
use crate::reports::read_text;
use crate::script::{banner, path_str, sh_join, with_part_fields};

pub const KIND: &str = "impl";
const SCRIPT: &str = "nextpnr.sh";
const REPORT: &str = "reports/report.json";

#[derive(Debug, Clone, Copy, Default)]
pub struct NextpnrImplFlow;

impl NextpnrImplFlow {
    fn part(settings: &Settings) -> Option<FpgaPart> {
        settings.get_str("fpga_part").map(FpgaPart::parse)
    }

    fn executable(settings: &Settings) -> String {
        if let Some(exe) = settings.get_str("nextpnr") {
            return exe.to_string();
        }
        let arch = Self::part(settings).and_then(|p| p.nextpnr_arch().map(str::to_string))
                                       .unwrap_or_else(|| "generic".to_string());
        format!("nextpnr-{arch}")
    }

    /// Archivo de configuración que produce cada arquitectura.
    fn config_output(settings: &Settings) -> &'static str {
        match Self::part(settings).as_ref().and_then(FpgaPart::nextpnr_arch) {
            Some("ice40") => "outputs/bitstream.asc",
            _ => "outputs/bitstream.config",
        }
    }
}

impl FlowDescriptor for NextpnrImplFlow {
    fn kind(&self) -> &str {
        KIND
    }

    fn aliases(&self) -> &[&str] {
        &["nextpnr", "pnr"]
    }

    fn schema(&self) -> SettingsSchema {
        let schema = SettingsSchema::common(KIND).with_clock_fields()
                                                 .field(FieldSpec::text("nextpnr").describe("defaults to nextpnr-<arch>"))
                                                 .field(FieldSpec::text("yosys").describe("forwarded to synth when set"))
                                                 .field(FieldSpec::integer("seed"))
                                                 .field(FieldSpec::path("constraints").must_exist()
                                                                                      .describe("LPF (ECP5) or PCF (iCE40) file"))
                                                 .field(FieldSpec::text_list("extra_args"));
        with_part_fields(schema, true)
    }

    fn dependencies(&self, settings: &Settings) -> Vec<DependencySpec> {
        let mut overrides = Map::new();
        for key in ["fpga_part", "clock_period", "yosys"] {
            if let Some(v) = settings.get(key) {
                overrides.insert(key.to_string(), v.clone());
            }
        }
        vec![DependencySpec::new(synth::KIND, Value::Object(overrides))]
    }

    fn tool(&self, settings: &Settings) -> ToolIdentity {
        ToolIdentity::new("nextpnr", Self::executable(settings))
    }

    fn expected_artifacts(&self, settings: &Settings) -> Vec<ExpectedArtifact> {
        vec![ExpectedArtifact::new(ArtifactKind::Bitstream, Self::config_output(settings))]
    }

    fn setup(&self, ctx: &SetupContext<'_>) -> Result<ToolInvocation, NodeError> {
        let s = ctx.settings;
        let part = Self::part(s).ok_or_else(|| NodeError::Setup { message: "fpga_part is not set".to_string() })?;
        let arch = part.nextpnr_arch()
                       .ok_or_else(|| NodeError::Setup { message: format!("part {} is not supported by nextpnr", part.part) })?;
        let netlist = ctx.dependency(synth::KIND)
                         .and_then(|r| r.artifact(ArtifactKind::Netlist))
                         .ok_or_else(|| NodeError::Setup { message: "synth produced no netlist".to_string() })?;

        let mut args = vec![Self::executable(s),
                            "--json".to_string(),
                            path_str(&netlist.path),
                            "--top".to_string(),
                            ctx.design.top.clone()];
        if let Some(device) = &part.device {
            args.push(format!("--{device}"));
        }
        if let Some(package) = &part.package {
            args.push("--package".to_string());
            args.push(package.clone());
        }
        if let (Some(speed), "ecp5") = (&part.speed, arch) {
            args.push("--speed".to_string());
            args.push(speed.clone());
        }
        if let Some(freq) = s.get_f64("clock_frequency") {
            args.push("--freq".to_string());
            args.push(format!("{freq:.3}"));
        }
        if let Some(seed) = s.get_u64("seed") {
            args.push("--seed".to_string());
            args.push(seed.to_string());
        }
        if let Some(threads) = s.get_u64("nthreads") {
            args.push("--threads".to_string());
            args.push(threads.to_string());
        }
        if let Some(constraints) = s.get_str("constraints") {
            args.push((if arch == "ice40" { "--pcf" } else { "--lpf" }).to_string());
            args.push(constraints.to_string());
        }
        args.push((if arch == "ice40" { "--asc" } else { "--textcfg" }).to_string());
        args.push(Self::config_output(s).to_string());
        args.push("--report".to_string());
        args.push(REPORT.to_string());
        if s.get_bool("quiet") {
            args.push("-q".to_string());
        }
        args.extend(s.get_str_list("extra_args"));

        let mut body = banner("#", KIND, ctx.design);
        let _ = writeln!(body, "exec {}", sh_join(&args));
        Ok(ToolInvocation::new("sh").arg(SCRIPT).script(SCRIPT, body))
    }

    fn parse(&self, ctx: &ParseContext<'_>) -> ParsedReport {
        let mut report = ParsedReport::new();
        count_severities(ctx.log, &NEXTPNR_SEVERITY).record(&mut report);
        let period = ctx.settings.get_f64("clock_period");
        let path = ctx.run_dir.path().join(REPORT);
        let from_json = match read_text(&path) {
            Some(text) => {
                report.add_artifact(Artifact::new(ArtifactKind::Report, &path));
                match parse_report_json(&text, period, &mut report) {
                    Ok(()) => true,
                    Err(e) => {
                        report.mark_partial(format!("{} is not a valid nextpnr report: {e}", path.display()));
                        false
                    }
                }
            }
            None => false,
        };
        if !from_json && !parse_log_fmax(ctx.log, period, &mut report) {
            report.mark_partial("no timing information found in report or log");
        }
        report
    }
}
