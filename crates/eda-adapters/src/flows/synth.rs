//! Flujo `synth`: síntesis con Yosys.
//!
//! Genera `yosys.ys`; el netlist JSON queda en `outputs/netlist.json` y la
//! estadística de celdas en `reports/stat.txt`.
use std::fmt::Write as _;

use eda_core::settings::FieldSpec;
use eda_core::{Artifact, ArtifactKind, ExpectedArtifact, FlowDescriptor, NodeError, ParseContext, ParsedReport, Settings,
               SettingsSchema, SetupContext, ToolIdentity, ToolInvocation};
use eda_core::report::text::count_severities;
use eda_domain::SourceKind;
use serde_json::json;

use crate::fpga::FpgaPart;
use crate::reports::yosys::{parse_stat, YOSYS_SEVERITY};
use crate::reports::read_text;
use crate::script::{banner, param_literal, with_part_fields};

pub const KIND: &str = "synth";
pub const NETLIST: &str = "outputs/netlist.json";
const SCRIPT: &str = "yosys.ys";
const STAT: &str = "reports/stat.txt";

#[derive(Debug, Clone, Copy, Default)]
pub struct YosysSynthFlow;

/// Comando `synth_*` según la familia de la parte.
fn synth_command(part: Option<&FpgaPart>, top: &str, settings: &Settings) -> String {
    let family = part.and_then(FpgaPart::family);
    let mut cmd = match family {
        Some("ecp5") => format!("synth_ecp5 -top {top}"),
        Some("ice40") => format!("synth_ice40 -top {top}"),
        Some(f @ ("xc7" | "xcu" | "xcup")) => format!("synth_xilinx -top {top} -family {f}"),
        _ => format!("synth -top {top}"),
    };
    if family.is_some() {
        if settings.get_bool("abc9") {
            cmd.push_str(" -abc9");
        }
        if !settings.get_bool("flatten") {
            cmd.push_str(" -noflatten");
        }
    } else if settings.get_bool("flatten") {
        cmd.push_str(" -flatten");
    }
    if settings.get_bool("retime") {
        cmd.push_str(" -retime");
    }
    cmd
}

impl YosysSynthFlow {
    fn render(ctx: &SetupContext<'_>) -> String {
        let s = ctx.settings;
        let design = ctx.design;
        let part = s.get_str("fpga_part").map(FpgaPart::parse);
        let mut out = banner("#", KIND, design);

        let vhdl: Vec<String> = design.sources
                                      .iter()
                                      .filter(|src| src.kind() == SourceKind::Vhdl)
                                      .map(|src| format!("\"{}\"", src.path.display()))
                                      .collect();
        for src in &design.sources {
            if matches!(src.kind(), SourceKind::Verilog | SourceKind::SystemVerilog) {
                let _ = writeln!(out, "read_verilog -sv \"{}\"", src.path.display());
            }
        }
        if !vhdl.is_empty() {
            let mut ghdl = vec![format!("ghdl --std={}", s.get_str("vhdl_std").unwrap_or("08"))];
            ghdl.extend(design.parameters.iter().map(|(k, v)| format!("-g{k}={}", param_literal(v))));
            ghdl.extend(vhdl);
            ghdl.push(format!("-e {}", design.top));
            let _ = writeln!(out, "plugin -i ghdl");
            let _ = writeln!(out, "{}", ghdl.join(" "));
        } else {
            for (k, v) in &design.parameters {
                let _ = writeln!(out, "chparam -set {k} {} {}", param_literal(v), design.top);
            }
        }
        let _ = writeln!(out, "hierarchy -check -top {}", design.top);
        if let (true, Some(period)) = (s.get_bool("abc9"), s.get_f64("clock_period")) {
            // abc9 toma el objetivo de delay en ps
            let _ = writeln!(out, "scratchpad -set abc9.D {}", (period * 1000.0).round() as u64);
        }
        let _ = writeln!(out, "{}", synth_command(part.as_ref(), &design.top, s));
        for cmd in s.get_str_list("extra_commands") {
            let _ = writeln!(out, "{cmd}");
        }
        let _ = writeln!(out, "tee -q -o {STAT} stat");
        let _ = writeln!(out, "write_json {NETLIST}");
        out
    }
}

impl FlowDescriptor for YosysSynthFlow {
    fn kind(&self) -> &str {
        KIND
    }

    fn aliases(&self) -> &[&str] {
        &["yosys"]
    }

    fn schema(&self) -> SettingsSchema {
        let schema = SettingsSchema::common(KIND).with_clock_fields()
                                                 .field(FieldSpec::text("yosys").default(json!("yosys")))
                                                 .field(FieldSpec::bool("abc9", true))
                                                 .field(FieldSpec::bool("flatten", true))
                                                 .field(FieldSpec::bool("retime", false))
                                                 .field(FieldSpec::choice("vhdl_std", &["93", "93c", "02", "08"]).default(json!("08")))
                                                 .field(FieldSpec::text_list("extra_commands")
                                                            .describe("yosys commands run after synthesis"));
        with_part_fields(schema, false)
    }

    fn tool(&self, settings: &Settings) -> ToolIdentity {
        ToolIdentity::new("yosys", settings.get_str("yosys").unwrap_or("yosys"))
    }

    fn expected_artifacts(&self, _settings: &Settings) -> Vec<ExpectedArtifact> {
        vec![ExpectedArtifact::new(ArtifactKind::Netlist, NETLIST)]
    }

    fn setup(&self, ctx: &SetupContext<'_>) -> Result<ToolInvocation, NodeError> {
        let yosys = ctx.settings.get_str("yosys").unwrap_or("yosys");
        let mut inv = ToolInvocation::new(yosys);
        if ctx.settings.get_bool("quiet") {
            inv = inv.arg("-q");
        }
        Ok(inv.args(["-s", SCRIPT]).script(SCRIPT, Self::render(ctx)))
    }

    fn parse(&self, ctx: &ParseContext<'_>) -> ParsedReport {
        let mut report = ParsedReport::new();
        count_severities(ctx.log, &YOSYS_SEVERITY).record(&mut report);
        let stat_path = ctx.run_dir.path().join(STAT);
        match read_text(&stat_path) {
            Some(text) => {
                report.add_artifact(Artifact::new(ArtifactKind::Report, &stat_path));
                if !parse_stat(&text, &mut report) {
                    report.mark_partial(format!("no cell statistics in {}", stat_path.display()));
                }
            }
            None => report.mark_partial(format!("{} not found", stat_path.display())),
        }
        report
    }
}
