//! Flujo `sim`: simulación con GHDL (VHDL) o Icarus Verilog.
//!
//! El script `sim.sh` analiza/elabora/ejecuta el testbench; si el diseño no
//! declara testbench se simula el top directamente.
use std::fmt::Write as _;

use eda_core::settings::FieldSpec;
use eda_core::{Artifact, ArtifactKind, FlowDescriptor, NodeError, ParseContext, ParsedReport, Settings, SettingsSchema,
               SetupContext, ToolIdentity, ToolInvocation};
use eda_domain::{Design, SourceKind};
use serde_json::json;

use crate::reports::sim::parse_sim_log;
use crate::script::{banner, param_literal, path_str, sh_join, sh_quote, sources_with_testbench};

pub const KIND: &str = "sim";
const SCRIPT: &str = "sim.sh";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Simulator {
    Ghdl,
    Iverilog,
}

impl Simulator {
    /// `auto`: GHDL si hay alguna fuente VHDL, Icarus en otro caso.
    pub fn select(settings: &Settings, design: &Design) -> Self {
        match settings.get_str("simulator") {
            Some("ghdl") => Simulator::Ghdl,
            Some("iverilog") => Simulator::Iverilog,
            _ => {
                if sources_with_testbench(design).iter().any(|s| s.kind() == SourceKind::Vhdl) {
                    Simulator::Ghdl
                } else {
                    Simulator::Iverilog
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SimFlow;

impl SimFlow {
    fn exe<'s>(settings: &'s Settings, name: &'s str) -> &'s str {
        settings.get_str(name).unwrap_or(name)
    }

    fn render_ghdl(ctx: &SetupContext<'_>, top: &str) -> Result<String, NodeError> {
        let s = ctx.settings;
        let ghdl = sh_quote(Self::exe(s, "ghdl"));
        let vhdl_std = format!("--std={}", s.get_str("vhdl_std").unwrap_or("08"));
        let mut files = Vec::new();
        for src in sources_with_testbench(ctx.design) {
            match src.kind() {
                SourceKind::Vhdl => files.push(path_str(&src.path)),
                SourceKind::Verilog | SourceKind::SystemVerilog => {
                    return Err(NodeError::Setup { message: format!("ghdl cannot compile Verilog source {}",
                                                                   src.path.display()) })
                }
                SourceKind::Other => {}
            }
        }
        let mut common = vec![vhdl_std, "--workdir=outputs".to_string()];
        common.extend(s.get_str_list("sim_flags"));
        let common = sh_join(&common);

        let mut out = String::new();
        out.push_str(&banner("#", KIND, ctx.design));
        out.push_str("set -e\n");
        let _ = writeln!(out, "{ghdl} -i {common} {}", sh_join(&files));
        let _ = writeln!(out, "{ghdl} -m {common} {}", sh_quote(top));
        let mut run = vec![format!("{ghdl} -r {common} {}", sh_quote(top))];
        if let Some(stop) = s.get_f64("stop_time") {
            run.push(format!("--stop-time={}ps", (stop * 1000.0).round() as u64));
        }
        if let Some(vcd) = s.get_str("vcd") {
            run.push(sh_quote(&format!("--vcd=outputs/{vcd}")));
        }
        if let Some(generics) = s.get("tb_generics").and_then(|g| g.as_object()) {
            for (k, v) in generics {
                run.push(sh_quote(&format!("-g{k}={}", param_literal(v))));
            }
        }
        let _ = writeln!(out, "{}", run.join(" "));
        Ok(out)
    }

    fn render_iverilog(ctx: &SetupContext<'_>, top: &str) -> Result<String, NodeError> {
        let s = ctx.settings;
        let mut files = Vec::new();
        for src in sources_with_testbench(ctx.design) {
            match src.kind() {
                SourceKind::Verilog | SourceKind::SystemVerilog => files.push(path_str(&src.path)),
                SourceKind::Vhdl => {
                    return Err(NodeError::Setup { message: format!("iverilog cannot compile VHDL source {}",
                                                                   src.path.display()) })
                }
                SourceKind::Other => {}
            }
        }
        if s.get("stop_time").is_some() {
            log::warn!("stop_time is ignored by iverilog; use $finish in the testbench");
        }
        let mut compile = vec![sh_quote(Self::exe(s, "iverilog")),
                               "-g2012".to_string(),
                               "-s".to_string(),
                               sh_quote(top),
                               "-o".to_string(),
                               "outputs/sim.vvp".to_string()];
        if let Some(generics) = s.get("tb_generics").and_then(|g| g.as_object()) {
            for (k, v) in generics {
                compile.push(sh_quote(&format!("-P{top}.{k}={}", param_literal(v))));
            }
        }
        compile.extend(s.get_str_list("sim_flags").iter().map(|f| sh_quote(f)));
        compile.extend(files.iter().map(|f| sh_quote(f)));

        let mut run = vec![sh_quote(Self::exe(s, "vvp")), "-n".to_string(), "outputs/sim.vvp".to_string()];
        if let Some(vcd) = s.get_str("vcd") {
            run.push(sh_quote(&format!("+vcd=outputs/{vcd}")));
        }

        let mut out = String::new();
        out.push_str(&banner("#", KIND, ctx.design));
        out.push_str("set -e\n");
        let _ = writeln!(out, "{}", compile.join(" "));
        let _ = writeln!(out, "{}", run.join(" "));
        Ok(out)
    }
}

impl FlowDescriptor for SimFlow {
    fn kind(&self) -> &str {
        KIND
    }

    fn aliases(&self) -> &[&str] {
        &["ghdl_sim", "iverilog_sim"]
    }

    fn schema(&self) -> SettingsSchema {
        SettingsSchema::common(KIND).with_clock_fields()
                                    .field(FieldSpec::choice("simulator", &["auto", "ghdl", "iverilog"]).default(json!("auto")))
                                    .field(FieldSpec::text("ghdl").default(json!("ghdl")))
                                    .field(FieldSpec::text("iverilog").default(json!("iverilog")))
                                    .field(FieldSpec::text("vvp").default(json!("vvp")))
                                    .field(FieldSpec::choice("vhdl_std", &["93", "93c", "02", "08"]).default(json!("08")))
                                    .field(FieldSpec::time("stop_time").positive())
                                    .field(FieldSpec::text("vcd").describe("waveform file name, written under outputs/"))
                                    .field(FieldSpec::map("tb_generics"))
                                    .field(FieldSpec::text_list("sim_flags"))
    }

    fn tool(&self, settings: &Settings) -> ToolIdentity {
        let ghdl = Self::exe(settings, "ghdl");
        let icarus = format!("{}+{}", Self::exe(settings, "iverilog"), Self::exe(settings, "vvp"));
        match settings.get_str("simulator") {
            Some("ghdl") => ToolIdentity::new("ghdl", ghdl),
            Some("iverilog") => ToolIdentity::new("iverilog", icarus),
            _ => ToolIdentity::new("auto", format!("{ghdl}|{icarus}")),
        }
    }

    fn setup(&self, ctx: &SetupContext<'_>) -> Result<ToolInvocation, NodeError> {
        let top = ctx.design.testbench.top.as_deref().unwrap_or(&ctx.design.top);
        let body = match Simulator::select(ctx.settings, ctx.design) {
            Simulator::Ghdl => Self::render_ghdl(ctx, top)?,
            Simulator::Iverilog => Self::render_iverilog(ctx, top)?,
        };
        Ok(ToolInvocation::new("sh").arg(SCRIPT).script(SCRIPT, body))
    }

    fn parse(&self, ctx: &ParseContext<'_>) -> ParsedReport {
        let mut report = ParsedReport::new();
        parse_sim_log(ctx.log, &mut report);
        if let Some(vcd) = ctx.settings.get_str("vcd") {
            let path = ctx.run_dir.outputs_dir().join(vcd);
            if path.is_file() {
                report.add_artifact(Artifact::new(ArtifactKind::Waveform, path));
            } else {
                report.mark_partial(format!("waveform {} was not produced", path.display()));
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eda_core::settings::{resolve_settings, SettingsLayers};
    use eda_core::RunDir;
    use std::fs;
    use std::path::Path;

    fn settings(overrides: serde_json::Value) -> Settings {
        resolve_settings(&SimFlow.schema(),
                         &SettingsLayers { overrides,
                                           ..Default::default() }).unwrap()
    }

    fn render(design: &Design, s: &Settings) -> Result<ToolInvocation, NodeError> {
        let run_dir = RunDir::new("/tmp/unused");
        SimFlow.setup(&SetupContext { design,
                                      settings: s,
                                      run_dir: &run_dir,
                                      dependencies: &[] })
    }

    fn script(inv: &ToolInvocation) -> &str {
        &inv.script.as_ref().unwrap().contents
    }

    #[test]
    fn vhdl_design_uses_ghdl() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("alu.vhd");
        let tb = dir.path().join("alu_tb.vhd");
        fs::write(&src, "").unwrap();
        fs::write(&tb, "").unwrap();
        let design = Design::new("alu", "alu").with_source(&src).with_testbench("alu_tb", vec![tb.clone()]);
        let s = settings(json!({"vhdl_std": "93c", "stop_time": "2us", "vcd": "dump.vcd", "tb_generics": {"WIDTH": 8}}));
        let inv = render(&design, &s).unwrap();
        assert_eq!(inv.command_line(), "sh sim.sh");
        let text = script(&inv);
        assert!(text.contains("ghdl -i --std=93c --workdir=outputs"), "{text}");
        assert!(text.contains(&tb.display().to_string()));
        assert!(text.contains("ghdl -m --std=93c --workdir=outputs alu_tb"), "{text}");
        assert!(text.contains("--stop-time=2000000ps --vcd=outputs/dump.vcd -gWIDTH=8"), "{text}");
    }

    #[test]
    fn verilog_design_uses_icarus_and_top_without_testbench() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("top.v");
        fs::write(&src, "").unwrap();
        let design = Design::new("d", "top").with_source(&src);
        let inv = render(&design, &settings(json!({"iverilog": "/opt/iverilog/bin/iverilog"}))).unwrap();
        let text = script(&inv);
        assert!(text.contains("/opt/iverilog/bin/iverilog -g2012 -s top -o outputs/sim.vvp"), "{text}");
        assert!(text.contains("vvp -n outputs/sim.vvp"));
    }

    #[test]
    fn forced_simulator_rejects_foreign_sources() {
        let design = Design::new("d", "top").with_source(Path::new("/x/top.v"));
        let err = render(&design, &settings(json!({"simulator": "ghdl"}))).unwrap_err();
        assert!(matches!(err, NodeError::Setup { .. }));
    }

    #[test]
    fn rendering_is_deterministic() {
        let design = Design::new("d", "top").with_source(Path::new("/x/top.v"));
        let s = settings(json!({"tb_generics": {"B": 1, "A": "x"}}));
        assert_eq!(render(&design, &s).unwrap(), render(&design, &s).unwrap());
    }

    #[test]
    fn tool_identity_follows_simulator_choice() {
        assert_eq!(SimFlow.tool(&settings(json!({"simulator": "ghdl", "ghdl": "/g"}))).executable, "/g");
        assert_eq!(SimFlow.tool(&settings(json!({}))).name, "auto");
    }
}
