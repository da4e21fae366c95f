#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use eda_adapters::{default_registry, ToolPathsInjector};
use eda_core::event::FlowEventKind;
use eda_core::{Design, EngineBuilder, FlowEngine, RunReport, SupervisorConfig};

/// Escribe un ejecutable `sh` que hace de herramienta EDA.
pub fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

pub const FAKE_YOSYS: &str = r#"mkdir -p outputs reports
echo '{"modules": {}}' > outputs/netlist.json
printf '   Number of cells: 3\n     LUT4 2\n     TRELLIS_FF 1\n\n' > reports/stat.txt
echo "Warning: fake yosys""#;

/// nextpnr falso: escribe la config y un reporte con el fmax alcanzado dado.
pub fn fake_nextpnr_body(achieved_mhz: f64) -> String {
    format!(r#"cfg=""; rpt=""
while [ $# -gt 0 ]; do
  case "$1" in
    --textcfg|--asc) cfg="$2"; shift;;
    --report) rpt="$2"; shift;;
  esac
  shift
done
echo config > "$cfg"
echo '{{"utilization": {{"TRELLIS_COMB": {{"used": 10, "available": 100}}}}, "fmax": {{"clk": {{"achieved": {achieved_mhz:.1}, "constraint": 100.0}}}}}}' > "$rpt"
echo "Info: routing complete""#)
}

pub const FAKE_IVERILOG: &str = r#"out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-o" ]; then out="$2"; shift; fi
  shift
done
echo compiled > "$out""#;

pub const FAKE_VVP: &str = r#"echo "VCD info: dumping is off"
echo "simulation done""#;

/// Injector con las herramientas falsas de `dir`.
pub fn fake_tools(dir: &Path, nextpnr_fmax: f64) -> ToolPathsInjector {
    let s = |p: PathBuf| p.display().to_string();
    ToolPathsInjector::new().with_tool("yosys", s(fake_tool(dir, "yosys", FAKE_YOSYS)))
                            .with_tool("nextpnr", s(fake_tool(dir, "nextpnr-ecp5", &fake_nextpnr_body(nextpnr_fmax))))
                            .with_tool("iverilog", s(fake_tool(dir, "iverilog", FAKE_IVERILOG)))
                            .with_tool("vvp", s(fake_tool(dir, "vvp", FAKE_VVP)))
}

pub fn design(dir: &Path) -> Arc<Design> {
    let src = dir.join("top.v");
    fs::write(&src, "module top(input clk, output reg q); always @(posedge clk) q <= ~q; endmodule\n").unwrap();
    Arc::new(Design::new("blinky", "top").with_source(src).with_clock("main_clock", "clk"))
}

pub fn engine_builder(tools: &Path, run_root: &Path, nextpnr_fmax: f64) -> EngineBuilder {
    builder_with(fake_tools(tools, nextpnr_fmax), run_root)
}

/// Builder con la política por defecto y el injector dado.
pub fn builder_with(tools: ToolPathsInjector, run_root: &Path) -> EngineBuilder {
    FlowEngine::builder(default_registry()).run_root(run_root)
                                           .jobs(2)
                                           .injector(Box::new(tools))
                                           .supervisor(SupervisorConfig { grace_period: Duration::from_millis(200),
                                                                          echo_output: false,
                                                                          ..Default::default() })
}

/// Procesos lanzados por flujo en un run.
pub fn launches_of(engine: &FlowEngine, report: &RunReport, flow: &str) -> usize {
    engine.events()
          .list(report.run_id)
          .iter()
          .filter(|e| matches!(&e.kind, FlowEventKind::ProcessLaunched { flow: f, .. } if f == flow))
          .count()
}
