#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use eda_persistence::EnvConfig;

pub fn fake_tool(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path.display().to_string()
}

const YOSYS: &str = r#"mkdir -p outputs reports
echo '{}' > outputs/netlist.json
printf 'Number of cells: 1\n  LUT4 1\n' > reports/stat.txt"#;

fn nextpnr(achieved_mhz: f64) -> String {
    format!(r#"while [ $# -gt 0 ]; do
  case "$1" in
    --textcfg) echo config > "$2"; shift;;
    --report) echo '{{"fmax": {{"clk": {{"achieved": {achieved_mhz:.1}, "constraint": 100.0}}}}}}' > "$2"; shift;;
  esac
  shift
done"#)
}

/// Proyecto mínimo más una configuración que apunta a herramientas falsas.
pub fn setup(dir: &Path, nextpnr_mhz: f64) -> (PathBuf, EnvConfig) {
    fs::write(dir.join("top.v"), "module top(input clk); endmodule\n").unwrap();
    let project = dir.join("blinky.json");
    fs::write(&project,
              r#"{"name": "blinky", "top": "top", "sources": [{"path": "top.v"}],
                  "clocks": [{"name": "main_clock", "port": "clk"}],
                  "settings": {"impl": {"fpga_part": "LFE5U-85F-8BG756C", "clock_period": 10}}}"#).unwrap();
    let mut cfg = EnvConfig { run_dir: dir.join("runs"),
                              jobs: Some(2),
                              ..Default::default() };
    cfg.tools.insert("yosys".into(), fake_tool(dir, "yosys", YOSYS));
    cfg.tools.insert("nextpnr".into(), fake_tool(dir, "nextpnr-ecp5", &nextpnr(nextpnr_mhz)));
    (project, cfg)
}
