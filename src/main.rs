use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use eda_core::FlowEngine;
use edaflow_rust::{engine_from_env, fmax_options, fmax_report_path, overrides_from_args, Project};
use eda_persistence::EnvConfig;
use serde_json::Value;

const USAGE: &str = "usage:
  edaflow run <project.json> <flow> [--set key=value]... [--json]
  edaflow fmax <project.json> <flow> [--low MHz] [--high MHz] [--resolution MHz] [--points N]
               [--max-iterations N] [--timeout SECS] [--max-luts N] [--set key=value]... [--json]
  edaflow flows";

/// Argumentos comunes de `run` y `fmax`.
struct Args<'a> {
    project: &'a str,
    flow: &'a str,
    sets: Vec<&'a str>,
    flags: BTreeMap<String, String>,
    json: bool,
}

impl<'a> Args<'a> {
    fn parse(args: &'a [String]) -> Option<Self> {
        let mut positional: Vec<&str> = Vec::new();
        let mut sets = Vec::new();
        let mut flags = BTreeMap::new();
        let mut json = false;
        let mut it = args.iter();
        while let Some(arg) = it.next() {
            match arg.as_str() {
                "--set" => sets.push(it.next()?.as_str()),
                "--json" => json = true,
                flag if flag.starts_with("--") => {
                    flags.insert(flag.trim_start_matches("--").to_string(), it.next()?.clone());
                }
                other => positional.push(other),
            }
        }
        let [project, flow] = positional[..] else { return None };
        Some(Self { project,
                    flow,
                    sets,
                    flags,
                    json })
    }

    /// Proyecto, overrides y engine; en error devuelve el código de salida.
    fn load(&self) -> Result<(Project, Value, FlowEngine), ExitCode> {
        let overrides = overrides_from_args(self.sets.iter().copied()).map_err(|e| {
                                                                          eprintln!("[edaflow] {e}");
                                                                          ExitCode::from(2)
                                                                      })?;
        let project = Project::load(&PathBuf::from(self.project)).map_err(|e| {
                                                                     eprintln!("[edaflow] {e}");
                                                                     ExitCode::from(3)
                                                                 })?;
        let engine = engine_from_env().map_err(|e| {
                                          eprintln!("[edaflow] {e}");
                                          ExitCode::from(3)
                                      })?;
        Ok((project, overrides, engine))
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("run") => run(&args[2..]),
        Some("fmax") => fmax(&args[2..]),
        Some("flows") => {
            let registry = eda_adapters::default_registry();
            for kind in registry.kinds() {
                println!("{kind}");
            }
            ExitCode::SUCCESS
        }
        _ => {
            eprintln!("{USAGE}");
            ExitCode::from(2)
        }
    }
}

fn run(args: &[String]) -> ExitCode {
    let Some(args) = Args::parse(args).filter(|a| a.flags.is_empty()) else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };
    let (project, overrides, engine) = match args.load() {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };
    let flow = args.flow;
    let as_json = args.json;
    let report = match engine.run(&project.request(flow, overrides)) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("[edaflow] {e}");
            return ExitCode::from(4);
        }
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report.to_json()).unwrap_or_default());
    } else {
        for node in report.nodes.values() {
            let r = &node.result;
            let reused = if node.reused { " (cached)" } else { "" };
            println!("{:<14} {:<10} {}{reused}", node.flow, r.status, r.fingerprint.short());
            if let Some(err) = &r.error {
                println!("    error: {err}");
            }
            for (k, v) in &r.metrics {
                println!("    {k} = {v}");
            }
        }
    }
    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn fmax(args: &[String]) -> ExitCode {
    let Some(args) = Args::parse(args) else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };
    let options = match fmax_options(&args.flags) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("[edaflow] {e}");
            return ExitCode::from(2);
        }
    };
    let (project, overrides, engine) = match args.load() {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };
    let outcome = match engine.fmax_sweep(&project.request(args.flow, overrides), &options) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("[edaflow] {e}");
            return ExitCode::from(4);
        }
    };

    let path = fmax_report_path(&EnvConfig::from_env().run_dir, &project.design.name, args.flow);
    if let Err(e) = outcome.write_json(&path) {
        log::warn!("cannot write {}: {e}", path.display());
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome.to_json()).unwrap_or_default());
    } else {
        for p in &outcome.points {
            let mark = if p.accepted { "ok" } else { "--" };
            let wns = p.wns.map_or_else(|| "-".to_string(), |w| format!("{w:.3}"));
            println!("{mark} {:>9.3} MHz  period {:>8.3} ns  wns {wns:>8}  {}", p.frequency_mhz, p.clock_period, p.status);
        }
    }
    match outcome.best {
        Some(best) => {
            println!("fmax: {:.3} MHz (period {:.3} ns) after {} iteration(s)", best.frequency_mhz, best.clock_period, outcome.iterations);
            ExitCode::SUCCESS
        }
        None => {
            println!("fmax: no candidate met timing");
            ExitCode::FAILURE
        }
    }
}
