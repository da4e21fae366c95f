//! Helpers para renderizar scripts de control deterministas.
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use eda_core::{FieldViolation, SettingsSchema};
use eda_core::settings::FieldSpec;
use eda_domain::{Design, SourceFile};
use serde_json::Value;

use crate::fpga::board_part;

/// Cabecera común de todos los scripts generados.
pub fn banner(comment: &str, flow: &str, design: &Design) -> String {
    format!("{comment} generated by edaflow: flow `{flow}`, design `{}`, top `{}`\n", design.name, design.top)
}

/// Cita un argumento para `sh` (comillas simples).
pub fn sh_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
               && arg.chars()
                     .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | '=' | ':' | '+' | ','));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

pub fn sh_join<S: AsRef<str>>(args: impl IntoIterator<Item = S>) -> String {
    args.into_iter().map(|a| sh_quote(a.as_ref())).collect::<Vec<_>>().join(" ")
}

/// Cita una palabra para Tcl entre llaves.
pub fn tcl_quote(word: &str) -> String {
    format!("{{{word}}}")
}

pub fn path_str(path: &Path) -> String {
    path.display().to_string()
}

/// Valor de parámetro/generic como texto sin comillas JSON.
pub fn param_literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        other => other.to_string(),
    }
}

/// Fuentes del diseño seguidas de las del testbench, sin repetir rutas.
pub fn sources_with_testbench(design: &Design) -> Vec<&SourceFile> {
    let mut out: Vec<&SourceFile> = Vec::new();
    for src in design.sources.iter().chain(design.testbench.sources.iter()) {
        if !out.iter().any(|s| s.path == src.path) {
            out.push(src);
        }
    }
    out
}

/// Agrega líneas `key=value` (uno por parámetro) con el formato dado.
pub fn render_params(out: &mut String, params: &BTreeMap<String, Value>, fmt: impl Fn(&str, &str) -> String) {
    for (k, v) in params {
        let _ = writeln!(out, "{}", fmt(k, &param_literal(v)));
    }
}

/// Campos `fpga_part`/`board` con derivación de la parte desde la placa.
pub fn with_part_fields(schema: SettingsSchema, part_required: bool) -> SettingsSchema {
    let part = FieldSpec::text("fpga_part").describe("vendor part name, e.g. LFE5U-85F-8BG756C");
    let part = if part_required { part.required() } else { part };
    schema.field(part)
          .field(FieldSpec::text("board").describe("known board name; fills fpga_part when unset"))
          .rule("board_part", part_from_board)
}

fn part_from_board(values: &mut BTreeMap<String, Value>) -> Vec<FieldViolation> {
    let Some(board) = values.get("board").and_then(Value::as_str).map(str::to_string) else {
        return Vec::new();
    };
    match board_part(&board) {
        Some(part) => {
            values.entry("fpga_part".to_string())
                  .or_insert_with(|| Value::String(part.to_string()));
            Vec::new()
        }
        None => vec![FieldViolation::new("board", format!("unknown board {board:?}"))],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eda_core::settings::{resolve_settings, SettingsLayers};
    use serde_json::json;

    #[test]
    fn shell_quoting() {
        assert_eq!(sh_quote("outputs/netlist.json"), "outputs/netlist.json");
        assert_eq!(sh_quote("a b"), "'a b'");
        assert_eq!(sh_quote("it's"), r"'it'\''s'");
        assert_eq!(sh_quote(""), "''");
        assert_eq!(sh_join(["--freq", "100.5"]), "--freq 100.5");
    }

    #[test]
    fn params_render_without_json_quotes() {
        assert_eq!(param_literal(&json!("FOO")), "FOO");
        assert_eq!(param_literal(&json!(8)), "8");
        assert_eq!(param_literal(&json!(true)), "1");
    }

    #[test]
    fn board_fills_part() {
        let schema = with_part_fields(SettingsSchema::common("synth"), true);
        let layers = SettingsLayers { overrides: json!({"board": "icebreaker"}),
                                      ..Default::default() };
        let s = resolve_settings(&schema, &layers).unwrap();
        assert_eq!(s.get_str("fpga_part"), Some("iCE40UP5K-SG48"));

        // una parte explícita gana a la placa
        let layers = SettingsLayers { overrides: json!({"board": "icebreaker", "fpga_part": "iCE40HX8K-CT256"}),
                                      ..Default::default() };
        assert_eq!(resolve_settings(&schema, &layers).unwrap().get_str("fpga_part"), Some("iCE40HX8K-CT256"));
    }

    #[test]
    fn unknown_board_and_missing_part_are_both_reported() {
        let schema = with_part_fields(SettingsSchema::common("impl"), true);
        let layers = SettingsLayers { overrides: json!({"board": "mystery"}),
                                      ..Default::default() };
        let err = resolve_settings(&schema, &layers).unwrap_err();
        assert!(err.has_field("board"));
        assert!(err.has_field("fpga_part"));
    }
}
