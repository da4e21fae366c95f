//! Identificación de partes FPGA y tabla de placas conocidas.
//!
//! Los nombres de parte siguen la nomenclatura del fabricante
//! (`LFE5U-85F-8BG756C`, `iCE40UP5K-SG48`, `xc7a35ticsg324-1L`); aquí se
//! traducen a lo que esperan yosys y nextpnr (familia, dispositivo,
//! encapsulado, speed grade).
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vendor {
    Lattice,
    Xilinx,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FpgaPart {
    pub part: String,
    pub vendor: Vendor,
    /// Familia como la nombran las herramientas abiertas (`ecp5`, `ice40`, `xc7`).
    pub family: Option<String>,
    /// Dispositivo o capacidad (`85k`, `um5g-45k`, `up5k`).
    pub device: Option<String>,
    pub package: Option<String>,
    pub speed: Option<String>,
}

impl FpgaPart {
    /// Nunca falla: una parte no reconocida queda como `Vendor::Unknown`
    /// sin familia.
    pub fn parse(part: &str) -> Self {
        let part = part.trim();
        let upper = part.to_ascii_uppercase();
        if upper.starts_with("LFE5") {
            parse_ecp5(part, &upper)
        } else if upper.starts_with("ICE40") {
            parse_ice40(part, &upper)
        } else if upper.starts_with("XC") {
            parse_xilinx(part, &upper)
        } else {
            Self::bare(part, Vendor::Unknown)
        }
    }

    fn bare(part: &str, vendor: Vendor) -> Self {
        Self { part: part.to_string(),
               vendor,
               family: None,
               device: None,
               package: None,
               speed: None }
    }

    pub fn family(&self) -> Option<&str> {
        self.family.as_deref()
    }

    /// Arquitectura de nextpnr (`nextpnr-<arch>`), si está soportada.
    pub fn nextpnr_arch(&self) -> Option<&str> {
        match self.family() {
            Some(f @ ("ecp5" | "ice40")) => Some(f),
            _ => None,
        }
    }
}

fn parse_ecp5(part: &str, upper: &str) -> FpgaPart {
    let mut out = FpgaPart::bare(part, Vendor::Lattice);
    out.family = Some("ecp5".to_string());
    let segments: Vec<&str> = upper.split('-').collect();
    let variant = match segments.first().copied() {
        Some("LFE5UM5G") => "um5g-",
        Some("LFE5UM") => "um-",
        _ => "",
    };
    if let Some(size) = segments.get(1) {
        let digits: String = size.chars().take_while(char::is_ascii_digit).collect();
        if !digits.is_empty() {
            out.device = Some(format!("{variant}{digits}k"));
        }
    }
    if let Some(code) = segments.get(2) {
        let speed: String = code.chars().take_while(char::is_ascii_digit).collect();
        let rest = &code[speed.len()..];
        let letters: String = rest.chars().take_while(char::is_ascii_alphabetic).collect();
        let pins: String = rest[letters.len()..].chars().take_while(char::is_ascii_digit).collect();
        if !speed.is_empty() {
            out.speed = Some(speed);
        }
        if !pins.is_empty() {
            let package = match letters.as_str() {
                "BG" => "CABGA",
                "MG" => "CSFBGA",
                "TG" => "TQFP",
                other => other,
            };
            out.package = Some(format!("{package}{pins}"));
        }
    }
    out
}

fn parse_ice40(part: &str, upper: &str) -> FpgaPart {
    let mut out = FpgaPart::bare(part, Vendor::Lattice);
    out.family = Some("ice40".to_string());
    let mut segments = upper["ICE40".len()..].split('-');
    out.device = segments.next().filter(|d| !d.is_empty()).map(str::to_ascii_lowercase);
    out.package = segments.next().filter(|p| !p.is_empty()).map(str::to_ascii_lowercase);
    out
}

fn parse_xilinx(part: &str, upper: &str) -> FpgaPart {
    let mut out = FpgaPart::bare(part, Vendor::Xilinx);
    let series = &upper[2..];
    out.family = if series.starts_with('7') {
        Some("xc7".to_string())
    } else if series.starts_with("ZU") || ((series.starts_with("KU") || series.starts_with("VU")) && series.contains('P')) {
        Some("xcup".to_string())
    } else if series.starts_with("KU") || series.starts_with("VU") {
        Some("xcu".to_string())
    } else {
        None
    };
    let mut segments = part.splitn(2, '-');
    out.device = segments.next().map(str::to_ascii_lowercase);
    out.speed = segments.next().map(str::to_string);
    out
}

/// Placas conocidas y su parte FPGA.
const BOARDS: &[(&str, &str)] = &[("ulx3s", "LFE5U-85F-6BG381C"),
                                  ("ulx3s_12f", "LFE5U-12F-6BG381C"),
                                  ("orangecrab", "LFE5U-25F-8MG285C"),
                                  ("ecp5_evn", "LFE5UM5G-85F-8BG381C"),
                                  ("icebreaker", "iCE40UP5K-SG48"),
                                  ("upduino", "iCE40UP5K-SG48"),
                                  ("icestick", "iCE40HX1K-TQ144"),
                                  ("arty_a7_35", "xc7a35ticsg324-1L"),
                                  ("arty_a7_100", "xc7a100tcsg324-1"),
                                  ("basys3", "xc7a35tcpg236-1"),
                                  ("nexys_a7", "xc7a100tcsg324-1")];

/// Parte FPGA de una placa conocida (`-` y mayúsculas se normalizan).
pub fn board_part(board: &str) -> Option<&'static str> {
    let key = board.trim().to_ascii_lowercase().replace('-', "_");
    BOARDS.iter().find(|(name, _)| *name == key).map(|(_, part)| *part)
}

pub fn known_boards() -> impl Iterator<Item = &'static str> {
    BOARDS.iter().map(|(name, _)| *name)
}
