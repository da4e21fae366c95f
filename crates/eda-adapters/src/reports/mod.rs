//! Parsers por herramienta. Todos escriben en un `ParsedReport` y devuelven
//! si encontraron lo que buscaban; el llamador decide si marcar parcial.

pub mod nextpnr;
pub mod sim;
pub mod vivado;
pub mod yosys;

use std::fs;
use std::path::Path;

/// Lee un reporte como texto (lossy). `None` si no existe o no se puede leer.
pub fn read_text(path: &Path) -> Option<String> {
    match fs::read(path) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => {
            log::debug!("report {} not readable: {e}", path.display());
            None
        }
    }
}
