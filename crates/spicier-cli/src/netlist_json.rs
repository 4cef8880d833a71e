//! Small JSON netlist representation, the CLI's stand-in for the
//! out-of-scope SPICE text parser. Deserializes straight into
//! `spicier_core::Circuit` via its derived `Serialize`/`Deserialize` impls
//! on `ComponentSpec`, so this module is just the file-reading boundary.

use std::path::Path;

use anyhow::{Context, Result};
use spicier_core::Circuit;

pub fn load(path: &Path) -> Result<Circuit> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading netlist file {}", path.display()))?;
    let circuit: Circuit =
        serde_json::from_str(&text).with_context(|| format!("parsing JSON netlist {}", path.display()))?;
    Ok(circuit)
}
