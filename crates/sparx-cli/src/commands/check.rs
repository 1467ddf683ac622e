//! Check command implementation.

use anyhow::Result;
use console::style;
use tracing::info;

use sparx_backend::BackendKind;
use sparx_circuit::{CircuitBuilder, ReturnType};
use sparx_models::Library;

use super::common::{circuit_options, load_netlist};

/// Execute the check command.
pub fn execute(netlist: &str, modes: &[String], prune: bool) -> Result<()> {
    println!("{} Checking {}", style("→").cyan().bold(), style(netlist).green());

    let recnet = load_netlist(netlist)?;
    let options = circuit_options(BackendKind::default(), modes, prune, ReturnType::Dict);
    let (circuit, info) = CircuitBuilder::new(recnet)
        .with_models(Library::new())
        .with_options(options)
        .build()?;
    info!(leaves = info.num_leaves(), "netlist resolved");

    println!();
    print!("{info}");

    let defaults = circuit.default_settings();
    if !defaults.is_empty() {
        println!("settings:");
        for (key, value) in &defaults {
            println!("  {key} = {}", serde_json::to_string(value)?);
        }
    }

    println!();
    println!(
        "{} {} external ports, {} leaf instances",
        style("✓").green().bold(),
        info.ports.len(),
        info.num_leaves()
    );
    Ok(())
}
