//! Eval command implementation.

use std::fmt::Write as _;
use std::fs;

use anyhow::{Context, Result};
use console::style;
use tracing::{debug, info};

use sparx_circuit::{CircuitBuilder, ReturnType};
use sparx_ir::{Param, SDict, Settings, singlemode};
use sparx_models::Library;

use super::common::{circuit_options, collect_settings, load_netlist, parse_backend};

/// Arguments of the eval command.
pub struct EvalArgs {
    pub netlist: String,
    pub backend: String,
    pub set: Vec<String>,
    pub sweep: Vec<String>,
    pub modes: Vec<String>,
    pub mode: Option<String>,
    pub format: String,
    pub output: Option<String>,
    pub prune: bool,
}

/// Execute the eval command.
pub fn execute(args: &EvalArgs) -> Result<()> {
    let backend = parse_backend(&args.backend)?;
    let format = args.format.to_lowercase();
    if format != "table" && format != "json" {
        anyhow::bail!("Unknown format: '{}'. Available: table, json", args.format);
    }
    let settings = collect_settings(&args.set, &args.sweep)?;

    eprintln!(
        "{} Evaluating {} with the {} backend",
        style("→").cyan().bold(),
        style(&args.netlist).green(),
        style(backend).yellow()
    );

    let recnet = load_netlist(&args.netlist)?;
    let options = circuit_options(backend, &args.modes, args.prune, ReturnType::Dict);
    let (circuit, build_info) = CircuitBuilder::new(recnet)
        .with_models(Library::new())
        .with_options(options)
        .build()?;
    debug!(cache_hit = build_info.cache_hit, "circuit built");

    let mut result = circuit.evaluate(&settings)?.into_sdict();
    if let Some(mode) = &args.mode {
        if build_info.modes.is_none() {
            anyhow::bail!("--mode {mode} needs a multimode build (pass --modes)");
        }
        result = singlemode(&result, mode)
            .with_context(|| format!("Failed to project onto mode '{mode}'"))?;
    }
    let samples = result.batch_len()?;
    info!(samples, entries = result.len(), "evaluation finished");

    let rendered = if format == "json" {
        serde_json::to_string_pretty(&result)?
    } else {
        let layered = circuit.netlist_settings().merged(&settings);
        render_table(&result, sweep_axis(&layered, samples))?
    };

    match &args.output {
        Some(path) => {
            fs::write(path, format!("{rendered}\n"))
                .with_context(|| format!("Failed to write file: {path}"))?;
            eprintln!(
                "{} Wrote {} ({} entries, {} samples)",
                style("✓").green().bold(),
                style(path).green(),
                result.len(),
                samples
            );
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

/// The swept parameter labelling table columns, if any.
fn sweep_axis(settings: &Settings, samples: usize) -> Option<(&str, &Param)> {
    let (key, len) = settings.batch_driver()?;
    if len != samples {
        return None;
    }
    settings.get(key).map(|p| (key, p))
}

/// Render `|S|^2` per declared entry, one column per sample.
pub fn render_table(s: &SDict, axis: Option<(&str, &Param)>) -> Result<String> {
    let samples = s.batch_len()?;
    let width = s.ports().map(str::len).max().unwrap_or(0);
    let label = 2 * width + 4;

    let mut out = String::new();
    write!(out, "{:label$}", "")?;
    for i in 0..samples {
        let header = match axis {
            Some((key, param)) => format!("{key}={:.4}", param.at(i)),
            None => format!("#{i}"),
        };
        write!(out, " {header:>14}")?;
    }
    writeln!(out)?;

    for (from, to, _) in s.entries() {
        write!(out, "{from:>width$} -> {to:<width$}")?;
        for i in 0..samples {
            write!(out, " {:>14.6e}", s.value(from, to, i).norm_sqr())?;
        }
        writeln!(out)?;
    }
    Ok(out.trim_end().to_string())
}
