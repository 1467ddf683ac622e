//! sparx Command-Line Interface
//!
//! Builds and evaluates JSON netlists against the built-in component library.
//!
//! ```text
//! sparx check --netlist mzi.json
//! sparx eval --netlist mzi.json --sweep wl=1.5:1.6:11 --set top.length=25
//! sparx eval --netlist mzi.json --modes TE,TM --mode TE --format json -o s.json
//! ```

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{check, eval, models, version};

/// sparx - S-parameter circuit evaluation
#[derive(Parser)]
#[command(name = "sparx")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a netlist and report how it resolved
    Check {
        /// Netlist file (flat or recursive JSON)
        #[arg(short, long)]
        netlist: String,

        /// Comma-separated mode names for multimode builds
        #[arg(long, value_delimiter = ',')]
        modes: Vec<String>,

        /// Drop instances that cannot reach an external port
        #[arg(long)]
        prune: bool,
    },

    /// Evaluate a netlist and print its S-matrix
    Eval {
        /// Netlist file (flat or recursive JSON)
        #[arg(short, long)]
        netlist: String,

        /// Backend (dense, klu, forward)
        #[arg(short, long, default_value = "dense", env = "SPARX_BACKEND")]
        backend: String,

        /// Parameter value: key=value or key=v1,v2,...
        #[arg(short, long = "set")]
        set: Vec<String>,

        /// Parameter sweep: key=start:stop:n
        #[arg(long)]
        sweep: Vec<String>,

        /// Comma-separated mode names for multimode builds
        #[arg(long, value_delimiter = ',')]
        modes: Vec<String>,

        /// Project the result onto a single mode
        #[arg(long)]
        mode: Option<String>,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,

        /// Write the result to a file instead of stdout
        #[arg(short, long)]
        output: Option<String>,

        /// Drop instances that cannot reach an external port
        #[arg(long)]
        prune: bool,
    },

    /// List the built-in component models
    Models,

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Check {
            netlist,
            modes,
            prune,
        } => check::execute(&netlist, &modes, prune),
        Commands::Eval {
            netlist,
            backend,
            set,
            sweep,
            modes,
            mode,
            format,
            output,
            prune,
        } => eval::execute(&eval::EvalArgs {
            netlist,
            backend,
            set,
            sweep,
            modes,
            mode,
            format,
            output,
            prune,
        }),
        Commands::Models => {
            models::execute();
            Ok(())
        }
        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}
