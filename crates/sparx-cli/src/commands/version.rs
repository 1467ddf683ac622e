//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - S-parameter circuit evaluation",
        style("sparx").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  sparx-ir       S-matrices, settings and netlists");
    println!("  sparx-backend  Port elimination backends");
    println!("  sparx-circuit  Netlist compilation and evaluation");
    println!("  sparx-models   Built-in component models");
    println!("  sparx-cli      Command-line interface");
    println!();
    println!(
        "Repository: {}",
        style(env!("CARGO_PKG_REPOSITORY")).underlined()
    );
    println!("License:    {}", style(env!("CARGO_PKG_LICENSE")).dim());
}
