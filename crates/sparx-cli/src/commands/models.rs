//! Models command implementation.

use console::style;
use sparx_ir::ModelSource;
use sparx_models::Library;

/// Execute the models command.
pub fn execute() {
    let library = Library::new();

    println!("{}", style("Built-in models:").bold());
    println!();

    for name in library.components() {
        let Some(model) = library.get(&name) else {
            continue;
        };
        println!(
            "  {} {}",
            style(format!("{name:<14}")).cyan(),
            style(model.describe()).dim()
        );
        println!("      ports:    {}", model.ports().join(", "));
        let settings = model.settings();
        if !settings.is_empty() {
            let defaults: Vec<String> = settings
                .iter()
                .map(|(key, value)| match value.as_scalar() {
                    Some(v) => format!("{key}={v}"),
                    None => key.to_string(),
                })
                .collect();
            println!("      defaults: {}", defaults.join(", "));
        }
    }
}
