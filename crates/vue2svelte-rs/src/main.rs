//! vue2svelte-rs: Vue 2 single-file components to Svelte.

use clap::Parser;
use miette::Result;
use vue2svelte_rs::cli::Args;
use vue2svelte_rs::config::{RunOptions, V2sConfig};
use vue2svelte_rs::orchestrator;
use vue2svelte_rs::output::Formatter;

fn main() -> Result<()> {
    let args = Args::parse();

    let config = V2sConfig::load(args.config.as_deref());
    let options = match RunOptions::resolve(&args, config) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match orchestrator::run(&options) {
        Ok(summary) => {
            let text = Formatter::new(args.output).format(&summary);
            println!("{}", text.trim_end());
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
