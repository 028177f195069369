//! tf-index CLI entry point

use std::process::ExitCode;

use clap::Parser;

use tf_index::cli::Commands;
use tf_index::commands::{
    run_build, run_config, run_export, run_resolve, run_serve, CommandContext,
};
use tf_index::{logging, Cli};

fn main() -> ExitCode {
    match run() {
        Ok(output) => {
            print!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

fn run() -> tf_index::Result<String> {
    let cli = Cli::parse();
    let ctx = CommandContext::from_cli(cli.config.clone(), cli.format, cli.verbose)?;

    let level = if cli.verbose {
        "debug"
    } else {
        ctx.settings.logging.level.as_str()
    };
    logging::init(level);

    if matches!(
        cli.command,
        Commands::Build(_) | Commands::Export(_) | Commands::Resolve(_)
    ) {
        ctx.cancel_on_interrupt()?;
    }

    match &cli.command {
        Commands::Build(args) => run_build(args, &ctx),
        Commands::Export(args) => run_export(args, &ctx),
        Commands::Resolve(args) => run_resolve(args, &ctx),
        Commands::Config(args) => run_config(args, &ctx),
        Commands::Serve(args) => run_serve(args, &ctx),
    }
}
