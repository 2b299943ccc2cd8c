use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "revealgate-cli", version, about = "Revealgate CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reveal gate control
    Gate {
        #[command(subcommand)]
        action: commands::gate::GateAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Gate { action } => commands::gate::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
