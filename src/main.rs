use clap::Parser;

use aitrait::cli::{self, Args, Commands};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let data_dir = args.data_dir;

    let result = match args.command {
        Commands::Compile { character } => cli::handle_compile(character, data_dir),
        Commands::Send { character } => cli::handle_send(character, data_dir),
        Commands::Traits { command } => cli::handle_traits(command, data_dir),
        Commands::Notes { command } => cli::handle_notes(command, data_dir),
        Commands::Relationships { command } => cli::handle_relationships(command, data_dir),
        Commands::Settings { command } => cli::handle_settings(command, data_dir),
        Commands::Reset => cli::handle_reset(data_dir),
    };

    if let Err(e) = result {
        eprintln!("❌ {:#}", e);
        std::process::exit(1);
    }
}
