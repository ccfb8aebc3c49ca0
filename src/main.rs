use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use textreel::cli::{self, Args, Command};
use textreel::config::Config;

/// Install a Ctrl+C handler that flips `flag`.
fn setup_ctrlc_handler(flag: Arc<AtomicBool>) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
}

fn load_config(args: &Args, render: &cli::RenderArgs) -> Config {
    let config = Config::load(args.config.as_deref()).and_then(|c| render.apply_to(c));
    match config {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn runtime() -> tokio::runtime::Runtime {
    match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {}", e);
            std::process::exit(1);
        }
    }
}

fn main() {
    let args = Args::parse();

    if let Err(e) = cli::init_logging(args.log_file.as_deref(), args.log_level.into()) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    match &args.command {
        Command::Charsets => cli::list_charsets(),
        Command::Config { action } => cli::handle_config_action(action.clone(), args.config.as_deref()),
        Command::Render { render, frame, all } => {
            let config = load_config(&args, render);
            let rt = runtime();
            let mut stdout = std::io::stdout();
            if let Err(e) = rt.block_on(cli::render(&config, *frame, *all, &mut stdout)) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Command::Play { render, no_status } => {
            let config = load_config(&args, render);
            let interrupted = Arc::new(AtomicBool::new(false));
            if let Err(e) = setup_ctrlc_handler(Arc::clone(&interrupted)) {
                eprintln!("Warning: Could not set up Ctrl+C handler: {}", e);
            }
            let rt = runtime();
            if let Err(e) = rt.block_on(cli::play(config, !*no_status, interrupted)) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}
