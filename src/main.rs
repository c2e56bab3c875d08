use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use is_terminal::IsTerminal;
use log::info;

use nexus_migrate::cli::{Cli, Commands};
use nexus_migrate::config::persist;
use nexus_migrate::migrate::DryRunEngine;
use nexus_migrate::remote::Offline;
use nexus_migrate::session::{Notice, Session};
use nexus_migrate::ui::{PlainSurface, Surface, TerminalSurface};

fn main() -> Result<()> {
    // Operational log goes to a file so it survives the screen clearing
    // done by live rendering (truncate on each run).
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open("nexus-migrate.log")?;
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    let cli = Cli::parse();
    info!("Starting nexus-migrate");

    let surface: Box<dyn Surface> = if cli.batch || !std::io::stdout().is_terminal() {
        Box::new(PlainSurface)
    } else {
        Box::new(TerminalSurface::new())
    };

    // Real API clients plug in here; the built-in commands only need the
    // plan model and the dry-run engine, so the session starts offline.
    let mut session = Session::new(Box::new(Offline), Box::new(Offline), surface);

    if cli.plan.is_some() {
        report(&session.load(cli.plan.as_deref()));
    }

    match cli.command {
        Commands::Verify => report(&session.verify_notice()),
        Commands::DryRun => report(&session.run(&mut DryRunEngine)),
        Commands::Show => {
            let doc = persist::document(session.tree());
            println!("{:#}", doc);
        }
    }

    Ok(())
}

fn report(notice: &Notice) {
    match notice {
        Notice::Ok(text) => println!("{} {}", "✓".bright_green().bold(), text),
        Notice::Error(text) => println!("{} {}", "✗".bright_red().bold(), text.bright_red()),
    }
}
