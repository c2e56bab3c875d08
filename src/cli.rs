use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "nexus-migrate")]
#[command(about = "Migrate Sonatype Nexus state to JFrog Artifactory")]
pub struct Cli {
    /// Path to a saved migration plan (defaults to the platform config dir)
    #[arg(long, global = true)]
    pub plan: Option<PathBuf>,

    /// Never render live progress or prompt; log the final summary only
    #[arg(long, global = true)]
    pub batch: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check connectivity and verify the plan against the source catalogs
    Verify,
    /// Walk the plan and report what would migrate, without touching either instance
    DryRun,
    /// Print the plan as it would be persisted (secrets stay encoded)
    Show,
}
