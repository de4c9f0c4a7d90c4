//! Asipuc CLI — tally attendance per service and export summary slides.
//!
//! Usage:
//!   asipuc services list             Show the day's services
//!   asipuc record adults 42          Set a count on the active service
//!   asipuc show                      Print every service with totals
//!   asipuc save                      Append the day to the history database
//!   asipuc export                    Export the active service as a slide
//!   asipuc export-all                Export every enabled service plus the total
//!   asipuc resources list            List fonts, backgrounds and logos

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "asipuc",
    about = "Attendance tallies and slide exports for services",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the day's services
    Services {
        #[command(subcommand)]
        action: ServicesAction,
    },

    /// Set one category count from raw input
    Record {
        /// Category (seniors, adults, young-adults, teens, children, visitors)
        category: String,

        /// Count; non-numeric input counts as 0
        #[arg(allow_hyphen_values = true)]
        value: String,

        /// Service id (defaults to the active service)
        #[arg(short, long)]
        service: Option<u32>,
    },

    /// Zero counts
    Reset {
        /// Service id (defaults to the active service)
        #[arg(short, long)]
        service: Option<u32>,

        /// Reset every service
        #[arg(long, conflicts_with = "service")]
        all: bool,
    },

    /// Print services, counts and the accumulated total
    Show {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Append one history record per enabled service
    Save,

    /// Show recently saved records
    History {
        /// Number of records to show
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Export one slide
    Export {
        /// Service id (defaults to the active service)
        #[arg(short, long)]
        service: Option<u32>,

        /// Export the accumulated total instead of one service
        #[arg(long, conflicts_with = "service")]
        accumulated: bool,

        #[command(flatten)]
        slide: SlideArgs,
    },

    /// Export every enabled service, then the accumulated total
    ExportAll {
        #[command(flatten)]
        slide: SlideArgs,

        /// Pause between captures in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// Manage fonts, backgrounds and logos
    Resources {
        #[command(subcommand)]
        action: ResourcesAction,
    },

    /// List slide templates
    Templates,

    /// Show or initialise the configuration file
    Config {
        /// Write the default configuration if none exists
        #[arg(long)]
        init: bool,
    },
}

#[derive(Subcommand)]
enum ServicesAction {
    /// List services
    List,

    /// Add a service
    Add {
        /// Display name
        name: String,

        /// Scheduled time (HH:MM)
        #[arg(short, long, default_value = "12:00")]
        time: String,
    },

    /// Remove a service (the last one cannot be removed)
    Remove { id: u32 },

    /// Rename a service or change its time
    Rename {
        id: u32,

        /// New display name
        name: String,

        /// New scheduled time (HH:MM)
        #[arg(short, long)]
        time: Option<String>,
    },

    /// Include or exclude a service from totals and exports
    Toggle { id: u32 },

    /// Make a service the target of `record`
    Activate { id: u32 },
}

#[derive(Subcommand)]
enum ResourcesAction {
    /// List available resources
    List {
        /// Only one kind (font, background, logo)
        kind: Option<String>,
    },

    /// Copy a file into the user resource folder
    Add {
        /// Kind (font, background, logo)
        kind: String,

        /// File to import
        path: PathBuf,
    },

    /// Delete a user resource by URL
    Remove { url: String },
}

/// Slide appearance and output options shared by the export commands.
#[derive(Args, Debug, Clone, Default)]
pub struct SlideArgs {
    /// Template (modern, classic, minimal, elegant)
    #[arg(long)]
    pub template: Option<String>,

    /// Theme preset name or path to a theme JSON file
    #[arg(long)]
    pub theme: Option<String>,

    /// Output format (png, jpeg)
    #[arg(long)]
    pub format: Option<String>,

    /// JPEG quality in [0.1, 1.0]
    #[arg(long)]
    pub quality: Option<f32>,

    /// Output width
    #[arg(long, requires = "height")]
    pub width: Option<u32>,

    /// Output height
    #[arg(long, requires = "width")]
    pub height: Option<u32>,

    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Background image from the resource library (file name)
    #[arg(long)]
    pub background: Option<String>,

    /// Main logo from the resource library (file name)
    #[arg(long)]
    pub logo: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = asipuc_common::config::AppConfig::load();
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    asipuc_common::logging::init_logging(&logging);

    let ctx = commands::Context::new(config);

    match cli.command {
        Commands::Services { action } => match action {
            ServicesAction::List => commands::services::list(&ctx),
            ServicesAction::Add { name, time } => commands::services::add(&ctx, name, time),
            ServicesAction::Remove { id } => commands::services::remove(&ctx, id),
            ServicesAction::Rename { id, name, time } => {
                commands::services::rename(&ctx, id, name, time)
            }
            ServicesAction::Toggle { id } => commands::services::toggle(&ctx, id),
            ServicesAction::Activate { id } => commands::services::activate(&ctx, id),
        },
        Commands::Record {
            category,
            value,
            service,
        } => commands::record::run(&ctx, category, value, service),
        Commands::Reset { service, all } => commands::record::reset(&ctx, service, all),
        Commands::Show { json } => commands::show::run(&ctx, json),
        Commands::Save => commands::history::save(&ctx).await,
        Commands::History { limit, json } => commands::history::list(&ctx, limit, json).await,
        Commands::Export {
            service,
            accumulated,
            slide,
        } => commands::export::run(&ctx, service, accumulated, slide).await,
        Commands::ExportAll { slide, delay_ms } => {
            commands::export::run_all(&ctx, slide, delay_ms).await
        }
        Commands::Resources { action } => match action {
            ResourcesAction::List { kind } => commands::resources::list(&ctx, kind),
            ResourcesAction::Add { kind, path } => commands::resources::add(&ctx, kind, path),
            ResourcesAction::Remove { url } => commands::resources::remove(&ctx, url),
        },
        Commands::Templates => commands::templates::run(),
        Commands::Config { init } => commands::config::run(&ctx, init),
    }
}
