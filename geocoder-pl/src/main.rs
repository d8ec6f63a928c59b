//! Point d'entrée CLI pour geocoder-pl

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

use geocoder_pl::cli::{self, Commands};

// .env du répertoire courant, sinon celui du binaire
fn load_env() {
    if dotenvy::dotenv().is_err() {
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

/// Géocodeur BDOT10K / PRG vers PostGIS
#[derive(Parser)]
#[command(name = "geocoder-pl")]
#[command(author, version)]
#[command(about = "Importer les bâtiments BDOT10K et les points adresse PRG dans PostGIS")]
#[command(long_about = "Importe les bâtiments BDOT10K et les points adresse PRG dans PostGIS.\n\nChaque point adresse est vérifié dans sa gmina (relocalisation via Nominatim sinon), rattaché au bâtiment le plus proche et indexé par secteur pour la recherche textuelle.")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env();

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::ImportBuildings {
            path,
            dictionaries,
            schema,
            settings,
            drop_schema,
            skip_indexes,
            report,
            db,
        } => {
            info!(path = %path.display(), "Import BDOT10K buildings");
            cli::cmd_import_buildings(
                &path,
                &dictionaries,
                &schema,
                settings.as_deref(),
                drop_schema,
                skip_indexes,
                report.as_deref(),
                &db,
            )
            .await?;
        }
        Commands::ImportPoints {
            path,
            regions,
            schema,
            settings,
            report,
            db,
        } => {
            info!(path = %path.display(), regions = %regions.display(), "Import PRG address points");
            cli::cmd_import_points(
                &path,
                &regions,
                &schema,
                settings.as_deref(),
                report.as_deref(),
                &db,
            )
            .await?;
        }
        Commands::Search {
            query,
            limit,
            lat,
            lon,
            schema,
            settings,
            db,
        } => {
            cli::cmd_search(&query, limit, lat, lon, &schema, settings.as_deref(), &db).await?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
