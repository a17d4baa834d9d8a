use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use dissolve_centroids::{run, DissolveParams};
use tracing_subscriber::EnvFilter;

/// Group polygon features by an attribute value and write one convex-hull
/// centroid point per group.
#[derive(Parser, Debug)]
#[command(name = "dissolve-centroids", version)]
struct Args {
    /// Input polygon feature collection (GeoJSON)
    input: PathBuf,

    /// Output point feature collection (GeoJSON, created)
    output: PathBuf,

    /// Attribute field whose distinct values define the groups
    #[arg(long)]
    group_field: String,

    /// Keep features with a null group value as their own group
    #[arg(long)]
    keep_nulls: bool,

    /// Leave centroids in the source spatial reference instead of
    /// reprojecting to WGS84
    #[arg(long)]
    no_wgs84: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let params = DissolveParams {
        group_field: args.group_field,
        ignore_nulls: !args.keep_nulls,
        project_to_wgs84: !args.no_wgs84,
    };

    match run(&args.input, &args.output, &params) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "run failed");
            ExitCode::FAILURE
        }
    }
}
