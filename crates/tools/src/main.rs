use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use foundation::math::LonLat;
use raster::RendererConfig;
use tools::{JobInput, parse_ids, parse_projection, parse_tile, pick, render_tile};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Render and pick granule footprint tiles")]
struct Args {
    /// Renderer config (JSON); missing fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct InputArgs {
    /// Granule search results (CMR JSON feed or a plain array)
    #[arg(long)]
    granules: PathBuf,

    /// Collection tags JSON carrying imagery option sets
    #[arg(long)]
    tags: Option<PathBuf>,

    /// geographic, arctic or antarctic
    #[arg(long, default_value = "geographic")]
    projection: String,

    /// Comma-separated ids added to the project
    #[arg(long)]
    added: Option<String>,

    /// Comma-separated ids removed from the project
    #[arg(long)]
    removed: Option<String>,

    /// Outline colour, #rrggbb
    #[arg(long)]
    color: Option<String>,

    /// Colour for deemphasized outlines
    #[arg(long)]
    light_color: Option<String>,

    /// Render as on the project page (excluded footprints are hidden)
    #[arg(long)]
    project_page: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Draw one tile and write outline.png, index.png and imagery.png
    Render {
        #[command(flatten)]
        input: InputArgs,

        /// Tile as z/x/y
        #[arg(long)]
        tile: String,

        /// Output directory
        #[arg(long, default_value = "tiles")]
        out: PathBuf,

        /// Seconds to wait for each imagery response
        #[arg(long, default_value_t = 30)]
        wait_secs: u64,
    },

    /// Print the footprint a click at lon/lat would select, as JSON
    Pick {
        #[command(flatten)]
        input: InputArgs,

        #[arg(long, default_value_t = 3)]
        zoom: u8,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(e) = real_main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), String> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| format!("read {}: {e}", path.display()))?;
            RendererConfig::from_json(&raw).map_err(|e| format!("parse {}: {e}", path.display()))?
        }
        None => RendererConfig::default(),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("tokio runtime: {e}"))?;

    match args.command {
        Command::Render {
            input,
            tile,
            out,
            wait_secs,
        } => {
            let job = load_input(&input)?;
            let tile = parse_tile(&tile)?;
            let rendered = runtime.block_on(render_tile(
                &job,
                &config,
                tile,
                reqwest::Client::new(),
                Duration::from_secs(wait_secs),
            ))?;
            rendered.save(&out)?;
            info!(tile = %tile, out = %out.display(), failed_loads = rendered.failed_loads, "wrote tile rasters");
            println!("{}", out.display());
        }
        Command::Pick {
            input,
            zoom,
            lon,
            lat,
        } => {
            let job = load_input(&input)?;
            let report = pick(&job, &config, zoom, LonLat::new(lon, lat))?;
            let json = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
            println!("{json}");
        }
    }
    Ok(())
}

fn load_input(args: &InputArgs) -> Result<JobInput, String> {
    let mut job = JobInput::load(
        &args.granules,
        args.tags.as_deref(),
        parse_ids(args.added.as_deref()),
        parse_ids(args.removed.as_deref()),
    )?;
    job.projection = parse_projection(&args.projection)?;
    job.color = args.color.clone();
    job.light_color = args.light_color.clone();
    job.project_page = args.project_page;
    Ok(job)
}
