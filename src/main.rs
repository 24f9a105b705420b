use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use skimmer::graph::TileSet;
use skimmer::{CostMatrix, MatrixConfig, MatrixRequest, ModeCosting};

#[derive(Parser)]
#[command(name = "skimmer")]
#[command(about = "Many-to-many cost matrices on tiled road graphs", long_about = None)]
struct Cli {
    /// Log verbosely
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a cost matrix for a JSON request against a tileset
    Matrix {
        /// Tileset file (.json or bincode)
        graph: PathBuf,
        /// Matrix request JSON
        request: PathBuf,
        /// Engine tunables JSON
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Convert a tileset between JSON and the binary format
    Convert {
        /// Input tileset (.json or bincode)
        input: PathBuf,
        /// Output tileset (.json or bincode)
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("Failed to initialize logging")?;

    match cli.command {
        Commands::Matrix {
            graph,
            request,
            config,
        } => run_matrix(&graph, &request, config.as_deref()),
        Commands::Convert { input, output } => run_convert(&input, &output),
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().map(|e| e == "json").unwrap_or(false)
}

fn load_tiles(path: &Path) -> Result<TileSet> {
    if is_json(path) {
        let data = std::fs::read_to_string(path).context("Failed to read tileset JSON")?;
        serde_json::from_str(&data).context("Failed to parse tileset JSON")
    } else {
        TileSet::load(path)
    }
}

fn run_matrix(graph: &Path, request: &Path, config: Option<&Path>) -> Result<()> {
    let tiles = load_tiles(graph)?;
    info!("Loaded {} tiles from {}", tiles.tile_count(), graph.display());

    let data = std::fs::read_to_string(request).context("Failed to read request")?;
    let request: MatrixRequest = serde_json::from_str(&data).context("Failed to parse request")?;

    let config = match config {
        Some(path) => {
            let data = std::fs::read_to_string(path).context("Failed to read config")?;
            serde_json::from_str::<MatrixConfig>(&data).context("Failed to parse config")?
        }
        None => MatrixConfig::default(),
    };

    let mut matrix = CostMatrix::new(config);
    let response = matrix
        .source_to_target(&request, &tiles, &ModeCosting::default(), None)
        .context("Matrix query failed")?;

    info!(
        "{}x{} matrix, {} settled edges, {} iterations",
        response.source_count,
        response.target_count,
        response.stats.settled(),
        response.stats.iterations
    );
    for s in 0..response.source_count {
        let row: Vec<String> = (0..response.target_count)
            .map(|t| {
                let cell = response.cell(s, t);
                if cell.found {
                    format!("{:.0}s/{:.0}m", cell.seconds, cell.distance)
                } else {
                    "--".to_string()
                }
            })
            .collect();
        println!("{s:>4}: {}", row.join("  "));
    }
    Ok(())
}

fn run_convert(input: &Path, output: &Path) -> Result<()> {
    let tiles = load_tiles(input)?;
    if is_json(output) {
        let data = serde_json::to_string_pretty(&tiles).context("Failed to encode tileset")?;
        std::fs::write(output, data).context("Failed to write tileset JSON")?;
    } else {
        tiles.save(output)?;
    }
    info!(
        "Converted {} tiles: {} -> {}",
        tiles.tile_count(),
        input.display(),
        output.display()
    );
    Ok(())
}
