use clap::Parser;
use std::fs;
use std::path::PathBuf;
use palettizer::{
    ClusterConfig, IngestConfig, Metric, Palette, QuantizeOptions, quantize,
};
use anyhow::{Context, Result, bail};

/// Reduce an image to a paint palette and report how much of each color it needs.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Input image path
    input: PathBuf,

    /// Comma-separated palette JSON files, merged in order
    #[arg(short, long, value_delimiter = ',')]
    palette: Vec<PathBuf>,

    /// Comma-separated list of hex colors to use as palette instead of files
    #[arg(short = 'c', long, conflicts_with = "palette")]
    colors: Option<String>,

    /// Output image path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Reduce the image to this many colors first (0 = no bound)
    #[arg(short = 'k', long, default_value_t = 0)]
    n_colors: usize,

    /// Color distance used to pick palette entries: euclidean or delta-e
    #[arg(short, long, default_value = "euclidean")]
    metric: Metric,

    /// Reject encoded inputs larger than this many bytes
    #[arg(long, default_value_t = palettizer::ingest::DEFAULT_MAX_BYTES)]
    max_bytes: u64,

    /// Downsample images whose long edge exceeds this many pixels
    #[arg(long, default_value_t = palettizer::ingest::DEFAULT_MAX_DIMENSION)]
    max_dimension: u32,

    /// Upper bound for k-means clusters
    #[arg(long, default_value_t = palettizer::cluster::DEFAULT_MAX_CLUSTERS)]
    max_clusters: usize,

    /// k-means seed
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Print the color usage report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let palette = if let Some(list) = &args.colors {
        let hex: Vec<&str> = list.split(',').map(str::trim).collect();
        Some(Palette::from_hex_list(&hex)?)
    } else if !args.palette.is_empty() {
        log::info!("parsing the palette from {:?}", args.palette);
        Some(Palette::from_files(&args.palette).context("failed to load palette")?)
    } else {
        None
    };
    if palette.as_ref().is_some_and(Palette::is_empty) {
        bail!("palette has no colors");
    }

    let options = QuantizeOptions::default()
        .with_n_colors(args.n_colors)
        .with_metric(args.metric)
        .with_ingest(
            IngestConfig::default()
                .with_max_bytes(args.max_bytes)
                .with_max_dimension(args.max_dimension),
        )
        .with_cluster(
            ClusterConfig::default()
                .with_max_clusters(args.max_clusters)
                .with_seed(args.seed),
        );

    let quantized = match quantize(args.input.as_path(), palette.as_ref(), &options) {
        Ok(q) => q,
        Err(e) if e.is_invalid_image() => bail!("cannot use {}: {e}", args.input.display()),
        Err(e) => return Err(e).context("quantization failed"),
    };

    let out_path = args.output.clone().unwrap_or_else(|| {
        let stem = args.input.file_stem().unwrap_or_default().to_string_lossy();
        PathBuf::from(format!("{stem}_palettized.png"))
    });
    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    quantized
        .image()
        .save(&out_path)
        .with_context(|| format!("failed to save {}", out_path.display()))?;
    log::info!("saved → {}", out_path.display());

    let usage = quantized.usage();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&usage)?);
    } else {
        println!("Palette colors usage:");
        for entry in &usage {
            println!("Color: {}, area: {:.2} %", entry.color, entry.percentage);
        }
    }

    Ok(())
}
