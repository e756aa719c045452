use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use vbeat_charter::chart::Chart;
use vbeat_charter::exporter::{ChartExport, ErrorResponse};
use vbeat_charter::features::FeatureSet;
use vbeat_charter::preview::PreviewConfig;
use vbeat_charter::profile::Difficulty;
use vbeat_charter::{Charter, CharterConfig, DEFAULT_SEED};

#[derive(Parser, Debug)]
#[command(author, version, about = "Note chart generator for V-Beat", long_about = None)]
struct Args {
    /// Path to the feature JSON written by the extraction service
    #[arg(short, long)]
    features: PathBuf,

    /// Difficulty (easy, normal, hard, hell); unknown values use easy
    #[arg(short, long, default_value = "easy")]
    difficulty: String,

    /// Generate every difficulty (written as <output>/<difficulty>.json)
    #[arg(long)]
    all_difficulties: bool,

    /// Output file, or directory with --all-difficulties. Prints to stdout if omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Random seed
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Draw a fresh seed instead of --seed
    #[arg(long)]
    random_seed: bool,

    /// Timing offset in seconds added to every note
    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    offset: f64,

    /// Seconds at the start excluded from the preview
    #[arg(long, default_value = "10.0")]
    preview_intro: f64,

    /// Seconds at the end excluded from the preview
    #[arg(long, default_value = "10.0")]
    preview_outro: f64,

    /// Preview length in seconds
    #[arg(long, default_value = "10.0")]
    preview_length: f64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_default_env()
        .filter_level(level.parse().unwrap_or(log::LevelFilter::Info))
        .init();

    if let Err(err) = run(&args) {
        log::error!("Chart generation failed: {:#}", err);
        if let Ok(json) = ErrorResponse::internal(&err).to_json() {
            println!("{}", json);
        }
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let config = CharterConfig {
        seed: if args.random_seed { None } else { Some(args.seed) },
        offset_sec: args.offset,
        preview: PreviewConfig {
            intro_skip_sec: args.preview_intro,
            outro_skip_sec: args.preview_outro,
            window_sec: args.preview_length,
        },
    };
    let charter = Charter::new(config);

    log::info!("Loading features from {}", args.features.display());
    let features = FeatureSet::load(&args.features)?;

    let charts = if args.all_difficulties {
        charter.generate_all(&features)?
    } else {
        vec![charter.generate(&features, Difficulty::parse(&args.difficulty))?]
    };

    for chart in &charts {
        let export = ChartExport::new(chart);
        match &args.output {
            Some(out) if args.all_difficulties => {
                std::fs::create_dir_all(out)?;
                let path = out.join(format!("{}.json", chart.difficulty));
                export.save(&path)?;
                log::info!("Saved {} chart to: {}", chart.difficulty, path.display());
            }
            Some(path) => {
                export.save(path)?;
                log::info!("Saved {} chart to: {}", chart.difficulty, path.display());
            }
            None => println!("{}", export.to_json()?),
        }
    }

    print_summary(&charts);
    Ok(())
}

fn print_summary(charts: &[Chart]) {
    eprintln!("\n=== Chart Summary ===");
    for chart in charts {
        eprintln!(
            "{:<8} | {} notes ({} tap / {} long) | preview {:.1}s",
            chart.difficulty.as_str(),
            chart.notes.len(),
            chart.tap_count(),
            chart.long_count(),
            chart.preview_start_sec
        );
    }
    eprintln!("=== End Summary ===\n");
}
