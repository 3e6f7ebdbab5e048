use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tcg_printer::config::{self, AppConfig};
use tcg_printer::imaging::{self, ImageBackend, PrintGeometry, RustBackend};
use tcg_printer::pipeline::Pipeline;
use tcg_printer::printer::{CupsDevice, PrintController};
use tcg_printer::{logging, output, testcard, watch};

#[derive(Parser)]
#[command(name = "tcg-printer")]
#[command(version)]
#[command(about = "Watch a folder and print trading-card images")]
#[command(long_about = "\
Watch a folder and print trading-card images

Every image dropped into the watch folder is scaled to cover the card
canvas, center-cropped, optionally contrast-stretched and sharpened, and
written to the processed folder as print_<name>. The print-ready copy is
then sent to the printer. While the printer is busy, originals wait in a
retry queue that is swept every few seconds.

Folders:

  tcg_cards_input/           # watch folder (drop images here)
  processed/
  └── print_dragon.jpg       # 750x1050 @ 300 DPI
  logs/
  ├── tcg-printer.<date>.log
  └── errors.<date>.log

Supported formats: jpg, jpeg, png, bmp, tiff (configurable).

Run 'tcg-printer gen-config' to generate a documented config.toml.")]
struct Cli {
    /// Config file (stock defaults when missing)
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    /// Override [paths] watch_dir
    #[arg(long, global = true)]
    watch_dir: Option<PathBuf>,

    /// Override [printer] name
    #[arg(long, global = true)]
    printer: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Watch the folder and print new cards (default)
    Run,
    /// Prepare every image in a folder for print without printing
    Batch {
        /// Folder to read (defaults to the watch folder)
        input: Option<PathBuf>,
        /// Folder to write (defaults to the processed folder)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Show printer status
    Status,
    /// Render a test card and run it through the transformer
    TestCard {
        /// Also print it (plain paper, greyscale)
        #[arg(long)]
        print: bool,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let command = cli.command.as_ref().unwrap_or(&Command::Run);

    if let Command::GenConfig = command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = load_config(&cli)?;
    logging::init_logging(&config.logging, &config.paths.log_dir)?;
    tracing::debug!(config = %cli.config.display(), "configuration loaded");

    match command {
        Command::Run => run(config)?,
        Command::Batch { input, output_dir } => {
            init_thread_pool(&config.processing);
            let input = input.clone().unwrap_or_else(|| config.paths.watch_dir.clone());
            let output_dir = output_dir
                .clone()
                .unwrap_or_else(|| config.paths.processed_dir.clone());
            if !input.is_dir() {
                return Err(format!("input folder does not exist: {}", input.display()).into());
            }
            let files = watch::scan_existing(&input, &config.image.supported_extensions);
            let geometry = PrintGeometry::from_config(&config.image);
            let report = imaging::batch_process(&RustBackend::new(), &files, &output_dir, &geometry);
            output::print_batch_report(&report, &output_dir);
        }
        Command::Status => {
            let printer = connect_printer(&config)?;
            output::print_status(&printer.status()?);
        }
        Command::TestCard { print } => test_card(&config, *print)?,
        Command::GenConfig => unreachable!("handled above"),
    }

    Ok(())
}

/// Stock defaults, then the config file, then command-line overrides.
fn load_config(cli: &Cli) -> Result<AppConfig, config::ConfigError> {
    let mut overlays = Vec::new();
    if let Some(file) = config::load_raw_config(&cli.config)? {
        overlays.push(file);
    }
    overlays.push(cli_overlay(cli));
    config::resolve_config(overlays)
}

fn cli_overlay(cli: &Cli) -> toml::Value {
    let mut root = toml::map::Map::new();
    if let Some(dir) = &cli.watch_dir {
        let mut paths = toml::map::Map::new();
        paths.insert(
            "watch_dir".into(),
            toml::Value::String(dir.to_string_lossy().into_owned()),
        );
        root.insert("paths".into(), toml::Value::Table(paths));
    }
    if let Some(name) = &cli.printer {
        let mut printer = toml::map::Map::new();
        printer.insert("name".into(), toml::Value::String(name.clone()));
        root.insert("printer".into(), toml::Value::Table(printer));
    }
    toml::Value::Table(root)
}

fn connect_printer(config: &AppConfig) -> Result<PrintController<CupsDevice>, Box<dyn std::error::Error>> {
    let device = CupsDevice::new(config.printer.command_timeout());
    PrintController::connect(device, &config.printer).map_err(|e| {
        tracing::error!(error = %e, "printer initialization failed");
        e.into()
    })
}

fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("starting TCG card printer {}", env!("CARGO_PKG_VERSION"));
    let printer = connect_printer(&config)?;
    match printer.status() {
        Ok(status) if status.is_ready() => tracing::info!(printer = %status.name, "printer ready"),
        Ok(status) => tracing::warn!(
            printer = %status.name,
            state = %status.state,
            reasons = ?status.reasons,
            "printer not ready, files will queue"
        ),
        Err(e) => tracing::warn!(error = %e, "printer status unavailable"),
    }
    printer.setup_custom_paper_size();

    let mut pipeline = Pipeline::new(config, RustBackend::new(), printer);
    let running = pipeline.running_flag();
    ctrlc::set_handler(move || {
        tracing::info!("shutdown requested");
        running.store(false, Ordering::SeqCst);
    })?;

    let summary = pipeline.serve()?;
    output::print_session_summary(&summary);
    Ok(())
}

fn test_card(config: &AppConfig, print: bool) -> Result<(), Box<dyn std::error::Error>> {
    let image = &config.image;
    let source = config.paths.processed_dir.join("test_card_input.png");
    testcard::write_test_card(&source, image.target_width, image.target_height, image.dpi)?;

    let backend = RustBackend::new();
    let geometry = PrintGeometry::from_config(image);
    let artifact = imaging::prepare_for_print(&backend, &source, &config.paths.processed_dir, &geometry)?;
    let dims = backend.identify(&artifact)?;
    println!("Test card: {} ({}x{})", artifact.display(), dims.width, dims.height);
    if (dims.width, dims.height) != (image.target_width, image.target_height) {
        return Err(format!(
            "transformer produced {}x{}, expected {}x{}",
            dims.width, dims.height, image.target_width, image.target_height
        )
        .into());
    }

    if print {
        let printer = connect_printer(config)?;
        output::print_status(&printer.status()?);
        let options = printer
            .default_options()
            .clone()
            .with_overrides([("MediaType", "Plain"), ("ColorModel", "Gray")]);
        let job = printer.submit_with(&artifact, &options)?;
        println!("Submitted job {}", job.id);
        let outcome = printer.wait_for_completion(
            &job,
            config.pipeline.poll_interval(),
            config.pipeline.job_timeout(),
        );
        println!("Job {}: {}", job.id, outcome);
    }
    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
