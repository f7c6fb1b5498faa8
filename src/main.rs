use albummer::config::{self, AlbumConfig, SortOrder};
use albummer::template::{self, TemplateOptions};
use albummer::{generate, output};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const DEFAULT_STYLESHEET: &str = "default.css";

#[derive(Parser)]
#[command(name = "albummer")]
#[command(about = "Compile a photo album into a single self-contained HTML page")]
#[command(long_about = "\
Compile a photo album into a single self-contained HTML page

An album is a plain-text file that names a media folder and interleaves
rows of media with markdown prose:

  :folder photos/2024-lisbon     # Media folder (required)
  :use lisbon.css                # Stylesheet inlined into the page

  # Lisbon

  tram.jpg   tiles.jpg   view.jpg
  river.mp4

  The last evening.

A line whose first word is a file in the media folder is a media row; every
file on it shares one table row. Everything else is prose. PNG and JPEG
images and MP4 videos are embedded, so the page works on its own.

The page is written next to the album with an .html extension.

Run 'albummer make-template' to scaffold an album from a folder, and
'albummer gen-config' to generate a documented albummer.toml.")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile an album file into HTML
    Generate {
        /// Album file (.alb)
        album: PathBuf,
        /// Config file (defaults to albummer.toml next to the album)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Scaffold an album file listing every media file in a folder
    MakeTemplate {
        /// Media folder to list
        folder: PathBuf,
        /// Album file to write
        output: PathBuf,
        /// Images per row
        #[arg(long)]
        columns: Option<usize>,
        /// Sort by modification time
        #[arg(long, value_enum)]
        order: Option<SortOrder>,
        /// Stylesheet for the :use directive
        #[arg(long)]
        stylesheet: Option<PathBuf>,
        /// Config file (defaults to albummer.toml next to the output)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print a stock albummer.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Generate { album, config } => {
            let album_config = load_config(config.as_deref(), &album)?;
            init_thread_pool(&album_config.processing);

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    output::print_encode_event(&event);
                }
            });
            let result = generate::generate(&album, &album_config, Some(tx));
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;
            output::print_generate_output(&result?);
        }
        Command::MakeTemplate {
            folder,
            output: out,
            columns,
            order,
            stylesheet,
            config,
        } => {
            let album_config = load_config(config.as_deref(), &out)?;
            let mut options =
                TemplateOptions::from_config(&album_config.template, &default_stylesheet());
            if let Some(columns) = columns {
                options.columns = columns;
            }
            if let Some(order) = order {
                options.order = order;
            }
            if let Some(stylesheet) = stylesheet {
                options.stylesheet = stylesheet;
            }

            let report = template::write_template(
                &folder,
                &out,
                &album_config.media,
                &album_config.policy,
                &options,
            )?;
            output::print_template_output(&report);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Install the tracing subscriber on stderr.
///
/// `RUST_LOG` wins when set; otherwise `-v` picks the level, default warn.
fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
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

/// An explicit `--config` must exist; otherwise look for `albummer.toml`
/// next to `anchor`.
fn load_config(
    explicit: Option<&Path>,
    anchor: &Path,
) -> Result<AlbumConfig, Box<dyn std::error::Error>> {
    match explicit {
        Some(path) if !path.is_file() => {
            Err(format!("Config file not found: {}", path.display()).into())
        }
        Some(path) => Ok(config::load_config_file(path)?),
        None => {
            let dir = match anchor.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            Ok(config::load_config(dir)?)
        }
    }
}

/// `default.css` next to the running executable.
fn default_stylesheet() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_STYLESHEET)))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STYLESHEET))
}
