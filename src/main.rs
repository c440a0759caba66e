use clap::{Parser, Subcommand};
use rabbit_diary::config::{self, DiaryConfig};
use rabbit_diary::diary::DiaryCache;
use rabbit_diary::generate::{self, SiteLayout};
use rabbit_diary::imaging::{DiaryBackend, RustBackend};
use rabbit_diary::render::{self, RenderTarget};
use rabbit_diary::template::FileTemplate;
use rabbit_diary::{naming, output};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rabbit-diary")]
#[command(about = "Hourly drawing diary: strip thumbnails and month pages")]
#[command(long_about = "\
Hourly drawing diary: strip thumbnails and month pages

Every day is a directory holding up to 24 drawings, one per hour, and
optional notes for notable hours:

  rabbits/
  ├── 2022-11-01/
  │   ├── rabbit-2022-11-01-0.png     # Drawing for hour 0
  │   ├── rabbit-2022-11-01-13.png    # Drawing for hour 13
  │   ├── event-2022-11-01-13.txt     # Note for hour 13
  │   └── thumbnail.png               # Strip of all hours (generated)
  └── old/                            # Archive, scanned after the root
      └── 2021-03-14/

Pages are rendered from an HTML template. A line holding <!--RABBIT DAY-->
starts a day block, repeated once per day of the selected month.

Run 'rabbit-diary gen-config' to generate a documented diary.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the static site for a diary directory
    Generate {
        /// Diary directory holding the day directories
        diary: PathBuf,
        /// Directory holding index.html and its assets
        template_dir: PathBuf,
        /// Output directory, replaced on every run
        target: PathBuf,
    },
    /// Print one page rendered from the configured template
    Render {
        /// Month to show, as YYYY-MM (default: newest month)
        #[arg(long)]
        month: Option<String>,
        /// Render links for the static site instead of the live endpoint
        #[arg(long = "static")]
        static_links: bool,
    },
    /// List diary days with their drawing and note counts
    List {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Write thumbnail.png into every day directory lacking one
    Thumbnails,
    /// Print a stock diary.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = config::load_config(&cli.config)?;
    init_thread_pool(&config.processing);
    let backend: Arc<dyn DiaryBackend> = Arc::new(RustBackend::new());

    match cli.command {
        Command::Generate {
            diary,
            template_dir,
            target,
        } => {
            let layout = SiteLayout::new(&diary, &template_dir, &target)?;
            let cache = DiaryCache::new(
                vec![layout.diary_dir.clone()],
                backend,
                config.day_settings(),
                config.diary_cooldown(),
            );
            let summary = generate::generate(&cache, &layout)?;
            output::print_generate_summary(&summary);
        }
        Command::Render {
            month,
            static_links,
        } => {
            let month = month.as_deref().and_then(|raw| {
                let parsed = naming::parse_month_selector(raw);
                if parsed.is_none() {
                    warn!(month = raw, "Ignoring invalid month selector");
                }
                parsed
            });
            let target = if static_links {
                RenderTarget::static_page(month)
            } else {
                RenderTarget::live(config.page.api_endpoint.clone())
            };
            let template = FileTemplate::new(config.template_dirs(), config.page.template_file.clone());
            let cache = open_diary(&config, backend);
            for line in render::render_index_page(&template, &cache, month, &target)? {
                println!("{}", line);
            }
        }
        Command::List { json } => {
            let cache = open_diary(&config, backend);
            cache.refresh();
            let buckets = cache.days_by_month_reversed();
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&output::day_rows(&buckets))?
                );
            } else {
                output::print_day_listing(&buckets);
            }
        }
        Command::Thumbnails => {
            let cache = open_diary(&config, backend);
            let (days, created) = generate::materialize_thumbnails(&cache);
            info!(days, created, "Thumbnails written");
            println!("{created} thumbnails created for {days} days");
        }
        Command::GenConfig => {}
    }

    Ok(())
}

fn open_diary(config: &DiaryConfig, backend: Arc<dyn DiaryBackend>) -> DiaryCache {
    DiaryCache::new(
        config.roots(),
        backend,
        config.day_settings(),
        config.diary_cooldown(),
    )
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores. User can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
