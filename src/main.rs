use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use radarview::catalog::{ChartData, PlayMode};
use radarview::command::{self, Command};
use radarview::config::AppConfig;
use radarview::prefs::{PrefStore, queries};
use radarview::sort::ColumnId;
use radarview::source::{DatasetSource, DirSource, HttpSource};
use radarview::store::{self, ColumnVisibility, RowView, Stores};
use radarview::window::{self, Viewport};

#[derive(Parser)]
#[command(name = "radarview", version, about = "Browse IIDX charts by notes radar")]
struct Cli {
    /// Path to the preferences database
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Read datasets from a local directory instead of the network
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Filter flags shared by `list` and `stats`. Each overrides the saved filter for this run.
#[derive(Args)]
struct FilterArgs {
    /// Play mode (SP or DP)
    #[arg(long)]
    mode: Option<PlayMode>,

    /// Title substring, case-insensitive
    #[arg(short, long)]
    search: Option<String>,

    /// Allowed difficulties, e.g. "h,a,l"
    #[arg(long)]
    diff: Option<String>,

    /// Level range, e.g. "10-12" or "11-"
    #[arg(long)]
    level: Option<String>,

    /// BPM range, e.g. "150-" (overlap with the chart's tempo range)
    #[arg(long)]
    bpm: Option<String>,

    /// Note count range, e.g. "1000-2000"
    #[arg(long)]
    notes: Option<String>,

    /// Radar range, e.g. "soflan 50-200" (repeatable)
    #[arg(long)]
    radar: Vec<String>,

    /// Clear the saved filter before applying flags
    #[arg(long)]
    fresh: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Yaml,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive catalog browser
    Browse {
        /// Start in this play mode
        #[arg(long)]
        mode: Option<PlayMode>,
    },

    /// Print one window of the filtered, sorted catalog
    List {
        #[command(flatten)]
        filter: FilterArgs,

        /// Sort keys, e.g. "level:desc,title"
        #[arg(long)]
        sort: Option<String>,

        /// First row to print
        #[arg(long, default_value = "0")]
        offset: usize,

        /// Number of rows to print
        #[arg(long, default_value = "50")]
        height: usize,

        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,

        /// Persist the resulting mode, filter and sort
        #[arg(long)]
        save: bool,
    },

    /// Summary statistics of the filtered rows
    Stats {
        #[command(flatten)]
        filter: FilterArgs,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show or clear saved preferences
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },
}

#[derive(Subcommand)]
enum PrefsAction {
    /// Print every stored preference
    Show,
    /// Delete every stored preference
    Reset,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let config = AppConfig::load();

    // Resolve database path: CLI > config > XDG default
    let db_path = cli
        .db_path
        .or(config.db_path.clone())
        .unwrap_or_else(radarview::config::default_db_path);
    log::info!("Preferences: {}", db_path.display());

    let prefs = PrefStore::open(&db_path).context("Failed to open preferences database")?;

    // Resolve dataset source: CLI > config > remote tables
    let source: Box<dyn DatasetSource> = match cli.data_dir.or(config.data_dir.clone()) {
        Some(dir) => Box::new(DirSource::new(dir)),
        None => Box::new(HttpSource::new(&config.data_url, config.timeout())),
    };

    match cli.command {
        Commands::Browse { mode } => {
            let mut stores = load_stores(&prefs, &config)?;
            if let Some(mode) = mode {
                Command::Mode(mode).apply(&mut stores);
            }
            let app = radarview::tui::App::new(stores, config.debounce(), config.overscan);
            radarview::tui::run(app, source.as_ref(), &prefs).context("Browser failed")?;
        }

        Commands::List { filter, sort, offset, height, format, save } => {
            let mut stores = load_stores(&prefs, &config)?;
            apply_filter_args(&mut stores, &filter)?;
            if let Some(sort) = sort {
                let spec = command::parse_sort(&sort).context("Invalid --sort")?;
                Command::Sort(spec).apply(&mut stores);
            }
            if save {
                prefs
                    .save_all(&queries::Preferences::from_stores(&stores))
                    .context("Failed to save preferences")?;
                log::info!("Saved filter and sort");
            }

            load_catalog(&mut stores, source.as_ref())?;
            let mut view = RowView::default();
            view.sync(&stores);

            let w = window::compute(view.len(), 1, Viewport { scroll_offset: offset, height }, 0);
            let rows: Vec<&ChartData> = view.slice(w.range()).map(|(_, chart)| chart).collect();

            match format {
                OutputFormat::Table => {
                    if view.is_empty() {
                        println!("No charts match.");
                        return Ok(());
                    }
                    if !rows.is_empty() {
                        print_chart_table(&rows, stores.columns.get());
                        println!();
                    }
                    println!("{}", window_summary(&w, view.len()));
                }
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&rows)?);
                }
                OutputFormat::Yaml => {
                    print!("{}", serde_yaml::to_string(&rows)?);
                }
            }
        }

        Commands::Stats { filter, json } => {
            let mut stores = load_stores(&prefs, &config)?;
            apply_filter_args(&mut stores, &filter)?;
            load_catalog(&mut stores, source.as_ref())?;
            let mut view = RowView::default();
            view.sync(&stores);

            let Some(stats) = radarview::stats::compute(&view.all()) else {
                println!("No charts match.");
                return Ok(());
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
                return Ok(());
            }

            println!("{} charts ({})", stats.count, stores.catalog.get().play_mode);
            println!();
            println!("{:<8} {:>9} {:>9} {:>9} {:>9}", "", "Mean", "Median", "Min", "Max");
            println!("{}", "-".repeat(48));
            let line = |label: &str, s: &radarview::stats::Summary| {
                println!(
                    "{:<8} {:>9.2} {:>9.2} {:>9.2} {:>9.2}",
                    label, s.mean, s.median, s.min, s.max
                );
            };
            line("Notes#", &stats.note_count);
            for (kind, s) in &stats.radar {
                line(kind.label(), s);
            }
        }

        Commands::Prefs { action } => match action {
            PrefsAction::Show => {
                let entries = prefs.entries().context("Failed to read preferences")?;
                for key in queries::ALL_KEYS {
                    match entries.iter().find(|(k, _, _)| k == key) {
                        Some((_, value, updated)) => println!("{key:<10} {value}  ({updated})"),
                        None => println!("{key:<10} (default)"),
                    }
                }
            }
            PrefsAction::Reset => {
                let removed = prefs.reset().context("Failed to reset preferences")?;
                println!("Removed {removed} stored preferences.");
            }
        },
    }

    Ok(())
}

/// Session stores from saved preferences. Without a stored column layout the
/// configured preset applies.
fn load_stores(prefs: &PrefStore, config: &AppConfig) -> Result<Stores> {
    let mut saved = prefs.load_all().context("Failed to load preferences")?;
    let has_columns = prefs
        .get_raw(queries::COLUMNS_KEY)
        .context("Failed to load preferences")?
        .is_some();
    if !has_columns {
        saved.columns = ColumnVisibility::preset(config.compact_columns);
    }
    Ok(saved.into_stores())
}

fn apply_filter_args(stores: &mut Stores, args: &FilterArgs) -> Result<()> {
    if args.fresh {
        Command::Reset.apply(stores);
    }
    if let Some(mode) = args.mode {
        Command::Mode(mode).apply(stores);
    }
    if let Some(text) = &args.search {
        Command::Search(text.clone()).apply(stores);
    }

    let mut lines: Vec<String> = Vec::new();
    if let Some(d) = &args.diff {
        lines.push(format!("diffs {d}"));
    }
    if let Some(r) = &args.level {
        lines.push(format!("level {r}"));
    }
    if let Some(r) = &args.bpm {
        lines.push(format!("bpm {r}"));
    }
    if let Some(r) = &args.notes {
        lines.push(format!("notes {r}"));
    }
    lines.extend(args.radar.iter().map(|r| format!("radar {r}")));

    for line in lines {
        let command: Command = line.parse().with_context(|| format!("Invalid filter '{line}'"))?;
        command.apply(stores);
    }
    Ok(())
}

fn load_catalog(stores: &mut Stores, source: &dyn DatasetSource) -> Result<()> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner:.green} {msg}").unwrap());
    pb.set_message(format!("Loading datasets from {}", source.describe()));
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = store::refresh(&mut stores.catalog, source);
    pb.finish_and_clear();

    let count = result.context("Failed to load datasets")?;
    log::info!("Loaded {count} charts");
    Ok(())
}

/// Footer line for one printed window of `total` matching rows.
fn window_summary(w: &window::Window, total: usize) -> String {
    if w.is_empty() {
        format!("Rows 0 of {total}")
    } else {
        format!("Rows {}-{} of {total}", w.start + 1, w.end)
    }
}

/// Print rows with the visible columns.
fn print_chart_table(rows: &[&ChartData], columns: &ColumnVisibility) {
    let columns = columns.ordered();
    let width = |c: ColumnId| match c {
        ColumnId::Title => 36,
        ColumnId::Bpm => 9,
        _ => 7,
    };

    let header: Vec<String> = columns
        .iter()
        .map(|&c| format!("{:<w$}", c.label(), w = width(c)))
        .collect();
    let header = header.join(" ");
    println!("{}", header.trim_end());
    println!("{}", "-".repeat(header.len()));

    for chart in rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|&c| {
                let w = width(c);
                let text = c.cell_text(chart);
                // Truncate long titles
                let text: String = if text.chars().count() > w {
                    text.chars().take(w - 3).chain("...".chars()).collect()
                } else {
                    text
                };
                format!("{text:<w$}")
            })
            .collect();
        println!("{}", cells.join(" ").trim_end());
    }
}
