//! sqlframe CLI
//!
//! Command-line interface for running SQL against SQLite and printing the
//! resulting frames:
//! - Run a query (optionally resampled onto a time grid)
//! - Show the interpolated SQL for a query
//! - Generate a default config file

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{bail, Context};
use chrono::{DateTime, Duration, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rusqlite::Connection;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sqlframe::config::{generate_default_config, Config, LoggingConfig};
use sqlframe::query::{parse_duration, FormatMode, MacroSet, QueryContext};
use sqlframe::source::{parse_timestamp, sqlite::sqlite_macros};
use sqlframe::{Converter, FieldType, FillMode, Frame, NativeKind, TimeRange, TypeRegistry};

#[derive(Parser)]
#[command(name = "sqlframe")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Turn SQL query results into typed frames")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a query against a SQLite database
    Query(QueryArgs),

    /// Print the SQL produced by macro interpolation
    Interpolate {
        #[command(flatten)]
        context: ContextArgs,
        /// Macro dialect
        #[arg(long, value_enum, default_value = "sqlite")]
        dialect: Dialect,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
pub struct QueryArgs {
    /// SQLite database file (default: database.path from config)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// JSON request envelope file, used instead of --sql
    #[arg(long, conflicts_with = "sql")]
    pub request: Option<PathBuf>,

    #[command(flatten)]
    pub context: ContextArgs,

    /// Maximum rows per frame (-1 = unlimited)
    #[arg(long, allow_hyphen_values = true)]
    pub row_limit: Option<i64>,

    /// Type columns without a usable declared type by sampling their values
    #[arg(long)]
    pub dynamic: bool,

    /// Column converted to timestamps regardless of declared type
    #[arg(long, default_value = "time")]
    pub time_column: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct ContextArgs {
    /// SQL text, may contain $__ macros
    #[arg(long)]
    pub sql: Option<String>,

    /// Range start (RFC 3339 or "YYYY-MM-DD HH:MM:SS")
    #[arg(long, requires = "to")]
    pub from: Option<String>,

    /// Range end
    #[arg(long, requires = "from")]
    pub to: Option<String>,

    /// Range ending now (e.g. 6h, 7d); ignored when --from/--to are given
    #[arg(long, default_value = "6h")]
    pub last: String,

    /// Grouping / resample interval (e.g. 1m)
    #[arg(long)]
    pub interval: Option<String>,

    /// Fill mode for resampling: previous, null or value:N
    #[arg(long)]
    pub fill: Option<String>,

    /// Result shape: time_series or table
    #[arg(long, default_value = "time_series")]
    pub mode: String,

    /// Reference id naming the frames
    #[arg(long, default_value = "A")]
    pub ref_id: String,

    /// Table name for $__table
    #[arg(long, default_value = "")]
    pub table: String,

    /// Column name for $__column
    #[arg(long, default_value = "")]
    pub column: String,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Dialect {
    Sqlite,
    Generic,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    init_logging(&config.logging)?;

    match cli.command {
        Commands::Query(args) => run_query(args, &config),
        Commands::Interpolate { context, dialect } => {
            let macros = match dialect {
                Dialect::Sqlite => sqlite_macros(),
                Dialect::Generic => MacroSet::default(),
            };
            let ctx = build_context(&context, &config)?;
            println!("{}", sqlframe::interpolate(&ctx, &macros)?);
            Ok(())
        }
        Commands::Config { output } => {
            let config_content = generate_default_config();
            if let Some(path) = output {
                std::fs::write(&path, &config_content)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("Config written to {}", path.display());
            } else {
                print!("{}", config_content);
            }
            Ok(())
        }
    }
}

fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sqlframe={}", config.level)));
    let registry = tracing_subscriber::registry().with(filter);

    let file = match &config.file {
        Some(path) => Some(Mutex::new(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path))?,
        )),
        None => None,
    };

    match (config.format.as_str(), file) {
        ("json", Some(file)) => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(file))
            .init(),
        ("json", None) => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        (_, Some(file)) => registry
            .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file))
            .init(),
        (_, None) => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
    Ok(())
}

fn parse_time(s: &str) -> anyhow::Result<DateTime<Utc>> {
    match s {
        "now" => Ok(Utc::now()),
        _ => parse_timestamp(s).with_context(|| format!("Invalid timestamp: {}", s)),
    }
}

fn build_context(args: &ContextArgs, config: &Config) -> anyhow::Result<QueryContext> {
    let sql = args
        .sql
        .as_deref()
        .context("--sql is required (or --request for queries)")?;

    let range = match (&args.from, &args.to) {
        (Some(from), Some(to)) => {
            let (from, to) = (parse_time(from)?, parse_time(to)?);
            match TimeRange::try_new(from, to) {
                Some(range) => range,
                None => bail!("--from must not be after --to"),
            }
        }
        _ => {
            let last = parse_duration(&args.last)
                .with_context(|| format!("Invalid duration: {}", args.last))?;
            TimeRange::last(last)
                .with_context(|| format!("--last {} is out of range", args.last))?
        }
    };

    let mode = FormatMode::parse(&args.mode)
        .with_context(|| format!("Invalid mode: {}", args.mode))?;

    let mut ctx = QueryContext::new(sql, range)
        .ref_id(args.ref_id.clone())
        .format(mode)
        .table(args.table.clone())
        .column(args.column.clone());

    if let Some(interval) = &args.interval {
        let interval: Duration = parse_duration(interval)
            .with_context(|| format!("Invalid interval: {}", interval))?;
        ctx = ctx.interval(interval);
    }

    let fill = match &args.fill {
        Some(raw) => Some(FillMode::parse(raw).with_context(|| format!("Invalid fill mode: {}", raw))?),
        None => config.query.fill(),
    };
    if let Some(fill) = fill {
        ctx = ctx.fill_mode(fill);
    }

    Ok(ctx)
}

fn time_column_converter(name: &str) -> Converter {
    TypeRegistry::converter_for(FieldType::Time)
        .named(format!("time column '{}'", name))
        .for_column(name)
        .scan(NativeKind::Temporal)
}

fn run_query(args: QueryArgs, config: &Config) -> anyhow::Result<()> {
    let db = args
        .db
        .clone()
        .or_else(|| config.database.path.as_ref().map(PathBuf::from))
        .context("No database given: pass --db or set database.path")?;
    let conn = Connection::open(&db)
        .with_context(|| format!("Failed to open database {}", db.display()))?;

    let mut pipeline = config
        .query
        .pipeline()
        .with_macros(sqlite_macros())
        .with_converter(time_column_converter(&args.time_column));
    if let Some(limit) = args.row_limit {
        pipeline = pipeline.row_limit(limit);
    }
    if args.dynamic {
        pipeline = pipeline.with_converter(Converter::dynamic());
    }

    let frames = match &args.request {
        Some(path) => {
            let request = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read request {}", path.display()))?;
            pipeline.run_sqlite_json(&conn, &request)?
        }
        None => {
            let ctx = build_context(&args.context, config)?;
            pipeline.run_sqlite(&conn, &ctx)?
        }
    };

    print_frames(&frames, args.format)
}

fn print_frames(frames: &[Frame], format: OutputFormat) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, frames)?;
            writeln!(out)?;
        }
        OutputFormat::Csv => {
            for frame in frames {
                frame.write_csv(&mut out)?;
            }
        }
        OutputFormat::Table => {
            for frame in frames {
                writeln!(out, "{} ({} rows)", frame.name, frame.row_count())?;
                writeln!(out, "{}", frame.to_table_string())?;
            }
        }
    }

    for frame in frames {
        for notice in &frame.meta.notices {
            eprintln!("{}: {}", frame.name, notice.text);
        }
    }
    Ok(())
}
