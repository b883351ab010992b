use std::path::PathBuf;

use clap::{Parser, Subcommand};
use regex::Regex;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use declcrawl::config::{self, Config, ConfigError};
use declcrawl::normalizer::{self, CrawlOptions};
use declcrawl::provider::{ClangDriver, CrawlRequest};
use declcrawl::render::{self, RenderError, UnknownFormat};
use declcrawl::store::{JsonStore, Query, RecordStore, StoreError};
use declcrawl::synth::Synthesizer;

#[derive(Parser, Debug)]
#[command(name = "declcrawl", version, about)]
struct Args {
    #[arg(long, short)]
    verbose: bool,

    #[arg(long)]
    log_file: Option<String>,

    /// Store file; overrides `database.path` from declcrawl.toml.
    #[arg(long)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl source files and upsert their declarations into the store.
    Collect {
        files: Vec<PathBuf>,

        /// Label stamped on every record of this crawl.
        #[arg(long, short)]
        tag: Option<String>,

        /// Abort on the first compiler error instead of recovering
        /// unresolved type spellings from source tokens.
        #[arg(long)]
        strict: bool,

        /// Force C++ parsing regardless of file extension.
        #[arg(long)]
        cxx: bool,

        /// Extra argument passed through to clang; repeatable.
        #[arg(long = "clang-arg", value_name = "ARG")]
        clang_args: Vec<String>,
    },
    /// Re-synthesize a stored declaration with all its dependencies.
    Show {
        identifier: String,

        /// Output notation: `c` or `layout`.
        #[arg(long, short)]
        format: Option<String>,

        /// Emit the declaration alone, without resolving references.
        #[arg(long)]
        flat: bool,

        /// Restrict store lookups to records with this tag.
        #[arg(long, short)]
        tag: Option<String>,
    },
    /// List stored identifiers matching a regex.
    Search {
        pattern: String,
    },
    /// Print a store summary, or stored metadata for one identifier.
    Info {
        identifier: Option<String>,
    },
}

#[derive(Debug)]
enum AppError {
    Config(ConfigError),
    Store(StoreError),
    Format(UnknownFormat),
    Render(RenderError),
    Pattern(regex::Error),
    NotFound(String),
}

impl std::fmt::Display for AppError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::Config(e) => e.fmt(f),
            Self::Store(e) => e.fmt(f),
            Self::Format(e) => e.fmt(f),
            Self::Render(e) => e.fmt(f),
            Self::Pattern(e) => write!(f, "invalid pattern: {e}"),
            Self::NotFound(id) => write!(f, "identifier '{id}' not found in store"),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<UnknownFormat> for AppError {
    fn from(e: UnknownFormat) -> Self {
        Self::Format(e)
    }
}

impl From<RenderError> for AppError {
    fn from(e: RenderError) -> Self {
        Self::Render(e)
    }
}

fn default_log_path() -> PathBuf {
    dirs_or_tmp().join("declcrawl.log")
}

fn dirs_or_tmp() -> PathBuf {
    if let Some(home) = std::env::var_os("HOME") {
        let dir = PathBuf::from(home).join(".declcrawl");
        if std::fs::create_dir_all(&dir).is_ok() {
            return dir;
        }
    }
    std::env::temp_dir()
}

fn init_logging(
    verbose: bool,
    log_file: Option<&str>,
) {
    let stderr_filter = if verbose {
        EnvFilter::new("declcrawl=debug")
    } else {
        EnvFilter::new("declcrawl=warn")
    };

    let file_filter = if verbose {
        EnvFilter::new("declcrawl=debug")
    } else {
        EnvFilter::new("declcrawl=info")
    };

    let log_path = log_file.map(PathBuf::from).unwrap_or_else(default_log_path);

    let file_appender = tracing_appender::rolling::never(
        log_path.parent().unwrap_or(std::path::Path::new(".")),
        log_path
            .file_name()
            .unwrap_or(std::ffi::OsStr::new("declcrawl.log")),
    );

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(false)
        .with_filter(file_filter);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_filter(stderr_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .init();
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.log_file.as_deref());

    if let Err(e) = run(args) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), AppError> {
    let cwd = std::env::current_dir()
        .map_err(|e| ConfigError::Io(PathBuf::from("."), e))?;
    let config = config::resolve(&cwd)?;
    let db_path = args.db.clone().unwrap_or_else(|| config.database.path.clone());

    match args.command {
        Command::Collect {
            files,
            tag,
            strict,
            cxx,
            clang_args,
        } => collect(&db_path, &config, files, tag, strict, cxx, clang_args),
        Command::Show {
            identifier,
            format,
            flat,
            tag,
        } => show(&db_path, &config, &identifier, format.as_deref(), flat, tag),
        Command::Search {
            pattern,
        } => search(&db_path, &pattern),
        Command::Info {
            identifier,
        } => print_info(&db_path, identifier.as_deref()),
    }
}

fn collect(
    db_path: &std::path::Path,
    config: &Config,
    files: Vec<PathBuf>,
    tag: Option<String>,
    strict: bool,
    cxx: bool,
    clang_args: Vec<String>,
) -> Result<(), AppError> {
    let mut store = JsonStore::open(db_path)?;
    let driver = ClangDriver::default();

    let mut all_args = config.collect.clang_args.clone();
    all_args.extend(clang_args);
    let request = CrawlRequest {
        strict: strict || config.collect.strict,
        cxx: cxx || config.collect.cxx,
        clang_args: all_args,
    };
    let opts = CrawlOptions {
        strict: request.strict,
        tag,
    };

    let mut total = 0usize;
    for file in &files {
        info!("crawling {}", file.display());
        let output = match driver.crawl(file, &request) {
            Ok(output) => output,
            Err(e) => {
                warn!("{}: {e}", file.display());
                println!("{}: skipped", file.display());
                continue;
            },
        };
        let records = match normalizer::normalize(&output, &opts) {
            Ok(records) => records,
            Err(e) => {
                warn!("{}: {e}", file.display());
                println!("{}: skipped", file.display());
                continue;
            },
        };
        let count = records.len();
        for record in records {
            store.upsert(record);
        }
        println!("{}: {count} records", file.display());
        total += count;
    }
    store.save()?;
    println!("{total} records -> {}", db_path.display());
    Ok(())
}

/// Fetch by exact identifier, retrying with aggregate-keyword prefixes so
/// `show foo` finds `struct foo`.
fn lookup(
    store: &JsonStore,
    identifier: &str,
    tag: Option<&str>,
) -> Option<declcrawl::Record> {
    let mut query = Query::id(identifier);
    if let Some(tag) = tag {
        query = query.with_tag(tag.to_string());
    }
    if let Some(record) = store.get(&query) {
        return Some(record);
    }
    for prefix in ["struct", "union", "class", "enum"] {
        let mut retry = query.clone();
        retry.id = Some(format!("{prefix} {identifier}"));
        if let Some(record) = store.get(&retry) {
            return Some(record);
        }
    }
    None
}

fn show(
    db_path: &std::path::Path,
    config: &Config,
    identifier: &str,
    format: Option<&str>,
    flat: bool,
    tag: Option<String>,
) -> Result<(), AppError> {
    let store = JsonStore::open(db_path)?;
    let record = lookup(&store, identifier, tag.as_deref())
        .ok_or_else(|| AppError::NotFound(identifier.to_string()))?;

    let renderer = render::for_name(format.unwrap_or(&config.formats.default))?;
    let mut synthesizer = Synthesizer::new(&store, renderer.as_ref());
    if let Some(tag) = tag {
        synthesizer = synthesizer.with_tag(tag);
    }
    if flat {
        synthesizer = synthesizer.flat();
    }
    let synthesis = synthesizer.show(&record)?;
    println!("{}", synthesis.text);
    for diag in &synthesis.diagnostics {
        eprintln!("warning: {diag}");
    }
    Ok(())
}

fn search(
    db_path: &std::path::Path,
    pattern: &str,
) -> Result<(), AppError> {
    let store = JsonStore::open(db_path)?;
    let re = Regex::new(pattern).map_err(AppError::Pattern)?;
    let mut ids = store.identifiers();
    ids.sort();
    ids.dedup();
    for id in ids.iter().filter(|id| re.is_match(id)) {
        println!("{id}");
    }
    Ok(())
}

fn print_info(
    db_path: &std::path::Path,
    identifier: Option<&str>,
) -> Result<(), AppError> {
    let store = JsonStore::open(db_path)?;

    let Some(identifier) = identifier else {
        println!("store:   {}", db_path.display());
        println!("records: {}", store.len());
        let mut counts = std::collections::BTreeMap::<&str, usize>::new();
        for record in store.records() {
            *counts.entry(record.kind().as_str()).or_default() += 1;
        }
        for (kind, count) in counts {
            println!("  {kind}: {count}");
        }
        return Ok(());
    };

    let mut found = false;
    for record in store.records().iter().filter(|r| {
        r.id == identifier
            || ["struct", "union", "class", "enum"]
                .iter()
                .any(|k| r.id == format!("{k} {identifier}"))
    }) {
        found = true;
        println!("identifier: {}", record.id);
        println!("kind:       {}", record.kind());
        println!("file:       {}", record.source_file);
        if let Some(tag) = &record.tag {
            println!("tag:        {tag}");
        }
        if let Some(src) = &record.src {
            println!("nested in:  {src}");
        }
        println!();
    }
    if !found {
        return Err(AppError::NotFound(identifier.to_string()));
    }
    Ok(())
}
