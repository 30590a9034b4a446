use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tabula::index::CompactStats;
use tabula::output;
use tabula::parser::ParseOutcome;
use tabula::query::parse_query;
use tabula::utils::progress::{ProgressBar, fraction_bar, set_fraction};
use tabula::{
    DataSource, Delimiter, Document, DocumentObserver, IndexStatus, LoadCoordinator, LoadError,
    LoadObserver, LoadState, ParserOptions, RecordReader, ViewerConfig, logging,
};

#[derive(Parser)]
#[command(name = "tabula")]
#[command(about = "Load, convert and search large CSV/TSV files")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show progress bars and debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum FileType {
    Csv,
    Tsv,
}

#[derive(clap::Args)]
struct InputArgs {
    /// File to read
    file: PathBuf,

    /// Input type (defaults from the file extension)
    #[arg(short = 't', long = "type", value_enum)]
    file_type: Option<FileType>,

    /// Field separator, overrides --type
    #[arg(short, long)]
    separator: Option<char>,

    /// Encoding label for files without a byte-order mark (e.g. windows-1252); detected when omitted
    #[arg(short, long)]
    codepage: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Re-emit the file as UTF-8 TSV with every field quoted
    Convert {
        #[command(flatten)]
        input: InputArgs,

        /// Stop after this many records
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Load and index the file, then print cells matching a query
    Search {
        #[command(flatten)]
        input: InputArgs,

        /// Query: words are ANDed, "phrases", a | b, -exclude, (groups)
        #[arg(required = true, trailing_var_arg = true)]
        query: Vec<String>,

        /// Print one JSON object per match
        #[arg(long)]
        json: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
    /// Show row, column and parse statistics
    Stats {
        #[command(flatten)]
        input: InputArgs,

        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let config = ViewerConfig::load()?;

    match cli.command {
        Commands::Convert { input, limit } => convert(&input, limit, &config, cli.verbose),
        Commands::Search {
            input,
            query,
            json,
            no_color,
        } => search(&input, &query.join(" "), json, !no_color, &config, cli.verbose),
        Commands::Stats { input, json } => stats(&input, json, &config, cli.verbose),
    }
}

impl InputArgs {
    fn delimiter(&self) -> Delimiter {
        if let Some(sep) = self.separator {
            return Delimiter::from(sep);
        }
        match self.file_type {
            Some(FileType::Csv) => Delimiter::Comma,
            Some(FileType::Tsv) => Delimiter::Tab,
            None => self
                .file
                .extension()
                .and_then(|e| e.to_str())
                .map(Delimiter::from_extension)
                .unwrap_or_default(),
        }
    }

    fn open(&self, config: &ViewerConfig) -> Result<(DataSource, ParserOptions)> {
        let mut options = config.parser_options(self.delimiter());
        if self.codepage.is_some() {
            options.encoding = self.codepage.clone();
        }
        let source = DataSource::open(&self.file, options.encoding.as_deref())
            .with_context(|| format!("Failed to open {}", self.file.display()))?;
        Ok((source, options))
    }
}

fn convert(input: &InputArgs, limit: Option<usize>, config: &ViewerConfig, verbose: bool) -> Result<()> {
    let (source, options) = input.open(config)?;
    let bar = verbose.then(|| fraction_bar("Converting"));

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut written = 0usize;
    let mut write_error = None;

    let mut reader = RecordReader::new(source, options);
    let outcome = reader
        .parse_with(|record, progress| {
            if limit.is_some_and(|max| written >= max) {
                return false;
            }
            if let Err(e) = output::write_quoted_tsv(&mut out, &record) {
                write_error = Some(e);
                return false;
            }
            written += 1;
            if let Some(bar) = &bar {
                set_fraction(bar, progress);
            }
            true
        })
        .with_context(|| format!("Failed to decode {}", input.file.display()))?;

    if let Some(e) = write_error {
        if e.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(e).context("Failed to write output");
    }
    out.flush().context("Failed to write output")?;

    if let Some(bar) = bar {
        bar.finish_and_clear();
        let stats = reader.stats();
        let stopped = if outcome == ParseOutcome::Stopped {
            " (limit reached)"
        } else {
            ""
        };
        eprintln!(
            "{written} records written{stopped}, {} malformed, {} skipped",
            stats.malformed, stats.skipped
        );
    }
    Ok(())
}

fn search(
    input: &InputArgs,
    query: &str,
    json: bool,
    color: bool,
    config: &ViewerConfig,
    verbose: bool,
) -> Result<()> {
    if parse_query(query).is_empty() {
        bail!("Empty query");
    }

    let (source, options) = input.open(config)?;
    let mut doc = Document::from_source(source, options, config)?;
    let mut progress = CliProgress::new(verbose);

    match doc.wait_until_indexed(&mut progress) {
        IndexStatus::Ready(_) => {}
        IndexStatus::Degraded => bail!("Index build failed; search unavailable"),
        _ => {
            if let Some(err) = progress.error {
                bail!("Failed to load {}: {err}", input.file.display());
            }
            bail!("Load of {} did not complete", input.file.display());
        }
    }

    let hits = doc.query(query)?;
    let table = doc.table().context("Table unavailable after load")?;

    if json {
        let stdout = io::stdout();
        let mut out = BufWriter::new(stdout.lock());
        output::print_json_matches(&mut out, &table, &hits)?;
        out.flush()?;
    } else {
        let parsed = parse_query(query);
        let terms = parsed.positive_terms();
        let mut out = output::stdout(color);
        output::print_cell_matches(&mut out, &table, &hits, &terms)?;
    }

    if verbose {
        eprintln!("{} matching cells", hits.len());
    }
    Ok(())
}

#[derive(serde::Serialize)]
struct FileStats<'a> {
    path: &'a Path,
    encoding: &'static str,
    bytes: usize,
    rows: usize,
    columns: usize,
    malformed: usize,
    skipped: usize,
}

fn stats(input: &InputArgs, json: bool, config: &ViewerConfig, verbose: bool) -> Result<()> {
    let (source, options) = input.open(config)?;
    let encoding = source.encoding().name();
    let bytes = source.len();

    let mut loader = LoadCoordinator::new();
    let mut progress = CliProgress::new(verbose);
    loader.start_load_from(source, options)?;
    if loader.wait(&mut progress) != LoadState::Completed {
        if let Some(err) = progress.error {
            bail!("Failed to load {}: {err}", input.file.display());
        }
        bail!("Load of {} did not complete", input.file.display());
    }

    let table = loader.table().context("Table unavailable after load")?;
    let parse = loader.stats();
    let stats = FileStats {
        path: &input.file,
        encoding,
        bytes,
        rows: table.row_count(),
        columns: table.column_count(),
        malformed: parse.malformed,
        skipped: parse.skipped,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("File:       {}", stats.path.display());
        println!("Encoding:   {}", stats.encoding);
        println!("Size:       {}", format_bytes(stats.bytes));
        println!("Rows:       {}", stats.rows);
        println!("Columns:    {}", stats.columns);
        println!("Malformed:  {}", stats.malformed);
        println!("Skipped:    {}", stats.skipped);
    }
    Ok(())
}

fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;
    const GB: usize = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Progress bars on stderr for loading and indexing
struct CliProgress {
    load: Option<ProgressBar>,
    index: Option<ProgressBar>,
    verbose: bool,
    error: Option<String>,
}

impl CliProgress {
    fn new(verbose: bool) -> Self {
        Self {
            load: verbose.then(|| fraction_bar("Loading ")),
            index: None,
            verbose,
            error: None,
        }
    }
}

impl LoadObserver for CliProgress {
    fn on_progress(&mut self, fraction: f64) {
        if let Some(bar) = &self.load {
            set_fraction(bar, fraction);
        }
    }

    fn on_complete(&mut self) {
        if let Some(bar) = self.load.take() {
            bar.finish_and_clear();
        }
    }

    fn on_error(&mut self, error: &LoadError) {
        if let Some(bar) = self.load.take() {
            bar.finish_and_clear();
        }
        self.error = Some(error.to_string());
    }
}

impl DocumentObserver for CliProgress {
    fn on_index_progress(&mut self, rows_indexed: usize, total_rows: usize) {
        if !self.verbose || total_rows == 0 {
            return;
        }
        let bar = self.index.get_or_insert_with(|| fraction_bar("Indexing"));
        set_fraction(bar, rows_indexed as f64 / total_rows as f64);
    }

    fn on_index_ready(&mut self, stats: &CompactStats) {
        if let Some(bar) = self.index.take() {
            bar.finish_and_clear();
        }
        if self.verbose {
            eprintln!("Indexed {} cells ({} trigrams)", stats.cells, stats.trigrams);
        }
    }
}
