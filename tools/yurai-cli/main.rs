use clap::Parser;
use std::fs::{self, File};
use std::io::{BufWriter, Read};
use std::path::{Path, PathBuf};
use std::result::Result;
use std::time::{Duration, Instant};
use yurai::prelude::*;
use yurai::report::render_report;

/// A field-provenance analysis CLI for cloud flow definitions
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a definition JSON file, or a directory of definitions
    input: Option<String>,

    /// Path to write the report to (stdout when omitted)
    #[arg(short, long)]
    output: Option<String>,

    /// Retries after the first attempt for rate-limited requests
    #[arg(long, default_value_t = 3)]
    max_retries: u32,

    /// First backoff delay in milliseconds, doubled per retry
    #[arg(long, default_value_t = 1000)]
    base_delay_ms: u64,

    /// Surface the library's debug events (RUST_LOG overrides this)
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let input = cli
        .input
        .clone()
        .unwrap_or_else(|| exit_with_error("An input path is required."));
    let path = Path::new(&input);

    if path.is_dir() {
        run_batch(path, &cli);
    } else {
        run_single(path, &cli);
    }
}

/// Analyzes every `.json` definition under a directory through the full
/// pipeline, governor included.
fn run_batch(root: &Path, cli: &Cli) {
    let total_start = Instant::now();

    let store = DirectoryStore {
        root: root.to_path_buf(),
    };
    let policy = RetryPolicy {
        max_retries: cli.max_retries,
        base_delay: Duration::from_millis(cli.base_delay_ms),
    };
    let pipeline = AnalysisPipeline::new(store).with_policy(policy);

    println!("Analyzing definitions in '{}'...", root.display());
    let run_start = Instant::now();
    let records = pipeline
        .run()
        .unwrap_or_else(|e| exit_with_error(&format!("Batch analysis failed: {}", e)));
    let run_duration = run_start.elapsed();

    let failed = records.iter().filter(|r| r.parse_error.is_some()).count();
    write_output(&records, cli.output.as_deref());

    println!("\n--- Batch Summary ---");
    println!("Flows analyzed:  {}", records.len() - failed);
    println!("Flows failed:    {}", failed);
    println!("Rate usage:      {}", pipeline.governor().summary());

    println!("\n--- Performance Summary ---");
    println!("Analysis:        {:?}", run_duration);
    println!("Total Execution: {:?}", total_start.elapsed());
}

/// Analyzes one definition file without store or governor machinery.
fn run_single(path: &Path, cli: &Cli) {
    let total_start = Instant::now();

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("flow")
        .to_string();

    let ingest_start = Instant::now();
    let definition = yurai::flow::ingest_file(path).unwrap_or_else(|e| {
        exit_with_error(&format!(
            "Failed to ingest definition '{}': {}",
            path.display(),
            e
        ))
    });
    let ingest_duration = ingest_start.elapsed();

    let analyze_start = Instant::now();
    let analysis = FlowAnalyzer::new().analyze(definition);
    let analyze_duration = analyze_start.elapsed();

    println!("\n--- Flow Summary ---");
    println!("Trigger:         {}", analysis.trigger_type);
    println!("Actions:         {}", analysis.action_names.len());
    println!("Fields written:  {}", analysis.modified_attributes.len());
    println!("Fields read:     {}", analysis.read_attributes.len());
    println!("Variables:       {}", analysis.variables.len());

    let record = FlowRecord::from_analysis(name.clone(), name, analysis);
    write_output(std::slice::from_ref(&record), cli.output.as_deref());

    println!("\n--- Performance Summary ---");
    println!("Ingestion:       {:?}", ingest_duration);
    println!("Analysis:        {:?}", analyze_duration);
    println!("Total Execution: {:?}", total_start.elapsed());
}

fn write_output(records: &[FlowRecord], output: Option<&str>) {
    match output {
        Some(path) => {
            let file = File::create(path).unwrap_or_else(|e| {
                exit_with_error(&format!("Failed to create report file '{}': {}", path, e))
            });
            write_report(records, BufWriter::new(file))
                .unwrap_or_else(|e| exit_with_error(&format!("Failed to write report: {}", e)));
            println!("\nReport written to '{}'", path);
        }
        None => {
            println!("\n{}", render_report(records));
        }
    }
}

/// Reads definitions from a directory of exported `.json` documents. The
/// file stem doubles as the flow's name and id.
struct DirectoryStore {
    root: PathBuf,
}

impl FlowStore for DirectoryStore {
    fn list_flows(&self) -> Result<Vec<FlowHandle>, StoreError> {
        let entries =
            fs::read_dir(&self.root).map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let mut flows = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| StoreError::Unavailable(e.to_string()))?
                .path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let stem = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("flow")
                    .to_string();
                flows.push(FlowHandle::new(stem.clone(), stem));
            }
        }
        flows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(flows)
    }

    fn open_definition(&self, handle: &FlowHandle) -> Result<Box<dyn Read>, StoreError> {
        let path = self.root.join(format!("{}.json", handle.id));
        let file = File::open(&path)
            .map_err(|e| StoreError::Unavailable(format!("{}: {}", path.display(), e)))?;
        Ok(Box::new(file))
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default.into());
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
