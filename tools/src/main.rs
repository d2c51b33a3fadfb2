use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::{Parser, Subcommand, ValueEnum};
use codec::{CellRequest, CodecLimits};
use fsshttpb_tools::{inspect_request, sample_request, InspectReport, SampleKind};
use glob::Pattern;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "fsshttpb-tools",
    version,
    about = "FSSHTTPB request inspection and sample tools"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a base64 sample request.
    Sample {
        #[arg(value_enum)]
        kind: SampleArg,
    },
    /// Inspect the frame structure of encoded requests.
    Inspect {
        /// Path to a request file, or a directory of them.
        path: PathBuf,
        /// Input files hold base64 text rather than raw bytes.
        #[arg(long)]
        base64: bool,
        /// Output format.
        #[arg(long, value_enum, default_value_t = InspectFormat::Tree)]
        format: InspectFormat,
        /// Optional glob filter when inspecting a directory.
        #[arg(long)]
        glob: Option<String>,
        /// Sort inspected files.
        #[arg(long, value_enum)]
        sort: Option<InspectSort>,
        /// Limit the number of inspected files (after sorting).
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SampleArg {
    QueryAccess,
    QueryChanges,
    PutChanges,
    Allocate,
}

impl From<SampleArg> for SampleKind {
    fn from(arg: SampleArg) -> Self {
        match arg {
            SampleArg::QueryAccess => Self::QueryAccess,
            SampleArg::QueryChanges => Self::QueryChanges,
            SampleArg::PutChanges => Self::PutChanges,
            SampleArg::Allocate => Self::Allocate,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum InspectFormat {
    Tree,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum InspectSort {
    Size,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    frames: &'a InspectReport,
    request: &'a CellRequest,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Sample { kind } => {
            let request = sample_request(kind.into()).context("build sample request")?;
            println!("{}", request.to_base64().context("encode sample request")?);
        }
        Command::Inspect {
            path,
            base64,
            format,
            glob,
            sort,
            limit,
        } => {
            if path.is_dir() {
                let entries = collect_request_entries(&path, glob.as_deref())?;
                let mut entries = maybe_sort_entries(entries, sort);
                let limit = limit.or(sort.map(|InspectSort::Size| 10));
                if let Some(limit) = limit {
                    entries.truncate(limit);
                }
                for entry in entries {
                    println!("== {} ({} bytes) ==", entry.path.display(), entry.size);
                    inspect_file(&entry.path, base64, format)?;
                }
            } else {
                inspect_file(&path, base64, format)?;
            }
        }
    }
    Ok(())
}

fn inspect_file(path: &Path, base64: bool, format: InspectFormat) -> Result<()> {
    let limits = CodecLimits::default();
    let bytes = read_request_bytes(path, base64)?;
    let report = inspect_request(&bytes, &limits)
        .with_context(|| format!("walk frames of {}", path.display()))?;
    match format {
        InspectFormat::Tree => print!("{report}"),
        InspectFormat::Json => {
            let request = CellRequest::decode(&bytes, &limits)
                .with_context(|| format!("decode request {}", path.display()))?;
            let output = JsonOutput {
                frames: &report,
                request: &request,
            };
            let json = serde_json::to_string_pretty(&output).context("serialize json")?;
            println!("{json}");
        }
    }
    Ok(())
}

fn read_request_bytes(path: &Path, base64: bool) -> Result<Vec<u8>> {
    if base64 {
        let text = fs::read_to_string(path)
            .with_context(|| format!("read request text {}", path.display()))?;
        STANDARD
            .decode(text.trim())
            .with_context(|| format!("decode base64 in {}", path.display()))
    } else {
        fs::read(path).with_context(|| format!("read request {}", path.display()))
    }
}

struct RequestEntry {
    path: PathBuf,
    size: u64,
}

fn collect_request_entries(dir: &Path, glob: Option<&str>) -> Result<Vec<RequestEntry>> {
    let mut entries = Vec::new();
    let pattern = match glob {
        Some(value) => Some(Pattern::new(value).context("invalid glob pattern")?),
        None => None,
    };

    for entry in fs::read_dir(dir).with_context(|| format!("read dir {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(pattern) = &pattern {
            let matches_path = pattern.matches_path(&path);
            let matches_name = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| pattern.matches(name));
            if !matches_path && !matches_name {
                continue;
            }
        }
        let size = entry.metadata()?.len();
        entries.push(RequestEntry { path, size });
    }
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

fn maybe_sort_entries(
    mut entries: Vec<RequestEntry>,
    sort: Option<InspectSort>,
) -> Vec<RequestEntry> {
    match sort {
        Some(InspectSort::Size) => {
            entries.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path)));
        }
        None => {}
    }
    entries
}
