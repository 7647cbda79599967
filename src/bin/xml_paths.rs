//! xml_paths - Count the structural paths used by a set of XML records.
//!
//! This tool crosswalks every XML file it is given into a tally of element and
//! attribute paths, optionally validating each file against an XSD first, and
//! prints how often each path occurs across all files. Files are processed in
//! parallel and share a single handler registry.
//!
//! # Usage
//!
//! ```bash
//! xml_paths [OPTIONS] <PATH>...
//! ```
//!
//! # Examples
//!
//! ```bash
//! # Tally all .xml files below a directory
//! xml_paths records/
//!
//! # Validate against a schema first (requires the `validation` feature)
//! xml_paths --schema record.xsd records/
//!
//! # Ignore namespaces and use 4 threads
//! xml_paths --local-names -j 4 records/ extra.xml
//! ```
//!
//! Files that fail to crosswalk are reported on stderr and make the tool exit
//! with status 1; the paths of the remaining files are still printed.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use rayon::prelude::*;
use walkdir::WalkDir;

use xml_crosswalk::path::StepKind;
use xml_crosswalk::{
    CrosswalkConfig, CrosswalkReport, Crosswalker, ElementPath, HandlerRegistry, ParseEvent,
    ReportingMode, Source, ValidationSetupError, Validator,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Count the structural paths used by a set of XML records.
#[derive(Parser, Debug)]
#[command(name = "xml_paths")]
#[command(version = VERSION)]
#[command(about = "Count the structural paths used by a set of XML records")]
#[command(
    long_about = "Crosswalks every XML file into a tally of element and attribute paths \
    and prints how often each path occurs. Directories are searched recursively."
)]
struct Args {
    /// Files or directories to process
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// XSD to validate each file against before parsing
    #[cfg(feature = "validation")]
    #[arg(long, value_name = "XSD")]
    schema: Option<PathBuf>,

    /// File extension to pick up when walking directories
    #[arg(long, default_value = "xml")]
    ext: String,

    /// Print paths with local names only, without namespaces
    #[arg(long)]
    local_names: bool,

    /// Print every diagnostic to stderr as it is recorded
    #[arg(long)]
    print_diagnostics: bool,

    /// Number of file-processing threads to run
    #[arg(short, long, default_value = "1")]
    jobs: usize,

    /// Follow symbolic links when walking directories
    #[arg(long)]
    follow_links: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

/// Path occurrence counts for one or more files.
#[derive(Debug, Default)]
struct PathTally {
    counts: BTreeMap<String, usize>,
}

impl PathTally {
    fn merge(mut self, other: PathTally) -> Self {
        for (path, count) in other.counts {
            *self.counts.entry(path).or_default() += count;
        }
        self
    }
}

/// Formats a path, optionally dropping namespaces.
fn render_path(path: &ElementPath, local_names: bool) -> String {
    if !local_names {
        return path.to_string();
    }
    path.steps()
        .iter()
        .map(|step| match step.kind {
            StepKind::Element => format!("/{}", step.name.local),
            StepKind::Attribute => format!("/@{}", step.name.local),
        })
        .collect()
}

fn build_registry(local_names: bool) -> Result<HandlerRegistry<PathTally>, Box<dyn std::error::Error>> {
    let registry = HandlerRegistry::builder()
        .on("*", move |event, path, tally: &mut PathTally| {
            if matches!(
                event,
                ParseEvent::StartElement { .. } | ParseEvent::Attribute { .. }
            ) {
                *tally
                    .counts
                    .entry(render_path(path, local_names))
                    .or_default() += 1;
            }
            Ok(())
        })
        .build()?;
    Ok(registry)
}

#[cfg(feature = "validation")]
fn load_validator(
    args: &Args,
) -> Result<Option<Box<dyn Validator + Sync>>, ValidationSetupError> {
    match &args.schema {
        Some(schema) => {
            let validator = xml_crosswalk::XsdValidator::from_file(schema)?;
            Ok(Some(Box::new(validator)))
        }
        None => Ok(None),
    }
}

#[cfg(not(feature = "validation"))]
fn load_validator(
    _args: &Args,
) -> Result<Option<Box<dyn Validator + Sync>>, ValidationSetupError> {
    Ok(None)
}

/// Expands directories into the files below them with the wanted extension.
fn collect_files(args: &Args) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in &args.paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        let walker = WalkDir::new(path)
            .follow_links(args.follow_links)
            .sort_by_file_name();
        for entry in walker {
            match entry {
                Ok(e) if e.file_type().is_file() && has_extension(e.path(), &args.ext) => {
                    files.push(e.path().to_path_buf());
                }
                Ok(_) => {}
                Err(e) => {
                    if args.debug {
                        eprintln!("Warning: Error walking directory: {}", e);
                    }
                }
            }
        }
    }
    files
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

fn report_failure(path: &Path, report: &CrosswalkReport<PathTally>) {
    if let Some(failure) = report.failure() {
        eprintln!("{}: {}", path.display(), failure);
        for diagnostic in report.collector().iter() {
            eprintln!("  {}", diagnostic);
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.debug {
        eprintln!("Debug mode enabled");
        eprintln!("Inputs: {:?}", args.paths);
        eprintln!("Jobs: {}", args.jobs);
    }

    if args.jobs == 0 {
        eprintln!("Error: jobs must be at least 1");
        std::process::exit(1);
    }

    let validator = match load_validator(&args) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let reporting = if args.print_diagnostics {
        ReportingMode::LogAndPrint
    } else {
        ReportingMode::Off
    };
    let crosswalker = Crosswalker::with_config(
        Arc::new(build_registry(args.local_names)?),
        CrosswalkConfig::new().with_reporting(reporting),
    );

    let files = collect_files(&args);
    if args.debug {
        eprintln!("Found {} files", files.len());
    }

    rayon::ThreadPoolBuilder::new()
        .num_threads(args.jobs)
        .build_global()
        .ok();

    let results: Vec<_> = files
        .par_iter()
        .map(|path| {
            let validator = validator.as_deref().map(|v| v as &dyn Validator);
            let report = crosswalker.crosswalk_new(Source::file(path), PathTally::default, validator);
            (path, report)
        })
        .collect();

    let mut failed = 0usize;
    let mut total = PathTally::default();
    for (path, report) in results {
        if args.debug && report.collector().has_warnings() {
            eprintln!(
                "{}: {} warning(s)",
                path.display(),
                report.collector().warnings().len()
            );
        }
        report_failure(path, &report);
        match report.into_result() {
            Ok(tally) => total = total.merge(tally),
            Err(_) => failed += 1,
        }
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for (path, count) in &total.counts {
        writeln!(handle, "{:>8}  {}", count, path)?;
    }
    handle.flush()?;

    if args.debug {
        eprintln!("Processed {} files, {} failed", files.len(), failed);
    }
    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
