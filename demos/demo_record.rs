//! demo_record - Crosswalk a Dublin Core record into a typed struct.
//!
//! This demo registers handlers for a handful of Dublin Core elements, walks a
//! record into a [`Record`], and prints the populated fields followed by every
//! diagnostic recorded along the way.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example demo_record [record.xml]
//! ```
//!
//! Without an argument a built-in sample record is used.

use std::env;
use std::sync::Arc;

use xml_crosswalk::{
    Crosswalker, HandlerError, HandlerRegistry, ParseEvent, ReportingMode, Source,
};
use xml_crosswalk::engine::CrosswalkConfig;

const DC: &str = "http://purl.org/dc/elements/1.1/";

const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<record xmlns:dc="http://purl.org/dc/elements/1.1/" id="easy-dataset:42">
  <dc:title>Excavation at <![CDATA[Site #7]]></dc:title>
  <dc:creator>Jansen, A.</dc:creator>
  <dc:creator>de Vries, B.</dc:creator>
  <dc:subject>archaeology</dc:subject>
  <dc:date>1998</dc:date>
  <dc:language>nl</dc:language>
</record>"#;

/// The typed result of the crosswalk.
#[derive(Debug, Default)]
struct Record {
    id: Option<String>,
    title: String,
    creators: Vec<String>,
    subjects: Vec<String>,
    year: Option<u16>,
    language: Option<String>,
}

/// Returns the trimmed element text on `EndElement`, `None` otherwise.
fn element_text(event: &ParseEvent) -> Option<String> {
    match event {
        ParseEvent::EndElement { text, .. } => Some(text.trim().to_string()),
        _ => None,
    }
}

fn registry() -> Result<HandlerRegistry<Record>, xml_crosswalk::PatternError> {
    HandlerRegistry::builder()
        .namespace("dc", DC)
        .on("/record/@id", |event, _, record: &mut Record| {
            record.id = event.text().map(str::to_string);
            Ok(())
        })
        .on("/record/dc:title", |event, _, record: &mut Record| {
            if let ParseEvent::Characters { text, .. } = event {
                record.title.push_str(text);
            }
            Ok(())
        })
        .on("dc:creator", |event, _, record: &mut Record| {
            record.creators.extend(element_text(event));
            Ok(())
        })
        .on("dc:subject", |event, _, record: &mut Record| {
            record.subjects.extend(element_text(event));
            Ok(())
        })
        .on("dc:date", |event, _, record: &mut Record| {
            if let Some(text) = element_text(event) {
                let year: u16 = text.parse()?;
                if year < 1000 {
                    return Err(HandlerError::new(format!("implausible year {}", year)));
                }
                record.year = Some(year);
            }
            Ok(())
        })
        .on("dc:language", |event, _, record: &mut Record| {
            if let Some(text) = element_text(event) {
                record.language = Some(text);
            }
            Ok(())
        })
        .build()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let crosswalker = Crosswalker::with_config(
        Arc::new(registry()?),
        CrosswalkConfig::new().with_reporting(ReportingMode::LogAndPrint),
    );

    let source = match args.get(1) {
        Some(path) => Source::file(path),
        None => Source::xml(SAMPLE),
    };

    let mut record = Record::default();
    let (result, collector) = crosswalker.crosswalk(source, &mut record, None).into_parts();

    match result {
        Ok(record) => {
            println!("{:>10}  {}", "id", record.id.as_deref().unwrap_or("-"));
            println!("{:>10}  {}", "title", record.title);
            println!("{:>10}  {}", "creators", record.creators.join("; "));
            println!("{:>10}  {}", "subjects", record.subjects.join("; "));
            println!(
                "{:>10}  {}",
                "year",
                record.year.map(|y| y.to_string()).unwrap_or_else(|| "-".to_string())
            );
            println!("{:>10}  {}", "language", record.language.as_deref().unwrap_or("-"));
        }
        Err(e) => {
            eprintln!("Crosswalk failed: {}", e);
        }
    }

    if !collector.is_empty() {
        println!();
        println!("{} diagnostic(s):", collector.len());
        for diagnostic in collector.iter() {
            println!("  {}", diagnostic);
        }
    }

    Ok(())
}
