//! End-to-end crosswalk tests.

use std::io::Write;
use std::sync::{Arc, Mutex};

use xml_crosswalk::{
    CrosswalkConfig, CrosswalkFailure, Crosswalker, Diagnostic, ElementPath, EngineState,
    ErrorCollector, HandlerError, HandlerRegistry, ParseEvent, Phase, ReportingMode, Source,
    ValidationSetupError, Validator,
};

#[derive(Debug, Default)]
struct Record {
    title: Option<String>,
    creators: Vec<String>,
}

fn record_registry() -> HandlerRegistry<Record> {
    HandlerRegistry::builder()
        .on("/record/title", |event, _, record: &mut Record| {
            if let ParseEvent::Characters { text, .. } = event {
                record.title.get_or_insert_with(String::new).push_str(text);
            }
            Ok(())
        })
        .on("creator", |event, _, record: &mut Record| {
            if let ParseEvent::EndElement { text, .. } = event {
                record.creators.push(text.trim().to_string());
            }
            Ok(())
        })
        .build()
        .unwrap()
}

/// Reports a fixed set of diagnostics, like a validator that found problems.
struct Scripted(Vec<Diagnostic>);

impl Validator for Scripted {
    fn validate(&self, _: &[u8], collector: &mut ErrorCollector) -> Result<(), ValidationSetupError> {
        for d in &self.0 {
            collector.report(d.clone().in_phase(Phase::Validation));
        }
        Ok(())
    }
}

/// Accepts every document and remembers what it was given.
#[derive(Default)]
struct Recording {
    seen: Mutex<Vec<Vec<u8>>>,
}

impl Validator for Recording {
    fn validate(&self, xml: &[u8], _: &mut ErrorCollector) -> Result<(), ValidationSetupError> {
        self.seen.lock().unwrap().push(xml.to_vec());
        Ok(())
    }
}

#[test]
fn test_title_crosswalk_without_validator() {
    let crosswalker = Crosswalker::new(Arc::new(record_registry()));
    let mut record = Record::default();

    let report = crosswalker.crosswalk_str("<record><title>Hello</title></record>", &mut record, None);

    assert!(report.collector().is_clean());
    assert_eq!(report.state(), EngineState::Succeeded);
    drop(report);
    assert_eq!(record.title.as_deref(), Some("Hello"));
}

#[test]
fn test_truncated_input_is_malformed() {
    let crosswalker = Crosswalker::new(Arc::new(record_registry()));
    let mut record = Record::default();

    let report = crosswalker.crosswalk_str("<record><title>Hello", &mut record, None);

    assert!(matches!(report.failure(), Some(CrosswalkFailure::MalformedInput(_))));
    assert!(!report.collector().is_clean());
    drop(report);
    assert_eq!(record.title, None);
}

#[test]
fn test_stream_is_read_once_and_both_passes_see_everything() {
    let xml = "<record><title>Stream</title></record>";
    let crosswalker = Crosswalker::new(Arc::new(record_registry()));
    let validator = Recording::default();
    let mut record = Record::default();

    let report = crosswalker.crosswalk_reader(xml.as_bytes(), &mut record, Some(&validator));

    assert!(report.is_success());
    drop(report);
    assert_eq!(validator.seen.lock().unwrap()[0], xml.as_bytes());
    assert_eq!(record.title.as_deref(), Some("Stream"));
}

#[test]
fn test_file_source_with_validator() {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    tmp.write_all(b"<record><title>On disk</title><creator> Smith </creator></record>")
        .unwrap();

    let crosswalker = Crosswalker::new(Arc::new(record_registry()));
    let validator = Scripted(vec![Diagnostic::warning("no schemaLocation")]);
    let mut record = Record::default();

    let report = crosswalker.crosswalk_file(tmp.path(), &mut record, Some(&validator));

    assert!(report.is_success());
    assert!(report.collector().is_clean());
    assert_eq!(report.collector().warnings().len(), 1);
    drop(report);
    assert_eq!(record.title.as_deref(), Some("On disk"));
    assert_eq!(record.creators, vec!["Smith"]);
}

#[test]
fn test_schema_invalid_document_still_parses() {
    let crosswalker = Crosswalker::new(Arc::new(record_registry()));
    let validator = Scripted(vec![
        Diagnostic::error("element 'creator' not expected"),
        Diagnostic::fatal("schema gave up"),
    ]);
    let mut record = Record::default();

    let report = crosswalker.crosswalk_str(
        "<record><creator>A</creator><title>T</title></record>",
        &mut record,
        Some(&validator),
    );

    match report.failure() {
        Some(CrosswalkFailure::ContentErrors(diagnostics)) => assert_eq!(diagnostics.len(), 2),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(report.collector().errors().len(), 1);
    assert_eq!(report.collector().fatal_errors().len(), 1);
    drop(report);
    assert_eq!(record.title.as_deref(), Some("T"));
    assert_eq!(record.creators, vec!["A"]);
}

#[test]
fn test_each_matching_event_dispatched_once_with_its_path() {
    let registry = HandlerRegistry::builder()
        .on("*", |event, path: &ElementPath, log: &mut Vec<String>| {
            let kind = match event {
                ParseEvent::StartElement { .. } => "start",
                ParseEvent::EndElement { .. } => "end",
                ParseEvent::Characters { .. } => "text",
                ParseEvent::Attribute { .. } => "attr",
            };
            log.push(format!("{} {}", kind, path));
            Ok(())
        })
        .build()
        .unwrap();
    let crosswalker = Crosswalker::new(Arc::new(registry));
    let mut log = Vec::new();

    let report = crosswalker.crosswalk_str(
        r#"<record lang="en"><title>T</title><empty/></record>"#,
        &mut log,
        None,
    );
    assert!(report.is_success());
    drop(report);

    assert_eq!(
        log,
        vec![
            "start /record",
            "attr /record/@lang",
            "start /record/title",
            "text /record/title",
            "end /record/title",
            "start /record/empty",
            "end /record/empty",
            "end /record",
        ]
    );
}

#[test]
fn test_namespaced_registry() {
    let dc = "http://purl.org/dc/elements/1.1/";
    let registry = HandlerRegistry::builder()
        .namespace("dc", dc)
        .on("/record/dc:title", |event, _, titles: &mut Vec<String>| {
            if let ParseEvent::EndElement { text, .. } = event {
                titles.push(text.clone());
            }
            Ok(())
        })
        .build()
        .unwrap();
    let crosswalker = Crosswalker::new(Arc::new(registry));
    let mut titles = Vec::new();

    // Same namespace under a different prefix, plus an unqualified title
    let xml = format!(
        r#"<record xmlns:x="{}"><x:title>Qualified</x:title><title>Plain</title></record>"#,
        dc
    );
    let report = crosswalker.crosswalk_str(&xml, &mut titles, None);
    assert!(report.is_success());
    drop(report);

    assert_eq!(titles, vec!["Qualified"]);
}

#[test]
fn test_handler_failure_keeps_earlier_diagnostics() {
    let registry = HandlerRegistry::builder()
        .on("/record/year", |event, _, years: &mut Vec<u32>| {
            if let ParseEvent::EndElement { text, .. } = event {
                years.push(text.trim().parse()?);
            }
            Ok(())
        })
        .build()
        .unwrap();
    let crosswalker = Crosswalker::new(Arc::new(registry));
    let validator = Scripted(vec![Diagnostic::warning("first"), Diagnostic::warning("second")]);
    let mut years = Vec::new();

    let report = crosswalker.crosswalk_str(
        "<record><year>1999</year><year>soon</year><year>2001</year></record>",
        &mut years,
        Some(&validator),
    );

    match report.failure() {
        Some(CrosswalkFailure::Handler { path, .. }) => assert_eq!(path, "/record/year"),
        other => panic!("unexpected {:?}", other),
    }
    let warnings: Vec<_> = report
        .collector()
        .warnings()
        .iter()
        .map(|d| d.message.as_str())
        .collect();
    assert_eq!(warnings, vec!["first", "second"]);
    drop(report);
    assert_eq!(years, vec![1999]);
}

#[test]
fn test_handler_error_source_is_preserved() {
    let registry = HandlerRegistry::builder()
        .on("/a", |_, _, _: &mut ()| {
            Err(HandlerError::with_source(
                "lookup failed",
                std::io::Error::new(std::io::ErrorKind::NotFound, "vocabulary missing"),
            ))
        })
        .build()
        .unwrap();
    let crosswalker = Crosswalker::new(Arc::new(registry));

    let mut target = ();
    let report = crosswalker.crosswalk_str("<a/>", &mut target, None);
    let err = report.into_result().unwrap_err();
    let text = err.to_string();
    assert!(text.contains("lookup failed"), "{}", text);
    assert!(text.contains("vocabulary missing"), "{}", text);
}

#[test]
fn test_concurrent_crosswalks_share_one_engine() {
    let crosswalker = Arc::new(Crosswalker::new(Arc::new(record_registry())));

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let crosswalker = Arc::clone(&crosswalker);
                scope.spawn(move || {
                    let xml = format!(
                        "<record><title>Title {i}</title>{}</record>",
                        "<creator>c</creator>".repeat(i)
                    );
                    let mut record = Record::default();
                    let ok = crosswalker
                        .crosswalk_str(&xml, &mut record, None)
                        .is_success();
                    (i, ok, record)
                })
            })
            .collect();

        for handle in handles {
            let (i, ok, record) = handle.join().unwrap();
            assert!(ok);
            assert_eq!(record.title, Some(format!("Title {}", i)));
            assert_eq!(record.creators.len(), i);
        }
    });
}

#[test]
fn test_validation_setup_failure() {
    struct MissingSchema;

    impl Validator for MissingSchema {
        fn validate(&self, _: &[u8], _: &mut ErrorCollector) -> Result<(), ValidationSetupError> {
            Err(ValidationSetupError::SchemaNotFound("record.xsd".into()))
        }
    }

    let crosswalker = Crosswalker::new(Arc::new(record_registry()));
    let mut record = Record::default();
    let report = crosswalker.crosswalk_str("<record><title>T</title></record>", &mut record, Some(&MissingSchema));

    let err = report.into_result().unwrap_err();
    assert!(err.to_string().contains("Schema file not found"));
    assert_eq!(record.title, None);
}

#[test]
fn test_reporting_mode_does_not_change_verdict() {
    struct Silent;

    impl log::Log for Silent {
        fn enabled(&self, _: &log::Metadata<'_>) -> bool {
            true
        }
        fn log(&self, _: &log::Record<'_>) {}
        fn flush(&self) {}
    }

    for mode in [ReportingMode::Off, ReportingMode::Log, ReportingMode::LogAndPrint] {
        let config = CrosswalkConfig::new().with_logger(mode, Arc::new(Silent));
        assert_eq!(config.reporter.mode(), mode);
        let crosswalker = Crosswalker::with_config(Arc::new(record_registry()), config);
        let validator = Scripted(vec![Diagnostic::error("bad")]);
        let mut record = Record::default();

        let report = crosswalker.crosswalk_str("<record/>", &mut record, Some(&validator));
        assert!(matches!(report.failure(), Some(CrosswalkFailure::ContentErrors(_))));
    }
}

#[test]
fn test_crosswalk_new_withholds_target_on_failure() {
    let crosswalker = Crosswalker::new(Arc::new(record_registry()));
    let report = crosswalker.crosswalk_new(Source::xml("<record><title>"), Record::default, None);

    assert_eq!(report.state(), EngineState::Failed);
    assert!(report.into_result().is_err());
}

#[test]
fn test_title_chunks_keep_separating_whitespace() {
    let crosswalker = Crosswalker::new(Arc::new(record_registry()));

    for (xml, expected) in [
        ("<record><title><![CDATA[a]]> <![CDATA[b]]></title></record>", "a b"),
        ("<record><title> </title></record>", " "),
        ("<record>\n  <title>Indented</title>\n</record>", "Indented"),
    ] {
        let mut record = Record::default();
        let report = crosswalker.crosswalk_str(xml, &mut record, None);
        assert!(report.is_success(), "{:?}", report.failure());
        drop(report);
        assert_eq!(record.title.as_deref(), Some(expected), "{}", xml);
    }
}

#[test]
fn test_latin1_record() {
    let crosswalker = Crosswalker::new(Arc::new(record_registry()));
    let xml: Vec<u8> =
        b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n<record><title>Cr\xe8me br\xfbl\xe9e</title></record>"
            .to_vec();
    let mut record = Record::default();

    let report = crosswalker.crosswalk(Source::bytes(xml), &mut record, None);

    assert!(report.is_success(), "{:?}", report.failure());
    drop(report);
    assert_eq!(record.title.as_deref(), Some("Cr\u{e8}me br\u{fb}l\u{e9}e"));
}

#[test]
fn test_internal_entity_record() {
    let crosswalker = Crosswalker::new(Arc::new(record_registry()));
    let mut record = Record::default();

    let report = crosswalker.crosswalk_str(
        r#"<!DOCTYPE record [<!ENTITY e "x">]><record><title>&e;</title></record>"#,
        &mut record,
        None,
    );

    assert!(report.is_success(), "{:?}", report.failure());
    drop(report);
    assert_eq!(record.title.as_deref(), Some("x"));
}

#[cfg(feature = "validation")]
mod xsd {
    use super::*;
    use xml_crosswalk::XsdValidator;

    const SCHEMA: &str = r#"<?xml version="1.0"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="record">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="title" type="xs:string"/>
        <xs:element name="creator" type="xs:string" minOccurs="0" maxOccurs="unbounded"/>
      </xs:sequence>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;

    #[test]
    fn test_schema_from_file() {
        let mut xsd = tempfile::NamedTempFile::new().unwrap();
        xsd.write_all(SCHEMA.as_bytes()).unwrap();
        let validator = XsdValidator::from_file(xsd.path()).unwrap();

        let crosswalker = Crosswalker::new(Arc::new(record_registry()));
        let mut record = Record::default();
        let report = crosswalker.crosswalk_str(
            "<record><title>Valid</title><creator>A</creator></record>",
            &mut record,
            Some(&validator),
        );

        assert!(report.is_success(), "{:?}", report.failure());
        assert!(report.collector().is_empty());
    }

    #[test]
    fn test_schema_violation_reported_with_location() {
        let validator = XsdValidator::from_bytes(SCHEMA).unwrap();
        let crosswalker = Crosswalker::new(Arc::new(record_registry()));
        let mut record = Record::default();

        let report = crosswalker.crosswalk_str(
            "<record>\n<creator>A</creator>\n<title>Late</title>\n</record>",
            &mut record,
            Some(&validator),
        );

        match report.failure() {
            Some(CrosswalkFailure::ContentErrors(diagnostics)) => {
                assert!(diagnostics.iter().all(|d| d.phase == Phase::Validation));
                assert!(diagnostics[0].location.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
        drop(report);
        // Parsing still ran after the schema complained
        assert_eq!(record.title.as_deref(), Some("Late"));
    }
}
