//! Line protocol parser behaviour
//!
//! Covers the documented properties of the parser: typing of field values,
//! escaping, quoting, timestamp units, drop filters and per-line isolation.

use kairosdb_core::datapoint::DataPointValue;
use kairosdb_core::error::KairosError;
use kairosdb_core::time::{Precision, Timestamp};
use kairosdb_influx::{DropFilters, InfluxParser, ParsedLine};

fn parse(line: &str, precision: Precision) -> Result<ParsedLine, KairosError> {
    InfluxParser::default().parse_line(line, precision)
}

fn names(parsed: &ParsedLine) -> Vec<String> {
    parsed
        .metrics
        .iter()
        .map(|m| m.name().to_string())
        .collect()
}

#[test]
fn test_field_value_typing() {
    let parsed = parse(
        r#"m,host=h a=42i,b="hello",c=true,d=T,e=TRUE,f=false,g=f,h=FALSE,i=6.25 1"#,
        Precision::Milliseconds,
    )
    .unwrap();

    let values: Vec<&DataPointValue> = parsed
        .metrics
        .iter()
        .map(|m| &m.data_point().value)
        .collect();

    assert_eq!(values[0], &DataPointValue::Long(42));
    assert_eq!(values[1], &DataPointValue::Text("hello".to_string()));
    for value in &values[2..5] {
        assert_eq!(*value, &DataPointValue::Long(1));
    }
    for value in &values[5..8] {
        assert_eq!(*value, &DataPointValue::Long(0));
    }
    assert_eq!(values[8].as_f64(), Some(6.25));
    assert_eq!(values[8].type_name(), "double");
}

#[test]
fn test_escaping() {
    let parsed = parse(
        r#"s\ ys\=te\,m,host=local\,host field="x" 1000"#,
        Precision::Milliseconds,
    )
    .unwrap();

    assert_eq!(parsed.metrics.len(), 1);
    let metric = &parsed.metrics[0];
    assert_eq!(metric.name(), &"s ys=te,m.field");
    assert_eq!(metric.tags().get("host").unwrap(), "local,host");
    assert_eq!(metric.data_point().value.as_text(), Some("x"));
    assert_eq!(metric.data_point().timestamp_millis(), 1000);
}

#[test]
fn test_unterminated_quote() {
    let err = parse(
        r#"system,host=h uptime_format="5:53 1000"#,
        Precision::Nanoseconds,
    )
    .unwrap_err();

    assert!(matches!(err, KairosError::Parse(_)));
    assert!(err.message().contains("unterminated double quote"));
}

#[test]
fn test_seconds_precision() {
    let parsed = parse("m,host=h v=1 154751015", Precision::Seconds).unwrap();
    assert_eq!(
        parsed.metrics[0].data_point().timestamp_millis(),
        154_751_015 * 1000
    );
}

#[test]
fn test_nanoseconds_precision() {
    let parsed = parse("m,host=h v=1 1547510150000000000", Precision::Nanoseconds).unwrap();
    assert_eq!(
        parsed.metrics[0].data_point().timestamp_millis(),
        1_547_510_150_000_000_000 / 1_000_000
    );

    let parsed = parse(
        "m,host=h v=1 1547510150000000000",
        Precision::default(),
    )
    .unwrap();
    assert_eq!(parsed.metrics[0].data_point().timestamp_millis(), 1_547_510_150_000);
}

#[test]
fn test_microseconds_and_milliseconds_precision() {
    let parsed = parse("m,host=h v=1 1547510150000000", Precision::Microseconds).unwrap();
    assert_eq!(parsed.metrics[0].data_point().timestamp_millis(), 1_547_510_150_000);

    let parsed = parse("m,host=h v=1 1547510150000", Precision::Milliseconds).unwrap();
    assert_eq!(parsed.metrics[0].data_point().timestamp_millis(), 1_547_510_150_000);
}

#[test]
fn test_drop_filters() {
    let filters = DropFilters::new(&["foo"], &["swap\\.used.*"]).unwrap();
    let parser = InfluxParser::new(filters);

    let parsed = parser
        .parse_line(
            "swap,host=localhost,foo=bar total=true,used=true,free=false,used_percent=false 1547510150000000000",
            Precision::Nanoseconds,
        )
        .unwrap();

    assert_eq!(names(&parsed), vec!["swap.total", "swap.free"]);
    assert_eq!(parsed.tags_dropped, 1);
    assert_eq!(parsed.metrics_dropped, 2);
    for metric in &parsed.metrics {
        assert!(!metric.tags().contains_key("foo"));
        assert_eq!(metric.tags().get("host").unwrap(), "localhost");
        assert_eq!(metric.data_point().timestamp_millis(), 1_547_510_150_000);
    }
    assert_eq!(parsed.metrics[0].data_point().value, DataPointValue::Long(1));
    assert_eq!(parsed.metrics[1].data_point().value, DataPointValue::Long(0));
}

#[test]
fn test_idempotence() {
    let filters = DropFilters::new(&["foo"], &["swap\\.used.*"]).unwrap();
    let parser = InfluxParser::new(filters);
    let line = r#"swap,host=localhost,foo=bar total=12i,free=3.5,note="a b" 1547510150000000000"#;

    let first = parser.parse_line(line, Precision::Nanoseconds).unwrap();
    let second = parser.parse_line(line, Precision::Nanoseconds).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_no_tag_block() {
    let parser = InfluxParser::default().with_default_tags(
        kairosdb_core::tags::TagSet::from_pairs([("host", "collector")]).unwrap(),
    );

    let parsed = parser
        .parse_line("cpu usage=1,idle=2 1", Precision::Milliseconds)
        .unwrap();
    assert_eq!(names(&parsed), vec!["cpu.usage", "cpu.idle"]);

    let err = parser
        .parse_line("cpu 1", Precision::Milliseconds)
        .unwrap_err();
    assert!(matches!(err, KairosError::Parse(_)));
}

#[test]
fn test_missing_field_block() {
    for line in ["swap", "swap,host=localhost,foo=bar", "swap,host=localhost "] {
        let err = parse(line, Precision::Nanoseconds).unwrap_err();
        assert_eq!(
            err.message(),
            "Invalid syntax. Measurement name and field set is required.",
            "{:?}",
            line
        );
    }
}

#[test]
fn test_empty_and_whitespace_lines() {
    for line in ["", " ", "\t", "   \t  "] {
        match parse(line, Precision::Nanoseconds) {
            Ok(parsed) => assert!(parsed.metrics.is_empty()),
            Err(e) => assert!(matches!(e, KairosError::Parse(_)), "{:?}", line),
        }
    }
}

#[test]
fn test_no_partial_output_on_failure() {
    let result = parse("m,host=h good=1i,bad=nope 1", Precision::Milliseconds);
    assert!(result.is_err());
}

#[test]
fn test_default_timestamp_is_now() {
    let before = Timestamp::now().timestamp_millis();
    let parsed = parse("m,host=h v=1", Precision::Seconds).unwrap();
    let after = Timestamp::now().timestamp_millis();

    let ts = parsed.metrics[0].data_point().timestamp_millis();
    assert!(before <= ts && ts <= after);
}

#[test]
fn test_lines_are_independent() {
    let parser = InfluxParser::default();
    let lines = [
        "cpu,host=a usage=1 1",
        "cpu,host=a usage=",
        "mem,host=b used=2i 2",
    ];

    let results: Vec<_> = lines
        .iter()
        .map(|line| parser.parse_line(line, Precision::Milliseconds))
        .collect();

    assert!(results[0].is_ok());
    assert!(results[1].is_err());
    let last = results[2].as_ref().unwrap();
    assert_eq!(names(last), vec!["mem.used"]);
}

#[test]
fn test_parser_is_shareable_across_threads() {
    let filters = DropFilters::new(&["foo"], &[]).unwrap();
    let parser = std::sync::Arc::new(InfluxParser::new(filters));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let parser = parser.clone();
            std::thread::spawn(move || {
                let line = format!("m,host=h{},foo=x v={}i {}", i, i, i);
                parser.parse_line(&line, Precision::Milliseconds).unwrap()
            })
        })
        .collect();

    for handle in handles {
        let parsed = handle.join().unwrap();
        assert_eq!(parsed.tags_dropped, 1);
        assert_eq!(parsed.metrics.len(), 1);
    }
}

#[test]
fn test_non_finite_floats_are_rejected() {
    for raw in ["inf", "-inf", "NaN", "infinity"] {
        let line = format!("m,host=h v={} 1", raw);
        let err = parse(&line, Precision::Milliseconds).unwrap_err();
        assert_eq!(err.message(), format!("Unable to parse field value: {}", raw));
    }
}

#[test]
fn test_non_breaking_space_is_content() {
    let parsed = parse("m,h=a\u{a0}b v=1 1", Precision::Milliseconds).unwrap();
    assert_eq!(parsed.metrics[0].tags().get("h").unwrap(), "a\u{a0}b");

    let err = parse("m,host=x v=1\u{a0}5", Precision::Milliseconds).unwrap_err();
    assert_eq!(err.message(), "Unable to parse field value: 1\u{a0}5");
}

#[test]
fn test_unit_separator_splits_blocks() {
    let parsed = parse("m,host=h\u{1f}v=2i\u{1f}7", Precision::Milliseconds).unwrap();
    assert_eq!(names(&parsed), vec!["m.v"]);
    assert_eq!(parsed.metrics[0].data_point().value, DataPointValue::Long(2));
    assert_eq!(parsed.metrics[0].data_point().timestamp_millis(), 7);
}
