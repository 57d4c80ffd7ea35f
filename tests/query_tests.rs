//! End-to-end tests for the marc_grep query language over binary record
//! streams, including the file-backed path the CLI uses.

use marcgrep::query::{evaluate_record, grep, parse_query, LabelMode};
use marcgrep::{compose, Leader, MarcReader, Record};
use std::io::{Cursor, Write};

fn make_record(ppn: &str, fields: &[(&str, &[u8])]) -> Record {
    let leader = Leader::from_bytes(b"00000nam a2200000 i 4500").expect("leader");
    let mut record = Record::new(leader);
    record.insert_field("001", ppn.as_bytes().to_vec());
    for (tag, content) in fields {
        record.insert_field(*tag, content.to_vec());
    }
    record
}

fn stream_of(records: &[Record]) -> Cursor<Vec<u8>> {
    let mut bytes = Vec::new();
    for record in records {
        bytes.extend(compose(record).expect("compose"));
    }
    Cursor::new(bytes)
}

#[test]
fn test_exists_query_emits_labeled_subfield() {
    // Author present: the title subfield is extracted with its tag label.
    let record = make_record(
        "PPN1",
        &[
            ("100", b"1 \x1faSmith"),
            ("245", b"10\x1faTitle\x1fbSubtitle"),
        ],
    );
    let query = parse_query(r#"if "100a" exists extract "245a""#).expect("parse");

    let mut reader = MarcReader::new(stream_of(&[record]));
    let mut out = Vec::new();
    let stats = grep(&mut reader, &query, LabelMode::MatchedFieldOrSubfield, &mut out)
        .expect("grep");

    assert_eq!(stats.records, 1);
    assert_eq!(stats.matched, 1);
    assert_eq!(String::from_utf8(out).unwrap(), "245:Title\n");
}

#[test]
fn test_single_field_vs_cross_occurrence_on_repeated_700() {
    // Two 700 occurrences: the first has no $a, the second's $a matches.
    let record = make_record(
        "PPN1",
        &[
            ("700", b"1 \x1fbEditor"),
            ("700", b"1 \x1faMeyer, Hans"),
        ],
    );

    // Per-occurrence: only the second occurrence qualifies and is extracted.
    let query = parse_query(r#"if "700a" === "Meyer.*" extract "700a""#).expect("parse");
    let values = evaluate_record(&record, &query).expect("eval").expect("match");
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].value, "Meyer, Hans");

    // Cross-occurrence: same existence outcome, evaluated once per record;
    // extraction covers every occurrence carrying $a, which is still just
    // the second one.
    let query = parse_query(r#"if "700a" == "Meyer.*" extract "700a""#).expect("parse");
    let values = evaluate_record(&record, &query).expect("eval").expect("match");
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].value, "Meyer, Hans");
}

#[test]
fn test_leader_condition_restricts_stream() {
    let mut serial = make_record("PPN-S", &[("245", b"10\x1faJournal")]);
    serial.leader.bibliographic_level = 's';
    let monograph = make_record("PPN-M", &[("245", b"10\x1faBook")]);

    let query = parse_query(r#"leader[7]="s" "245a""#).expect("parse");
    let mut reader = MarcReader::new(stream_of(&[serial, monograph]));
    let mut out = Vec::new();
    let stats = grep(&mut reader, &query, LabelMode::ControlNumber, &mut out).expect("grep");

    assert_eq!(stats.records, 2);
    assert_eq!(stats.matched, 1);
    assert_eq!(String::from_utf8(out).unwrap(), "PPN-S:Journal\n");
}

#[test]
fn test_field_list_emission_order_is_descending_by_key() {
    let record = make_record(
        "PPN1",
        &[
            ("100", b"1 \x1faAuthor"),
            ("245", b"10\x1faTitle\x1fbSub"),
        ],
    );
    let query = parse_query(r#""100a":"245ab""#).expect("parse");

    let mut reader = MarcReader::new(stream_of(&[record]));
    let mut out = Vec::new();
    grep(&mut reader, &query, LabelMode::MatchedFieldOrSubfield, &mut out).expect("grep");

    // Larger sort keys (245b, 245a) are emitted before smaller ones (100a).
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "245:Sub\n245:Title\n100:Author\n"
    );
}

#[test]
fn test_control_number_and_traditional_modes() {
    let record = make_record("PPN9", &[("700", b"1 \x1faMeyer")]);
    let query = parse_query(r#""700a""#).expect("parse");

    let mut out = Vec::new();
    let mut reader = MarcReader::new(stream_of(&[record.clone()]));
    grep(
        &mut reader,
        &query,
        LabelMode::ControlNumberAndMatchedFieldOrSubfield,
        &mut out,
    )
    .expect("grep");
    assert_eq!(String::from_utf8(out).unwrap(), "PPN9:700:Meyer\n");

    let mut out = Vec::new();
    let mut reader = MarcReader::new(stream_of(&[record]));
    grep(&mut reader, &query, LabelMode::Traditional, &mut out).expect("grep");
    assert_eq!(String::from_utf8(out).unwrap(), "700 $a Meyer\n");
}

#[test]
fn test_zero_matches_is_success_with_counts() {
    let record = make_record("PPN1", &[("245", b"10\x1faTitle")]);
    let query = parse_query(r#"if "999z" exists extract "245a""#).expect("parse");

    let mut reader = MarcReader::new(stream_of(&[record]));
    let mut out = Vec::new();
    let stats = grep(&mut reader, &query, LabelMode::NoLabel, &mut out).expect("grep");

    assert_eq!(stats.records, 1);
    assert_eq!(stats.matched, 0);
    assert!(out.is_empty());
}

#[test]
fn test_multiple_pairs_any_true_pair_matches_the_record() {
    let record = make_record("PPN1", &[("245", b"10\x1faTitle")]);
    let query = parse_query(
        r#"if "999z" exists extract "245a", if "245a" exists extract "001""#,
    )
    .expect("parse");

    let values = evaluate_record(&record, &query).expect("eval").expect("match");
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].tag, "001");
    assert_eq!(values[0].value, "PPN1");
}

#[test]
fn test_wildcard_extraction_dumps_whole_record() {
    let record = make_record("PPN1", &[("245", b"10\x1faTitle")]);
    let query = parse_query(r#"if "245" exists extract *"#).expect("parse");

    let mut reader = MarcReader::new(stream_of(&[record]));
    let mut out = Vec::new();
    grep(&mut reader, &query, LabelMode::MatchedFieldOrSubfield, &mut out).expect("grep");
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "245:10\u{1f}aTitle\n001:PPN1\n"
    );
}

#[test]
fn test_grep_from_a_file_like_the_cli() {
    let record = make_record("PPN1", &[("100", b"1 \x1faSmith"), ("245", b"10\x1faTitle")]);
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    file.write_all(&compose(&record).expect("compose")).expect("write");
    file.flush().expect("flush");

    let opened = std::fs::File::open(file.path()).expect("open");
    let mut reader = MarcReader::new(std::io::BufReader::new(opened));
    let query = parse_query(r#"if "100a" exists extract "245a""#).expect("parse");

    let mut out = Vec::new();
    let stats = grep(&mut reader, &query, LabelMode::MatchedFieldOrSubfield, &mut out)
        .expect("grep");
    assert_eq!(stats.matched, 1);
    assert_eq!(String::from_utf8(out).unwrap(), "245:Title\n");
}

#[test]
fn test_query_parse_failure_reports_message() {
    let err = parse_query(r#"leader[30-31]="ab" "001""#).expect_err("must fail");
    assert!(err.to_string().contains("exceeds leader bound"), "got: {err}");
}
