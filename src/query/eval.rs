//! Streaming evaluation of parsed queries against MARC records.
//!
//! [`grep`] drives a [`MarcReader`] to the end of its stream, evaluates the
//! query against each record, and emits every extracted value for matching
//! records. [`evaluate_record`] is the per-record core and has no state of
//! its own, so it can be unit-tested in isolation and reused concurrently.
//!
//! # Emission order
//!
//! Extracted values from one record are emitted in *descending* order of
//! their sort key (the tag, or tag plus subfield code): lexicographically
//! larger keys come first, ties keep evaluation order. This is a
//! reproducible output contract, kept from the tool this format serves;
//! see [`emission_order`].

use super::ast::{Condition, FieldRef, Query, QueryPair};
use crate::error::Result;
use crate::reader::MarcReader;
use crate::record::{Field, Record, SUBFIELD_DELIMITER};
use indexmap::IndexMap;
use regex::Regex;
use std::cmp::Ordering;
use std::io::{Read, Write};

/// How emitted matches are labeled, one mode per output line style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelMode {
    /// `TAG:value` — label with the extracted field's tag.
    MatchedFieldOrSubfield,
    /// `PPN:value` — label with the record's control number.
    ControlNumber,
    /// `PPN:TAG:value` — control number and tag.
    ControlNumberAndMatchedFieldOrSubfield,
    /// `TAG $a value` — subfield values prefixed with their code; whole
    /// fields have each subfield delimiter rendered as ` $`.
    Traditional,
    /// `value` — no label at all.
    NoLabel,
}

/// One extracted value, queued for emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedValue {
    /// Emission sort key: the tag, or tag plus subfield code.
    pub sort_key: String,
    /// Tag of the field the value came from.
    pub tag: String,
    /// Subfield code when a specific subfield was extracted.
    pub code: Option<char>,
    /// The extracted text.
    pub value: String,
}

/// Counters reported at the end of a [`grep`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GrepStats {
    /// Total records read from the stream.
    pub records: u64,
    /// Records for which at least one query pair evaluated true.
    pub matched: u64,
}

/// The named emission comparator: larger sort keys first.
///
/// Used with a stable sort, so equal keys keep their evaluation order.
fn emission_order(a: &ExtractedValue, b: &ExtractedValue) -> Ordering {
    b.sort_key.cmp(&a.sort_key)
}

/// Evaluate a query against one record.
///
/// Returns `Ok(None)` when the record does not match (leader condition
/// failed, or no pair evaluated true), or `Ok(Some(values))` with the
/// extracted values in emission order. A matching record can yield an
/// empty value list (e.g. an `is_missing` condition whose extraction tag
/// is absent).
///
/// # Errors
///
/// Returns an error if a field the query needs to inspect has a malformed
/// subfield structure, or the record's leader cannot be re-serialized for
/// a leader condition.
pub fn evaluate_record(record: &Record, query: &Query) -> Result<Option<Vec<ExtractedValue>>> {
    if let Some(condition) = &query.leader_condition {
        let leader_bytes = record.leader.as_bytes()?;
        let slice = &leader_bytes[condition.start..=condition.end];
        if slice != condition.literal.as_bytes() {
            return Ok(None);
        }
    }

    // One pass over the record builds the tag -> occurrences multi-map.
    let mut by_tag: IndexMap<&str, Vec<&Field>> = IndexMap::new();
    for field in record.fields() {
        by_tag.entry(field.tag.as_str()).or_default().push(field);
    }

    let mut matched = false;
    let mut values = Vec::new();
    for pair in &query.pairs {
        if evaluate_pair(record, &by_tag, pair, &mut values)? {
            matched = true;
        }
    }

    if !matched {
        return Ok(None);
    }
    values.sort_by(emission_order);
    Ok(Some(values))
}

fn evaluate_pair(
    record: &Record,
    by_tag: &IndexMap<&str, Vec<&Field>>,
    pair: &QueryPair,
    values: &mut Vec<ExtractedValue>,
) -> Result<bool> {
    match &pair.condition {
        Condition::NoComparison => {
            let present = if pair.extract.is_wildcard() {
                record.field_count() > 0
            } else {
                by_tag.contains_key(pair.extract.tag.as_str())
            };
            if present {
                extract_all(record, by_tag, &pair.extract, values)?;
            }
            Ok(present)
        },
        Condition::Matches(pattern) => {
            let hit = any_occurrence_matches(by_tag, &pair.cond_ref, pattern)?;
            if hit {
                extract_all(record, by_tag, &pair.extract, values)?;
            }
            Ok(hit)
        },
        Condition::NotMatches(pattern) => {
            let hit = !any_occurrence_matches(by_tag, &pair.cond_ref, pattern)?;
            if hit {
                extract_all(record, by_tag, &pair.extract, values)?;
            }
            Ok(hit)
        },
        Condition::Exists => {
            let present = reference_present(by_tag, &pair.cond_ref)?;
            if present {
                extract_all(record, by_tag, &pair.extract, values)?;
            }
            Ok(present)
        },
        Condition::IsMissing => {
            let missing = !reference_present(by_tag, &pair.cond_ref)?;
            if missing {
                extract_all(record, by_tag, &pair.extract, values)?;
            }
            Ok(missing)
        },
        Condition::SingleFieldMatches(pattern) => {
            evaluate_single_field(by_tag, pair, pattern, false, values)
        },
        Condition::SingleFieldNotMatches(pattern) => {
            evaluate_single_field(by_tag, pair, pattern, true, values)
        },
    }
}

/// Cross-occurrence comparison: does the pattern match the referenced
/// subfields (or the whole field) in *any* occurrence of the tag?
fn any_occurrence_matches(
    by_tag: &IndexMap<&str, Vec<&Field>>,
    cond_ref: &FieldRef,
    pattern: &Regex,
) -> Result<bool> {
    let Some(occurrences) = by_tag.get(cond_ref.tag.as_str()) else {
        return Ok(false);
    };
    for field in occurrences {
        if cond_ref.has_codes() && !field.is_control_field() {
            let subfields = field.subfields()?;
            for &code in &cond_ref.codes {
                if subfields.values(code).any(|value| pattern.is_match(value)) {
                    return Ok(true);
                }
            }
        } else if pattern.is_match(&field.content_str()) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Is the referenced tag present — optionally restricted to occurrences
/// carrying every referenced subfield code?
fn reference_present(
    by_tag: &IndexMap<&str, Vec<&Field>>,
    cond_ref: &FieldRef,
) -> Result<bool> {
    let Some(occurrences) = by_tag.get(cond_ref.tag.as_str()) else {
        return Ok(false);
    };
    if !cond_ref.has_codes() {
        return Ok(true);
    }
    for field in occurrences {
        if field.is_control_field() {
            continue;
        }
        let subfields = field.subfields()?;
        if cond_ref.codes.iter().all(|&code| subfields.has_subfield(code)) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Per-occurrence comparison (`===` / `!==`): for each occurrence of the
/// tag that carries the extraction subfield, test the comparison subfield
/// within that same occurrence and extract only where the test passes.
fn evaluate_single_field(
    by_tag: &IndexMap<&str, Vec<&Field>>,
    pair: &QueryPair,
    pattern: &Regex,
    negated: bool,
    values: &mut Vec<ExtractedValue>,
) -> Result<bool> {
    let Some(occurrences) = by_tag.get(pair.extract.tag.as_str()) else {
        return Ok(false);
    };

    let mut matched = false;
    for field in occurrences {
        if field.is_control_field() {
            continue;
        }
        let subfields = field.subfields()?;

        // Only occurrences that would actually yield an extraction qualify.
        if pair.extract.has_codes()
            && !pair
                .extract
                .codes
                .iter()
                .any(|&code| subfields.has_subfield(code))
        {
            continue;
        }

        let mut comparison_hit = false;
        for &code in &pair.cond_ref.codes {
            if subfields.values(code).any(|value| pattern.is_match(value)) {
                comparison_hit = true;
                break;
            }
        }

        let passes = if negated { !comparison_hit } else { comparison_hit };
        if passes {
            extract_from_field(field, &pair.extract, values)?;
            matched = true;
        }
    }
    Ok(matched)
}

/// Extract from every occurrence of the extraction reference (or every
/// field, for the `*` wildcard).
fn extract_all(
    record: &Record,
    by_tag: &IndexMap<&str, Vec<&Field>>,
    extract: &FieldRef,
    values: &mut Vec<ExtractedValue>,
) -> Result<()> {
    if extract.is_wildcard() {
        for field in record.fields() {
            push_whole_field(field, values);
        }
        return Ok(());
    }
    if let Some(occurrences) = by_tag.get(extract.tag.as_str()) {
        for field in occurrences {
            extract_from_field(field, extract, values)?;
        }
    }
    Ok(())
}

/// Extract the referenced subfields (or the whole field) from one
/// occurrence.
fn extract_from_field(
    field: &Field,
    extract: &FieldRef,
    values: &mut Vec<ExtractedValue>,
) -> Result<()> {
    if !extract.has_codes() || field.is_control_field() {
        push_whole_field(field, values);
        return Ok(());
    }
    let subfields = field.subfields()?;
    for &code in &extract.codes {
        for value in subfields.values(code) {
            values.push(ExtractedValue {
                sort_key: format!("{}{code}", field.tag),
                tag: field.tag.clone(),
                code: Some(code),
                value: value.to_string(),
            });
        }
    }
    Ok(())
}

fn push_whole_field(field: &Field, values: &mut Vec<ExtractedValue>) {
    values.push(ExtractedValue {
        sort_key: field.tag.clone(),
        tag: field.tag.clone(),
        code: None,
        value: field.content_str().into_owned(),
    });
}

/// Format one extracted value per the label mode.
fn format_value(record: &Record, item: &ExtractedValue, mode: LabelMode) -> String {
    let ppn = record.control_number().unwrap_or("");
    match mode {
        LabelMode::MatchedFieldOrSubfield => format!("{}:{}", item.tag, item.value),
        LabelMode::ControlNumber => format!("{ppn}:{}", item.value),
        LabelMode::ControlNumberAndMatchedFieldOrSubfield => {
            format!("{ppn}:{}:{}", item.tag, item.value)
        },
        LabelMode::Traditional => match item.code {
            Some(code) => format!("{} ${code} {}", item.tag, item.value),
            None => {
                let rendered = item
                    .value
                    .replace(SUBFIELD_DELIMITER as char, " $");
                format!("{} {rendered}", item.tag)
            },
        },
        LabelMode::NoLabel => item.value.clone(),
    }
}

/// Stream records through the query, writing matches to `out`.
///
/// Matching records have all their extracted values written, one line per
/// value, in emission order. Returns the run's record/match counters; the
/// caller usually reports them to stderr.
///
/// # Errors
///
/// Returns an error on the first malformed record (fail-fast) or if
/// writing to `out` fails.
pub fn grep<R: Read, W: Write>(
    reader: &mut MarcReader<R>,
    query: &Query,
    mode: LabelMode,
    out: &mut W,
) -> Result<GrepStats> {
    let mut stats = GrepStats::default();
    while let Some(record) = reader.read_record()? {
        stats.records += 1;
        if let Some(values) = evaluate_record(&record, query)? {
            stats.matched += 1;
            for item in &values {
                writeln!(out, "{}", format_value(&record, item, mode))?;
            }
        }
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leader::Leader;
    use crate::query::parse_query;
    use crate::record::Record;
    use crate::writer::compose;
    use std::io::Cursor;

    fn make_record(fields: &[(&str, &[u8])]) -> Record {
        let leader = Leader::from_bytes(b"00000nam a2200000 i 4500").unwrap();
        let mut record = Record::new(leader);
        for (tag, content) in fields {
            record.insert_field(*tag, content.to_vec());
        }
        record
    }

    fn smith_record() -> Record {
        make_record(&[
            ("001", b"PPN1"),
            ("100", b"1 \x1faSmith"),
            ("245", b"10\x1faTitle\x1fbSubtitle"),
        ])
    }

    #[test]
    fn test_exists_extracts_named_subfield() {
        let query = parse_query("if \"100a\" exists extract \"245a\"").unwrap();
        let values = evaluate_record(&smith_record(), &query).unwrap().unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].tag, "245");
        assert_eq!(values[0].code, Some('a'));
        assert_eq!(values[0].value, "Title");
    }

    #[test]
    fn test_exists_fails_when_subfield_absent() {
        let query = parse_query("if \"100x\" exists extract \"245a\"").unwrap();
        assert!(evaluate_record(&smith_record(), &query).unwrap().is_none());
    }

    #[test]
    fn test_is_missing() {
        let query = parse_query("if \"856\" is_missing extract \"245a\"").unwrap();
        let values = evaluate_record(&smith_record(), &query).unwrap().unwrap();
        assert_eq!(values[0].value, "Title");

        let query = parse_query("if \"100\" is_missing extract \"245a\"").unwrap();
        assert!(evaluate_record(&smith_record(), &query).unwrap().is_none());
    }

    #[test]
    fn test_matched_record_with_empty_extraction_still_matches() {
        // Condition true, extraction tag absent: matched, nothing emitted.
        let query = parse_query("if \"856\" is_missing extract \"300a\"").unwrap();
        let values = evaluate_record(&smith_record(), &query).unwrap();
        assert_eq!(values, Some(Vec::new()));
    }

    #[test]
    fn test_field_list_query() {
        let query = parse_query("\"245ab\":\"100a\"").unwrap();
        let values = evaluate_record(&smith_record(), &query).unwrap().unwrap();
        let rendered: Vec<String> = values
            .iter()
            .map(|item| format!("{}:{}", item.sort_key, item.value))
            .collect();
        // Descending sort key order.
        assert_eq!(
            rendered,
            vec!["245b:Subtitle", "245a:Title", "100a:Smith"]
        );
    }

    #[test]
    fn test_leader_condition_filters_records() {
        // Bibliographic level is leader position 7 ('m' here).
        let query = parse_query("leader[7]=\"m\" \"245a\"").unwrap();
        assert!(evaluate_record(&smith_record(), &query).unwrap().is_some());

        let query = parse_query("leader[7]=\"s\" \"245a\"").unwrap();
        assert!(evaluate_record(&smith_record(), &query).unwrap().is_none());
    }

    #[test]
    fn test_cross_occurrence_comparison() {
        let record = make_record(&[
            ("001", b"PPN1"),
            ("700", b"1 \x1fbNoSubfieldA"),
            ("700", b"1 \x1faMeyer"),
        ]);

        // Any occurrence with a matching $a makes the pair true; extraction
        // then covers every occurrence of the extraction reference.
        let query = parse_query("if \"700a\" == \"Meyer\" extract \"700a\"").unwrap();
        let values = evaluate_record(&record, &query).unwrap().unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].value, "Meyer");

        let query = parse_query("if \"700a\" == \"Nobody\" extract \"700a\"").unwrap();
        assert!(evaluate_record(&record, &query).unwrap().is_none());
    }

    #[test]
    fn test_not_equal_is_cross_occurrence_negation() {
        let record = make_record(&[("001", b"P"), ("700", b"1 \x1faMeyer")]);
        let query = parse_query("if \"700a\" != \"Meyer\" extract \"001\"").unwrap();
        assert!(evaluate_record(&record, &query).unwrap().is_none());

        // Absent tag: nothing matches the pattern, so != holds.
        let query = parse_query("if \"710a\" != \"Meyer\" extract \"001\"").unwrap();
        assert!(evaluate_record(&record, &query).unwrap().is_some());
    }

    #[test]
    fn test_single_field_comparison_is_per_occurrence() {
        let record = make_record(&[
            ("001", b"PPN1"),
            ("700", b"1 \x1fbEditor"),
            ("700", b"1 \x1faMeyer\x1fbTranslator"),
        ]);

        // First 700 lacks $a, so it cannot qualify; only the second is
        // tested and extracted.
        let query = parse_query("if \"700a\" === \"Meyer\" extract \"700a\"").unwrap();
        let values = evaluate_record(&record, &query).unwrap().unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].value, "Meyer");

        let query = parse_query("if \"700a\" === \"Nobody\" extract \"700a\"").unwrap();
        assert!(evaluate_record(&record, &query).unwrap().is_none());
    }

    #[test]
    fn test_single_field_not_equal_extracts_absent_or_failing() {
        let record = make_record(&[
            ("001", b"PPN1"),
            ("700", b"1 \x1faMeyer\x1fbX"),
            ("700", b"1 \x1faSchmidt\x1fbY"),
        ]);

        // Comparison on $a, extraction of $b: the Schmidt occurrence fails
        // the pattern, so only its $b is extracted.
        let query = parse_query("if \"700a\" !== \"Meyer\" extract \"700b\"").unwrap();
        let values = evaluate_record(&record, &query).unwrap().unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].value, "Y");
    }

    #[test]
    fn test_wildcard_extraction() {
        let query = parse_query("if \"100a\" exists extract *").unwrap();
        let values = evaluate_record(&smith_record(), &query).unwrap().unwrap();
        assert_eq!(values.len(), 3);
        // Descending by tag.
        assert_eq!(values[0].tag, "245");
        assert_eq!(values[2].tag, "001");
    }

    #[test]
    fn test_grep_end_to_end() {
        let record = smith_record();
        let bytes = compose(&record).unwrap();
        let mut reader = MarcReader::new(Cursor::new(bytes));
        let query = parse_query("if \"100a\" exists extract \"245a\"").unwrap();

        let mut out = Vec::new();
        let stats = grep(
            &mut reader,
            &query,
            LabelMode::MatchedFieldOrSubfield,
            &mut out,
        )
        .unwrap();

        assert_eq!(stats.records, 1);
        assert_eq!(stats.matched, 1);
        assert_eq!(String::from_utf8(out).unwrap(), "245:Title\n");
    }

    #[test]
    fn test_grep_counts_non_matching_records() {
        let matching = compose(&smith_record()).unwrap();
        let other = compose(&make_record(&[("001", b"PPN2"), ("245", b"10\x1faOther")]))
            .unwrap();
        let mut bytes = matching;
        bytes.extend(other);

        let mut reader = MarcReader::new(Cursor::new(bytes));
        let query = parse_query("if \"100a\" exists extract \"245a\"").unwrap();
        let mut out = Vec::new();
        let stats = grep(&mut reader, &query, LabelMode::NoLabel, &mut out).unwrap();

        assert_eq!(stats.records, 2);
        assert_eq!(stats.matched, 1);
        assert_eq!(String::from_utf8(out).unwrap(), "Title\n");
    }

    #[test]
    fn test_label_modes() {
        let record = smith_record();
        let item = ExtractedValue {
            sort_key: "245a".to_string(),
            tag: "245".to_string(),
            code: Some('a'),
            value: "Title".to_string(),
        };
        assert_eq!(
            format_value(&record, &item, LabelMode::MatchedFieldOrSubfield),
            "245:Title"
        );
        assert_eq!(
            format_value(&record, &item, LabelMode::ControlNumber),
            "PPN1:Title"
        );
        assert_eq!(
            format_value(
                &record,
                &item,
                LabelMode::ControlNumberAndMatchedFieldOrSubfield
            ),
            "PPN1:245:Title"
        );
        assert_eq!(
            format_value(&record, &item, LabelMode::Traditional),
            "245 $a Title"
        );
        assert_eq!(format_value(&record, &item, LabelMode::NoLabel), "Title");
    }

    #[test]
    fn test_traditional_whole_field_substitutes_delimiters() {
        let record = smith_record();
        let item = ExtractedValue {
            sort_key: "245".to_string(),
            tag: "245".to_string(),
            code: None,
            value: "10\x1faTitle\x1fbSubtitle".to_string(),
        };
        assert_eq!(
            format_value(&record, &item, LabelMode::Traditional),
            "245 10 $aTitle $bSubtitle"
        );
    }
}
