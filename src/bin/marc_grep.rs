//! Ad-hoc structural queries over MARC-21 record streams.
//!
//! ```text
//! marc_grep <input-file> <query-string> [output-label-format]
//! ```
//!
//! Matches go to stdout, one line per extracted value; the final match
//! count summary goes to stderr. Exit code 0 on success (even with zero
//! matches), nonzero on open failure or query-parse failure.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use marcgrep::query::{grep, parse_query, LabelMode};
use marcgrep::MarcReader;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "marc_grep",
    about = "Match and extract fields from MARC-21 binary record streams",
    version
)]
struct Cli {
    /// MARC-21 binary input file
    input: PathBuf,

    /// Query, e.g. '"245a"' or 'if "100a" exists extract "245a"'
    query: String,

    /// How emitted matches are labeled
    #[arg(value_enum, default_value_t = LabelFormat::MatchedFieldOrSubfield)]
    label_format: LabelFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
#[value(rename_all = "snake_case")]
enum LabelFormat {
    /// TAG:value
    MatchedFieldOrSubfield,
    /// PPN:value
    ControlNumber,
    /// PPN:TAG:value
    ControlNumberAndMatchedFieldOrSubfield,
    /// TAG $a value
    Traditional,
    /// value only
    NoLabel,
}

impl From<LabelFormat> for LabelMode {
    fn from(format: LabelFormat) -> Self {
        match format {
            LabelFormat::MatchedFieldOrSubfield => LabelMode::MatchedFieldOrSubfield,
            LabelFormat::ControlNumber => LabelMode::ControlNumber,
            LabelFormat::ControlNumberAndMatchedFieldOrSubfield => {
                LabelMode::ControlNumberAndMatchedFieldOrSubfield
            },
            LabelFormat::Traditional => LabelMode::Traditional,
            LabelFormat::NoLabel => LabelMode::NoLabel,
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let query = parse_query(&cli.query)
        .with_context(|| format!("Cannot parse query '{}'", cli.query))?;

    let file = File::open(&cli.input)
        .with_context(|| format!("Cannot open '{}'", cli.input.display()))?;
    let mut reader = MarcReader::new(BufReader::new(file));

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let stats = grep(&mut reader, &query, cli.label_format.into(), &mut out)?;

    eprintln!("Matched {} of {} record(s).", stats.matched, stats.records);
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("marc_grep: {e:#}");
        std::process::exit(1);
    }
}
