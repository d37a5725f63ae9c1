//! rdfmap CLI — apply declarative mapping files to source data
//!
//! `apply` streams NDJSON data through a mapping and writes N-Triples;
//! `check` parses and resolves a mapping file without running it;
//! `format` reprints a mapping file in canonical form.

use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use tracing::warn;

use rdfmap::{
    parse_mapping, serialize_mappings, spawn_evaluator, CompiledRule, EngineConfig, EvalReport,
    Row, SourceSpec, SqlResultReader,
};

#[derive(Parser)]
#[command(name = "rdfmap", version, about = "Declarative source-to-RDF mapping engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a mapping file to NDJSON input, writing N-Triples to stdout
    Apply {
        /// Mapping file (PREFIX declarations + MAPPING blocks)
        mapping: PathBuf,

        /// NDJSON input: one source document (JSON rules) or one flat
        /// column object (SQL rules) per line; defaults to stdin
        #[arg(long)]
        data: Option<PathBuf>,

        /// Apply only the named rule instead of every rule in the file
        #[arg(long)]
        rule: Option<String>,

        /// Rows per output flush
        #[arg(long, default_value_t = 1024)]
        batch_size: usize,
    },
    /// Parse and resolve a mapping file, reporting errors without running it
    Check {
        /// Mapping file
        mapping: PathBuf,
    },
    /// Reprint a mapping file in canonical form
    Format {
        /// Mapping file
        mapping: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Apply {
            mapping,
            data,
            rule,
            batch_size,
        } => run_apply(&mapping, data.as_deref(), rule.as_deref(), batch_size).await,
        Commands::Check { mapping } => run_check(&mapping),
        Commands::Format { mapping } => run_format(&mapping),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn load_rules(path: &std::path::Path) -> anyhow::Result<Vec<CompiledRule>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let rules = parse_mapping(&text).with_context(|| format!("parsing {}", path.display()))?;
    rules
        .into_iter()
        .map(|rule| {
            let name = rule.name.clone();
            rule.resolve().with_context(|| match name {
                Some(n) => format!("resolving rule {}", n),
                None => "resolving unnamed rule".to_string(),
            })
        })
        .collect()
}

async fn run_apply(
    mapping: &std::path::Path,
    data: Option<&std::path::Path>,
    rule_name: Option<&str>,
    batch_size: usize,
) -> anyhow::Result<()> {
    let mut rules = load_rules(mapping)?;
    if let Some(name) = rule_name {
        rules.retain(|r| r.name() == Some(name));
        if rules.is_empty() {
            bail!("no rule named {} in {}", name, mapping.display());
        }
    }

    let reader: Box<dyn BufRead> = match data {
        Some(path) => Box::new(BufReader::new(
            std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(std::io::stdin())),
    };
    let lines: Vec<String> = reader
        .lines()
        .collect::<Result<_, _>>()
        .context("reading input data")?;

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut totals = EvalReport::default();

    for rule in rules {
        let report = apply_one(rule, &lines, batch_size, &mut out).await?;
        totals.rows_in += report.rows_in;
        totals.triples_out += report.triples_out;
        totals.errors.extend(report.errors);
    }
    out.flush()?;

    eprintln!(
        "{} rows in, {} triples out, {} errors",
        totals.rows_in,
        totals.triples_out,
        totals.errors.len()
    );
    for error in &totals.errors {
        eprintln!("  {}", error);
    }
    if !totals.is_clean() {
        std::process::exit(2);
    }
    Ok(())
}

async fn apply_one(
    rule: CompiledRule,
    lines: &[String],
    batch_size: usize,
    out: &mut impl Write,
) -> anyhow::Result<EvalReport> {
    let config = EngineConfig {
        batch_size,
        ..Default::default()
    };
    let rule = Arc::new(rule);
    let (rows, mut triples, _cancel, done) = spawn_evaluator(rule.clone(), config).into_stream();

    let feeder = {
        let rule = rule.clone();
        let lines: Vec<String> = lines.to_vec();
        tokio::spawn(async move {
            for (lineno, line) in lines.iter().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match parse_row(&rule, line) {
                    Ok(row) => {
                        if rows.send(row).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("line {} skipped: {:#}", lineno + 1, e),
                }
            }
        })
    };

    while let Some(batch) = triples.next().await {
        for triple in batch {
            writeln!(out, "{}", triple)?;
        }
    }
    feeder.await.context("input task panicked")?;
    let report = done.await.context("evaluator task panicked")?;
    Ok(report)
}

/// Turn one NDJSON line into a source row for the rule.
///
/// JSON rules run the document through the shape template; SQL rules
/// read a flat object as a column-to-value record, in place of a
/// database driver.
fn parse_row(rule: &CompiledRule, line: &str) -> anyhow::Result<Row> {
    let doc: serde_json::Value = serde_json::from_str(line).context("invalid JSON")?;
    match &rule.rule().source {
        SourceSpec::Json { shape } => Ok(shape.extract(&doc)?),
        SourceSpec::Sql { .. } => {
            let obj = match &doc {
                serde_json::Value::Object(map) => map,
                _ => bail!("SQL rule input must be a flat JSON object per line"),
            };
            let columns: Vec<String> = obj.keys().cloned().collect();
            let values: Vec<Option<String>> = obj
                .values()
                .map(|v| match v {
                    serde_json::Value::Null => None,
                    serde_json::Value::String(s) => Some(s.clone()),
                    other => Some(other.to_string()),
                })
                .collect();
            Ok(SqlResultReader::new(columns).row(values))
        }
    }
}

fn run_check(mapping: &std::path::Path) -> anyhow::Result<()> {
    let rules = load_rules(mapping)?;
    for rule in &rules {
        let kind = if rule.rule().source.is_sql() { "SQL" } else { "JSON" };
        println!(
            "ok: {} ({}, {} patterns, {} bindings)",
            rule.name().unwrap_or("<unnamed>"),
            kind,
            rule.rule().graph_template.len(),
            rule.rule().bindings.len()
        );
    }
    println!("{} rule(s) resolved", rules.len());
    Ok(())
}

fn run_format(mapping: &std::path::Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(mapping)
        .with_context(|| format!("reading {}", mapping.display()))?;
    let rules = parse_mapping(&text)?;
    print!("{}", serialize_mappings(&rules));
    Ok(())
}
