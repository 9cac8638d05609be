//! ingot-flatten: Flatten JSON documents into dotted-path attribute maps
//!
//! Usage:
//!   # Flatten one document from a file
//!   ingot-flatten order.json
//!
//!   # Flatten newline-delimited message bodies from stdin
//!   cat bodies.jsonl | ingot-flatten --ndjson --prefix BodyJson

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use ingot::flatten::{FlattenConfig, FlattenEngine, DEFAULT_PREFIX};
use ingot::forward::{parse_body, BODY_FIELD};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{stdin, BufRead, BufReader, Read};

#[derive(Parser, Debug)]
#[command(name = "ingot-flatten")]
#[command(about = "Flatten nested JSON into dotted-path attributes", long_about = None)]
struct Args {
    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// Process newline-delimited JSON (one document per line)
    #[arg(long)]
    ndjson: bool,

    /// Root of the generated paths
    #[arg(long, default_value = DEFAULT_PREFIX)]
    prefix: String,

    /// Object depth past which subtrees are kept as JSON text (default: 64)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Compact output (no pretty-printing)
    #[arg(long)]
    compact: bool,
}

fn main() -> Result<()> {
    ingot::bootstrap::init_tracing();
    let args = Args::parse();

    let mut config = FlattenConfig::default();
    if let Some(depth) = args.max_depth {
        config.max_depth = depth;
    }
    let engine = FlattenEngine::new(config);

    let mut reader: Box<dyn BufRead> = if let Some(file_path) = &args.input {
        let file = File::open(file_path).with_context(|| format!("Failed to open {}", file_path))?;
        Box::new(BufReader::new(file))
    } else {
        Box::new(BufReader::new(stdin()))
    };

    let mut stdout = std::io::stdout().lock();

    if args.ndjson {
        let parsed = ingot::flatten_json_lines(reader, &mut stdout, &engine, &args.prefix)?;
        tracing::info!(parsed, "flattened NDJSON input");
        return Ok(());
    }

    let mut content = Vec::new();
    reader.read_to_end(&mut content).context("Failed to read input")?;

    let body = parse_body(&content);
    let output: Map<String, Value> = match &body.json {
        Some(json) => engine
            .flatten_with(json, &args.prefix, |leaf| leaf.to_json())
            .into_iter()
            .collect(),
        None => {
            tracing::warn!("input is not valid JSON, emitting raw body");
            let mut fallback = Map::new();
            fallback.insert(BODY_FIELD.to_string(), Value::String(body.raw));
            fallback
        }
    };

    let output = Value::Object(output);
    if args.compact {
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&output)?);
    }

    Ok(())
}
