use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use searchkit::engine::bulk::DEFAULT_DOCTYPE;
use searchkit::{EngineConfig, HitMetadata, HttpEngine, IndexAdmin, Mlt, SearchResult, SearchResults, S};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "searchkit")]
#[command(about = "Load documents into and query an Elasticsearch-compatible engine", long_about = None)]
struct Cli {
    /// Engine URL, overriding SEARCHKIT_URL and the config file
    #[arg(long, global = true)]
    url: Option<String>,
    /// JSON config file read instead of the environment
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index JSON/JSONL files (or a directory of them) and refresh
    Load {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        #[arg(long)]
        index: Option<String>,
        #[arg(long)]
        doctype: Option<String>,
        /// Create the index before loading
        #[arg(long, default_value_t = false)]
        create: bool,
        /// Documents per bulk request
        #[arg(long, default_value_t = 500)]
        batch_size: usize,
    },
    /// Run a term search
    Search {
        #[arg(long)]
        index: Vec<String>,
        #[arg(long)]
        doctype: Vec<String>,
        /// field=value query term, repeatable
        #[arg(long = "query", value_parser = parse_pair)]
        queries: Vec<(String, Value)>,
        /// field=value filter, repeatable
        #[arg(long = "filter", value_parser = parse_pair)]
        filters: Vec<(String, Value)>,
        /// Sort key, `-field` for descending
        #[arg(long)]
        order_by: Vec<String>,
        #[arg(long, default_value_t = 0)]
        from: usize,
        #[arg(long)]
        size: Option<usize>,
        /// Print these fields as a list per hit
        #[arg(long, value_delimiter = ',')]
        values: Option<Vec<String>>,
        #[arg(long)]
        highlight: Vec<String>,
        #[arg(long, default_value_t = false)]
        explain: bool,
        /// Print the compiled request instead of sending it
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Find documents similar to one document
    Mlt {
        #[arg(long)]
        index: Vec<String>,
        #[arg(long)]
        id: String,
        #[arg(long, value_delimiter = ',', required = true)]
        fields: Vec<String>,
        #[arg(long = "filter", value_parser = parse_pair)]
        filters: Vec<(String, Value)>,
        #[arg(long)]
        min_term_freq: Option<u32>,
        #[arg(long)]
        min_doc_freq: Option<u32>,
        #[arg(long)]
        max_query_terms: Option<u32>,
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
}

#[derive(Serialize)]
struct HitLine<'a> {
    #[serde(rename = "_id")]
    id: &'a str,
    #[serde(rename = "_score")]
    score: Option<f64>,
    #[serde(flatten)]
    body: HitBody<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    highlight: Option<&'a std::collections::BTreeMap<String, Vec<String>>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum HitBody<'a> {
    Source {
        #[serde(rename = "_source")]
        source: &'a Map<String, Value>,
    },
    Fields { fields: &'a Map<String, Value> },
    Values { values: &'a [Value] },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.url)?;

    match cli.command {
        Commands::Load { input, index, doctype, create, batch_size } => {
            let index = index.or(config.index.clone()).context("no index given (--index or SEARCHKIT_INDEX)")?;
            let doctype = doctype.or(config.doctype.clone()).unwrap_or_else(|| DEFAULT_DOCTYPE.to_string());
            load(&HttpEngine::new(&config)?, &input, &index, &doctype, create, batch_size)
        }
        Commands::Search {
            index,
            doctype,
            queries,
            filters,
            order_by,
            from,
            size,
            values,
            highlight,
            explain,
            dry_run,
        } => {
            let s = base_search(&config, &index, dry_run)?
                .doctypes(&as_strs(&doctype))
                .query(queries)
                .filter(filters)
                .order_by(&as_strs(&order_by))
                .highlight(&as_strs(&highlight))
                .explain(explain);
            let mut s = page(&s, from, size);
            if let Some(fields) = values {
                s = s.values_list(&as_strs(&fields))?;
            }
            if dry_run {
                println!("{}", s.build_query().to_json());
                return Ok(());
            }
            print_results(s.execute()?)
        }
        Commands::Mlt { index, id, fields, filters, min_term_freq, min_doc_freq, max_query_terms, dry_run } => {
            let s = base_search(&config, &index, dry_run)?.filter(filters);
            let mut mlt = Mlt::new(&s, id, fields)?;
            if let Some(n) = min_term_freq {
                mlt = mlt.min_term_freq(n);
            }
            if let Some(n) = min_doc_freq {
                mlt = mlt.min_doc_freq(n);
            }
            if let Some(n) = max_query_terms {
                mlt = mlt.max_query_terms(n);
            }
            if dry_run {
                println!("{}", mlt.build_query().to_json());
                return Ok(());
            }
            print_results(mlt.execute()?)
        }
    }
}

fn load_config(file: Option<&Path>, url: Option<String>) -> Result<EngineConfig> {
    let mut config = match file {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::from_env()?,
    };
    if let Some(url) = url {
        config.url = url;
    }
    config.validate()?;
    Ok(config)
}

/// A search over `indexes` (or the configured index). Dry runs get no engine.
fn base_search(config: &EngineConfig, indexes: &[String], dry_run: bool) -> Result<S> {
    let mut s = S::new();
    if !dry_run {
        s = s.engine(Arc::new(HttpEngine::new(config)?));
    }
    let indexes: Vec<&str> = if indexes.is_empty() {
        config.index.as_deref().into_iter().collect()
    } else {
        as_strs(indexes)
    };
    Ok(s.indexes(&indexes))
}

/// `size` results starting at `from`; no size means everything after `from`.
fn page(s: &S, from: usize, size: Option<usize>) -> S {
    match size {
        Some(size) => s.slice(from..from.saturating_add(size)),
        None => s.slice(from..),
    }
}

fn as_strs(items: &[String]) -> Vec<&str> {
    items.iter().map(String::as_str).collect()
}

/// `field=value`; the value is read as JSON when it parses, else as a string.
fn parse_pair(raw: &str) -> std::result::Result<(String, Value), String> {
    let (field, value) = raw.split_once('=').ok_or_else(|| format!("expected field=value, got `{raw}`"))?;
    if field.trim().is_empty() {
        return Err(format!("missing field name in `{raw}`"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((field.trim().to_string(), value))
}

fn print_results(results: &SearchResults) -> Result<()> {
    tracing::info!(
        total = results.total(),
        returned = results.len(),
        max_score = ?results.max_score(),
        took_ms = results.took_ms(),
        timed_out = results.timed_out(),
        "search complete"
    );
    for result in results {
        let body = match result {
            SearchResult::Object(r) => HitBody::Source { source: r.source() },
            SearchResult::Dict(r) => HitBody::Fields { fields: r.fields() },
            SearchResult::List(r) => HitBody::Values { values: r.values() },
        };
        let highlight = Some(result.highlight()).filter(|h| !h.is_empty());
        let line = HitLine { id: result.id(), score: result.score(), body, highlight };
        println!("{}", serde_json::to_string(&line)?);
    }
    Ok(())
}

fn load(engine: &HttpEngine, input: &str, index: &str, doctype: &str, create: bool, batch_size: usize) -> Result<()> {
    if batch_size == 0 {
        bail!("--batch-size must be at least 1");
    }
    if create {
        engine.create_index(index)?;
    }
    let files = collect_files(Path::new(input));
    if files.is_empty() {
        bail!("no .json or .jsonl files found under {input}");
    }
    let mut total = 0;
    for file in &files {
        let docs = read_documents(file).with_context(|| format!("reading {}", file.display()))?;
        for batch in docs.chunks(batch_size) {
            total += engine.index_documents(index, doctype, batch)?;
        }
        tracing::info!(file = %file.display(), docs = docs.len(), "loaded file");
    }
    engine.refresh(index)?;
    tracing::info!(index, doctype, total, files = files.len(), "load complete");
    Ok(())
}

fn collect_files(input_path: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    }
    files
}

/// JSONL files hold one document per line; JSON files hold one document or
/// an array of them.
fn read_documents(file: &Path) -> Result<Vec<Value>> {
    let reader = BufReader::new(File::open(file)?);
    if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
        let mut docs = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            docs.push(serde_json::from_str(&line)?);
        }
        return Ok(docs);
    }
    match serde_json::from_reader(reader)? {
        Value::Array(docs) => Ok(docs),
        doc @ Value::Object(_) => Ok(vec![doc]),
        other => bail!("expected an object or an array of objects, got {other}"),
    }
}
