//! # Solr Adapter CLI (`solr`)
//!
//! Runs adapter operations against a configured Solr server, or prints the
//! request an operation would send.
//!
//! ## Usage
//!
//! ```bash
//! solr --config ./config/solr.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `solr plan <operation> <type>` | Print the built request without sending it |
//! | `solr get <type> <id>` | Fetch one record |
//! | `solr query <type>` | Search records |
//! | `solr create <type> --json '{..}'` | Create a record |
//! | `solr update <type> <id> --json '{..}'` | Update a record |
//! | `solr delete <type> <id>` | Delete a record |
//!
//! Writes that need a version (optimistic concurrency, atomic) read the
//! record first to learn it, unless `--version` is given.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use solr_adapter::config::{self, Config};
use solr_adapter::logging;
use solr_adapter::transport::HttpTransport;
use solr_adapter::{Session, SolrAdapter};
use solr_adapter_core::handler::HandlerData;
use solr_adapter_core::query::SearchQuery;
use solr_adapter_core::request::{Operation, Request, RequestBuilder};
use solr_adapter_core::update_mode::UpdateMode;
use solr_adapter_core::{Fields, NormalizedRecord, Snapshot, Version};
use std::path::PathBuf;
use std::sync::Arc;

/// Solr adapter CLI: use Apache Solr as a document store.
#[derive(Parser)]
#[command(
    name = "solr",
    about = "Solr adapter: find, query, create, update and delete Solr documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/solr.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the request an operation would send, without network access.
    Plan {
        #[arg(value_enum)]
        operation: OperationArg,
        /// Entity type name (see `[types.*]` in the config).
        type_name: String,
        /// Record id; repeat for find-many.
        #[arg(long = "id")]
        ids: Vec<String>,
        /// Document attributes as a JSON object (writes).
        #[arg(long)]
        json: Option<String>,
        /// Version to attach to a write.
        #[arg(long)]
        version: Option<i64>,
        #[command(flatten)]
        search: SearchArgs,
    },

    /// Fetch one record by id.
    Get { type_name: String, id: String },

    /// Search records.
    Query {
        type_name: String,
        #[command(flatten)]
        search: SearchArgs,
    },

    /// Create a record. Without `--id` a UUID is generated.
    Create {
        type_name: String,
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        json: String,
    },

    /// Update a record.
    ///
    /// Under optimistic concurrency or atomic mode the stored record is
    /// read first and `--json` is merged over it. Otherwise, or with
    /// `--version`, `--json` is the whole document.
    Update {
        type_name: String,
        id: String,
        #[arg(long)]
        json: String,
        /// Use this version instead of reading the record first.
        #[arg(long)]
        version: Option<i64>,
    },

    /// Delete a record.
    Delete {
        type_name: String,
        id: String,
        /// Use this version instead of reading the record first.
        #[arg(long)]
        version: Option<i64>,
    },
}

#[derive(clap::Args, Debug, Default)]
struct SearchArgs {
    /// Main query (`q`); defaults to `*:*`.
    #[arg(long)]
    q: Option<String>,
    /// Filter query; repeatable.
    #[arg(long)]
    fq: Vec<String>,
    #[arg(long)]
    limit: Option<u64>,
    #[arg(long)]
    offset: Option<u64>,
}

impl SearchArgs {
    fn to_query(&self) -> SearchQuery {
        SearchQuery {
            q: self.q.clone(),
            fq: self.fq.clone(),
            limit: self.limit,
            offset: self.offset,
            ..Default::default()
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OperationArg {
    Find,
    FindMany,
    FindAll,
    Query,
    QueryRecord,
    CreateRecord,
    UpdateRecord,
    DeleteRecord,
}

impl From<OperationArg> for Operation {
    fn from(arg: OperationArg) -> Self {
        match arg {
            OperationArg::Find => Operation::Find,
            OperationArg::FindMany => Operation::FindMany,
            OperationArg::FindAll => Operation::FindAll,
            OperationArg::Query => Operation::Query,
            OperationArg::QueryRecord => Operation::QueryRecord,
            OperationArg::CreateRecord => Operation::CreateRecord,
            OperationArg::UpdateRecord => Operation::UpdateRecord,
            OperationArg::DeleteRecord => Operation::DeleteRecord,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    logging::init_logging(&cfg.logging.level, cfg.logging.format)?;

    match cli.command {
        Commands::Plan {
            operation,
            type_name,
            ids,
            json,
            version,
            search,
        } => {
            let request = plan_request(
                &cfg,
                operation.into(),
                &type_name,
                ids,
                json.as_deref(),
                version,
                &search,
            )?;
            print_request(&request)?;
        }
        Commands::Get { type_name, id } => {
            let adapter = SolrAdapter::new(&cfg, HttpTransport::from_config(&cfg)?);
            let record = adapter.find(&mut Session::new(), &type_name, id).await?;
            print_record(&record)?;
        }
        Commands::Query { type_name, search } => {
            let adapter = SolrAdapter::new(&cfg, HttpTransport::from_config(&cfg)?);
            let mut session = Session::new();
            let records = adapter
                .query(&mut session, &type_name, search.to_query())
                .await?;
            let total = session
                .metadata()
                .metadata_for(&type_name)
                .and_then(|m| m.total);
            match total {
                Some(total) => println!("{} of {} matching records", records.len(), total),
                None => println!("{} records", records.len()),
            }
            for record in &records {
                print_record(record)?;
            }
        }
        Commands::Create {
            type_name,
            id,
            json,
        } => {
            let adapter = SolrAdapter::new(&cfg, HttpTransport::from_config(&cfg)?);
            let snapshot = Snapshot::new_record(&type_name, id.map(Value::String), parse_fields(&json)?);
            let result = adapter.create_record(&mut Session::new(), snapshot).await?;
            println!("created {} {}", type_name, result.id);
            if let Some(record) = result.refreshed {
                print_record(&record)?;
            }
        }
        Commands::Update {
            type_name,
            id,
            json,
            version,
        } => {
            let adapter = SolrAdapter::new(&cfg, HttpTransport::from_config(&cfg)?);
            let mut session = Session::new();
            let previous = prepare_version(&adapter, &mut session, &type_name, &id, version).await?;

            let mut attributes = previous.clone().unwrap_or_default();
            attributes.extend(parse_fields(&json)?);
            let mut snapshot = Snapshot::existing(&type_name, id.clone(), attributes);
            if let Some(previous) = previous {
                snapshot = snapshot.with_previous(previous);
            }

            let result = adapter.update_record(&mut session, snapshot).await?;
            println!("updated {} {}", type_name, result.id);
            if let Some(record) = result.refreshed {
                print_record(&record)?;
            }
        }
        Commands::Delete {
            type_name,
            id,
            version,
        } => {
            let adapter = SolrAdapter::new(&cfg, HttpTransport::from_config(&cfg)?);
            let mut session = Session::new();
            prepare_version(&adapter, &mut session, &type_name, &id, version).await?;
            adapter
                .delete_record(&mut session, Snapshot::existing(&type_name, id.clone(), Fields::new()))
                .await?;
            println!("deleted {} {}", type_name, id);
        }
    }

    Ok(())
}

/// Make the record's version known to `session` before a write.
///
/// With an explicit `--version` nothing is read. Otherwise, when the update
/// mode needs a version, the record is fetched and its attributes returned
/// (atomic updates diff against them).
async fn prepare_version(
    adapter: &SolrAdapter<HttpTransport>,
    session: &mut Session,
    type_name: &str,
    id: &str,
    version: Option<i64>,
) -> Result<Option<Fields>> {
    if let Some(v) = version {
        session
            .metadata_mut()
            .record_version(type_name, id, Version(v));
        return Ok(None);
    }

    match adapter.update_mode() {
        UpdateMode::OptimisticConcurrency | UpdateMode::Atomic => {
            let record = adapter
                .find(session, type_name, id.to_string())
                .await
                .with_context(|| format!("Failed to read {} {} before writing", type_name, id))?;
            Ok(Some(record.attributes))
        }
        UpdateMode::LastWriteWins | UpdateMode::None => Ok(None),
    }
}

fn plan_request(
    cfg: &Config,
    operation: Operation,
    type_name: &str,
    ids: Vec<String>,
    json: Option<&str>,
    version: Option<i64>,
    search: &SearchArgs,
) -> Result<Request> {
    let builder = RequestBuilder::new(cfg.build_options(), Arc::new(cfg.clone()));
    let mut ids: Vec<Value> = ids.into_iter().map(Value::String).collect();

    let data = match operation {
        Operation::Find => match ids.len() {
            1 => HandlerData::Id(ids.remove(0)),
            _ => bail!("find takes exactly one --id"),
        },
        Operation::FindMany => {
            if ids.is_empty() {
                bail!("find-many takes at least one --id");
            }
            HandlerData::Ids(ids)
        }
        Operation::FindAll => HandlerData::Query(SearchQuery::default()),
        Operation::Query | Operation::QueryRecord => HandlerData::Query(search.to_query()),
        Operation::CreateRecord | Operation::UpdateRecord | Operation::DeleteRecord => {
            let mut doc = match json {
                Some(json) => parse_fields(json)?,
                None => Fields::new(),
            };
            let unique_key = builder.unique_key(type_name);
            match ids.len() {
                0 if doc.contains_key(&unique_key) => {}
                0 => bail!("{} needs --id or '{}' in --json", operation, unique_key),
                1 => {
                    doc.insert(unique_key, ids.remove(0));
                }
                _ => bail!("{} takes at most one --id", operation),
            }
            if let Some(v) = version {
                doc.insert(builder.version_field().to_string(), Version(v).to_value());
            }
            HandlerData::Document(doc)
        }
    };

    Ok(builder.build(type_name, operation, data))
}

fn print_request(request: &Request) -> Result<()> {
    println!("{} {}", request.method(), request.relative_url());
    match request.body() {
        Some(body) => println!("{}", serde_json::to_string_pretty(body)?),
        None => {
            for (key, value) in request.query_pairs() {
                println!("  {} = {}", key, value);
            }
        }
    }
    Ok(())
}

fn print_record(record: &NormalizedRecord) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(record)?);
    Ok(())
}

fn parse_fields(json: &str) -> Result<Fields> {
    let value: Value = serde_json::from_str(json).with_context(|| "Failed to parse --json")?;
    match value {
        Value::Object(map) => Ok(map),
        _ => bail!("--json must be a JSON object"),
    }
}
