use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::io::{self, Write};
use tracing::info;

use odoo_stash::cache::CacheLayer;
use odoo_stash::config::{CacheConfig, Config, Overrides};
use odoo_stash::logging;
use odoo_stash::odoo::entities::*;
use odoo_stash::odoo::normalize::{null_sentinels, rename_field, unwrap_relation};
use odoo_stash::odoo::{CachedOdooClient, Domain};

#[derive(Parser, Debug)]
#[command(name = "ostash")]
#[command(about = "Cached, normalized access to Odoo data for reports")]
#[command(version)]
struct Args {
  #[command(flatten)]
  overrides: Overrides,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Fetch transactions in a date window, one JSON object per line
  Fetch {
    entity: DatedKind,
    /// First day (YYYY-MM-DD), local time (YYYY-MM-DD HH:MM:SS) or RFC 3339
    start: String,
    /// Last day, defaults to the first one
    end: Option<String>,
    /// Headers only
    #[arg(long)]
    no_detail: bool,
    /// Request and cache one calendar month at a time
    #[arg(long)]
    monthly: bool,
  },
  /// Dump a master-data table
  Master { entity: MasterKind },
  /// Ad-hoc search_read on any model (not cached)
  Query {
    model: String,
    /// Field to read (repeatable)
    #[arg(long = "field")]
    fields: Vec<String>,
    /// Unwrap a many-to-one field, optionally moving its label to LABEL
    #[arg(long = "relation", value_name = "FIELD[:LABEL]")]
    relations: Vec<String>,
    /// Turn false/0 into null in this field (repeatable)
    #[arg(long = "null")]
    nulls: Vec<String>,
    /// Rename a column in the output
    #[arg(long = "rename", value_name = "FROM:TO")]
    renames: Vec<String>,
    /// Equality filter; the value is read as JSON, or as a string if that fails
    #[arg(long = "where", value_name = "FIELD=VALUE")]
    filters: Vec<String>,
  },
  /// Delete cached entries whose key starts with PREFIX
  Invalidate { prefix: String },
  /// Delete expired cache entries
  Sweep,
  /// List cached keys
  Keys { prefix: Option<String> },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DatedKind {
  #[value(alias = "pos_orders")]
  PosOrders,
  #[value(alias = "purchase_orders")]
  PurchaseOrders,
  #[value(alias = "account_invoices")]
  AccountInvoices,
  #[value(alias = "account_move_lines")]
  AccountMoveLines,
  #[value(alias = "product_losses")]
  ProductLosses,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MasterKind {
  Products,
  Members,
  Suppliers,
  Categories,
  Labels,
  Taxes,
  Accounts,
  Locations,
  Uoms,
  Journals,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let mut out = io::stdout().lock();

  // Cache maintenance only needs the cache section, not ERP credentials
  if args.command.is_maintenance() {
    let file = Config::load_file(&args.overrides)?;
    let debug = args.overrides.debug || file.odoo.debug.unwrap_or(false);
    let _guard = logging::init(&file.logging, debug)?;
    let cache = CacheLayer::open(&CacheConfig::resolve(file.cache, &args.overrides)?)?;
    return maintain(&cache, args.command, &mut out);
  }

  let config = Config::load(&args.overrides)?;
  let _guard = logging::init(&config.logging, config.odoo.debug)?;

  let client = CachedOdooClient::new(&config)?;

  match args.command {
    Command::Fetch {
      entity,
      start,
      end,
      no_detail,
      monthly,
    } => {
      let request = FetchRequest {
        client: &client,
        start: &start,
        end: end.as_deref(),
        include_detail: !no_detail,
        monthly,
      };
      match entity {
        DatedKind::PosOrders => request.run(&PosOrders, &mut out).await?,
        DatedKind::PurchaseOrders => request.run(&PurchaseOrders, &mut out).await?,
        DatedKind::AccountInvoices => request.run(&AccountInvoices, &mut out).await?,
        DatedKind::AccountMoveLines => request.run(&AccountMoveLines, &mut out).await?,
        DatedKind::ProductLosses => request.run(&client.losses(), &mut out).await?,
      }
    }
    Command::Master { entity } => match entity {
      MasterKind::Products => dump_master(&client, &Products, &mut out).await?,
      MasterKind::Members => dump_master(&client, &Members, &mut out).await?,
      MasterKind::Suppliers => dump_master(&client, &Suppliers, &mut out).await?,
      MasterKind::Categories => dump_master(&client, &Categories, &mut out).await?,
      MasterKind::Labels => dump_master(&client, &Labels, &mut out).await?,
      MasterKind::Taxes => dump_master(&client, &TaxRates, &mut out).await?,
      MasterKind::Accounts => dump_master(&client, &Accounts, &mut out).await?,
      MasterKind::Locations => dump_master(&client, &Locations, &mut out).await?,
      MasterKind::Uoms => dump_master(&client, &Uoms, &mut out).await?,
      MasterKind::Journals => dump_master(&client, &Journals, &mut out).await?,
    },
    Command::Query {
      model,
      fields,
      relations,
      nulls,
      renames,
      filters,
    } => {
      let domain = Domain::and(filters.iter().map(|f| parse_filter(f)).collect::<Result<Vec<_>>>()?);
      let renames = renames.iter().map(|r| parse_rename(r)).collect::<Result<Vec<_>>>()?;
      let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
      let nulls: Vec<&str> = nulls.iter().map(String::as_str).collect();

      let mut records = client.search_read(&model, &domain, &fields).await?;
      for record in &mut records {
        for relation in &relations {
          let (field, label) = match relation.split_once(':') {
            Some((field, label)) => (field, Some(label)),
            None => (relation.as_str(), None),
          };
          unwrap_relation(record, field, label)?;
        }
        null_sentinels(record, &nulls);
        for (from, to) in &renames {
          rename_field(record, from, to);
        }
      }
      write_rows(&mut out, None, &records)?;
    }
    other @ (Command::Invalidate { .. } | Command::Sweep | Command::Keys { .. }) => {
      maintain(client.cache(), other, &mut out)?
    }
  }

  Ok(())
}

impl Command {
  fn is_maintenance(&self) -> bool {
    matches!(self, Command::Invalidate { .. } | Command::Sweep | Command::Keys { .. })
  }
}

fn maintain(cache: &CacheLayer, command: Command, out: &mut impl Write) -> Result<()> {
  match command {
    Command::Invalidate { prefix } => {
      let removed = cache.invalidate(&prefix)?;
      writeln!(out, "{}", json!({ "removed": removed }))?;
    }
    Command::Sweep => {
      let removed = cache.sweep()?;
      writeln!(out, "{}", json!({ "removed": removed }))?;
    }
    Command::Keys { prefix } => {
      for key in cache.keys(prefix.as_deref().unwrap_or(""))? {
        writeln!(out, "{}", key)?;
      }
    }
    other => return Err(eyre!("{:?} needs the ERP connection", other)),
  }
  Ok(())
}

struct FetchRequest<'a> {
  client: &'a CachedOdooClient,
  start: &'a str,
  end: Option<&'a str>,
  include_detail: bool,
  monthly: bool,
}

impl FetchRequest<'_> {
  async fn run<E: DatedEntity>(&self, entity: &E, out: &mut impl Write) -> Result<()> {
    let window = self.client.window(self.start, self.end)?;

    let batch = if self.monthly {
      self.client.fetch_monthly(entity, &window, self.include_detail).await?
    } else {
      let result = self.client.fetch(entity, &window, self.include_detail).await?;
      info!(cached = result.is_hit(), "{}", E::NAMESPACE);
      result.data
    };

    info!(
      headers = batch.headers.len(),
      details = batch.details.len(),
      "{} {} - {}",
      E::MODEL,
      window.local_start,
      window.local_end
    );
    write_rows(out, Some("header"), &batch.headers)?;
    write_rows(out, Some("detail"), &batch.details)?;
    Ok(())
  }
}

async fn dump_master<M: MasterEntity>(client: &CachedOdooClient, entity: &M, out: &mut impl Write) -> Result<()> {
  let result = client.master(entity).await?;
  info!(rows = result.data.len(), cached = result.is_hit(), "{}", M::MODEL);
  write_rows(out, None, &result.data)
}

/// One JSON object per line, wrapped as `{"<tag>": row}` when a tag is given.
fn write_rows<T: Serialize>(out: &mut impl Write, tag: Option<&str>, rows: &[T]) -> Result<()> {
  for row in rows {
    let value = serde_json::to_value(row)?;
    let line = match tag {
      Some(tag) => Value::Object(Map::from_iter([(tag.to_string(), value)])),
      None => value,
    };
    writeln!(out, "{}", line)?;
  }
  Ok(())
}

fn parse_filter(filter: &str) -> Result<Domain> {
  let (field, raw) = filter
    .split_once('=')
    .ok_or_else(|| eyre!("Expected FIELD=VALUE, got '{}'", filter))?;
  let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
  Ok(Domain::eq(field.trim(), value))
}

fn parse_rename(rename: &str) -> Result<(String, String)> {
  match rename.split_once(':') {
    Some((from, to)) if !from.trim().is_empty() && !to.trim().is_empty() => {
      Ok((from.trim().to_string(), to.trim().to_string()))
    }
    _ => Err(eyre!("Expected FROM:TO, got '{}'", rename)),
  }
}
