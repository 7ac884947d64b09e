use crate::{
    codec,
    config::Config,
    document::{ReportDocument, Section},
    error::StoreResult,
    images::ALL_CATEGORIES,
    records::{
        EnergySample, ImplementationItem, InfrastructureRow, Metric, PolicyRecommendation, Table,
        VehicleComparison,
    },
    storage::FileStorage,
    store::ReportStore,
    util::{date_stamp, ensure_dir, format_timestamp, today, DATE_FORMAT},
};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

type Store = ReportStore<FileStorage>;

#[derive(Parser, Debug)]
#[command(name = "report-desk")]
#[command(about = "Policy research report store (tables, findings, image gallery)")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./report-desk.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override storage.data_file.
    #[arg(long)]
    pub data_file: Option<PathBuf>,

    /// Report to act on. Defaults to the first report.
    #[arg(long)]
    pub report: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show where the store lives and how it loaded.
    Status {},
    List {},
    /// Create a report from the default template and select it.
    Create {},
    /// Delete the selected report (the last one is always kept).
    Delete {},
    Show {},
    SetTitle {
        title: String,
    },
    SetSummary {
        content: String,
    },
    Finding {
        #[command(subcommand)]
        op: FindingOp,
    },
    Row {
        #[command(subcommand)]
        op: RowOp,
    },
    Image {
        #[command(subcommand)]
        op: ImageOp,
    },
    /// Write the whole store as JSON for download.
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum FindingOp {
    Add { text: String },
    Set { index: usize, text: String },
    Remove { index: usize },
}

#[derive(Subcommand, Debug)]
pub enum RowOp {
    List {
        table: Table,
    },
    /// Append a placeholder row.
    Add {
        table: Table,
    },
    Remove {
        table: Table,
        index: usize,
    },
    /// Replace one row with a JSON object.
    Set {
        table: Table,
        index: usize,
        #[arg(long)]
        file: PathBuf,
    },
    /// Replace the whole table with a JSON array of rows.
    Import {
        table: Table,
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum ImageOp {
    List {
        #[arg(long, default_value = ALL_CATEGORIES)]
        category: String,
    },
    /// Upload one or more files; the store is written once.
    Add {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Caption for every file; defaults to "Image: <filename>".
        #[arg(long)]
        caption: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    Tag {
        id: String,
        #[arg(long)]
        caption: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Write one image and print its content type.
    Get {
        id: String,
        /// Target file; defaults to its safe name under export.out_dir.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    Remove {
        id: String,
    },
    Clear {
        /// Required confirmation.
        #[arg(long)]
        yes: bool,
    },
    /// Write every image of the report into a flat directory.
    Export {
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg = match resolve_config_path(args.config.as_deref()) {
        Some(p) => Config::load(&p)?,
        None => Config::default(),
    };
    let log_path = resolve_log_path(&cfg);
    let _guard = init_logging(&args, &cfg, log_path.as_deref())?;

    let data_file = args
        .data_file
        .clone()
        .unwrap_or_else(|| PathBuf::from(&cfg.storage.data_file));
    let mut store = ReportStore::new(FileStorage::new(data_file, cfg.storage.atomic_writes))
        .skip_unchanged_writes(cfg.storage.skip_unchanged_writes);
    let outcome = store.load();

    if cfg.storage.seed_default_report {
        if let Some(id) = store.ensure_report()? {
            info!("seeded empty store with {id}");
        }
    }
    if let Some(id) = &args.report {
        store.select_report(id)?;
    }

    match args.cmd {
        Command::Status {} => print_json(&json!({
            "data_file": store.storage().path(),
            "load": outcome,
            "reports": store.len(),
            "selected": store.selected_id(),
        })),
        Command::List {} => list(&store),
        Command::Create {} => {
            let id = store.create_default_report()?;
            print_json(&json!({ "created": id }))
        }
        Command::Delete {} => {
            let id = selected_id(&store)?;
            store.delete_report(&id)?;
            print_json(&json!({ "deleted": id, "selected": store.selected_id() }))
        }
        Command::Show {} => {
            let doc = store.selected().ok_or_else(no_report)?;
            print_json(&document_view(doc))
        }
        Command::SetTitle { title } => {
            let changed = store.update_selected(|doc| Ok(doc.set_title(&title)))?;
            print_json(&json!({ "changed": changed }))
        }
        Command::SetSummary { content } => {
            let changed = store.update_selected(|doc| Ok(doc.set_summary_content(&content)))?;
            print_json(&json!({ "changed": changed }))
        }
        Command::Finding { op } => finding(&mut store, op),
        Command::Row { op } => row(&mut store, op),
        Command::Image { op } => image(&cfg, &mut store, op),
        Command::Export { out } => export_store(&cfg, &store, out.as_deref()),
    }
}

fn resolve_config_path(user: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = user {
        return Some(p.to_path_buf());
    }
    ["report-desk.toml", "report-desk.example.toml"]
        .into_iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries command output.
    let stderr_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        if !parent.as_os_str().is_empty() {
            ensure_dir(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file || cfg.logging.file_path.is_empty() {
        return None;
    }
    Some(PathBuf::from(&cfg.logging.file_path))
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn no_report() -> anyhow::Error {
    anyhow!("no report exists; run `create` first")
}

fn selected_id(store: &Store) -> Result<String> {
    store
        .selected_id()
        .map(str::to_string)
        .ok_or_else(no_report)
}

fn list(store: &Store) -> Result<()> {
    let selected = store.selected_id();
    let rows: Vec<Value> = store
        .reports()
        .map(|doc| {
            json!({
                "id": doc.id(),
                "title": doc.title(),
                "last_modified": format_timestamp(&doc.last_modified()),
                "images": doc.images().len(),
                "selected": Some(doc.id()) == selected,
            })
        })
        .collect();
    print_json(&Value::Array(rows))
}

fn document_view(doc: &ReportDocument) -> Value {
    let images: Vec<_> = doc.images().iter().map(|img| img.metadata()).collect();
    json!({
        "id": doc.id(),
        "title": doc.title(),
        "created_date": doc.created_date().format(DATE_FORMAT).unwrap_or_default(),
        "last_modified": format_timestamp(&doc.last_modified()),
        "summary": doc.summary(),
        "metrics": doc.records::<Metric>(),
        "nev_comparison": doc.records::<VehicleComparison>(),
        "infrastructure_data": doc.records::<InfrastructureRow>(),
        "energy_consumption": doc.records::<EnergySample>(),
        "policy_recommendations": doc.records::<PolicyRecommendation>(),
        "implementation_status": doc.records::<ImplementationItem>(),
        "image_categories": doc.images().categories(),
        "images": images,
    })
}

fn finding(store: &mut Store, op: FindingOp) -> Result<()> {
    let out = store.update_selected(|doc| {
        Ok(match op {
            FindingOp::Add { text } => {
                doc.add_finding(&text);
                json!({ "findings": doc.summary().key_findings.len() })
            }
            FindingOp::Set { index, text } => {
                json!({ "changed": doc.update_finding(index, &text)? })
            }
            FindingOp::Remove { index } => json!({ "removed": doc.remove_finding(index)? }),
        })
    })?;
    print_json(&out)
}

enum RowAction {
    List,
    Add,
    Remove(usize),
    Set(usize, Value),
    Replace(Value),
}

fn apply_row<T: Section>(doc: &mut ReportDocument, action: RowAction) -> StoreResult<Value> {
    let table = T::TABLE.as_str();
    match action {
        RowAction::List => Ok(serde_json::to_value(doc.records::<T>())?),
        RowAction::Add => {
            doc.edit_records::<T, _, _>(|c| c.append(T::placeholder()))?;
            Ok(json!({ "table": table, "rows": doc.records::<T>().len() }))
        }
        RowAction::Remove(index) => {
            let removed = doc.edit_records::<T, _, _>(|c| c.remove_at(index))?;
            Ok(json!({ "table": table, "removed": serde_json::to_value(removed)? }))
        }
        RowAction::Set(index, raw) => {
            let row: T = serde_json::from_value(raw)?;
            let changed = doc.edit_records::<T, _, _>(|c| c.update_at(index, row))?;
            Ok(json!({ "table": table, "index": index, "changed": changed }))
        }
        RowAction::Replace(raw) => {
            let rows: Vec<T> = serde_json::from_value(raw)?;
            let changed = doc.edit_records::<T, _, _>(|c| c.replace_all(rows))?;
            Ok(json!({ "table": table, "changed": changed, "rows": doc.records::<T>().len() }))
        }
    }
}

fn row(store: &mut Store, op: RowOp) -> Result<()> {
    let (table, action) = match op {
        RowOp::List { table } => (table, RowAction::List),
        RowOp::Add { table } => (table, RowAction::Add),
        RowOp::Remove { table, index } => (table, RowAction::Remove(index)),
        RowOp::Set { table, index, file } => (table, RowAction::Set(index, read_json(&file)?)),
        RowOp::Import { table, file } => (table, RowAction::Replace(read_json(&file)?)),
    };

    let out = match table {
        Table::KeyFindings => bail!("key findings are edited with the `finding` command"),
        Table::Metrics => store.update_selected(|doc| apply_row::<Metric>(doc, action))?,
        Table::NevComparison => {
            store.update_selected(|doc| apply_row::<VehicleComparison>(doc, action))?
        }
        Table::InfrastructureData => {
            store.update_selected(|doc| apply_row::<InfrastructureRow>(doc, action))?
        }
        Table::EnergyConsumption => {
            store.update_selected(|doc| apply_row::<EnergySample>(doc, action))?
        }
        Table::PolicyRecommendations => {
            store.update_selected(|doc| apply_row::<PolicyRecommendation>(doc, action))?
        }
        Table::ImplementationStatus => {
            store.update_selected(|doc| apply_row::<ImplementationItem>(doc, action))?
        }
    };
    print_json(&out)
}

fn read_json(file: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("reading rows: {}", file.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing rows: {}", file.display()))
}

fn image(cfg: &Config, store: &mut Store, op: ImageOp) -> Result<()> {
    match op {
        ImageOp::List { category } => {
            let doc = store.selected().ok_or_else(no_report)?;
            let rows: Vec<_> = doc
                .images()
                .filter_by_category(&category)
                .map(|img| img.metadata())
                .collect();
            print_json(&serde_json::to_value(rows)?)
        }
        ImageOp::Add {
            paths,
            caption,
            category,
        } => {
            let category = category.unwrap_or_else(|| cfg.images.default_category.clone());
            warn_unknown_category(cfg, &category);
            // Read everything first so one bad file uploads nothing.
            let files = paths
                .iter()
                .map(|p| read_image(cfg, p))
                .collect::<Result<Vec<_>>>()?;
            let added = store.update_selected(|doc| {
                doc.edit_images(|cat| {
                    Ok(files
                        .into_iter()
                        .map(|(filename, payload)| {
                            let caption = caption
                                .clone()
                                .unwrap_or_else(|| format!("Image: {filename}"));
                            let id = cat.add(&filename, payload, &caption, &category);
                            json!({ "id": id, "filename": filename })
                        })
                        .collect::<Vec<_>>())
                })
            })?;
            info!("added {} images", added.len());
            print_json(&json!({ "added": added }))
        }
        ImageOp::Tag {
            id,
            caption,
            category,
        } => {
            if let Some(c) = &category {
                warn_unknown_category(cfg, c);
            }
            let changed = store.update_selected(|doc| {
                doc.edit_images(|cat| {
                    cat.update_metadata(&id, caption.as_deref(), category.as_deref())
                })
            })?;
            print_json(&json!({ "changed": changed }))
        }
        ImageOp::Get { id, out } => {
            let report = selected_id(store)?;
            let entry = store.export_image(&report, &id)?;
            let path = out.unwrap_or_else(|| PathBuf::from(&cfg.export.out_dir).join(&entry.name));
            entry.write_to(&path)?;
            info!("wrote image {id} to {}", path.display());
            print_json(&json!({
                "path": path,
                "name": entry.name,
                "content_type": entry.content_type,
                "bytes": entry.bytes.len(),
            }))
        }
        ImageOp::Remove { id } => {
            let removed =
                store.update_selected(|doc| doc.edit_images(|cat| Ok(cat.remove_by_id(&id))))?;
            print_json(&json!({ "removed": removed }))
        }
        ImageOp::Clear { yes } => {
            let count = store.selected().ok_or_else(no_report)?.images().len();
            if !yes {
                bail!("refusing to clear {count} images without --yes");
            }
            let cleared = store.update_selected(|doc| doc.edit_images(|cat| Ok(cat.clear())))?;
            print_json(&json!({ "cleared": cleared }))
        }
        ImageOp::Export { out_dir } => {
            let id = selected_id(store)?;
            let archive = store.export_images(&id)?;
            let dir = out_dir.unwrap_or_else(|| {
                PathBuf::from(&cfg.export.out_dir).join(format!(
                    "{}_{}",
                    cfg.export.images_dir_prefix,
                    date_stamp(today())
                ))
            });
            archive.write_to_dir(&dir)?;
            info!(
                "exported {} images ({} bytes) to {}",
                archive.len(),
                archive.total_bytes(),
                dir.display()
            );
            let files: Vec<_> = archive
                .entries
                .iter()
                .map(|e| json!({ "name": e.name, "content_type": e.content_type }))
                .collect();
            print_json(&json!({ "dir": dir, "files": files }))
        }
    }
}

fn read_image(cfg: &Config, path: &Path) -> Result<(String, Vec<u8>)> {
    let filename = path
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("not a file path: {}", path.display()))?
        .to_string();

    match codec::extension(&filename) {
        Some(ext) if cfg.is_allowed_extension(&ext) => {}
        _ => bail!(
            "unsupported image type: {filename} (allowed: {})",
            cfg.images.allowed_extensions.join(", ")
        ),
    }

    let meta = std::fs::metadata(path).with_context(|| format!("stat {}", path.display()))?;
    if meta.len() > cfg.images.max_image_bytes {
        bail!("image exceeds max_image_bytes: {}", meta.len());
    }
    let payload = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    Ok((filename, payload))
}

fn warn_unknown_category(cfg: &Config, category: &str) {
    if !cfg.images.categories.iter().any(|c| c == category) {
        warn!("category {category:?} is not one of the configured categories");
    }
}

fn export_store(cfg: &Config, store: &Store, out: Option<&Path>) -> Result<()> {
    let text = store.export_store()?;
    let path = out.map(PathBuf::from).unwrap_or_else(|| {
        PathBuf::from(&cfg.export.out_dir).join(format!(
            "{}_{}.json",
            cfg.export.store_file_prefix,
            date_stamp(today())
        ))
    });
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_dir(parent)?;
        }
    }
    std::fs::write(&path, &text).with_context(|| format!("write {}", path.display()))?;
    info!("exported {} reports to {}", store.len(), path.display());
    print_json(&json!({ "path": path, "bytes": text.len() }))
}
