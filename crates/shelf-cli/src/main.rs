use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use shelf_core::{
    parse_tags, AppConfig, CollectionItem, CollectionStatus, Database, DuplicatePolicy, ExitCode,
    ItemFilter, ItemPatch, ItemSort, MediaCategory, ShelfError,
};
use shelf_scrape::{ImportOutcome, Importer, ScrapeConfig, ScrapeError};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "shelf",
    about = "Personal movie, book and music collection backed by catalogue pages",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format (for scripts).
    /// Also enabled by setting SHELF_JSON=1.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the catalogue.
    Search {
        query: String,
        #[arg(long = "type", short = 't', default_value = "movie")]
        media_type: MediaCategory,
    },

    /// Fetch and print a catalogue detail page without storing it.
    Detail { url: String },

    /// Import a catalogue entry into the collection.
    Add {
        /// Search query; the picked result is imported.
        query: Option<String>,
        #[arg(long = "type", short = 't', default_value = "movie")]
        media_type: MediaCategory,
        /// 1-based position in the search results.
        #[arg(long, default_value = "1")]
        pick: usize,
        /// Import a detail page URL directly instead of searching.
        #[arg(long, conflicts_with = "query")]
        url: Option<String>,
        /// Overrides `import.on_duplicate` from the config (update | reject).
        #[arg(long)]
        on_duplicate: Option<DuplicatePolicy>,
    },

    /// List collection items.
    List {
        #[arg(long = "type", short = 't')]
        media_type: Option<MediaCategory>,
        #[arg(long)]
        status: Option<CollectionStatus>,
        #[arg(long)]
        tag: Option<String>,
        /// newest | oldest | title | rating
        #[arg(long, default_value = "newest")]
        sort: ItemSort,
        #[arg(long, default_value = "50")]
        limit: usize,
        #[arg(long, default_value = "0")]
        offset: usize,
    },

    /// Show a single item.
    Show { id: i64 },

    /// Edit the user fields of an item.
    Edit {
        id: i64,
        #[arg(long)]
        status: Option<CollectionStatus>,
        #[arg(long, conflicts_with = "clear_rating")]
        rating: Option<f32>,
        #[arg(long)]
        clear_rating: bool,
        /// Comma separated; an empty string clears all tags.
        #[arg(long)]
        tags: Option<String>,
        /// An empty string clears the comment. Same for the identifier fields.
        #[arg(long)]
        comment: Option<String>,
        #[arg(long)]
        isbn: Option<String>,
        #[arg(long)]
        imdb: Option<String>,
        #[arg(long)]
        source_id: Option<String>,
        #[arg(long)]
        original_title: Option<String>,
        #[arg(long)]
        goodreads: Option<String>,
        /// IMDb rating on its 0-10 scale.
        #[arg(long, conflicts_with = "clear_imdb_rating")]
        imdb_rating: Option<f32>,
        #[arg(long)]
        clear_imdb_rating: bool,
    },

    /// Delete an item.
    Delete {
        id: i64,
        #[arg(long)]
        confirm: bool,
    },

    /// Show collection statistics.
    Stats,

    /// Cover cache operations.
    Cover {
        #[command(subcommand)]
        action: CoverAction,
    },

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show version information.
    Version,
}

#[derive(Subcommand)]
enum CoverAction {
    /// Relink or re-download the cover of an item.
    Refresh { id: i64 },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show effective config values.
    Show,
    /// Print the config file path.
    Path,
    /// Write the effective config to the config file.
    Init {
        #[arg(long)]
        force: bool,
    },
}

// ─── Main ────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    init_logging();

    let cli = Cli::parse();
    let json_output = cli.json || std::env::var("SHELF_JSON").as_deref() == Ok("1");

    if let Err(err) = run(cli.command, json_output).await {
        let code = exit_code_for(&err);
        if json_output {
            let payload = serde_json::json!({
                "status": "error",
                "error": error_kind(&code),
                "message": format!("{err:#}"),
            });
            println!("{payload}");
        } else {
            eprintln!("Error: {err:#}");
        }
        std::process::exit(code as i32);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("SHELF_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(command: Commands, json_output: bool) -> Result<()> {
    let start = Instant::now();

    // Load config (honors SHELF_CONFIG and SHELF_LIBRARY_PATH if set)
    let mut config = AppConfig::load()?;
    if let Ok(lib_path) = std::env::var("SHELF_LIBRARY_PATH") {
        config.set_library_path(lib_path.into());
    }
    debug!(library = %config.core.library_path, "config loaded");

    match command {
        // ── Search ─────────────────────────────────────────────────────────

        Commands::Search { query, media_type } => {
            let resolver = shelf_scrape::SearchResolver::new(ScrapeConfig::from_app_config(&config))?;
            let candidates = resolver.try_search(&query, media_type).await?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "items": candidates, "total": candidates.len(), "query": query },
                    "meta": { "duration_ms": dur }
                }))?;
            } else if candidates.is_empty() {
                println!("No results for: {query}");
            } else {
                for (idx, candidate) in candidates.iter().enumerate() {
                    let sid = candidate.source_id.as_deref().unwrap_or("-");
                    println!("{:>2}. {:<40}  {sid}", idx + 1, candidate.title);
                    println!("    {}", candidate.detail_ref);
                }
            }
        }

        // ── Detail ─────────────────────────────────────────────────────────

        Commands::Detail { url } => {
            let normalizer =
                shelf_scrape::DetailNormalizer::new(ScrapeConfig::from_app_config(&config))?;
            let record = normalizer.fetch_detail(&url).await?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({"status":"ok","data":record,"meta":{"duration_ms":dur}}))?;
            } else {
                println!("{}", serde_json::to_string_pretty(&record)?);
            }
        }

        // ── Add ────────────────────────────────────────────────────────────

        Commands::Add { query, media_type, pick, url, on_duplicate } => {
            let db = open_db(&config)?;
            let policy = on_duplicate.unwrap_or(config.import.on_duplicate);
            let importer = Importer::new(&db, ScrapeConfig::from_app_config(&config), policy)?;

            let outcome = match (url, query) {
                (Some(url), _) => importer.import_url(&url).await?,
                (None, Some(query)) => {
                    let candidates = importer.search().try_search(&query, media_type).await?;
                    let candidate = pick
                        .checked_sub(1)
                        .and_then(|idx| candidates.get(idx))
                        .ok_or_else(|| {
                            anyhow::Error::new(CliError::NoCandidate {
                                query: query.clone(),
                                pick,
                                found: candidates.len(),
                            })
                        })?;
                    importer.import_candidate(candidate).await?
                }
                (None, None) => {
                    return Err(CliError::InvalidArgs("either a query or --url is required".into()).into());
                }
            };

            let item = db.get_item(outcome.id())?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "result": outcome, "item": item },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                match outcome {
                    ImportOutcome::Created { id } => println!("Added #{id}: {}", item.title),
                    ImportOutcome::Updated { id } => println!("Updated #{id}: {}", item.title),
                    ImportOutcome::Rejected { existing_id } => {
                        println!("Already in collection as #{existing_id}: {}", item.title);
                    }
                }
                if let Some(path) = item.local_cover_path.as_deref() {
                    println!("  cover: {path}");
                }
            }

            if matches!(outcome, ImportOutcome::Rejected { .. }) {
                std::process::exit(ExitCode::Conflict as i32);
            }
        }

        // ── List ───────────────────────────────────────────────────────────

        Commands::List { media_type, status, tag, sort, limit, offset } => {
            let db = open_db(&config)?;
            let filter = ItemFilter {
                media_type,
                status,
                tag,
                sort,
                limit: Some(limit),
                offset,
            };
            let items = db.list_items(&filter)?;
            let dur = start.elapsed().as_millis();

            if json_output {
                let total = db.count_items(&filter)?;
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "items": items, "total": total, "limit": limit, "offset": offset },
                    "meta": { "duration_ms": dur }
                }))?;
            } else if items.is_empty() {
                println!("No items. Use `shelf add` to import from the catalogue.");
            } else {
                for item in &items {
                    print_item_line(item);
                }
            }
        }

        // ── Show ───────────────────────────────────────────────────────────

        Commands::Show { id } => {
            let db = open_db(&config)?;
            let item = db.get_item(id)?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({"status":"ok","data":item,"meta":{"duration_ms":dur}}))?;
            } else {
                print_item_detail(&item);
            }
        }

        // ── Edit ───────────────────────────────────────────────────────────

        Commands::Edit {
            id,
            status,
            rating,
            clear_rating,
            tags,
            comment,
            isbn,
            imdb,
            source_id,
            original_title,
            goodreads,
            imdb_rating,
            clear_imdb_rating,
        } => {
            let patch = ItemPatch {
                status,
                my_rating: if clear_rating { Some(None) } else { rating.map(Some) },
                tags: tags.as_deref().map(parse_tags),
                comment: comment.map(Some),
                isbn: isbn.map(Some),
                imdb_id: imdb.map(Some),
                source_id: source_id.map(Some),
                original_title: original_title.map(Some),
                goodreads_id: goodreads.map(Some),
                imdb_rating: if clear_imdb_rating { Some(None) } else { imdb_rating.map(Some) },
            };
            if patch.is_empty() {
                return Err(CliError::InvalidArgs("nothing to edit".into()).into());
            }

            let db = open_db(&config)?;
            let item = db.apply_patch(id, patch)?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({"status":"ok","data":item,"meta":{"duration_ms":dur}}))?;
            } else {
                println!("Updated #{id}: {}", item.title);
            }
        }

        // ── Delete ─────────────────────────────────────────────────────────

        Commands::Delete { id, confirm } => {
            if !confirm {
                eprintln!("Refusing to delete #{id} without --confirm");
                std::process::exit(ExitCode::ConfirmRequired as i32);
            }
            let db = open_db(&config)?;
            db.delete_item(id)?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({"status":"ok","data":{"deleted":id},"meta":{"duration_ms":dur}}))?;
            } else {
                println!("Deleted #{id}");
            }
        }

        // ── Stats ──────────────────────────────────────────────────────────

        Commands::Stats => {
            let db = open_db(&config)?;
            let stats = db.stats()?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({"status":"ok","data":stats,"meta":{"duration_ms":dur}}))?;
            } else {
                println!("Collection statistics:");
                println!("  Total items:    {}", stats.total);
                println!("  Completed:      {}", stats.done);
                match stats.average_rating {
                    Some(avg) => println!("  Average rating: {avg:.1}"),
                    None => println!("  Average rating: -"),
                }
                for (category, count) in &stats.by_category {
                    println!("  {category:<15} {count}");
                }
                for (status, count) in &stats.by_status {
                    println!("  {status:<15} {count}");
                }
                if !stats.by_year.is_empty() {
                    println!("By year:");
                    for (year, count) in &stats.by_year {
                        println!("  {year}  {count}");
                    }
                }
                if !stats.recent.is_empty() {
                    println!("Recently added:");
                    for recent in &stats.recent {
                        println!(
                            "  #{:<4} [{}] {}",
                            recent.id, recent.media_type, recent.title
                        );
                    }
                }
            }
        }

        // ── Cover ──────────────────────────────────────────────────────────

        Commands::Cover { action } => match action {
            CoverAction::Refresh { id } => {
                let db = open_db(&config)?;
                let importer = Importer::new(
                    &db,
                    ScrapeConfig::from_app_config(&config),
                    config.import.on_duplicate,
                )?;
                let path = importer.refresh_cover(id).await?;
                let dur = start.elapsed().as_millis();

                if json_output {
                    print_json(&serde_json::json!({
                        "status": "ok",
                        "data": { "id": id, "local_cover_path": path },
                        "meta": { "duration_ms": dur }
                    }))?;
                } else {
                    match path {
                        Some(path) => println!("Cover for #{id}: {}", path.display()),
                        None => println!("No cover available for #{id}"),
                    }
                }
            }
        },

        // ── Config ─────────────────────────────────────────────────────────

        Commands::Config { action } => {
            let dur = start.elapsed().as_millis();
            match action {
                ConfigAction::Show => {
                    if json_output {
                        print_json(&serde_json::json!({"status":"ok","data":config,"meta":{"duration_ms":dur}}))?;
                    } else {
                        for (key, value) in config_key_values(&config) {
                            println!("{key} = {value}");
                        }
                    }
                }
                ConfigAction::Path => {
                    let path = AppConfig::config_path();
                    if json_output {
                        print_json(&serde_json::json!({"status":"ok","data":{"path":path},"meta":{"duration_ms":dur}}))?;
                    } else {
                        println!("{}", path.display());
                    }
                }
                ConfigAction::Init { force } => {
                    let path = AppConfig::config_path();
                    if path.exists() && !force {
                        return Err(CliError::InvalidArgs(format!(
                            "{} already exists (use --force to overwrite)",
                            path.display()
                        ))
                        .into());
                    }
                    config.save()?;
                    if json_output {
                        print_json(&serde_json::json!({"status":"ok","data":{"path":path},"meta":{"duration_ms":dur}}))?;
                    } else {
                        println!("Wrote {}", path.display());
                    }
                }
            }
        }

        // ── Version ────────────────────────────────────────────────────────

        Commands::Version => {
            let version = env!("CARGO_PKG_VERSION");
            let dur = start.elapsed().as_millis();
            if json_output {
                print_json(&serde_json::json!({"status":"ok","data":{"version":version},"meta":{"duration_ms":dur}}))?;
            } else {
                println!("shelf v{version}");
            }
        }
    }

    Ok(())
}

// ─── Errors ─────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    InvalidArgs(String),

    #[error("no result #{pick} for \"{query}\" ({found} found)")]
    NoCandidate { query: String, pick: usize, found: usize },
}

fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    if let Some(cli) = err.downcast_ref::<CliError>() {
        return match cli {
            CliError::InvalidArgs(_) => ExitCode::InvalidArgs,
            CliError::NoCandidate { .. } => ExitCode::NotFound,
        };
    }
    let shelf = err.downcast_ref::<ShelfError>().or_else(|| match err.downcast_ref::<ScrapeError>() {
        Some(ScrapeError::Storage(inner)) => Some(inner),
        _ => None,
    });
    if let Some(shelf) = shelf {
        return match shelf {
            ShelfError::ItemNotFound(_) => ExitCode::NotFound,
            ShelfError::DuplicateItem { .. } => ExitCode::Conflict,
            ShelfError::Validation(_) => ExitCode::InvalidArgs,
            _ => ExitCode::GeneralError,
        };
    }
    match err.downcast_ref::<ScrapeError>() {
        Some(e) if e.is_transient() => ExitCode::NetworkError,
        Some(ScrapeError::MalformedReference(_) | ScrapeError::InvalidIsbn(_)) => ExitCode::InvalidArgs,
        Some(ScrapeError::MissingTitle) => ExitCode::NotFound,
        _ => ExitCode::GeneralError,
    }
}

fn error_kind(code: &ExitCode) -> &'static str {
    match code {
        ExitCode::NotFound => "not_found",
        ExitCode::InvalidArgs => "invalid_args",
        ExitCode::NetworkError => "network",
        ExitCode::Conflict => "conflict",
        ExitCode::ConfirmRequired => "confirm_required",
        ExitCode::Success | ExitCode::GeneralError => "error",
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

fn open_db(config: &AppConfig) -> Result<Database> {
    let db_path = config.database_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Database::open(&db_path)?)
}

fn print_item_line(item: &CollectionItem) {
    let id = item.id.map(|id| id.to_string()).unwrap_or_default();
    let year = item.year.map(|y| y.to_string()).unwrap_or_default();
    let rating = item.my_rating.map(|r| format!("{r:.1}")).unwrap_or_else(|| "-".into());
    println!(
        "{id:>4}  [{media:<5}] {title:<40}  {year:<4}  {status:<4}  {rating}",
        media = item.media_type,
        title = item.title,
        status = item.status.label(item.media_type),
    );
}

fn print_item_detail(item: &CollectionItem) {
    let id = item.id.map(|id| id.to_string()).unwrap_or_default();
    println!("#{id} {} ({})", item.title, item.media_type);

    let fields: [(&str, Option<String>); 24] = [
        ("Original title", item.original_title.clone()),
        ("Year", item.year.map(|y| y.to_string())),
        ("Status", Some(item.status.label(item.media_type).to_string())),
        ("My rating", item.my_rating.map(|r| format!("{r:.1}"))),
        ("Catalogue rating", item.douban_rating.map(|r| format!("{r:.1}"))),
        ("Director", item.director.clone()),
        ("Cast", item.cast.clone()),
        ("Country", item.country.clone()),
        ("Genres", item.genres.clone()),
        ("Duration", item.duration.clone()),
        ("Author", item.author.clone()),
        ("Translator", item.translator.clone()),
        ("Publisher", item.publisher.clone()),
        ("Published", item.pub_date.clone()),
        ("ISBN", item.isbn.clone()),
        ("Performer", item.performer.clone()),
        ("Genre", item.genre.clone()),
        ("Format", item.media_format.clone()),
        ("Released", item.release_date.clone()),
        ("IMDb", item.imdb_id.clone()),
        ("IMDb rating", item.imdb_rating.map(|r| format!("{r:.1}"))),
        ("Goodreads", item.goodreads_id.clone()),
        ("Source", item.source_url.clone()),
        ("Cover", item.local_cover_path.clone()),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            println!("  {label:<17} {value}");
        }
    }
    if let Some(pages) = item.pages {
        println!("  {:<17} {pages}", "Pages");
    }
    if !item.tags.is_empty() {
        println!("  {:<17} {}", "Tags", item.tags.join(", "));
    }
    if let Some(comment) = item.comment.as_deref() {
        println!("  {:<17} {comment}", "Comment");
    }
    println!(
        "  {:<17} {}",
        "Added",
        item.created_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M")
    );
    if let Some(summary) = item.summary.as_deref() {
        println!("\n{summary}");
    }
}

fn config_key_values(config: &AppConfig) -> Vec<(&'static str, String)> {
    let fetch = &config.fetch;
    vec![
        ("library_path", config.core.library_path.clone()),
        ("database_path", config.database_path().to_string_lossy().to_string()),
        ("covers_dir", config.covers_dir().to_string_lossy().to_string()),
        ("fetch.search_base_url", fetch.search_base_url.clone()),
        ("fetch.search_limit", fetch.search_limit.to_string()),
        ("fetch.cast_limit", fetch.cast_limit.to_string()),
        ("fetch.detail_timeout_secs", fetch.detail_timeout_secs.to_string()),
        ("fetch.cover_timeout_secs", fetch.cover_timeout_secs.to_string()),
        ("fetch.hosts.movie", fetch.hosts.movie.clone()),
        ("fetch.hosts.book", fetch.hosts.book.clone()),
        ("fetch.hosts.music", fetch.hosts.music.clone()),
        ("import.on_duplicate", format!("{:?}", config.import.on_duplicate).to_lowercase()),
    ]
}
