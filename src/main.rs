use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use forum_census::avatar::AvatarCache;
use forum_census::client::ForumClient;
use forum_census::config::Config;
use forum_census::cookie::{load_cookie, save_cookie};
use forum_census::crawl::{CrawlEvent, PostScope};
use forum_census::model::{Post, User};
use forum_census::session::{Crawler, Session};
use forum_census::view::{project, project_posts, SortKey};

/// Collect a forum's members and discussions into sortable views.
#[derive(Debug, Parser)]
#[command(name = "forum-census", version)]
struct Cli {
    /// Case-insensitive username filter applied to the member view.
    #[arg(long, default_value = "")]
    search: String,

    /// Column to order members by.
    #[arg(long, value_enum, default_value = "registered")]
    sort: SortColumn,

    /// Sort descending instead of ascending.
    #[arg(long)]
    descending: bool,

    /// Only crawl discussions started by this author id.
    #[arg(long)]
    author: Option<String>,

    /// List collected discussions instead of members.
    #[arg(long)]
    posts: bool,

    /// Print the projected view as JSON instead of a table.
    #[arg(long)]
    json: bool,

    /// Store a session cookie for future runs, then exit.
    #[arg(long, value_name = "COOKIE")]
    save_cookie: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SortColumn {
    Registered,
    Posts,
}

impl From<SortColumn> for SortKey {
    fn from(column: SortColumn) -> Self {
        match column {
            SortColumn::Registered => SortKey::RegisteredAt,
            SortColumn::Posts => SortKey::PostCount,
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    let cli = Cli::parse();

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    if let Some(value) = cli.save_cookie {
        save_cookie(&config.cookie_file, &value).await?;
        info!(path = %config.cookie_file.display(), "Session cookie saved");
        return Ok(());
    }

    info!(base_url = %config.base_url, "Starting forum census");

    tokio::fs::create_dir_all(&config.avatar_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create avatar directory: {}",
                config.avatar_dir.display()
            )
        })?;

    let cookie = load_cookie(&config.cookie_file).await;
    if cookie.is_none() {
        warn!("No session cookie saved - crawling anonymously");
    }

    let client = ForumClient::new(&config, cookie)?;
    let avatars = AvatarCache::new(&config)?;
    let crawler = Crawler::new(Arc::new(client), Arc::new(avatars), config.page_delay);
    let mut session = Session::new(crawler);

    let scope = cli.author.map_or(PostScope::All, PostScope::ByAuthor);
    session.start_crawl(scope);

    loop {
        tokio::select! {
            event = session.next_event() => match event {
                Some(event) => log_event(event),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received - finishing with partial results");
                session.cancel_active();
            }
        }
    }

    session.complete().await;
    let census = session.census();
    info!(
        users = census.users.len(),
        posts = census.posts.len(),
        "Crawl complete"
    );

    if cli.posts {
        let view = project_posts(&census.posts, !cli.descending);
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&view)?);
        } else {
            print_posts(&view);
        }
    } else {
        let view = project(&census.users, &cli.search, cli.sort.into(), !cli.descending);
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&view)?);
        } else {
            print_users(&view);
        }
    }

    Ok(())
}

fn log_event(event: CrawlEvent) {
    match event {
        CrawlEvent::Users(p) => {
            debug!(collected = p.collected, total = ?p.total, "member crawl progress");
        }
        CrawlEvent::Posts(p) => {
            debug!(collected = p.collected, total = ?p.total, "discussion crawl progress");
        }
        CrawlEvent::UsersDone { collected } => info!(collected, "member crawl finished"),
        CrawlEvent::PostsDone { collected } => info!(collected, "discussion crawl finished"),
    }
}

fn print_users(view: &[&User]) {
    println!(
        "{:<6} {:<24} {:<12} {:>6} {:>9}",
        "ID", "USERNAME", "REGISTERED", "POSTS", "REPORTED"
    );
    for user in view {
        println!(
            "{:<6} {:<24} {:<12} {:>6} {:>9}",
            user.id,
            user.name,
            user.registered_at.to_string(),
            user.post_count,
            user.reported_post_count
        );
    }
    println!("{} members", view.len());
}

fn print_posts(view: &[&Post]) {
    println!("{:<8} {:<48} {:<12} {:>8}", "ID", "TITLE", "CREATED", "COMMENTS");
    for post in view {
        let created = post
            .created_at
            .map_or_else(|| "unknown".to_string(), |d| d.to_string());
        println!(
            "{:<8} {:<48} {:<12} {:>8}",
            post.id, post.title, created, post.comment_count
        );
    }
    println!("{} discussions", view.len());
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,forum_census=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}
