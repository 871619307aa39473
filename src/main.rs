use clap::{Args, Parser, Subcommand};
use policyfinder::config::load_config_file;
use policyfinder::prelude::*;
use policyfinder::{IconKey, IncomeRange, PolicyCard};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_FILE: &str = "policyfinder.yml";

/// Find government policies that fit your profile
#[derive(Parser, Debug)]
#[command(name = "policyfinder")]
#[command(about = "Browse, search and rank government policy records")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load all policies and show the filtered, sorted list
    Browse {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Ask the store for policies matching your profile, then filter locally
    Match {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        view: ViewArgs,

        /// Your profession (student, farmer, salaried, self-employed, business-owner, unemployed, retired)
        #[arg(long)]
        profession: Option<String>,

        /// Your age
        #[arg(long)]
        age: Option<u32>,

        /// Yearly income band (under_25k, 25k_50k, 50k_100k, over_100k)
        #[arg(long)]
        income: Option<String>,

        /// Where you live
        #[arg(long)]
        location: Option<String>,
    },

    /// List the category filters
    Categories,
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Read policies from a JSON file (or POLICYFINDER_DATA)
    #[arg(long, conflicts_with = "url")]
    data: Option<PathBuf>,

    /// Base URL of the hosted policy table (or POLICYFINDER_URL)
    #[arg(long)]
    url: Option<String>,

    /// API key for the hosted table (or POLICYFINDER_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// YAML config file (default: ./policyfinder.yml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Records per page (default: 6)
    #[arg(long)]
    page_size: Option<usize>,

    /// Settling delay before "load more" commits, in milliseconds (default: 500)
    #[arg(long)]
    settle_ms: Option<u64>,
}

#[derive(Args, Debug)]
struct ViewArgs {
    /// Category filter: All, Financial, Social, Legal
    #[arg(long, default_value = "All")]
    category: String,

    /// Search text matched against name, description and tags
    #[arg(short, long, default_value = "")]
    query: String,

    /// Sort order
    #[arg(long, default_value = "relevance", value_parser = ["relevance", "latest", "popular"])]
    sort: String,

    /// Interest terms used by the relevance sort (repeatable)
    #[arg(long = "interest")]
    interests: Vec<String>,

    /// Number of pages to reveal
    #[arg(long, default_value_t = 1)]
    pages: usize,

    /// Mark policies as saved (repeatable)
    #[arg(long = "save")]
    saves: Vec<u64>,

    /// Show full details for one policy
    #[arg(long)]
    detail: Option<u64>,

    /// Print the view as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn print_available_commands() {
    println!("Available commands:");
    println!("  browse       Load all policies and show the filtered, sorted list");
    println!("  match        Query policies matching your profile, then filter locally");
    println!("  categories   List the category filters");
}

fn build_config(args: &SourceArgs) -> anyhow::Result<Config> {
    let mut builder = ConfigBuilder::new();

    if let Some(data) = &args.data {
        builder = builder.data_file(data);
    }
    if let Some(url) = &args.url {
        builder = builder.url(url)?;
    }
    if let Some(key) = &args.api_key {
        builder = builder.api_key(key);
    }
    if let Some(size) = args.page_size {
        builder = builder.page_size(size);
    }
    if let Some(ms) = args.settle_ms {
        builder = builder.settle_delay(Duration::from_millis(ms));
    }

    builder = builder.fill_from_env()?;

    let config_path = args
        .config
        .clone()
        .or_else(|| Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.is_file()));
    if let Some(path) = config_path {
        tracing::debug!(path = %path.display(), "reading config file");
        builder = builder.fill_from_file(load_config_file(&path)?)?;
    }

    Ok(builder.build()?)
}

fn open_store(config: &Config) -> anyhow::Result<Arc<dyn PolicyStore>> {
    let store: Arc<dyn PolicyStore> = match &config.source {
        PolicySource::File(path) => Arc::new(FilePolicyStore::new(path)),
        PolicySource::Http(store) => Arc::new(HttpPolicyStore::new(store)?),
    };
    Ok(store)
}

fn apply_view_args(controller: &BrowserController, view: &ViewArgs) {
    controller.set_category(CategoryFilter::from(view.category.as_str()));
    controller.set_search_query(view.query.clone());
    controller.set_sort_mode(SortMode::from(view.sort.as_str()));
    for interest in &view.interests {
        controller.toggle_interest(interest.clone());
    }
    for id in &view.saves {
        controller.toggle_saved(PolicyId(*id));
    }
    if let Some(id) = view.detail {
        controller.open_detail(PolicyId(id));
    }
}

async fn reveal_pages(controller: &BrowserController, pages: usize) -> BrowseView {
    let mut stream = controller.pages().take(pages.max(1));
    let mut last = controller.view();
    while let Some(view) = stream.next().await {
        last = view;
    }
    last
}

fn render_card(card: &PolicyCard) {
    let record = &card.record;
    let marker = if card.saved { "★" } else { " " };
    println!(
        "{} {} [{}] {} ({})",
        marker,
        IconKey::from(record.icon.as_str()).glyph(),
        record.id,
        record.name,
        record.category.label()
    );
    if !record.tags.is_empty() {
        println!("      tags: {}", record.tags.join(", "));
    }
}

fn render_detail(card: &PolicyCard) {
    let record = &card.record;
    println!();
    println!("{} {}", IconKey::from(record.icon.as_str()).glyph(), record.name);
    println!("  Category:    {}", record.category.label());
    println!("  Description: {}", record.description);
    println!("  Eligibility: {}", record.eligibility);
    if !record.tags.is_empty() {
        println!("  Tags:        {}", record.tags.join(", "));
    }
    println!("  Saved:       {}", if card.saved { "yes" } else { "no" });
}

fn render(view: &BrowseView, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(view)?);
        return Ok(());
    }

    println!(
        "Showing {} of {} policies (category: {}, sort: {:?})",
        view.visible_policies.len(),
        view.total_filtered_count,
        view.category,
        view.sort_mode
    );
    for card in &view.visible_policies {
        render_card(card);
    }
    if view.has_more {
        println!("… more available, pass --pages {}", view.page_count + 1);
    }
    if let Some(err) = &view.error {
        match err.kind {
            ErrorKind::EmptyResult => eprintln!("{} (try --category All and no --query)", err.message),
            ErrorKind::FetchFailure => eprintln!("Error: {} (run the command again to retry)", err.message),
            ErrorKind::RefinementFailure => {
                eprintln!("Profile search failed, showing earlier results: {}", err.message)
            }
        }
    }
    if let Some(card) = &view.detail {
        render_detail(card);
    }
    Ok(())
}

fn fail_if_unloaded(view: &BrowseView) -> anyhow::Result<()> {
    if let Some(err) = &view.error {
        if err.kind == ErrorKind::FetchFailure && view.visible_policies.is_empty() {
            anyhow::bail!("could not load policies: {}", err.message);
        }
    }
    Ok(())
}

async fn run_browse_command(source: SourceArgs, view: ViewArgs) -> anyhow::Result<()> {
    let config = build_config(&source)?;
    let controller = BrowserController::new(open_store(&config)?, config.browse);

    controller.load().await;
    apply_view_args(&controller, &view);

    let final_view = reveal_pages(&controller, view.pages).await;
    render(&final_view, view.json)?;
    fail_if_unloaded(&final_view)
}

struct ProfileArgs {
    profession: Option<String>,
    age: Option<u32>,
    income: Option<String>,
    location: Option<String>,
}

async fn run_match_command(
    source: SourceArgs,
    view: ViewArgs,
    profile: ProfileArgs,
) -> anyhow::Result<()> {
    let config = build_config(&source)?;
    let controller = BrowserController::new(open_store(&config)?, config.browse);

    let profession = profile
        .profession
        .as_deref()
        .map(str::parse::<Profession>)
        .transpose()?;
    let income = profile
        .income
        .as_deref()
        .map(str::parse::<IncomeRange>)
        .transpose()?;

    controller.set_profession(profession);
    controller.set_age(profile.age);
    controller.set_income_range(income);
    controller.set_location(profile.location);

    controller.submit_profile_search().await;
    apply_view_args(&controller, &view);

    let final_view = reveal_pages(&controller, view.pages).await;
    render(&final_view, view.json)?;
    fail_if_unloaded(&final_view)
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Some(Command::Browse { source, view }) => run_browse_command(source, view).await,
        Some(Command::Match {
            source,
            view,
            profession,
            age,
            income,
            location,
        }) => {
            let profile = ProfileArgs {
                profession,
                age,
                income,
                location,
            };
            run_match_command(source, view, profile).await
        }
        Some(Command::Categories) => {
            for category in CategoryFilter::choices() {
                println!("{}", category.label());
            }
            Ok(())
        }
        None => {
            print_available_commands();
            Ok(())
        }
    }
}

