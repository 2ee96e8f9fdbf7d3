use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    load_settings, load_settings_from, DetailController, DetailState, HttpGateway, ListOptions,
    ListState, UserGateway, UserListController,
};
use shared::{
    format::{format_count, format_optional_count},
    protocol::{RepositorySummary, UserProfile, UserSummary},
};
use tokio::runtime::Handle;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "github-users", about = "Browse and search GitHub users")]
struct Args {
    /// Config file; defaults to ./github_users.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// API token, overriding the config file and GITHUB_TOKEN.
    #[arg(long)]
    token: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List users in id order, one page per round.
    Browse {
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Search users by login or name.
    Search { query: String },
    /// Show a user's profile and repositories.
    Show { login: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let args = Args::parse();

    let mut settings = match &args.config {
        Some(path) => load_settings_from(path, |key| std::env::var(key).ok())
            .with_context(|| format!("loading {}", path.display()))?,
        None => load_settings().context("loading settings")?,
    };
    if let Some(token) = args.token.filter(|token| !token.trim().is_empty()) {
        settings.token = Some(token);
    }
    info!(
        api = %settings.api_base_url,
        authenticated = settings.token.is_some(),
        "settings loaded"
    );

    let gateway: Arc<dyn UserGateway> =
        Arc::new(HttpGateway::new(&settings).context("building HTTP gateway")?);

    match args.command {
        Command::Browse { pages } => {
            let list =
                UserListController::new(gateway, Handle::current(), ListOptions::from(&settings));
            browse(&list, pages).await
        }
        Command::Search { query } => {
            let list =
                UserListController::new(gateway, Handle::current(), ListOptions::from(&settings));
            search(&list, &query).await
        }
        Command::Show { login } => {
            let detail =
                DetailController::new(gateway, Handle::current(), settings.repo_query());
            show(&detail, &login).await
        }
    }
}

async fn browse(list: &Arc<UserListController>, pages: u32) -> Result<()> {
    let mut rx = list.subscribe();
    let mut printed = 0;

    for _ in 0..pages {
        if !list.can_load_more() {
            break;
        }
        rx.borrow_and_update();
        list.load_more();
        rx.changed().await.context("list controller stopped")?;

        let state = rx.borrow_and_update().clone();
        let items = settled_items(state)?;
        for user in &items[printed..] {
            print_user_row(user);
        }
        printed = items.len();
    }

    if !list.can_load_more() {
        println!("-- end of list ({printed} users) --");
    }
    Ok(())
}

async fn search(list: &Arc<UserListController>, query: &str) -> Result<()> {
    if query.trim().is_empty() {
        bail!("search query must not be blank");
    }

    let mut rx = list.subscribe();
    list.set_query(query);
    let state = rx
        .wait_for(|state| !state.is_loading())
        .await
        .context("list controller stopped")?
        .clone();

    let items = settled_items(state)?;
    if items.is_empty() {
        println!("no users match '{query}'");
    }
    for user in &items {
        print_user_row(user);
    }
    Ok(())
}

async fn show(detail: &Arc<DetailController>, login: &str) -> Result<()> {
    let mut rx = detail.subscribe();
    detail.load(login);
    let state = rx
        .wait_for(|state| !state.is_loading())
        .await
        .context("detail controller stopped")?
        .clone();

    match state {
        DetailState::Ready { profile, repos } => {
            print_profile(&profile);
            println!();
            if repos.is_empty() {
                println!("no public repositories");
            }
            for repo in &repos {
                print_repo_row(repo);
            }
            Ok(())
        }
        DetailState::Failed(reason) => bail!("could not load {login}: {reason}"),
        DetailState::Loading => bail!("detail load did not settle"),
    }
}

fn settled_items(state: ListState) -> Result<Vec<UserSummary>> {
    match state {
        ListState::Ready(items) => Ok(items),
        ListState::Failed(reason) => bail!("{reason}"),
        ListState::Loading => bail!("list did not settle"),
    }
}

fn print_user_row(user: &UserSummary) {
    let badge = if user.site_admin { " [staff]" } else { "" };
    println!("{:>10}  {}{badge}  {}", user.id, user.login, user.html_url);
}

fn print_profile(profile: &UserProfile) {
    println!("{} ({})", profile.display_name(), profile.login());
    for (label, value) in [
        ("bio", &profile.bio),
        ("company", &profile.company),
        ("location", &profile.location),
        ("blog", &profile.blog),
    ] {
        if let Some(value) = value.as_deref().filter(|value| !value.trim().is_empty()) {
            println!("  {label}: {value}");
        }
    }
    println!(
        "  repos {}  followers {}  following {}",
        format_optional_count(profile.public_repos),
        format_optional_count(profile.followers),
        format_optional_count(profile.following),
    );
}

fn print_repo_row(repo: &RepositorySummary) {
    let language = repo.language.as_deref().unwrap_or("-");
    println!(
        "  {:<40} {:>6} stars  {:>6} forks  {language}",
        repo.full_name,
        format_count(u64::from(repo.stargazers_count)),
        format_count(u64::from(repo.forks_count)),
    );
    if let Some(description) = repo.description.as_deref() {
        println!("      {description}");
    }
}
