use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use lingo::api::{ApiClient, Backend, ImageUpload};
use lingo::app::{Route, Store};
use lingo::auth::{AuthGate, AuthStatus};
use lingo::config::{ClientConfig, ConfigManager, FeedPreferences};
use lingo::logging::{init_logging, LogConfig};
use lingo::matching::distance_label;
use lingo::notifications::Notifier;
use lingo::reactions::total_count;
use lingo::reply_tree::ReplyNode;
use lingo::server_config::ServerConfigManager;
use lingo::storage::FileStorageAdapter;
use lingo::views::{load_discover, CommunityFeed, FeedTab, PageState, PostsFeed, ProfileEditor};
use lingo::windowing::WindowView;
use lingo::wizard::{OnboardingWizard, StepKind, WizardError, WizardPhase};
use lingo::{log_api_call, log_debug};
use lingo_types::{LanguageSkill, Post, PostCategory, UserQuery};

/// Lingo - language exchange from the terminal
#[derive(Parser)]
#[command(name = "lingo")]
#[command(about = "Command-line client for the Lingo language-exchange platform")]
#[command(version)]
struct Cli {
    /// API base URL (overrides LINGO_API_URL / NEXT_PUBLIC_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store a bearer token copied from the web app
    Login {
        #[arg(long, env = "LINGO_TOKEN")]
        token: String,
    },
    /// Forget the stored token
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Walk through (or resume) onboarding
    Onboarding,
    /// Browse suggested language partners
    Discover {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        language: Option<String>,
    },
    /// Community feed
    Feed {
        /// all, bookmarks, following, or a category
        #[arg(long)]
        tab: Option<String>,
        /// Shortcut for --tab <category>
        #[arg(long)]
        category: Option<String>,
        /// Extra pages to reveal
        #[arg(long, default_value_t = 0)]
        more: usize,
    },
    /// Server-paged posts, optionally with a reply thread
    Posts {
        #[arg(long)]
        category: Option<String>,
        #[arg(long, default_value_t = 1)]
        pages: usize,
        /// Print the reply thread of this post
        #[arg(long)]
        thread: Option<String>,
    },
    /// Toggle a reaction on a post
    React { post_id: String, emoji: String },
    /// Toggle a bookmark on a post
    Bookmark { post_id: String },
    /// Replace your bio
    Bio { text: String },
    /// Upload a new profile photo
    Avatar { path: PathBuf },
    /// Show or save the API URL in use
    Server {
        #[arg(long)]
        save: bool,
    },
}

// Load environment variables from .env so NEXT_PUBLIC_API_URL from the web
// project is picked up
fn load_env() {
    let _ = dotenv::dotenv();
}

struct Session {
    client: ApiClient,
    store: Store,
    config: ClientConfig,
    log_config: LogConfig,
}

impl Session {
    fn backend(&self) -> Arc<dyn Backend> {
        Arc::new(self.client.clone())
    }

    fn notifier(&self) -> Notifier {
        Notifier::new(self.config.notification_ttl)
    }

    fn viewer_id(&self) -> Option<String> {
        self.store.current_user().map(|u| u.id.clone())
    }
}

async fn sign_in(api_url: &str, storage: &FileStorageAdapter, log_config: LogConfig) -> Result<Session> {
    let config = ClientConfig::default();
    let mut client = ApiClient::with_timeout(api_url, config.request_timeout);
    let mut store = Store::new().with_log_config(log_config.clone());

    let status = AuthGate::new(storage).resolve(&mut client).await?;
    store.apply_auth(status);
    if !store.is_authenticated() {
        bail!("Not signed in. Run `lingo login --token <token>` with the token from the web app.");
    }
    log_api_call!(log_config, "signed in against {}", api_url);

    Ok(Session {
        client,
        store,
        config,
        log_config,
    })
}

fn prompt(label: &str, current: &str) -> Result<String> {
    if current.is_empty() {
        print!("{}: ", label);
    } else {
        print!("{} [{}]: ", label, current);
    }
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let line = line.trim();
    Ok(if line.is_empty() {
        current.to_string()
    } else {
        line.to_string()
    })
}

fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn join_languages(skills: &[LanguageSkill]) -> String {
    skills
        .iter()
        .map(|s| s.language.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn parse_tab(value: &str) -> Result<FeedTab> {
    FeedTab::parse(value).with_context(|| format!("Unknown feed tab: {}", value))
}

fn parse_category(value: &str) -> Result<PostCategory> {
    PostCategory::parse(value).with_context(|| format!("Unknown category: {}", value))
}

/// Fills the draft for the current step from stdin. Returns `false` when the
/// user typed `<` to go back.
fn edit_step(wizard: &mut OnboardingWizard, kind: StepKind) -> Result<bool> {
    let draft = wizard.draft().clone();
    let mut next = draft.clone();
    let input = match kind {
        StepKind::Name => prompt("Name", &draft.name)?,
        StepKind::Location => {
            let city = prompt("City", &draft.city)?;
            if city == "<" {
                return Ok(false);
            }
            next.city = city;
            prompt("Country", &draft.country)?
        }
        StepKind::Languages => {
            let native = prompt("Languages you speak (comma separated)", &join_languages(&draft.native_languages))?;
            if native == "<" {
                return Ok(false);
            }
            next.native_languages = split_list(&native).into_iter().map(LanguageSkill::new).collect();
            prompt("Languages you are learning", &join_languages(&draft.target_languages))?
        }
        StepKind::Profile => prompt("Bio", &draft.bio)?,
        StepKind::Preferences => prompt("Interests (comma separated)", &draft.interests.join(", "))?,
        StepKind::Photo => prompt("Photo path (empty to skip)", "")?,
    };
    if input == "<" {
        return Ok(false);
    }

    match kind {
        StepKind::Name => next.name = input,
        StepKind::Location => next.country = input,
        StepKind::Languages => {
            next.target_languages = split_list(&input).into_iter().map(LanguageSkill::new).collect()
        }
        StepKind::Profile => next.bio = input,
        StepKind::Preferences => next.interests = split_list(&input),
        StepKind::Photo => {
            next.photo = if input.is_empty() {
                None
            } else {
                let bytes = std::fs::read(&input).with_context(|| format!("Failed to read {}", input))?;
                Some(ImageUpload::new(input.clone(), bytes))
            };
        }
    }
    *wizard.draft_mut() = next;
    Ok(true)
}

async fn run_onboarding(session: &mut Session) -> Result<()> {
    let mut wizard = OnboardingWizard::new(session.backend()).with_log_config(session.log_config.clone());
    wizard.mount().await?;

    println!("Type < to go back.");
    loop {
        let (index, kind, title) = match (wizard.phase(), wizard.current_step()) {
            (WizardPhase::Active(index), Some(step)) => (index, step.kind(), step.title()),
            (WizardPhase::Completed, _) => {
                println!("Onboarding complete.");
                break;
            }
            _ => bail!("Onboarding did not start"),
        };
        let (number, total) = wizard.progress();
        println!("\nStep {}/{}: {}", number, total, title);

        if !edit_step(&mut wizard, kind)? {
            if index == 0 {
                println!("Already at the first step.");
            }
            wizard.back();
            continue;
        }

        match wizard.next().await {
            Ok(_) => {}
            Err(WizardError::Validation(invalid)) => println!("{}", invalid),
            Err(e) if e.is_retryable() => println!("{} Press enter to try again.", e),
            Err(e) => return Err(e.into()),
        }
    }

    if let Some(user) = wizard.user() {
        session
            .store
            .dispatch(lingo::app::Action::UserRefreshed(user.clone()));
    }
    Ok(())
}

fn print_post(post: &Post) {
    let reactions: Vec<String> = post
        .reactions
        .iter()
        .map(|r| format!("{}{}{}", r.emoji, r.count, if r.has_reacted { "*" } else { "" }))
        .collect();
    println!(
        "[{}] {} ({}){}",
        post.id,
        post.author.name,
        post.category.as_str(),
        if post.is_bookmarked { " (saved)" } else { "" }
    );
    println!("  {}", post.content);
    if !reactions.is_empty() {
        println!("  {}  ({} total)", reactions.join(" "), total_count(&post.reactions));
    }
}

fn print_thread(nodes: &[ReplyNode]) {
    let mut stack: Vec<(&ReplyNode, usize)> = nodes.iter().rev().map(|n| (n, 0)).collect();
    while let Some((node, depth)) = stack.pop() {
        println!("{}- {}: {}", "  ".repeat(depth), node.reply.author.name, node.reply.content);
        stack.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    let cli = Cli::parse();

    let config_manager = ConfigManager::new()?;
    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::from_env()
    }
    .in_dir(config_manager.config_dir());
    init_logging(&log_config)?;

    let server_config = ServerConfigManager::new(config_manager.clone());
    let api_url = server_config.determine_api_url(cli.api_url.clone())?;
    log_debug!(log_config, "Using API {}", api_url);

    let storage = FileStorageAdapter::new()?;

    match cli.command {
        Command::Server { save } => {
            println!("{} ({})", api_url, server_config.describe(&api_url));
            if save {
                server_config.save_api_url(api_url)?;
                println!("Saved.");
            }
        }
        Command::Login { token } => {
            let mut client = ApiClient::new(&api_url);
            let gate = AuthGate::new(&storage);
            gate.sign_in(&mut client, &token)?;
            match gate.resolve(&mut client).await? {
                AuthStatus::Authenticated(user) => println!("Signed in as {}", user.name),
                AuthStatus::AuthRequired => bail!("The server rejected that token"),
            }
        }
        Command::Logout => {
            let mut client = ApiClient::new(&api_url);
            AuthGate::new(&storage).sign_out(&mut client);
            println!("Signed out.");
        }
        Command::Whoami => {
            let session = sign_in(&api_url, &storage, log_config).await?;
            if let Some(user) = session.store.current_user() {
                println!("{} <{}>", user.name, user.email.as_deref().unwrap_or("-"));
                if let Some(location) = user.location_label() {
                    println!("{}", location);
                }
                println!("Speaks: {}", join_languages(&user.native_languages));
                println!("Learning: {}", join_languages(&user.target_languages));
            }
            if session.store.route() == Route::Onboarding {
                println!("Onboarding is not finished; run `lingo onboarding`.");
            }
        }
        Command::Onboarding => {
            let mut session = sign_in(&api_url, &storage, log_config).await?;
            run_onboarding(&mut session).await?;
        }
        Command::Discover { search, language } => {
            let session = sign_in(&api_url, &storage, log_config).await?;
            let query = UserQuery {
                search,
                target_language: language,
                limit: Some(session.config.page_size as u32),
                ..Default::default()
            };
            match load_discover(&session.client, &query).await {
                PageState::Ready(page) if page.matches.is_empty() => {
                    println!("No partners match your filters yet.")
                }
                PageState::Ready(page) => {
                    for card in &page.matches {
                        let user = &card.user;
                        println!(
                            "{:>4} {} {}{}{}",
                            user.match_percentage
                                .map(|p| format!("{:.0}%", p))
                                .unwrap_or_else(|| "-".to_string()),
                            user.name,
                            user.location_label().unwrap_or_default(),
                            distance_label(user.distance)
                                .map(|d| format!(" ({})", d))
                                .unwrap_or_default(),
                            if card.request_pending { " [request sent]" } else { "" }
                        );
                    }
                }
                PageState::AuthRequired => bail!("Session expired; please log in again"),
                PageState::Failed(message) => bail!(message),
                PageState::Loading => {}
            }
        }
        Command::Feed { tab, category, more } => {
            let session = sign_in(&api_url, &storage, log_config.clone()).await?;
            let user_id = session.viewer_id().unwrap_or_default();
            let prefs = config_manager.load_preferences(&user_id)?.unwrap_or_default();
            let config = ClientConfig {
                page_size: prefs.page_size,
                ..session.config.clone()
            };

            let tab = match (category, tab) {
                (Some(category), _) => FeedTab::Category(parse_category(&category)?),
                (None, Some(tab)) => parse_tab(&tab)?,
                (None, None) => FeedTab::parse(&prefs.last_tab).unwrap_or(FeedTab::All),
            };

            let mut feed = CommunityFeed::new(session.backend(), session.viewer_id(), &config)
                .with_log_config(log_config);
            if let PageState::Failed(message) = feed.load().await {
                bail!(message.clone());
            }
            feed.set_tab(tab);
            for _ in 0..more {
                if !feed.load_more().await {
                    break;
                }
            }

            match feed.view() {
                WindowView::Empty => println!("Nothing here yet."),
                WindowView::Items { items, show_load_more } => {
                    items.iter().for_each(print_post);
                    if show_load_more {
                        println!("\n{} of {} shown; use --more to see more", items.len(), feed.list().len());
                    }
                }
            }

            config_manager.save_preferences(
                &user_id,
                &FeedPreferences {
                    last_tab: tab.key().to_string(),
                    page_size: prefs.page_size,
                },
            )?;
        }
        Command::Posts { category, pages, thread } => {
            let session = sign_in(&api_url, &storage, log_config.clone()).await?;
            let mut feed = PostsFeed::new(session.backend(), session.config.page_size, session.notifier())
                .with_log_config(log_config);
            feed.set_category(category.as_deref().map(parse_category).transpose()?);
            for _ in 0..pages.max(1) {
                if !feed.load_next().await {
                    break;
                }
            }
            if let Some(notification) = feed.notifier().latest() {
                bail!(notification.message.clone());
            }
            match feed.view() {
                WindowView::Empty => println!("No posts yet."),
                WindowView::Items { items, .. } => items.iter().for_each(print_post),
            }
            if let Some(post_id) = thread {
                match feed.thread(&post_id) {
                    Some(nodes) => print_thread(&nodes),
                    None => println!("Post {} is not in the loaded pages", post_id),
                }
            }
        }
        Command::React { post_id, emoji } => {
            let session = sign_in(&api_url, &storage, log_config).await?;
            let mut feed = CommunityFeed::new(session.backend(), session.viewer_id(), &session.config);
            feed.load().await;
            let outcome = feed.toggle_reaction(&post_id, &emoji).await?;
            if let Some(error) = outcome.error() {
                bail!(error.user_message());
            }
            if let Some(post) = feed.post(&post_id) {
                print_post(post);
            }
        }
        Command::Bookmark { post_id } => {
            let session = sign_in(&api_url, &storage, log_config).await?;
            let mut feed = CommunityFeed::new(session.backend(), session.viewer_id(), &session.config);
            feed.load().await;
            let outcome = feed.toggle_bookmark(&post_id).await?;
            if let Some(error) = outcome.error() {
                bail!(error.user_message());
            }
            if let Some(post) = feed.post(&post_id) {
                println!("{}", if post.is_bookmarked { "Saved." } else { "Removed from saved." });
            }
        }
        Command::Bio { text } => {
            let mut session = sign_in(&api_url, &storage, log_config).await?;
            let user = session.store.current_user().cloned().context("No signed-in user")?;
            let mut editor = ProfileEditor::new(session.backend(), user, session.notifier());
            let outcome = editor.update_bio(&text).await;
            if let Some(error) = outcome.error() {
                bail!(error.user_message());
            }
            session
                .store
                .dispatch(lingo::app::Action::UserRefreshed(editor.user()));
            println!("Bio updated.");
        }
        Command::Avatar { path } => {
            let mut session = sign_in(&api_url, &storage, log_config).await?;
            let user = session.store.current_user().cloned().context("No signed-in user")?;
            let bytes = std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "avatar.jpg".to_string());
            let mut editor = ProfileEditor::new(session.backend(), user, session.notifier());
            let preview = format!("file://{}", path.display());
            let outcome = editor
                .upload_image(ImageUpload::new(filename, bytes), Some(preview))
                .await;
            if let Some(error) = outcome.error() {
                bail!(error.user_message());
            }
            session
                .store
                .dispatch(lingo::app::Action::ProfileImageChanged(editor.user().profile_image));
            println!("Profile photo: {}", editor.profile_image().unwrap_or("-"));
        }
    }

    Ok(())
}
