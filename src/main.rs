//! Solace CLI
//!
//! Terminal front end for the Solace client:
//! - Chat with a partner (polling thread)
//! - Ask the assistant
//! - Browse matches, favorites and the journal

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

use solace::assistant::{AskOutcome, Origin};
use solace::config::generate_default_config;
use solace::dashboard::Dashboard;
use solace::directory::{format_match, Directory};
use solace::journal::Journal;
use solace::model::Credentials;
use solace::questionnaire::{Questionnaire, Step};
use solace::{
    inbox, logging, ApiClient, AssistantWidget, Config, ConversationView, LocalCache,
    Notifications, ParticipantRef, PartnerKind, SendOutcome, SessionStore, CANNED_QUESTIONS,
};

#[derive(Parser)]
#[command(name = "solace")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Terminal client for the Solace therapy-matching service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: standard locations + environment)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend base URL (overrides config)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Account kind to sign in as (user, therapist)
    #[arg(long, default_value = "user", global = true)]
    pub role: PartnerKind,

    /// Sign-in email
    #[arg(long, env = "SOLACE_EMAIL", global = true)]
    pub email: Option<String>,

    /// Sign-in password
    #[arg(long, env = "SOLACE_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open a conversation; type lines to send, Ctrl-D to leave
    Chat {
        /// Partner id
        partner: String,
        /// Partner kind (user, therapist)
        #[arg(short = 'k', long, default_value = "therapist")]
        partner_kind: PartnerKind,
    },

    /// Send a single message
    Send {
        partner: String,
        message: String,
        #[arg(short = 'k', long, default_value = "therapist")]
        partner_kind: PartnerKind,
    },

    /// List conversation partners
    Inbox,

    /// Ask the assistant a question
    Ask {
        /// Free-text question
        question: Option<String>,
        /// Ask a canned question by number instead (see --list)
        #[arg(long)]
        canned: Option<usize>,
        /// Show canned questions
        #[arg(long)]
        list: bool,
    },

    /// Show ranked therapist matches
    Matches,

    /// Toggle a favorite therapist
    Favorite { therapist: String },

    /// Show today's advice and article
    Dashboard,

    /// Answer the onboarding questionnaire
    Onboard,

    /// List or add journal entries
    Journal {
        #[arg(long, requires = "content")]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
    },

    /// Generate default config file
    Config {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

struct App {
    config: Config,
    api: ApiClient,
    session: SessionStore,
}

impl App {
    fn new(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Config::load_with_env(path)?,
            None => Config::load_default(),
        };
        if let Some(url) = &cli.api_url {
            config.api.base_url = url.clone();
        }

        let api = ApiClient::connect(&config.api.transport()).context("building HTTP client")?;
        Ok(Self {
            config,
            api,
            session: SessionStore::new(),
        })
    }

    /// Resolve the current identity, signing in when credentials are given
    async fn identity(&self, cli: &Cli) -> Result<ParticipantRef> {
        match self.try_identity(cli).await? {
            Some(me) => Ok(me),
            None => {
                bail!("not signed in: pass --email/--password or set SOLACE_EMAIL/SOLACE_PASSWORD")
            }
        }
    }

    /// Like `identity`, but signed out is a valid answer
    async fn try_identity(&self, cli: &Cli) -> Result<Option<ParticipantRef>> {
        self.session.bootstrap(&self.api).await;
        if let Some(me) = self.session.current_participant().await {
            return Ok(Some(me));
        }

        let (Some(email), Some(password)) = (&cli.email, &cli.password) else {
            return Ok(None);
        };
        let credentials = Credentials {
            email: email.clone(),
            password: password.clone(),
        };
        match self.session.sign_in(&self.api, cli.role, &credentials).await? {
            Some(identity) => Ok(Some(identity.participant())),
            None => bail!("sign-in rejected"),
        }
    }

    fn cache(&self) -> LocalCache {
        LocalCache::open(&self.config.cache.dir)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        let content = generate_default_config();
        match output {
            Some(path) => {
                std::fs::write(path, content)?;
                println!("Wrote {}", path.display());
            }
            None => print!("{}", content),
        }
        return Ok(());
    }

    let app = App::new(&cli)?;
    logging::init(&app.config.logging);
    tracing::debug!(base_url = %app.config.api.base_url, "Solace CLI starting");

    match &cli.command {
        Commands::Chat {
            partner,
            partner_kind,
        } => {
            let me = app.identity(&cli).await?;
            chat(&app, me, ParticipantRef::new(partner.clone(), *partner_kind)).await?;
        }

        Commands::Send {
            partner,
            message,
            partner_kind,
        } => {
            let me = app.identity(&cli).await?;
            let mut view =
                ConversationView::new(app.api.clone(), me, app.config.messaging.poll_interval());
            view.open(ParticipantRef::new(partner.clone(), *partner_kind))
                .await;
            let outcome = view.send_text(message.clone()).await;
            view.close().await;
            match outcome {
                SendOutcome::Sent(m) => println!("Sent ({})", m.id),
                SendOutcome::Skipped => bail!("message is empty"),
                SendOutcome::Failed(e) => bail!("send failed: {}", e),
            }
        }

        Commands::Inbox => {
            let me = app.identity(&cli).await?;
            let (partners, error) = inbox::load_partners(&app.api, &me).await;
            if let Some(e) = error {
                eprintln!("Could not load inbox: {}", e);
            }
            for partner in partners {
                println!("{:<10} {}", partner.kind, partner.id);
            }
        }

        Commands::Ask {
            question,
            canned,
            list,
        } => {
            if *list {
                for (i, q) in CANNED_QUESTIONS.iter().enumerate() {
                    println!("{:>2}. {}", i, q);
                }
                return Ok(());
            }
            ask(&app, &cli, question.as_deref(), *canned).await?;
        }

        Commands::Matches => {
            let me = app.identity(&cli).await?;
            let mut directory = Directory::new(app.api.clone(), app.cache());
            directory.refresh_matches(&me.id).await;
            if let Some(e) = directory.last_error() {
                bail!("could not load matches: {}", e);
            }
            println!("{:<6} {:<24} {}", "MATCH", "THERAPIST", "ID");
            for m in directory.matches() {
                let star = if directory.is_favorite(&m.therapist.id) { "*" } else { "" };
                println!(
                    "{:<6} {:<24} {}{}",
                    format_match(m.match_percentage),
                    m.therapist.name,
                    m.therapist.id,
                    star
                );
            }
        }

        Commands::Favorite { therapist } => {
            let mut directory = Directory::new(app.api.clone(), app.cache());
            let now = directory.toggle_favorite(therapist)?;
            println!(
                "{} {} favorites",
                if now { "Added to" } else { "Removed from" },
                therapist
            );
        }

        Commands::Dashboard => {
            let me = app.identity(&cli).await?;
            let mut dashboard = Dashboard::new(app.api.clone(), app.cache());
            match dashboard.advice(&me.id).await {
                Some(advice) => println!("Advice: {}", advice.advice),
                None => println!("Advice: (unavailable)"),
            }
            let today = chrono::Local::now().date_naive();
            if let Some(article) = dashboard.daily_article(today).await {
                println!("Article: {}", article.title);
                if let Some(summary) = article.summary {
                    println!("  {}", summary);
                }
                if let Some(url) = article.url {
                    println!("  {}", url);
                }
            }
        }

        Commands::Onboard => {
            let me = app.identity(&cli).await?;
            onboard(&app, me).await?;
        }

        Commands::Journal { title, content } => {
            let me = app.identity(&cli).await?;
            let mut journal = Journal::new(app.api.clone(), me.id.clone());
            let mut toasts = Notifications::default();

            if let (Some(title), Some(content)) = (title, content) {
                let result = journal.create(title, content, &mut toasts).await;
                for toast in toasts.visible() {
                    println!("{} {}", toast.variant.icon(), toast.message);
                }
                result?;
            } else {
                for entry in journal.refresh().await {
                    let date = entry
                        .created_at
                        .map(|d| d.format("%Y-%m-%d").to_string())
                        .unwrap_or_default();
                    println!("{:<10} {:<24} {}", date, entry.title, entry.content);
                }
            }
        }

        Commands::Config { .. } => unreachable!("handled before setup"),
    }

    Ok(())
}

async fn chat(app: &App, me: ParticipantRef, partner: ParticipantRef) -> Result<()> {
    let mut view = ConversationView::new(app.api.clone(), me, app.config.messaging.poll_interval());
    let mut revisions = view.subscribe();
    view.open(partner.clone()).await;

    println!("Chatting with {} {} (Ctrl-D to leave)", partner.kind, partner.id);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut printed = 0usize;

    loop {
        tokio::select! {
            changed = revisions.changed() => {
                if changed.is_err() {
                    break;
                }
                let bubbles = view.bubbles().await;
                if bubbles.len() < printed {
                    printed = 0;
                }
                for bubble in &bubbles[printed..] {
                    let who = if bubble.own { "you" } else { partner.id.as_str() };
                    println!("[{}] {}", who, bubble.text);
                }
                printed = bubbles.len();
            }
            line = lines.next_line() => {
                match line? {
                    Some(text) => {
                        if let SendOutcome::Failed(e) = view.send_text(text).await {
                            eprintln!("(not sent: {})", e);
                        }
                    }
                    None => break,
                }
            }
        }
    }

    view.close().await;
    Ok(())
}

async fn onboard(app: &App, me: ParticipantRef) -> Result<()> {
    let mut questionnaire = Questionnaire::load(app.api.clone(), me).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(question) = questionnaire.current().cloned() {
        let (step, total) = questionnaire.progress();
        println!("[{}/{}] {}", step, total, question.question);
        for (i, option) in question.options.iter().enumerate() {
            println!("  {}. {}", i + 1, option);
        }

        let Some(line) = lines.next_line().await? else {
            println!("Stopped");
            return Ok(());
        };
        let choice = match line.trim().parse::<usize>() {
            Ok(n) if n >= 1 => n - 1,
            _ => {
                eprintln!("Enter an option number");
                continue;
            }
        };
        if let Err(e) = questionnaire.select(choice) {
            eprintln!("{}", e);
            continue;
        }
        match questionnaire.advance().await {
            Ok(Step::Complete) => break,
            Ok(Step::Next(_)) => {}
            Err(e) => eprintln!("Could not save answer: {}", e),
        }
    }

    println!("Questionnaire complete");
    Ok(())
}

async fn ask(app: &App, cli: &Cli, question: Option<&str>, canned: Option<usize>) -> Result<()> {
    // free text without a session gets the sign-in notice instead of an answer
    if app.try_identity(cli).await?.is_none() {
        tracing::debug!("Asking the assistant signed out");
    }

    let widget = AssistantWidget::new(
        app.api.clone(),
        app.session.clone(),
        app.config.assistant.reveal_delay(),
    );
    widget.open().await;

    // the reply lands after the echoed question
    let reply_at = widget.transcript().await.len() + 1;
    let mut snapshots = widget.subscribe();
    snapshots.borrow_and_update();
    let printer = tokio::spawn(async move {
        let mut printed = 0;
        let mut stdout = std::io::stdout();
        while snapshots.changed().await.is_ok() {
            let view = snapshots.borrow_and_update().clone();
            let Some(entry) = view.transcript.get(reply_at) else {
                continue;
            };
            if entry.origin != Origin::Bot {
                continue;
            }
            if entry.text.len() > printed {
                print!("{}", &entry.text[printed..]);
                let _ = stdout.flush();
                printed = entry.text.len();
            }
            if !view.cursor_visible {
                break;
            }
        }
    });

    let outcome = match (question, canned) {
        (_, Some(index)) => widget.ask_canned(index).await,
        (Some(text), None) => widget.submit_text(text).await,
        (None, None) => {
            printer.abort();
            bail!("pass a question or --canned <n>");
        }
    };

    match outcome {
        AskOutcome::Answered(_) | AskOutcome::SignInRequired => {
            // the notice is a bot entry too, so the printer shows it
            let _ = printer.await;
            println!();
        }
        AskOutcome::Ignored => {
            printer.abort();
            bail!("nothing to ask");
        }
        AskOutcome::Failed(e) => {
            printer.abort();
            bail!("assistant unavailable: {}", e);
        }
    }

    Ok(())
}
