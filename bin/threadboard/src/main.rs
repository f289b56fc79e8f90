//! # Threadboard Binary
//!
//! Assembles the comment API client, the session source and the thread
//! engine, then runs one command against a board.

use std::process::ExitCode;
use std::sync::Arc;

use askama::Template;
use clap::{Parser, Subcommand};
use tb_auth_session::{CookieSessionSource, FirstOf, TokenSessionSource};
use tb_configs::Settings;
use tb_core::{AppError, CommentService, UserDirectory};
use tb_http::HttpCommentService;
use tb_services::{
    CommentDraft, CommentStore, IdentityContext, ReplyContext, ThreadBuilder, UsernameResolver,
};
use tb_ui::ThreadTemplate;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about = "threadboard: nested comment threads for a board")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show a board's thread.
    Show {
        slug: String,
        /// Load every level down to the depth limit instead of only the top.
        #[arg(long)]
        expand_all: bool,
    },
    /// Post a top-level comment on a board.
    Post {
        slug: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        text: String,
    },
    /// Reply to an existing comment.
    Reply {
        slug: String,
        comment_id: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        text: String,
    },
    /// Delete one of your own comments.
    Delete { slug: String, comment_id: String },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env("THREADBOARD_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

struct App {
    builder: ThreadBuilder,
    names: UsernameResolver,
    identity: IdentityContext,
}

impl App {
    fn assemble(mut settings: Settings) -> anyhow::Result<Self> {
        let http = Arc::new(HttpCommentService::new(
            &settings.api.base_url,
            settings.api.timeout(),
        )?);
        let service: Arc<dyn CommentService> = http.clone();
        let directory: Arc<dyn UserDirectory> = http;

        let identity = IdentityContext::from_source(&FirstOf(vec![
            Box::new(TokenSessionSource::new(settings.session.token.take())),
            Box::new(CookieSessionSource::new(settings.session.cookie.take())),
        ]));

        let store = Arc::new(CommentStore::new(service, settings.api.timeout()));
        let builder = ThreadBuilder::new(store, settings.thread.max_depth, settings.thread.order);
        let names = UsernameResolver::new(directory, settings.labels, settings.api.timeout());

        Ok(Self {
            builder,
            names,
            identity,
        })
    }

    async fn run(&self, command: Commands) -> tb_core::Result<()> {
        match command {
            Commands::Show { slug, expand_all } => {
                self.builder.open(&slug).await?;
                if expand_all {
                    self.builder.expand_all().await?;
                }
                self.print(&ReplyContext::Idle).await
            }
            Commands::Post { slug, title, text } => {
                self.builder.open(&slug).await?;
                let mut reply = ReplyContext::Idle;
                let created = reply
                    .submit(
                        self.builder.store(),
                        &CommentDraft::new(title, text),
                        &self.identity,
                    )
                    .await?;
                info!(id = %created.id, "posted");
                self.print(&reply).await
            }
            Commands::Reply {
                slug,
                comment_id,
                title,
                text,
            } => {
                self.builder.open(&slug).await?;
                self.builder.expand_all().await?;
                let target = self
                    .builder
                    .store()
                    .comment(&comment_id)
                    .ok_or_else(|| AppError::NotFound("Comment".into(), comment_id.clone()))?;

                let mut reply = ReplyContext::Idle;
                reply.reply_to(&target);
                let draft = CommentDraft::new(title, text);
                let created = reply
                    .submit(self.builder.store(), &draft, &self.identity)
                    .await?;
                info!(id = %created.id, parent_id = %comment_id, "replied");
                self.builder.expand(&comment_id).await?;
                self.print(&reply).await
            }
            Commands::Delete { slug, comment_id } => {
                self.builder.open(&slug).await?;
                self.builder.expand_all().await?;
                self.builder
                    .store()
                    .remove(&comment_id, self.identity.session())
                    .await?;
                info!(id = %comment_id, "deleted");
                self.print(&ReplyContext::Idle).await
            }
        }
    }

    async fn print(&self, reply: &ReplyContext) -> tb_core::Result<()> {
        let Some(thread) = self.builder.project() else {
            return Ok(());
        };
        let rows = thread.rows();
        self.names
            .prefetch(rows.iter().map(|row| row.comment.user_id.as_str()))
            .await;
        let page = ThreadTemplate::new(&thread, &self.names, &self.identity, reply)
            .render()
            .map_err(|e| AppError::Validation(format!("render failed: {e}")))?;
        println!("{page}");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(err) => {
            error!(error = %err, "configuration rejected");
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let app = match App::assemble(settings) {
        Ok(app) => app,
        Err(err) => {
            error!(error = %err, "startup failed");
            eprintln!("{err:#}");
            return ExitCode::FAILURE;
        }
    };

    match app.run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "command failed");
            eprintln!("{}", err.user_message());
            ExitCode::FAILURE
        }
    }
}
