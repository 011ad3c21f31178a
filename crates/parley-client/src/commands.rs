use anyhow::{Context, Result};
use chrono::{Local, Utc};
use parley_types::models::Message;
use parley_view::{ChatSession, SessionConfig, TranslationController, ViewContext};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::{Command, Switch};
use crate::render;

pub async fn run(command: Command, ctx: ViewContext) -> Result<()> {
    match command {
        Command::Thread { chat, utc } => {
            let session = ChatSession::open(ctx.clone(), &chat, SessionConfig::default()).await?;
            if utc {
                let rows = session.annotated_thread_in(&Utc).await;
                render::thread(&rows, session.translations(), &ctx.user_id, &Utc);
            } else {
                let rows = session.annotated_thread_in(&Local).await;
                render::thread(&rows, session.translations(), &ctx.user_id, &Local);
            }
            session.close().await?;
        }

        Command::Translate { chat, message } => {
            let session = ChatSession::open(ctx.clone(), &chat, SessionConfig::default()).await?;
            let state = session.toggle_translation(&message).await?;
            if let Some(m) = ctx.store.message(&chat, &message).await {
                let display = session.translations().display(&m);
                println!("{}", display.primary);
                if let Some(secondary) = display.secondary {
                    println!("    ↳ {}", secondary);
                }
            }
            info!(chat_id = %chat, message_id = %message, ?state, "translation toggled");
            session.close().await?;
        }

        Command::Analyze { chat, message } => {
            let session = ChatSession::open(ctx, &chat, SessionConfig::default()).await?;
            let analysis = session.cultural_context(&message).await?;
            render::cultural(&analysis);
            session.close().await?;
        }

        Command::AutoTranslate { chat, state } => {
            let enabled = matches!(state, Switch::On);
            ctx.cache.set_auto_translate(&chat, enabled).await?;
            println!(
                "Auto-translate {} for {}",
                if enabled { "enabled" } else { "disabled" },
                chat
            );
        }

        Command::Preview { text, to, formality } => {
            let controller = TranslationController::new(ctx, CancellationToken::new());
            let translated = controller.translate_preview(&text, &to, formality.map(Into::into)).await?;
            println!("{}", translated);
        }

        Command::Adjust {
            text,
            formality,
            language,
        } => {
            let language = language.unwrap_or_else(|| ctx.language.clone());
            let controller = TranslationController::new(ctx, CancellationToken::new());
            let adjusted = controller.adjust_formality(&text, &language, formality.into()).await?;
            println!("{}", adjusted);
        }

        Command::Languages { chat } => {
            let session = ChatSession::open(ctx, &chat, SessionConfig::default()).await?;
            for share in session.detect_languages().await? {
                println!("{:>6}  {}", share.message_count, share.language);
            }
            session.close().await?;
        }

        Command::Sync { chat, file } => {
            let raw = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let messages: Vec<Message> =
                serde_json::from_str(&raw).with_context(|| format!("parsing {}", file.display()))?;

            // One explicit sweep, so the report covers every translation written.
            let config = SessionConfig {
                listen: false,
                ..SessionConfig::default()
            };
            let mut session = ChatSession::open(ctx, &chat, config).await?;
            session.ingest(messages).await?;
            let report = session.sweep().await?;
            if report.seeded {
                println!("First sync of {}: history recorded, nothing translated", chat);
            }
            println!(
                "{} new, {} translated, {} already in your language, {} skipped, {} failed",
                report.new_messages, report.translated, report.same_language, report.skipped, report.failed
            );
            session.close().await?;
        }
    }
    Ok(())
}
