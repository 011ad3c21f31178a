mod common;

use std::time::Duration;

use chrono::Utc;
use common::{CHAT, FakeBackend, ME, context, msg};
use parley_types::events::{Notice, StoreEvent};
use parley_types::models::{Chat, ChatType};
use parley_view::{ChatSession, ListItem, ScrollCommand, SessionConfig, TranslationState};

fn group_chat() -> Chat {
    Chat {
        id: CHAT.into(),
        kind: ChatType::Group,
        participants: vec![ME.into(), "u2".into(), "u3".into()],
        group_name: Some("Lisbon trip".into()),
        group_icon: None,
        group_admins: vec!["u2".into()],
        last_message_text: None,
        last_message_sender_id: None,
        last_message_timestamp: None,
        unread_count: [(ME.to_string(), 1)].into_iter().collect(),
    }
}

#[tokio::test]
async fn open_loads_cache_restores_scroll_and_marks_read() {
    let backend = FakeBackend::new();
    let (ctx, _notices) = context(backend.clone());
    let db = ctx.cache.database().clone();
    db.cache_chat(&group_chat()).unwrap();
    db.cache_messages(&[
        msg("m1", "u2", 0, "olá"),
        msg("m2", "u2", 30_000, "tudo bem?"),
        msg("m3", ME, 120_000, "yes!"),
    ])
    .unwrap();
    db.save_scroll_position(CHAT, 420.0, Some("m2")).unwrap();

    let mut session = ChatSession::open(ctx.clone(), CHAT, SessionConfig::default())
        .await
        .unwrap();

    let thread = session.thread_in(&Utc).await;
    let keys: Vec<String> = thread.iter().map(ListItem::key).collect();
    assert_eq!(
        keys,
        vec!["date-2024-03-05", "msg-m1", "msg-m2", "unread", "msg-m3"]
    );
    assert_eq!(ctx.store.chat(CHAT).await.unwrap().unread_for(ME), 0);

    let annotated = session.annotated_thread_in(&Utc).await;
    let names: Vec<bool> = annotated.iter().map(|(_, f)| f.show_sender_name).collect();
    assert_eq!(names, vec![false, true, false, false, false]);

    assert_eq!(
        session.scroll().on_layout(2000.0, 600.0),
        Some(ScrollCommand::ScrollToOffset(420.0))
    );

    // Opening makes no remote calls; history is never auto-translated.
    session.set_auto_translate(true).await.unwrap();
    assert_eq!(session.sweep().await.unwrap().new_messages, 0);
    assert!(backend.calls().is_empty());
    session.close().await.unwrap();
}

#[tokio::test]
async fn listener_translates_messages_arriving_after_open() {
    let backend = FakeBackend::new();
    let (ctx, _notices) = context(backend.clone());
    ctx.store.upsert(msg("m1", "u2", 0, "hola")).await;

    let mut session = ChatSession::open(ctx.clone(), CHAT, SessionConfig::default())
        .await
        .unwrap();
    session.set_auto_translate(true).await.unwrap();

    let mut events = ctx.store.subscribe();
    session
        .ingest(vec![msg("m2", "u2", 10_000, "¿vienes?")])
        .await
        .unwrap();

    let applied = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(StoreEvent::TranslationApplied { message_id, .. }) = events.recv().await {
                return message_id;
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(applied, "m2");
    assert_eq!(backend.count("translateMessage"), 1);
    let cached = ctx.cache.messages(CHAT).await.unwrap();
    let m2 = cached.iter().find(|m| m.id == "m2").unwrap();
    assert_eq!(m2.translation("en").unwrap().text, "[en] ¿vienes?");
    assert!(ctx.store.message(CHAT, "m1").await.unwrap().translations.is_empty());

    session.close().await.unwrap();
}

#[tokio::test]
async fn history_arriving_after_an_empty_open_is_not_translated() {
    let backend = FakeBackend::new();
    let (ctx, _notices) = context(backend.clone());
    ctx.cache.set_auto_translate(CHAT, true).await.unwrap();

    let mut session = ChatSession::open(ctx.clone(), CHAT, SessionConfig::default())
        .await
        .unwrap();
    let mut events = ctx.store.subscribe();

    let history: Vec<_> = (0..5)
        .map(|i| msg(&format!("h{i}"), "u2", i * 1_000, "hola"))
        .collect();
    ctx.store.replace_snapshot(CHAT, history).await;
    session.sweep().await.unwrap();
    assert!(backend.calls().is_empty());

    session
        .ingest(vec![msg("m1", "u2", 60_000, "¿vienes?")])
        .await
        .unwrap();

    let applied = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(StoreEvent::TranslationApplied { message_id, .. }) = events.recv().await {
                return message_id;
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(applied, "m1");
    assert_eq!(backend.count("translateMessage"), 1);
    assert!(ctx.store.message(CHAT, "h0").await.unwrap().translations.is_empty());
    session.close().await.unwrap();
}

#[tokio::test]
async fn permission_denied_purges_chat_and_notifies() {
    let backend = FakeBackend::new();
    let (ctx, mut notices) = context(backend.clone());
    ctx.store.upsert_chat(group_chat()).await;
    ctx.store.upsert(msg("m1", "u2", 0, "hola")).await;
    ctx.cache.store_messages(vec![msg("m1", "u2", 0, "hola")]).await.unwrap();

    let session = ChatSession::open(ctx.clone(), CHAT, SessionConfig::default())
        .await
        .unwrap();
    let cancel = session.cancellation();
    backend.deny_all();

    let err = session.toggle_translation("m1").await.unwrap_err();
    assert!(err.is_permission_denied());
    assert!(session.is_removed());
    assert!(cancel.is_cancelled());

    assert!(ctx.store.messages(CHAT).await.is_empty());
    assert!(ctx.store.chat(CHAT).await.is_none());
    assert!(ctx.cache.messages(CHAT).await.unwrap().is_empty());

    assert_eq!(
        notices.try_recv().unwrap(),
        Notice::RemovedFromChat {
            chat_id: CHAT.into(),
            chat_name: Some("Lisbon trip".into()),
        }
    );
    assert!(notices.try_recv().is_err());

    session.close().await.unwrap();
    assert!(ctx.cache.scroll_position(CHAT).await.unwrap().is_none());
}

#[tokio::test]
async fn background_permission_failure_purges_chat_and_notifies() {
    let backend = FakeBackend::new();
    let (ctx, mut notices) = context(backend.clone());
    ctx.store.upsert_chat(group_chat()).await;
    ctx.store.upsert(msg("m1", "u2", 0, "hola")).await;
    ctx.cache.set_auto_translate(CHAT, true).await.unwrap();

    let mut session = ChatSession::open(ctx.clone(), CHAT, SessionConfig::default())
        .await
        .unwrap();
    let cancel = session.cancellation();
    backend.deny_all();
    session
        .ingest(vec![msg("m2", "u2", 10_000, "¿vienes?")])
        .await
        .unwrap();

    let notice = tokio::time::timeout(Duration::from_secs(5), notices.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        notice,
        Notice::RemovedFromChat {
            chat_id: CHAT.into(),
            chat_name: Some("Lisbon trip".into()),
        }
    );
    assert!(session.is_removed());
    assert!(cancel.is_cancelled());
    assert_eq!(backend.calls(), vec!["quickDetectLanguage".to_string()]);
    assert!(ctx.store.messages(CHAT).await.is_empty());
    assert!(ctx.cache.messages(CHAT).await.unwrap().is_empty());

    session.close().await.unwrap();
    assert!(notices.try_recv().is_err());
}

#[tokio::test]
async fn sweep_without_listener_reports_every_translation() {
    let backend = FakeBackend::new();
    let (ctx, _notices) = context(backend.clone());
    ctx.cache.store_messages(vec![msg("m1", "u2", 0, "hola")]).await.unwrap();
    ctx.cache.set_auto_translate(CHAT, true).await.unwrap();

    let config = SessionConfig {
        listen: false,
        ..SessionConfig::default()
    };
    let mut session = ChatSession::open(ctx.clone(), CHAT, config).await.unwrap();
    session
        .ingest(vec![
            msg("m2", "u2", 10_000, "¿vienes?"),
            msg("m3", "u2", 20_000, "a las ocho"),
        ])
        .await
        .unwrap();

    let report = session.sweep().await.unwrap();
    assert_eq!(report.new_messages, 2);
    assert_eq!(report.translated, 2);
    assert_eq!(backend.count("translateMessage"), report.translated);

    let cached = ctx.cache.database().get_translations_for_chat(CHAT).unwrap();
    assert_eq!(cached.len(), report.translated);
    session.close().await.unwrap();
}

#[tokio::test]
async fn close_saves_scroll_and_drop_cancels() {
    let backend = FakeBackend::new();
    let (ctx, _notices) = context(backend);
    ctx.store.upsert(msg("m1", "u2", 0, "hola")).await;
    ctx.store.upsert(msg("m2", "u2", 1_000, "adiós")).await;

    let mut session = ChatSession::open(ctx.clone(), CHAT, SessionConfig::default())
        .await
        .unwrap();
    session.scroll().on_layout(1500.0, 500.0);
    session.scroll().on_scroll(640.0);
    session.close().await.unwrap();

    let saved = ctx.cache.scroll_position(CHAT).await.unwrap().unwrap();
    assert_eq!(saved.scroll_offset, 640.0);
    assert_eq!(saved.anchor_message_id.as_deref(), Some("m2"));

    let session = ChatSession::open(ctx, CHAT, SessionConfig::default()).await.unwrap();
    let cancel = session.cancellation();
    drop(session);
    assert!(cancel.is_cancelled());
}

#[tokio::test]
async fn message_actions_go_through_the_store() {
    let backend = FakeBackend::new();
    let (ctx, _notices) = context(backend);
    ctx.store.upsert(msg("m1", "u2", 0, "hola")).await;
    let session = ChatSession::open(ctx.clone(), CHAT, SessionConfig::default())
        .await
        .unwrap();

    let outgoing = session.stage_message("on my way").await;
    session.mark_failed(&outgoing.id).await.unwrap();
    session.retry(&outgoing.id).await.unwrap();
    session.mark_sent(&outgoing.id).await.unwrap();

    assert!(session.toggle_reaction("m1", "❤️").await.unwrap());
    session.delete_for_me("m1").await.unwrap();

    let visible: Vec<String> = session
        .thread_in(&Utc)
        .await
        .iter()
        .filter_map(ListItem::as_message)
        .map(|m| m.id.clone())
        .collect();
    assert_eq!(visible, vec![outgoing.id.clone()]);

    let state = session
        .translations()
        .state(&ctx.store.message(CHAT, &outgoing.id).await.unwrap());
    assert_eq!(state, TranslationState::NoTranslation);

    let languages = session.detect_languages().await.unwrap();
    assert_eq!(languages.len(), 2);
    session.close().await.unwrap();
}
