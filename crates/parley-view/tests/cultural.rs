mod common;

use common::{CHAT, FakeBackend, context, msg};
use parley_types::events::Notice;
use parley_types::models::{CulturalAnalysis, CulturalPhrase};
use parley_view::{CulturalAnalysisLoader, CulturalState};

fn analysis(explanation: Option<&str>) -> CulturalAnalysis {
    CulturalAnalysis {
        cultural_phrases: vec![CulturalPhrase {
            phrase: "estar en las nubes".into(),
            explanation: "to be daydreaming".into(),
            literal_meaning: Some("to be in the clouds".into()),
        }],
        slang_terms: Vec::new(),
        message_explanation: explanation.map(str::to_string),
        analyzed_at: None,
    }
}

#[tokio::test]
async fn cached_analysis_with_explanation_is_used() {
    let backend = FakeBackend::new();
    let (ctx, _notices) = context(backend.clone());
    let cached = analysis(Some("They are saying you seem distracted."));
    ctx.cache
        .save_cultural_analysis(CHAT, "m1", cached.clone())
        .await
        .unwrap();

    let loader = CulturalAnalysisLoader::new(ctx);
    assert_eq!(loader.load(CHAT, "m1").await.unwrap(), cached);
    assert_eq!(loader.state("m1"), Some(CulturalState::Ready(cached)));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn cached_analysis_without_explanation_is_refetched() {
    let backend = FakeBackend::new();
    let fresh = analysis(Some("A friendly tease."));
    backend.analysis(fresh.clone());
    let (ctx, _notices) = context(backend.clone());
    ctx.store.upsert(msg("m1", "u2", 0, "estás en las nubes")).await;
    ctx.cache
        .save_cultural_analysis(CHAT, "m1", analysis(None))
        .await
        .unwrap();

    let loader = CulturalAnalysisLoader::new(ctx.clone());
    assert_eq!(loader.load(CHAT, "m1").await.unwrap(), fresh);
    assert_eq!(backend.count("analyzeCulturalContext"), 1);

    // Persisted: a second loader reads it from the cache.
    let again = CulturalAnalysisLoader::new(ctx);
    again.load(CHAT, "m1").await.unwrap();
    assert_eq!(backend.count("analyzeCulturalContext"), 1);
}

#[tokio::test]
async fn failure_surfaces_state_and_alert() {
    let backend = FakeBackend::new();
    let (ctx, mut notices) = context(backend);
    ctx.store.upsert(msg("m1", "u2", 0, "qué onda")).await;

    let loader = CulturalAnalysisLoader::new(ctx);
    assert!(loader.load(CHAT, "m1").await.is_err());
    assert!(matches!(loader.state("m1"), Some(CulturalState::Failed(_))));
    assert!(matches!(notices.try_recv().unwrap(), Notice::Alert { .. }));
}
