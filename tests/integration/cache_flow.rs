//! Cache-aside flow: the caller checks the cache before orchestrating a
//! generation and writes completed full-fidelity artifacts back afterwards.
//! The orchestrator itself never touches the cache.

use std::sync::Arc;

use clipforge::cache::{CacheConfig, CacheStore};
use clipforge::error::GenerationError;
use clipforge::fingerprint::fingerprint;
use clipforge::orchestrator::{
    GenerationOrchestrator, GenerationRequest, PollingConfig,
};
use clipforge::registry::{GenerationStatus, StatusRegistry};
use clipforge::types::ArtifactData;

use crate::integration::test_utils::{
    sample_request, wait_terminal, ScriptedDescriber, ScriptedProvider,
};

fn fast_polling() -> PollingConfig {
    PollingConfig {
        poll_interval_ms: 1,
        max_attempts: 10,
        max_transport_failures: 3,
    }
}

/// The cache-aside contract callers implement: hit returns the cached
/// artifact, miss generates and writes back only completed full-fidelity
/// results.
async fn generate_cached(
    cache: &CacheStore,
    orchestrator: &GenerationOrchestrator,
    request: GenerationRequest,
) -> Result<ArtifactData, GenerationError> {
    let fp = fingerprint(
        &request.subject_id,
        &request.artifact_type,
        &request.prompt_text,
    );
    if let Some(entry) = cache.get(&fp) {
        return Ok(entry.data);
    }

    let ticket = orchestrator.generate(request.clone()).await?;
    let record = wait_terminal(orchestrator, &ticket.generation_id).await;
    match record.status {
        GenerationStatus::Completed => {
            let data = record
                .result
                .ok_or_else(|| GenerationError::Upstream("completed without result".to_string()))?;
            if !record.degraded {
                cache.put(
                    fp,
                    &request.subject_id,
                    &request.artifact_type,
                    &request.prompt_text,
                    data.clone(),
                );
            }
            Ok(data)
        }
        _ => Err(GenerationError::Upstream(
            record
                .error_message
                .unwrap_or_else(|| "generation failed".to_string()),
        )),
    }
}

#[tokio::test]
async fn repeated_requests_hit_the_cache_after_one_generation() {
    let provider = ScriptedProvider::accepting(vec![ScriptedProvider::finished(
        "https://cdn.example/storm.mp4",
    )]);
    let orchestrator = GenerationOrchestrator::new(
        provider.clone(),
        ScriptedDescriber::failing("unused"),
        Arc::new(StatusRegistry::new()),
        fast_polling(),
    );
    let cache = CacheStore::new(CacheConfig::default());

    for _ in 0..3 {
        let data = generate_cached(&cache, &orchestrator, sample_request())
            .await
            .unwrap();
        assert_eq!(
            data,
            ArtifactData::Locator("https://cdn.example/storm.mp4".to_string())
        );
    }

    // Exactly one upstream submission; the other two calls were served
    // from the cache.
    assert_eq!(provider.submissions(), 1);
    assert_eq!(cache.len(), 1);
    let metrics = cache.metrics();
    assert_eq!(metrics.misses, 1);
    assert_eq!(metrics.hits, 2);
}

#[tokio::test]
async fn distinct_prompts_generate_independently() {
    let provider = ScriptedProvider::accepting(vec![
        ScriptedProvider::finished("https://cdn.example/a.mp4"),
        ScriptedProvider::finished("https://cdn.example/b.mp4"),
    ]);
    let orchestrator = GenerationOrchestrator::new(
        provider.clone(),
        ScriptedDescriber::failing("unused"),
        Arc::new(StatusRegistry::new()),
        fast_polling(),
    );
    let cache = CacheStore::new(CacheConfig::default());

    let mut other = sample_request();
    other.prompt_text = "the same lighthouse on a calm morning".to_string();

    generate_cached(&cache, &orchestrator, sample_request())
        .await
        .unwrap();
    generate_cached(&cache, &orchestrator, other)
        .await
        .unwrap();

    assert_eq!(provider.submissions(), 2);
    assert_eq!(cache.len(), 2);
}

#[tokio::test]
async fn degraded_artifacts_are_never_written_back() {
    let provider =
        ScriptedProvider::rejecting(GenerationError::Upstream("quota exhausted".to_string()));
    let fallback = ScriptedDescriber::succeeding("Waves crash over a lantern-lit bow.");
    let orchestrator = GenerationOrchestrator::new(
        provider.clone(),
        fallback.clone(),
        Arc::new(StatusRegistry::new()),
        fast_polling(),
    );
    let cache = CacheStore::new(CacheConfig::default());

    let data = generate_cached(&cache, &orchestrator, sample_request())
        .await
        .unwrap();
    assert!(data.is_inline());

    // The degraded text never entered the cache, so a retry submits again.
    assert!(cache.is_empty());
    generate_cached(&cache, &orchestrator, sample_request())
        .await
        .unwrap();
    assert_eq!(provider.submissions(), 2);
    assert_eq!(fallback.calls(), 2);
}

#[tokio::test]
async fn exported_entries_serve_hits_after_import() {
    let provider = ScriptedProvider::accepting(vec![ScriptedProvider::finished(
        "https://cdn.example/storm.mp4",
    )]);
    let orchestrator = GenerationOrchestrator::new(
        provider.clone(),
        ScriptedDescriber::failing("unused"),
        Arc::new(StatusRegistry::new()),
        fast_polling(),
    );

    let warm = CacheStore::new(CacheConfig::default());
    generate_cached(&warm, &orchestrator, sample_request())
        .await
        .unwrap();

    // A fresh store seeded from the export serves the request without a
    // new generation.
    let cold = CacheStore::new(CacheConfig::default());
    assert_eq!(cold.import(warm.export()), 1);
    generate_cached(&cold, &orchestrator, sample_request())
        .await
        .unwrap();
    assert_eq!(provider.submissions(), 1);
    assert_eq!(cold.metrics().hits, 1);
}
