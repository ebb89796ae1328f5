//! End-to-end behavior of the chat pipeline with a stand-in completion service

use askerbot_core::{
    AskerError, CancellationToken, ChatConfig, CompletionProvider, CompletionPurpose,
    CompletionRequest, CompletionResponse, ManualClock, Result, Usage,
};
use askerbot_plugin_knowledge::{
    ChatService, FallbackReason, FALLBACK_REPLY,
};
use async_trait::async_trait;
use mockall::mock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

mock! {
    pub Completion {}

    #[async_trait]
    impl CompletionProvider for Completion {
        fn name(&self) -> &str;
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
    }
}

/// Answers with the first snippet's content; analysis calls get plain prose
struct EchoProvider {
    answers: AtomicUsize,
    analyses: AtomicUsize,
}

impl EchoProvider {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            answers: AtomicUsize::new(0),
            analyses: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl CompletionProvider for EchoProvider {
    fn name(&self) -> &str {
        "echo"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        match request.purpose {
            CompletionPurpose::QueryAnalysis => {
                self.analyses.fetch_add(1, Ordering::SeqCst);
                Ok(CompletionResponse {
                    text: "Beklager, jeg kan ikke analysere dette.".to_string(),
                    usage: None,
                })
            }
            CompletionPurpose::Answer => {
                self.answers.fetch_add(1, Ordering::SeqCst);
                let content = request
                    .system
                    .split("INNHOLD:\n")
                    .nth(1)
                    .and_then(|rest| rest.split("\n\n---").next())
                    .unwrap_or_default()
                    .to_string();
                Ok(CompletionResponse {
                    text: format!("  {}\n", content),
                    usage: Some(Usage {
                        prompt_tokens: 100,
                        completion_tokens: 20,
                        total_tokens: 120,
                    }),
                })
            }
        }
    }
}

fn config() -> ChatConfig {
    ChatConfig {
        index_dir: "/nonexistent/askerbot/index".into(),
        ..ChatConfig::default()
    }
}

fn service_with(provider: Arc<dyn CompletionProvider>) -> ChatService {
    ChatService::new(config(), Some(provider))
}

#[tokio::test]
async fn test_parking_question_end_to_end() {
    let provider = EchoProvider::new();
    let service = service_with(provider.clone());

    let reply = service
        .answer("Hvor kan jeg parkere på Føyka?", &CancellationToken::new())
        .await
        .unwrap();

    assert!(reply.rag_used || reply.faq_used);
    assert!(reply.sources[0].title.contains("Parkering"));
    assert!(reply.reply.contains("avgift"));
    assert_eq!(reply.sources.len(), 1);
    assert_eq!(reply.usage.unwrap().total_tokens, 120);
    assert!(!reply.reply.starts_with(' '));
    assert_eq!(provider.answers.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_gibberish_returns_generic_fallback() {
    let provider = EchoProvider::new();
    let service = service_with(provider.clone());

    let reply = service
        .answer("asdkjasd qweoiqwe", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(reply.reply, FALLBACK_REPLY);
    assert!(reply.sources.is_empty());
    assert!(!reply.rag_used);
    assert_eq!(reply.fallback_reason, Some(FallbackReason::NoRelevantSources));
    // Enrichment was tried, but no answer call is made for a fallback.
    assert_eq!(provider.analyses.load(Ordering::SeqCst), 1);
    assert_eq!(provider.answers.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_faq_is_deterministic_across_cache_states() {
    let provider = EchoProvider::new();
    let service = service_with(provider.clone());
    let cancel = CancellationToken::new();

    let first = service.answer("obos akademi", &cancel).await.unwrap();
    let second = service.answer("OBOS Akademi?", &cancel).await.unwrap();

    assert!(first.faq_used);
    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(first.reply, second.reply);
    assert_eq!(first.sources, second.sources);
    assert_eq!(first.sources.len(), 2);
    assert_eq!(provider.answers.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cached_reply_is_identical() {
    let provider = EchoProvider::new();
    let service = service_with(provider.clone());
    let cancel = CancellationToken::new();

    let first = service.answer("Hvor kan jeg parkere på Føyka?", &cancel).await.unwrap();
    let second = service.answer("hvor kan jeg parkere på føyka", &cancel).await.unwrap();

    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(first.reply, second.reply);
    assert_eq!(first.sources, second.sources);
    assert_eq!(provider.answers.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_response_cache_expires() {
    let provider = EchoProvider::new();
    let clock = Arc::new(ManualClock::new());
    let service = ChatService::with_clock(config(), Some(provider.clone()), clock.clone());
    let cancel = CancellationToken::new();

    service.answer("Hvor kan jeg parkere på Føyka?", &cancel).await.unwrap();
    clock.advance(Duration::from_secs(11 * 60));
    let again = service.answer("Hvor kan jeg parkere på Føyka?", &cancel).await.unwrap();

    assert!(!again.cached);
    assert_eq!(provider.answers.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_ticket_price_cites_tickets_not_membership() {
    let service = service_with(EchoProvider::new());
    let reply = service
        .answer("Hva koster enkeltbillett?", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(reply.sources[0].url, "https://askerfotball.no/billetter");
    assert!(reply.reply.contains("150"));
}

#[tokio::test]
async fn test_whistleblowing_question_cites_varsling() {
    let service = service_with(EchoProvider::new());
    let reply = service
        .answer("Hvor melder jeg avvik?", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(reply.sources[0].url, "https://askerfotball.no/varsling");
}

#[tokio::test]
async fn test_enrichment_failure_keeps_local_analysis() {
    let mut mock = MockCompletion::new();
    mock.expect_complete()
        .withf(|req| req.purpose == CompletionPurpose::QueryAnalysis)
        .times(1)
        .returning(|_| Err(AskerError::provider("status 503")));
    mock.expect_complete()
        .withf(|req| req.purpose == CompletionPurpose::Answer)
        .times(1)
        .returning(|_| {
            Ok(CompletionResponse {
                text: "Det er avgift på parkeringsplassene på kampdager.".to_string(),
                usage: None,
            })
        });

    let service = service_with(Arc::new(mock));
    let reply = service
        .answer(
            "Hvor kan jeg parkere når det er kamp på Føyka i helgen?",
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(reply.rag_used);
    assert!(reply.sources[0].title.contains("Parkering"));
}

#[tokio::test]
async fn test_enriched_analysis_feeds_retrieval() {
    let mut mock = MockCompletion::new();
    mock.expect_complete()
        .withf(|req| req.purpose == CompletionPurpose::QueryAnalysis)
        .times(1)
        .returning(|_| {
            Ok(CompletionResponse {
                text: "```json\n{\"intent\": \"historie\", \"search_terms\": [\"stiftet\", \"historie\"], \"semantic_variants\": [\"grunnlagt\"], \"confidence\": 0.9}\n```".to_string(),
                usage: None,
            })
        });
    mock.expect_complete()
        .withf(|req| {
            req.purpose == CompletionPurpose::Answer && req.system.contains("Intent: historie")
        })
        .times(1)
        .returning(|_| {
            Ok(CompletionResponse {
                text: "Asker Fotball ble stiftet i 1889.".to_string(),
                usage: None,
            })
        });

    let service = service_with(Arc::new(mock));
    let reply = service
        .answer("Når ble klubben egentlig startet opp?", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(reply.reply, "Asker Fotball ble stiftet i 1889.");
    assert_eq!(reply.sources[0].url, "https://askerfotball.no/historie");
}

#[tokio::test]
async fn test_empty_answer_is_upstream_error() {
    let mut mock = MockCompletion::new();
    mock.expect_complete().returning(|_| {
        Ok(CompletionResponse {
            text: "   ".to_string(),
            usage: None,
        })
    });

    let service = service_with(Arc::new(mock));
    let err = service
        .answer("Hvor kan jeg parkere på Føyka?", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AskerError::EmptyCompletion));
}

#[tokio::test]
async fn test_answer_failure_is_not_cached() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let mut mock = MockCompletion::new();
    mock.expect_complete().returning(move |_| {
        if seen.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(AskerError::provider("status 500"))
        } else {
            Ok(CompletionResponse {
                text: "Parkering koster avgift på kampdager.".to_string(),
                usage: None,
            })
        }
    });

    let service = service_with(Arc::new(mock));
    let cancel = CancellationToken::new();

    assert!(service.answer("Hvor kan jeg parkere på Føyka?", &cancel).await.is_err());
    let reply = service.answer("Hvor kan jeg parkere på Føyka?", &cancel).await.unwrap();
    assert!(!reply.cached);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_slow_answer_times_out() {
    struct Slow;

    #[async_trait]
    impl CompletionProvider for Slow {
        fn name(&self) -> &str {
            "slow"
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(CompletionResponse {
                text: "for sent".to_string(),
                usage: None,
            })
        }
    }

    let service = ChatService::new(
        ChatConfig {
            completion_timeout: Duration::from_secs(5),
            ..config()
        },
        Some(Arc::new(Slow)),
    );
    let err = service
        .answer("Hvor kan jeg parkere på Føyka?", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AskerError::Timeout(_)));
}

#[tokio::test]
async fn test_cancelled_request_stops_answer_call() {
    let service = service_with(EchoProvider::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = service
        .answer("Hvor kan jeg parkere på Føyka?", &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, AskerError::Cancelled(_)));
}

#[tokio::test]
async fn test_health_reports_uptime_from_clock() {
    let clock = Arc::new(ManualClock::new());
    let service = ChatService::with_clock(config(), None, clock.clone());
    assert_eq!(service.health().uptime_secs, 0);

    clock.advance(Duration::from_secs(90));
    let health = service.health();
    assert_eq!(health.uptime_secs, 90);
    assert_eq!(health.status, "ok");
}
