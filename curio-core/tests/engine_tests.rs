//! Integration tests for the invocation engine: retry loop, timing, output
//! shaping and accounting. Time-sensitive tests run on tokio's paused clock.

use async_trait::async_trait;
use curio_core::config::EngineConfig;
use curio_core::engine::{
    AttemptEvent, InvocationObserver, InvocationOutput, InvocationRequest, ModelRouter,
    NoopObserver,
};
use curio_core::http::{HttpRequest, HttpResponse, HttpTransport, TransportError};
use curio_core::providers::{
    Completion, CompletionRequest, ErrorKind, InvocationError, OpenAIAdapter, ProviderAdapter,
    ProviderKind, ProviderResult, ReportedUsage,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const CONFIG: &str = r#"
providers:
  - name: openai
    type: openai
    api_key: sk-test
    models:
      - id: gpt-4o-mini
        max_output_tokens: 1024
        cost_per_1k_input: 0.15
        cost_per_1k_output: 0.6
    model_prefixes: ["gpt-"]
"#;

/// Adapter that replays a fixed script of outcomes and records when each
/// attempt started
struct ScriptedAdapter {
    script: Mutex<VecDeque<ProviderResult<Completion>>>,
    calls: Mutex<Vec<Instant>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedAdapter {
    fn new(script: Vec<ProviderResult<Completion>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn gaps(&self) -> Vec<Duration> {
        let calls = self.calls.lock().unwrap();
        calls.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAI
    }

    async fn complete(&self, request: &CompletionRequest) -> ProviderResult<Completion> {
        self.calls.lock().unwrap().push(Instant::now());
        self.requests.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(InvocationError::provider("script exhausted")))
    }
}

fn completion(text: &str, total: Option<u64>) -> ProviderResult<Completion> {
    Ok(Completion {
        text: text.to_string(),
        usage: ReportedUsage {
            input_tokens: 2000,
            output_tokens: 500,
            total_tokens: total,
        },
    })
}

fn router_with(config: &str, adapter: Arc<dyn ProviderAdapter>) -> ModelRouter {
    let config: Arc<EngineConfig> = Arc::new(serde_yaml::from_str(config).unwrap());
    ModelRouter::builder(config.clone(), config)
        .adapter(adapter)
        .observer(Arc::new(NoopObserver))
        .build()
}

fn router(adapter: Arc<dyn ProviderAdapter>) -> ModelRouter {
    router_with(CONFIG, adapter)
}

fn request() -> InvocationRequest {
    InvocationRequest::new("gpt-4o-mini", "You summarize articles.", "Summarize this.")
}

#[tokio::test]
async fn test_missing_credential_fails_without_network() {
    let adapter = ScriptedAdapter::new(vec![completion("unused", None)]);
    let config = r#"
providers:
  - name: openai
    type: openai
    model_prefixes: ["gpt-"]
"#;
    let router = router_with(config, adapter.clone());

    let err = tokio_test::assert_err!(router.invoke(&request()).await);

    assert_eq!(err.kind(), ErrorKind::MissingCredential);
    assert_eq!(err.to_string(), "API key not found for model: gpt-4o-mini");
    assert_eq!(adapter.call_count(), 0);
}

#[tokio::test]
async fn test_unknown_model_is_missing_credential() {
    let adapter = ScriptedAdapter::new(vec![]);
    let router = router(adapter.clone());

    let err = router
        .invoke(&InvocationRequest::new("mistral-large", "", "hi"))
        .await
        .unwrap_err();

    assert_eq!(err, InvocationError::missing_credential("mistral-large"));
    assert_eq!(adapter.call_count(), 0);
}

#[tokio::test]
async fn test_text_output_returned_verbatim_with_accounting() {
    let adapter = ScriptedAdapter::new(vec![completion("A short summary.", None)]);
    let router = router(adapter.clone());

    let result = tokio_test::assert_ok!(router.invoke(&request()).await);

    assert_eq!(result.output, InvocationOutput::Text("A short summary.".to_string()));
    assert_eq!(result.token_usage.input, 2000);
    assert_eq!(result.token_usage.output, 500);
    assert_eq!(result.token_usage.total, 2500);
    assert!((result.cost - 0.6).abs() < 1e-9);
    assert_eq!(adapter.call_count(), 1);
}

#[tokio::test]
async fn test_reported_total_is_kept() {
    let adapter = ScriptedAdapter::new(vec![completion("ok", Some(2600))]);
    let router = router(adapter);

    let result = router.invoke(&request()).await.unwrap();
    assert_eq!(result.token_usage.total, 2600);
}

#[tokio::test]
async fn test_request_defaults_reach_the_adapter() {
    let adapter = ScriptedAdapter::new(vec![completion("ok", None)]);
    let router = router(adapter.clone());

    router.invoke(&request()).await.unwrap();

    let requests = adapter.requests.lock().unwrap();
    let sent = &requests[0];
    assert_eq!(sent.model, "gpt-4o-mini");
    assert_eq!(sent.api_key.expose_secret(), "sk-test");
    assert_eq!(sent.temperature, 0.3);
    assert_eq!(sent.max_output_tokens, 1024);
    assert_eq!(sent.prompt.system(), Some("You summarize articles."));
    assert!(!sent.structured_output_requested);
}

#[tokio::test]
async fn test_fenced_json_is_recovered() {
    let adapter = ScriptedAdapter::new(vec![completion(
        "```json\n{\"summary\": \"x\"}\n```",
        None,
    )]);
    let router = router(adapter);

    let result = router
        .invoke(&request().with_structured_output())
        .await
        .unwrap();

    assert_eq!(result.output.as_json(), Some(&serde_json::json!({"summary": "x"})));
    assert!(!result.output.is_degraded());
}

#[tokio::test]
async fn test_unparseable_structured_output_degrades() {
    let adapter = ScriptedAdapter::new(vec![completion("not json at all", None)]);
    let router = router(adapter.clone());

    let result = router
        .invoke(&request().with_structured_output())
        .await
        .unwrap();

    assert!(result.output.is_degraded());
    let value = result.output.into_value();
    assert_eq!(value["raw"], "not json at all");
    assert!(value["parseError"].as_str().unwrap().starts_with("Invalid structured output"));
    assert_eq!(adapter.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_hint_is_honored() {
    let adapter = ScriptedAdapter::new(vec![
        Err(InvocationError::rate_limited("slow down", Some(Duration::from_secs(2)))),
        completion("ok", None),
    ]);
    let router = router(adapter.clone());

    let result = router.invoke(&request()).await.unwrap();

    assert_eq!(result.output.as_text(), Some("ok"));
    assert_eq!(adapter.call_count(), 2);
    assert!(adapter.gaps()[0] >= Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_without_hint_uses_backoff() {
    let adapter = ScriptedAdapter::new(vec![
        Err(InvocationError::rate_limited("slow down", None)),
        completion("ok", None),
    ]);
    let router = router(adapter.clone());

    router.invoke(&request()).await.unwrap();

    let gap = adapter.gaps()[0];
    assert!(gap >= Duration::from_secs(1) && gap < Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_huge_rate_limit_hint_is_clamped() {
    let adapter = ScriptedAdapter::new(vec![
        Err(InvocationError::rate_limited("slow down", Some(Duration::from_secs(86_400)))),
        completion("ok", None),
    ]);
    let router = router(adapter.clone());

    router.invoke(&request()).await.unwrap();

    let gap = adapter.gaps()[0];
    assert!(gap >= Duration::from_secs(120) && gap < Duration::from_secs(121));
}

#[tokio::test(start_paused = true)]
async fn test_persistent_rate_limit_stops_at_three_attempts() {
    let limited = || Err(InvocationError::rate_limited("slow down", Some(Duration::from_secs(2))));
    let adapter = ScriptedAdapter::new(vec![limited(), limited(), limited(), limited()]);
    let router = router(adapter.clone());

    let err = router.invoke(&request()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RateLimited);
    assert_eq!(adapter.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_provider_errors_back_off_exponentially() {
    let adapter = ScriptedAdapter::new(vec![
        Err(InvocationError::provider("first")),
        Err(InvocationError::provider("second")),
        Err(InvocationError::provider("third")),
    ]);
    let router = router(adapter.clone());
    let started = Instant::now();

    let err = router.invoke(&request()).await.unwrap_err();

    assert_eq!(err, InvocationError::provider("third"));
    assert_eq!(adapter.call_count(), 3);

    let gaps = adapter.gaps();
    assert!(gaps[0] >= Duration::from_secs(1) && gaps[0] < Duration::from_secs(2));
    assert!(gaps[1] >= Duration::from_secs(2) && gaps[1] < Duration::from_secs(3));

    // No sleep follows the final attempt
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn test_transient_failure_then_success() {
    let adapter = ScriptedAdapter::new(vec![
        Err(InvocationError::timed_out("deadline")),
        completion("recovered", None),
    ]);
    let router = router(adapter.clone());

    let result = router.invoke(&request()).await.unwrap();

    assert_eq!(result.output.as_text(), Some("recovered"));
    assert_eq!(adapter.call_count(), 2);
    assert!(result.duration_ms >= 1000);
}

#[tokio::test]
async fn test_fatal_errors_are_not_retried() {
    for fatal in [
        InvocationError::missing_credential("gpt-4o-mini"),
        InvocationError::invalid_structured_output("bad", "raw"),
    ] {
        let adapter = ScriptedAdapter::new(vec![Err(fatal.clone()), completion("unused", None)]);
        let router = router(adapter.clone());

        let err = router.invoke(&request()).await.unwrap_err();

        assert_eq!(err, fatal);
        assert_eq!(adapter.call_count(), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_aborts_backoff() {
    let adapter = ScriptedAdapter::new(vec![
        Err(InvocationError::provider("boom")),
        completion("unused", None),
    ]);
    let router = router(adapter.clone());
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = router
        .invoke_with_cancellation(&request(), &cancel)
        .await
        .unwrap_err();

    assert_eq!(err, InvocationError::timed_out("invocation cancelled"));
    assert_eq!(adapter.call_count(), 1);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_already_cancelled_makes_no_call() {
    let adapter = ScriptedAdapter::new(vec![completion("unused", None)]);
    let router = router(adapter.clone());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = router
        .invoke_with_cancellation(&request(), &cancel)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TimedOut);
    assert_eq!(adapter.call_count(), 0);
}

/// Transport that never answers
struct StallingTransport {
    calls: AtomicU32,
}

#[async_trait]
impl HttpTransport for StallingTransport {
    async fn post_json(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn test_deadline_overrun_on_final_attempt_is_timed_out() {
    let transport = Arc::new(StallingTransport {
        calls: AtomicU32::new(0),
    });
    let adapter = Arc::new(OpenAIAdapter::new("https://api.openai.com/v1", transport.clone()));
    let router = router(adapter);
    let started = Instant::now();

    let err = router.invoke(&request()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TimedOut);
    assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
    // Three 60s deadlines plus 1s and 2s of backoff
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(183) && elapsed < Duration::from_secs(185));
}

#[derive(Default)]
struct CountingObserver {
    attempts: AtomicU32,
    retries: AtomicU32,
    degraded: AtomicU32,
    successes: AtomicU32,
}

impl InvocationObserver for CountingObserver {
    fn on_attempt(&self, _event: &AttemptEvent<'_>) {
        self.attempts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_retry(&self, _event: &AttemptEvent<'_>, _error: &InvocationError, _delay: Duration) {
        self.retries.fetch_add(1, Ordering::SeqCst);
    }

    fn on_output_degraded(&self, _model: &str, _error: &InvocationError) {
        self.degraded.fetch_add(1, Ordering::SeqCst);
    }

    fn on_success(&self, _model: &str, _result: &curio_core::InvocationResult) {
        self.successes.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test(start_paused = true)]
async fn test_observer_sees_every_stage() {
    let adapter = ScriptedAdapter::new(vec![
        Err(InvocationError::provider("boom")),
        completion("still not json", None),
    ]);
    let observer = Arc::new(CountingObserver::default());
    let config: Arc<EngineConfig> = Arc::new(serde_yaml::from_str(CONFIG).unwrap());
    let router = ModelRouter::builder(config.clone(), config)
        .adapter(adapter)
        .observer(observer.clone())
        .build();

    router
        .invoke(&request().with_structured_output())
        .await
        .unwrap();

    assert_eq!(observer.attempts.load(Ordering::SeqCst), 2);
    assert_eq!(observer.retries.load(Ordering::SeqCst), 1);
    assert_eq!(observer.degraded.load(Ordering::SeqCst), 1);
    assert_eq!(observer.successes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_invocations_are_independent() {
    let adapter = ScriptedAdapter::new(vec![completion("one", None), completion("two", None)]);
    let router = router(adapter.clone());

    let (req_a, req_b) = (request(), request());
    let (a, b) = tokio::join!(router.invoke(&req_a), router.invoke(&req_b));

    let mut outputs = vec![
        a.unwrap().output.as_text().unwrap().to_string(),
        b.unwrap().output.as_text().unwrap().to_string(),
    ];
    outputs.sort();
    assert_eq!(outputs, vec!["one", "two"]);
    assert_eq!(adapter.call_count(), 2);
}
