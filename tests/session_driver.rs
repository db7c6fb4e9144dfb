//! Agent session driver integration tests
//!
//! Drives full sessions against a scripted model and an in-memory browser.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use bedrock_browser::agent::{AgentSession, StepSink};
use bedrock_browser::core::{
    resolve, BrowserAgentError, ConfigError, Credentials, ErrorKind, Message, RawInputs, Result,
    RunConfig, RunResult, StepEvent, TaskRequest, ToolCall, ToolDefinition, ToolResult,
};
use bedrock_browser::llm::{GenerateOptions, LLMProvider, LLMResponse};
use bedrock_browser::report::{present, present_config_error, present_with_config};
use bedrock_browser::tools::BrowserRuntime;

const TITLE_TASK: &str = "Go to example.com and report the page title";

/// One scripted model turn
enum Turn {
    Reply(LLMResponse),
    Fail(BrowserAgentError),
    Panic,
    Hang,
}

/// Model double that replays scripted turns
struct ScriptedLlm {
    turns: Mutex<VecDeque<Turn>>,
    /// Returned once the script runs out
    fallback: Option<LLMResponse>,
    /// Reply to the tool-less synthesis call
    synthesis: Mutex<Option<Turn>>,
    tool_calls: AtomicUsize,
    synthesis_calls: AtomicUsize,
}

impl ScriptedLlm {
    fn new(turns: Vec<Turn>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            fallback: None,
            synthesis: Mutex::new(None),
            tool_calls: AtomicUsize::new(0),
            synthesis_calls: AtomicUsize::new(0),
        }
    }

    fn endless(response: LLMResponse) -> Self {
        Self {
            fallback: Some(response),
            ..Self::new(Vec::new())
        }
    }

    fn with_synthesis(self, turn: Turn) -> Self {
        *self.synthesis.lock().unwrap() = Some(turn);
        self
    }

    async fn play(turn: Turn) -> Result<LLMResponse> {
        match turn {
            Turn::Reply(response) => Ok(response),
            Turn::Fail(err) => Err(err),
            Turn::Panic => panic!("scripted model panic"),
            Turn::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

#[async_trait]
impl LLMProvider for ScriptedLlm {
    async fn chat(
        &self,
        _model: &str,
        _messages: &[Message],
        _options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        self.synthesis_calls.fetch_add(1, Ordering::SeqCst);
        let turn = self.synthesis.lock().unwrap().take();
        match turn {
            Some(turn) => Self::play(turn).await,
            None => Ok(LLMResponse::text("")),
        }
    }

    async fn chat_with_tools(
        &self,
        _model: &str,
        _messages: &[Message],
        tools: &[ToolDefinition],
        _options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        assert!(tools.iter().any(|t| t.name == "done"));
        self.tool_calls.fetch_add(1, Ordering::SeqCst);
        let turn = self.turns.lock().unwrap().pop_front();
        match (turn, &self.fallback) {
            (Some(turn), _) => Self::play(turn).await,
            (None, Some(fallback)) => Ok(fallback.clone()),
            (None, None) => Ok(LLMResponse::text("script exhausted")),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Browser double that records actions and counts releases
#[derive(Default)]
struct FakeBrowser {
    executed: Mutex<Vec<String>>,
    closes: AtomicUsize,
    missing_binary: bool,
    failing_close: bool,
}

impl FakeBrowser {
    fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserRuntime for FakeBrowser {
    async fn execute(&self, tool_call: &ToolCall) -> Result<ToolResult> {
        if self.missing_binary {
            return Err(BrowserAgentError::AgentBrowserNotFound);
        }
        self.executed.lock().unwrap().push(tool_call.name.clone());
        match tool_call.name.as_str() {
            "browser_url" => Ok(ToolResult::success(
                "browser_url",
                "Navigated to https://example.com (title: \"Example Domain\")",
            )),
            "browser_click" if tool_call.get_string("ref").as_deref() == Some("e99") => {
                Err(BrowserAgentError::browser("Element @e99 not found"))
            }
            name => Ok(ToolResult::success(name, "ok")),
        }
    }

    async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.failing_close {
            Err(BrowserAgentError::browser("session already gone"))
        } else {
            Ok(())
        }
    }
}

fn run_config(max_steps: i64) -> RunConfig {
    let raw = RawInputs::default()
        .with_model("anthropic.claude-3-haiku-20240307-v1:0")
        .with_region("us-west-2")
        .with_temperature(0.3)
        .with_max_steps(max_steps)
        .with_credentials(Credentials::new("AKIDEXAMPLE", "example-secret"));
    resolve(&raw).expect("valid configuration")
}

fn call(name: &str, args: serde_json::Value) -> ToolCall {
    ToolCall::new(name, args)
}

fn tools(calls: Vec<ToolCall>) -> Turn {
    Turn::Reply(LLMResponse::tools(calls))
}

fn done(answer: &str) -> Turn {
    tools(vec![call("done", serde_json::json!({ "answer": answer }))])
}

fn open_example() -> ToolCall {
    call(
        "browser_url",
        serde_json::json!({ "url": "https://example.com" }),
    )
}

/// Run a session to completion and collect the streamed events
async fn run_session(
    llm: Arc<ScriptedLlm>,
    browser: Arc<FakeBrowser>,
    max_steps: i64,
    cancel: CancellationToken,
) -> (RunResult, Vec<StepEvent>) {
    let task = TaskRequest::new(TITLE_TASK, run_config(max_steps)).unwrap();
    let session = AgentSession::new(llm, browser);
    let (sink, mut rx) = StepSink::channel();

    let result = session.run(task, sink, cancel).await;

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    (result, events)
}

fn step_indices(events: &[StepEvent]) -> Vec<u32> {
    events.iter().map(|e| e.step_index).collect()
}

#[tokio::test]
async fn test_haiku_us_west_2_title_scenario() {
    let llm = Arc::new(ScriptedLlm::new(vec![
        tools(vec![open_example()]),
        tools(vec![call("browser_get_text", serde_json::json!({}))]),
        done("The page title is \"Example Domain\""),
    ]));
    let browser = Arc::new(FakeBrowser::default());

    let (result, events) =
        run_session(llm.clone(), browser.clone(), 5, CancellationToken::new()).await;

    match &result {
        RunResult::Success {
            transcript,
            final_answer,
            truncated,
        } => {
            assert!(transcript.len() <= 5);
            assert_eq!(step_indices(transcript), vec![1, 2]);
            assert_eq!(transcript, &events);
            assert!(final_answer.contains("Example Domain"));
            assert!(!truncated);
        }
        other => panic!("expected success, got {:?}", other),
    }
    assert_eq!(events[0].action, "browser_url");
    assert_eq!(events[0].description, "browser_url(url=https://example.com)");
    assert_eq!(browser.executed(), vec!["browser_url", "browser_get_text"]);
    assert_eq!(llm.tool_calls.load(Ordering::SeqCst), 3);
    assert_eq!(browser.closes(), 1);
}

#[tokio::test]
async fn test_steps_are_contiguous_across_turns() {
    let llm = Arc::new(ScriptedLlm::new(vec![
        tools(vec![
            open_example(),
            call("browser_snapshot", serde_json::json!({})),
        ]),
        tools(vec![
            call("browser_click", serde_json::json!({ "ref": "e1" })),
            call("browser_get_text", serde_json::json!({ "ref": "e2" })),
        ]),
        Turn::Reply(LLMResponse::text("Example Domain")),
    ]));
    let browser = Arc::new(FakeBrowser::default());

    let (result, events) = run_session(llm, browser.clone(), 10, CancellationToken::new()).await;

    assert!(result.is_success());
    assert_eq!(step_indices(&events), vec![1, 2, 3, 4]);
    assert!(events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    assert_eq!(browser.closes(), 1);
}

#[tokio::test]
async fn test_failed_action_is_an_observation() {
    let llm = Arc::new(ScriptedLlm::new(vec![
        tools(vec![call("browser_click", serde_json::json!({ "ref": "e99" }))]),
        tools(vec![call("browser_teleport", serde_json::json!({}))]),
        done("Could not find the element"),
    ]));
    let browser = Arc::new(FakeBrowser::default());

    let (result, events) = run_session(llm, browser.clone(), 5, CancellationToken::new()).await;

    assert!(result.is_success());
    assert_eq!(events.len(), 2);
    assert!(!events[0].success);
    assert!(!events[1].success);
    assert_eq!(events[1].action, "browser_teleport");
    assert_eq!(browser.closes(), 1);
}

#[tokio::test]
async fn test_step_ceiling_with_synthesized_answer() {
    let llm = Arc::new(
        ScriptedLlm::new(vec![
            tools(vec![
                open_example(),
                call("browser_snapshot", serde_json::json!({})),
            ]),
            // Only one of these fits under the ceiling
            tools(vec![
                call("browser_get_text", serde_json::json!({})),
                call("browser_scroll", serde_json::json!({ "direction": "down" })),
            ]),
        ])
        .with_synthesis(Turn::Reply(LLMResponse::text("Example Domain"))),
    );
    let browser = Arc::new(FakeBrowser::default());

    let (result, events) =
        run_session(llm.clone(), browser.clone(), 3, CancellationToken::new()).await;

    match result {
        RunResult::Success {
            transcript,
            final_answer,
            truncated,
        } => {
            assert!(truncated);
            assert_eq!(final_answer, "Example Domain");
            assert_eq!(step_indices(&transcript), vec![1, 2, 3]);
        }
        other => panic!("expected truncated success, got {:?}", other),
    }
    assert_eq!(events.len(), 3);
    assert!(!browser.executed().contains(&"browser_scroll".to_string()));
    assert_eq!(llm.synthesis_calls.load(Ordering::SeqCst), 1);
    assert_eq!(browser.closes(), 1);
}

#[tokio::test]
async fn test_step_ceiling_without_answer_fails() {
    let llm = Arc::new(ScriptedLlm::endless(LLMResponse::tools(vec![call(
        "browser_scroll",
        serde_json::json!({ "direction": "down" }),
    )])));
    let browser = Arc::new(FakeBrowser::default());

    let (result, events) = run_session(llm, browser.clone(), 2, CancellationToken::new()).await;

    assert_eq!(result.error_kind(), Some(ErrorKind::StepLimitExceeded));
    assert_eq!(step_indices(&events), vec![1, 2]);
    assert_eq!(browser.closes(), 1);
}

#[tokio::test]
async fn test_step_ceiling_with_failing_synthesis() {
    let llm = Arc::new(
        ScriptedLlm::endless(LLMResponse::tools(vec![open_example()])).with_synthesis(
            Turn::Fail(BrowserAgentError::bedrock("ThrottlingException: slow down")),
        ),
    );
    let browser = Arc::new(FakeBrowser::default());

    let (result, _) = run_session(llm, browser.clone(), 1, CancellationToken::new()).await;

    assert_eq!(result.error_kind(), Some(ErrorKind::StepLimitExceeded));
    assert_eq!(browser.closes(), 1);
}

#[tokio::test]
async fn test_invalid_credentials_report_auth_error() {
    let llm = Arc::new(ScriptedLlm::new(vec![Turn::Fail(BrowserAgentError::Auth(
        "UnrecognizedClientException: The security token included in the request is invalid"
            .to_string(),
    ))]));
    let browser = Arc::new(FakeBrowser::default());

    let (result, events) = run_session(llm, browser.clone(), 5, CancellationToken::new()).await;

    assert_eq!(result.error_kind(), Some(ErrorKind::AuthError));
    assert!(events.is_empty());
    assert_eq!(browser.closes(), 1);

    let payload = present(&result);
    let error = payload.error.expect("error section");
    assert_eq!(error.kind, "auth_error");
    assert!(error.hint.contains("aws configure"));
    assert!(error.hint.contains("AWS_ACCESS_KEY_ID"));
}

#[tokio::test]
async fn test_model_errors_are_classified() {
    let cases = vec![
        (
            BrowserAgentError::AccessDenied("You don't have access to the model".to_string()),
            ErrorKind::AccessDenied,
        ),
        (
            BrowserAgentError::ModelUnavailable {
                model: "anthropic.claude-3-opus-20240229-v1:0".to_string(),
                region: "us-west-2".to_string(),
                message: "The provided model identifier is invalid".to_string(),
            },
            ErrorKind::ModelUnavailable,
        ),
        (
            BrowserAgentError::bedrock("InternalServerException"),
            ErrorKind::AgentError,
        ),
    ];

    for (err, expected) in cases {
        let llm = Arc::new(ScriptedLlm::new(vec![Turn::Fail(err)]));
        let browser = Arc::new(FakeBrowser::default());
        let (result, _) = run_session(llm, browser.clone(), 5, CancellationToken::new()).await;
        assert_eq!(result.error_kind(), Some(expected));
        assert_eq!(browser.closes(), 1);
    }
}

#[tokio::test]
async fn test_missing_agent_browser() {
    let llm = Arc::new(ScriptedLlm::new(vec![tools(vec![open_example()])]));
    let browser = Arc::new(FakeBrowser {
        missing_binary: true,
        ..Default::default()
    });

    let (result, events) = run_session(llm, browser.clone(), 5, CancellationToken::new()).await;

    assert_eq!(result.error_kind(), Some(ErrorKind::MissingDependency));
    assert!(events.is_empty());
    assert_eq!(browser.closes(), 1);
}

#[tokio::test]
async fn test_panic_in_loop_is_agent_error() {
    let llm = Arc::new(ScriptedLlm::new(vec![
        tools(vec![open_example()]),
        Turn::Panic,
    ]));
    let browser = Arc::new(FakeBrowser::default());

    let (result, events) = run_session(llm, browser.clone(), 5, CancellationToken::new()).await;

    assert_eq!(result.error_kind(), Some(ErrorKind::AgentError));
    match result {
        RunResult::Failure(failure) => assert!(failure.message.contains("scripted model panic")),
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(events.len(), 1);
    assert_eq!(browser.closes(), 1);
}

#[tokio::test]
async fn test_cancel_before_start() {
    let llm = Arc::new(ScriptedLlm::new(vec![done("never")]));
    let browser = Arc::new(FakeBrowser::default());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let (result, events) = run_session(llm.clone(), browser.clone(), 5, cancel).await;

    assert_eq!(result.error_kind(), Some(ErrorKind::Cancelled));
    assert!(events.is_empty());
    assert_eq!(llm.tool_calls.load(Ordering::SeqCst), 0);
    assert_eq!(browser.closes(), 1);
}

#[tokio::test]
async fn test_cancel_during_model_call() {
    let llm = Arc::new(ScriptedLlm::new(vec![tools(vec![open_example()]), Turn::Hang]));
    let browser = Arc::new(FakeBrowser::default());
    let cancel = CancellationToken::new();

    let task = TaskRequest::new(TITLE_TASK, run_config(5)).unwrap();
    let session = AgentSession::new(llm.clone(), browser.clone());
    let (sink, mut rx) = StepSink::channel();
    let handle = tokio::spawn(session.run(task, sink, cancel.clone()));

    // The first step arrives before the hanging turn
    let first = timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("first step in time")
        .expect("channel open");
    assert_eq!(first.step_index, 1);

    cancel.cancel();
    let result = timeout(Duration::from_secs(5), handle)
        .await
        .expect("run stops promptly")
        .expect("session task");

    assert_eq!(result.error_kind(), Some(ErrorKind::Cancelled));
    assert_eq!(browser.closes(), 1);
}

#[tokio::test]
async fn test_dropped_run_still_releases_browser() {
    let llm = Arc::new(ScriptedLlm::new(vec![Turn::Hang]));
    let browser = Arc::new(FakeBrowser::default());

    let task = TaskRequest::new(TITLE_TASK, run_config(5)).unwrap();
    let session = AgentSession::new(llm.clone(), browser.clone());
    let handle = tokio::spawn(session.run(task, StepSink::discard(), CancellationToken::new()));

    while llm.tool_calls.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }
    handle.abort();
    assert!(handle.await.unwrap_err().is_cancelled());

    timeout(Duration::from_secs(5), async {
        while browser.closes() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("browser released");
    assert_eq!(browser.closes(), 1);
}

#[tokio::test]
async fn test_release_failure_does_not_fail_run() {
    let llm = Arc::new(ScriptedLlm::new(vec![done("Example Domain")]));
    let browser = Arc::new(FakeBrowser {
        failing_close: true,
        ..Default::default()
    });

    let (result, events) = run_session(llm, browser.clone(), 5, CancellationToken::new()).await;

    assert!(result.is_success());
    assert!(events.is_empty());
    assert_eq!(browser.closes(), 1);
}

#[tokio::test]
async fn test_dropped_receiver_does_not_fail_run() {
    let llm = Arc::new(ScriptedLlm::new(vec![
        tools(vec![open_example()]),
        done("Example Domain"),
    ]));
    let browser = Arc::new(FakeBrowser::default());

    let task = TaskRequest::new(TITLE_TASK, run_config(5)).unwrap();
    let (sink, rx) = StepSink::channel();
    drop(rx);

    let result = AgentSession::new(llm, browser.clone())
        .run(task, sink, CancellationToken::new())
        .await;

    assert!(result.is_success());
    assert_eq!(browser.closes(), 1);
}

#[test]
fn test_unknown_region_rejected_before_session() {
    let raw = RawInputs::default()
        .with_model("anthropic.claude-3-haiku-20240307-v1:0")
        .with_region("mars-central-1")
        .with_credentials(Credentials::new("AKIDEXAMPLE", "example-secret"));

    let err = tokio_test::assert_err!(resolve(&raw));
    assert_eq!(err, ConfigError::UnknownRegion("mars-central-1".to_string()));

    let payload = present_config_error(&err);
    assert_eq!(payload.error.unwrap().kind, "unknown_region");
}

#[test]
fn test_empty_task_rejected() {
    let err = tokio_test::assert_err!(TaskRequest::new("   ", run_config(5)));
    assert_eq!(err, ConfigError::EmptyTask);
}

#[test]
fn test_presenting_a_run_is_idempotent() {
    let llm = Arc::new(ScriptedLlm::new(vec![
        tools(vec![open_example()]),
        done("Example Domain"),
    ]));
    let browser = Arc::new(FakeBrowser::default());
    let config = run_config(5);

    let (result, _) = tokio_test::block_on(run_session(
        llm,
        browser,
        5,
        CancellationToken::new(),
    ));

    let first = present_with_config(&result, &config);
    let second = present_with_config(&result, &config);
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    assert_eq!(first.render_text(), second.render_text());
    assert!(first.render_text().contains("us-west-2"));
    assert!(!first.to_json().unwrap().contains("example-secret"));
}
