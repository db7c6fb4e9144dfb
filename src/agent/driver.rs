//! Agent session driver
//!
//! Runs one task to completion as a ReAct loop (Thought → Action →
//! Observation) against a model and a browser session, streaming a
//! [`StepEvent`] for every executed action.
//!
//! `run` never returns an error: every outcome, including panics inside the
//! loop and cancellation, is folded into a [`RunResult`], and the browser
//! session is released exactly once before it returns.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::agent::loop_state::{AgentLoopState, Observation};
use crate::core::{
    BrowserAgentError, Config, ErrorKind, Message, RunConfig, RunResult, StepEvent,
    TaskRequest, ToolDefinition,
};
use crate::llm::{BedrockClient, GenerateOptions, LLMProvider};
use crate::tools::{BrowserExecutor, BrowserRuntime, ToolRegistry};

const SYSTEM_PROMPT: &str = r#"You are a web browsing agent. You complete the user's task by driving a real browser through tools, following the ReAct pattern:
1. THINK about what you need to do next.
2. ACT by calling exactly the browser tools you need.
3. OBSERVE the results and continue, or finish.

## Browser Workflow
1. `browser_url`: Navigate to the site. The observation lists interactive elements with [ref=eN] tags.
2. Pick the target element's ref from the LATEST observation.
3. `browser_fill`, `browser_click`, `browser_press`: act on that ref, e.g. {"ref": "e5"}.
4. `browser_get_text`: read content once you are on the right page.

## Rules
- Every tool call uses one step of a limited budget. Do not waste steps.
- Use EXACT refs from snapshots. Do not invent refs, selectors or URLs.
- When the task is complete, call `done` with the final answer."#;

/// Receiving end of a session's progress channel
pub type StepReceiver = mpsc::UnboundedReceiver<StepEvent>;

/// Sending end of a session's progress channel
///
/// Emitting never fails: if the receiver is gone the event is dropped.
#[derive(Debug, Clone, Default)]
pub struct StepSink {
    tx: Option<mpsc::UnboundedSender<StepEvent>>,
}

impl StepSink {
    /// Create a connected sink/receiver pair
    pub fn channel() -> (Self, StepReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that discards every event
    pub fn discard() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: StepEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).is_err() {
                debug!("step receiver dropped; event discarded");
            }
        }
    }
}

/// Closes the browser exactly once
///
/// `release` is the normal path. If the guard is dropped unreleased (the run
/// future itself was dropped) the close is spawned onto the current runtime.
struct SessionGuard {
    browser: Option<Arc<dyn BrowserRuntime>>,
}

impl SessionGuard {
    fn new(browser: Arc<dyn BrowserRuntime>) -> Self {
        Self {
            browser: Some(browser),
        }
    }

    async fn release(mut self) {
        if let Some(browser) = self.browser.take() {
            close_browser(browser).await;
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some(browser) = self.browser.take() {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(close_browser(browser));
                }
                Err(_) => warn!("no runtime available to release browser session"),
            }
        }
    }
}

async fn close_browser(browser: Arc<dyn BrowserRuntime>) {
    match browser.close().await {
        Ok(()) => debug!("browser session released"),
        Err(e) => warn!(error = %e, "failed to release browser session"),
    }
}

/// One agent session: a model, a browser and the tools connecting them
pub struct AgentSession {
    llm: Arc<dyn LLMProvider>,
    browser: Arc<dyn BrowserRuntime>,
    tools: ToolRegistry,
    extra_instructions: Option<String>,
    max_observation_chars: usize,
}

impl AgentSession {
    /// Create a session from explicit collaborators
    pub fn new(llm: Arc<dyn LLMProvider>, browser: Arc<dyn BrowserRuntime>) -> Self {
        Self {
            llm,
            browser,
            tools: ToolRegistry::new(),
            extra_instructions: None,
            max_observation_chars: 6000,
        }
    }

    /// Bedrock client plus a fresh agent-browser session for one task
    pub fn for_task(config: &Config, run: &RunConfig) -> Self {
        let llm = BedrockClient::from_run_config(run, config);
        let browser = BrowserExecutor::from_config(&config.browser);
        debug!(session = %browser.session_name(), "created browser session");

        let mut session = Self::new(Arc::new(llm), Arc::new(browser))
            .with_max_observation_chars(config.agent.max_observation_chars);
        if let Some(instructions) = &config.agent.system_prompt {
            session = session.with_instructions(instructions.as_str());
        }
        session
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.extra_instructions = Some(instructions.into());
        self
    }

    pub fn with_max_observation_chars(mut self, chars: usize) -> Self {
        self.max_observation_chars = chars;
        self
    }

    /// Run a task to completion
    pub async fn run(
        self,
        task: TaskRequest,
        events: StepSink,
        cancel: CancellationToken,
    ) -> RunResult {
        let guard = SessionGuard::new(Arc::clone(&self.browser));
        let config = task.config();
        info!(
            provider = self.llm.name(),
            model = %config.model,
            region = %config.region,
            max_steps = config.max_steps,
            "starting agent session"
        );

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => cancelled(),
            outcome = AssertUnwindSafe(self.drive(&task, &events, &cancel)).catch_unwind() => {
                match outcome {
                    Ok(result) => result,
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        warn!(%message, "agent loop panicked");
                        RunResult::failure(
                            ErrorKind::AgentError,
                            format!("Agent loop panicked: {}", message),
                        )
                    }
                }
            }
        };

        guard.release().await;

        match &result {
            RunResult::Success { transcript, truncated, .. } => {
                info!(steps = transcript.len(), truncated, "agent session succeeded")
            }
            RunResult::Failure(failure) => {
                info!(kind = %failure.kind, "agent session failed")
            }
        }
        result
    }

    async fn drive(
        &self,
        task: &TaskRequest,
        events: &StepSink,
        cancel: &CancellationToken,
    ) -> RunResult {
        let config = task.config();
        let model = config.model.invoke_id();
        let options = GenerateOptions {
            temperature: Some(config.temperature),
            max_tokens: Some(config.max_tokens),
            stop: None,
        };
        let tools: Vec<ToolDefinition> = self.tools.all_definitions().to_vec();

        let mut state = AgentLoopState::new(config.max_steps)
            .with_max_observation_chars(self.max_observation_chars);
        let mut transcript: Vec<StepEvent> = Vec::new();

        while state.should_continue() {
            if cancel.is_cancelled() {
                return cancelled();
            }

            let messages = self.build_messages(task.instruction(), &state);
            debug!(
                turn = state.turn + 1,
                steps = state.steps,
                observations = state.observations.len(),
                "calling model"
            );

            let response = match self
                .llm
                .chat_with_tools(&model, &messages, &tools, Some(options.clone()))
                .await
            {
                Ok(response) => response,
                Err(e) => return failure_from(&e),
            };
            state.next_turn();

            if response.tool_calls.is_empty() {
                state.final_answer = Some(response.content.trim().to_string());
                break;
            }

            for call in &response.tool_calls {
                if self.tools.is_terminal(call) {
                    let answer = call
                        .get_string("answer")
                        .unwrap_or_else(|| response.content.clone());
                    state.final_answer = Some(answer.trim().to_string());
                    break;
                }

                if state.remaining_steps() == 0 {
                    debug!(action = %call.name, "step ceiling reached; skipping tool call");
                    break;
                }

                if cancel.is_cancelled() {
                    return cancelled();
                }

                debug!(action = %call.summary(), "executing");
                let observation = match self.tools.execute(self.browser.as_ref(), call).await {
                    Ok(result) => Observation::from(result),
                    Err(e @ BrowserAgentError::AgentBrowserNotFound) => return failure_from(&e),
                    Err(e) => Observation::error(&call.name, e.to_string()),
                };

                let success = observation.success;
                let step_index = state.record(observation);
                let event = StepEvent {
                    step_index,
                    action: call.name.clone(),
                    description: call.summary(),
                    success,
                    timestamp: Utc::now(),
                };
                info!(step = step_index, action = %event.action, success, "step complete");
                events.emit(event.clone());
                transcript.push(event);
            }
        }

        match state.final_answer.take() {
            Some(answer) if !answer.is_empty() => RunResult::Success {
                transcript,
                final_answer: answer,
                truncated: false,
            },
            Some(_) => RunResult::failure(
                ErrorKind::AgentError,
                "The model ended the task without an answer",
            ),
            None => {
                if cancel.is_cancelled() {
                    return cancelled();
                }
                self.synthesize(task, &model, &options, &state, transcript)
                    .await
            }
        }
    }

    /// Answer from observations once the step ceiling is hit
    async fn synthesize(
        &self,
        task: &TaskRequest,
        model: &str,
        options: &GenerateOptions,
        state: &AgentLoopState,
        transcript: Vec<StepEvent>,
    ) -> RunResult {
        info!(max_steps = state.max_steps, "step limit reached; synthesizing answer");

        let prompt = format!(
            "Task: {}\n\nYou have used all {} browser steps. Based only on the observations below, \
             answer the task as well as you can. If they do not contain the answer, reply with an \
             empty message.{}",
            task.instruction(),
            state.max_steps,
            state.format_observations()
        );
        let messages = vec![Message::user(prompt)];

        let limit_message = format!(
            "Reached the limit of {} steps without completing the task",
            state.max_steps
        );

        match self.llm.chat(model, &messages, Some(options.clone())).await {
            Ok(response) if !response.content.trim().is_empty() => RunResult::Success {
                transcript,
                final_answer: response.content.trim().to_string(),
                truncated: true,
            },
            Ok(_) => RunResult::failure(ErrorKind::StepLimitExceeded, limit_message),
            Err(e) => {
                warn!(error = %e, "answer synthesis failed");
                RunResult::failure(ErrorKind::StepLimitExceeded, limit_message)
            }
        }
    }

    fn build_messages(&self, instruction: &str, state: &AgentLoopState) -> Vec<Message> {
        let system_prompt = match &self.extra_instructions {
            Some(extra) => format!("{}\n\n## Additional Instructions\n{}", SYSTEM_PROMPT, extra),
            None => SYSTEM_PROMPT.to_string(),
        };

        let user_content = format!(
            "Task: {}\n\nSteps remaining: {} of {}{}",
            instruction,
            state.remaining_steps(),
            state.max_steps,
            state.format_observations()
        );

        vec![Message::system(system_prompt), Message::user(user_content)]
    }
}

fn failure_from(err: &BrowserAgentError) -> RunResult {
    let kind = ErrorKind::from(err);
    warn!(%kind, error = %err, "agent session error");
    RunResult::failure(kind, err.to_string())
}

fn cancelled() -> RunResult {
    info!("agent session cancelled");
    RunResult::failure(ErrorKind::Cancelled, "The run was cancelled")
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(step_index: u32) -> StepEvent {
        StepEvent {
            step_index,
            action: "browser_url".to_string(),
            description: "browser_url(url=https://example.com)".to_string(),
            success: true,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_sink_delivers_in_order() {
        let (sink, mut rx) = StepSink::channel();
        sink.emit(event(1));
        sink.emit(event(2));
        assert_eq!(rx.try_recv().unwrap().step_index, 1);
        assert_eq!(rx.try_recv().unwrap().step_index, 2);
    }

    #[test]
    fn test_sink_survives_dropped_receiver() {
        let (sink, rx) = StepSink::channel();
        drop(rx);
        sink.emit(event(1));
        StepSink::discard().emit(event(2));
    }

    #[tokio::test]
    async fn test_configured_instructions_reach_system_prompt() {
        let run = crate::core::resolve(
            &crate::core::RawInputs::default()
                .with_credentials(crate::core::Credentials::new("AKID", "secret")),
        )
        .unwrap();
        let mut config = Config::default();
        config.agent.system_prompt = Some("Prefer English-language pages".to_string());

        let session = AgentSession::for_task(&config, &run);
        let messages = session.build_messages("find the forecast", &AgentLoopState::new(3));
        assert!(messages[0].content.starts_with(SYSTEM_PROMPT));
        assert!(messages[0]
            .content
            .ends_with("## Additional Instructions\nPrefer English-language pages"));
        assert!(messages[1].content.contains("Steps remaining: 3 of 3"));

        let plain = AgentSession::for_task(&Config::default(), &run);
        let messages = plain.build_messages("x", &AgentLoopState::new(1));
        assert_eq!(messages[0].content, SYSTEM_PROMPT);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
