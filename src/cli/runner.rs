//! Task runner shared by the one-shot CLI and the REPL
//!
//! Resolves the configuration, runs one agent session while printing its
//! steps as they arrive, and presents the outcome.

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::agent::{AgentSession, StepSink};
use crate::core::{
    resolve, Config, ConfigError, ErrorKind, RawInputs, RunResult, TaskRequest,
};
use crate::report::{format_step, present_config_error, present_with_config, DisplayPayload};

/// Exit code of a successful run
pub const EXIT_SUCCESS: u8 = 0;
/// Exit code of a run that failed after starting
pub const EXIT_RUN_FAILURE: u8 = 1;
/// Exit code of a configuration rejected before any session started
pub const EXIT_CONFIG_ERROR: u8 = 2;

/// Values chosen on the command line or with REPL `set`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub model: Option<String>,
    pub region: Option<String>,
    pub temperature: Option<f64>,
    pub max_steps: Option<i64>,
    pub headed: Option<bool>,
}

impl Overrides {
    /// Layer these values over inputs gathered from config and environment
    pub fn apply(&self, mut raw: RawInputs) -> RawInputs {
        if let Some(model) = &self.model {
            raw.model = Some(model.clone());
        }
        if let Some(region) = &self.region {
            raw.region = Some(region.clone());
        }
        if let Some(temperature) = self.temperature {
            raw.temperature = Some(temperature);
        }
        if let Some(max_steps) = self.max_steps {
            raw.max_steps = Some(max_steps);
        }
        raw
    }

    /// Apply the settings that live in the config file rather than `RunConfig`
    pub fn apply_config(&self, config: &mut Config) {
        if let Some(headed) = self.headed {
            config.browser.headed = headed;
        }
    }

    /// Inputs for a run: config file, AWS profile, environment, overrides
    pub async fn gather(&self, config: &Config) -> Result<RawInputs, ConfigError> {
        RawInputs::gather(config).await.map(|raw| self.apply(raw))
    }
}

/// Finished task: what to show and how to exit
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub payload: DisplayPayload,
    pub exit_code: u8,
}

impl TaskOutcome {
    fn config_error(err: &ConfigError) -> Self {
        Self {
            payload: present_config_error(err),
            exit_code: EXIT_CONFIG_ERROR,
        }
    }
}

/// Resolve, run and present one task
///
/// Steps are printed to stdout as they happen unless `quiet` is set. Ctrl-C
/// cancels the run.
pub async fn run_task(config: &Config, overrides: &Overrides, task: &str, quiet: bool) -> TaskOutcome {
    let mut config = config.clone();
    overrides.apply_config(&mut config);

    let run_config = match overrides.gather(&config).await.and_then(|raw| resolve(&raw)) {
        Ok(run_config) => run_config,
        Err(e) => return TaskOutcome::config_error(&e),
    };
    let request = match TaskRequest::new(task, run_config.clone()) {
        Ok(request) => request,
        Err(e) => return TaskOutcome::config_error(&e),
    };

    let session = AgentSession::for_task(&config, &run_config);
    let result = drive(session, request, quiet).await;

    let exit_code = if result.is_success() {
        EXIT_SUCCESS
    } else {
        EXIT_RUN_FAILURE
    };
    TaskOutcome {
        payload: present_with_config(&result, &run_config),
        exit_code,
    }
}

async fn drive(session: AgentSession, request: TaskRequest, quiet: bool) -> RunResult {
    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("interrupt received; cancelling run");
                cancel.cancel();
            }
        })
    };

    let (sink, mut steps) = StepSink::channel();
    let handle = tokio::spawn(session.run(request, sink, cancel));

    while let Some(event) = steps.recv().await {
        if !quiet {
            println!("  {}", format_step(&event));
        }
    }

    interrupt.abort();

    match handle.await {
        Ok(result) => result,
        Err(e) => {
            warn!(error = %e, "agent session task failed");
            RunResult::failure(ErrorKind::AgentError, format!("Agent session task failed: {}", e))
        }
    }
}
