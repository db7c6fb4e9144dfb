//! CLI commands
//!
//! Special commands that can be executed in the REPL.
//!
//! A command word followed by free text (`Set up a GitHub account`) is a task,
//! not a command. Prefix the line with `/` to force command parsing.

use crate::cli::runner::Overrides;
use crate::cli::sample_tasks::{format_sample_tasks, sample_task, SAMPLE_TASKS};
use crate::core::run_config::{MAX_STEPS_RANGE, TEMPERATURE_RANGE};
use crate::core::{resolve, Config, ConfigError, ConfigField, ModelId, Region};
use crate::llm::models::{format_models, format_regions};

/// Result of parsing a command
#[derive(Debug, PartialEq)]
pub enum CommandResult {
    /// Not a command; run the line as a task
    Continue(String),
    /// Command was handled, show output
    Handled(String),
    /// Show the effective settings for the next task
    Status,
    /// Exit the REPL
    Exit,
}

const SETTING_KEYS: [&str; 8] = [
    "model",
    "region",
    "temperature",
    "temp",
    "steps",
    "max_steps",
    "max-steps",
    "headed",
];

/// Parse and handle special commands
pub fn handle_command(input: &str, overrides: &mut Overrides) -> CommandResult {
    let input = input.trim();
    let (cmd, args) = match input.split_once(char::is_whitespace) {
        Some((cmd, args)) => (cmd, args.trim()),
        None => (input, ""),
    };
    let forced = input.starts_with('/');
    let bare = args.is_empty() || forced;
    let cmd = cmd.trim_start_matches('/').to_lowercase();

    match cmd.as_str() {
        "exit" | "quit" | "q" if bare => CommandResult::Exit,

        "help" | "?" if bare => CommandResult::Handled(help_text()),

        "models" if bare => {
            CommandResult::Handled(format!("Supported models:\n{}", format_models()))
        }

        "regions" if bare => {
            CommandResult::Handled(format!("Supported regions:\n{}", format_regions()))
        }

        "examples" if bare => {
            CommandResult::Handled(format!("Sample tasks:\n{}", format_sample_tasks()))
        }

        "status" if bare => CommandResult::Status,

        "use" if bare || args.parse::<usize>().is_ok() => use_sample_task(args),

        "set" if bare || is_setting(args) => {
            CommandResult::Handled(handle_set_command(args, overrides))
        }

        _ => {
            if forced {
                CommandResult::Handled(format!(
                    "Unknown command: {}. Type 'help' for available commands.",
                    cmd
                ))
            } else {
                CommandResult::Continue(input.to_string())
            }
        }
    }
}

fn is_setting(args: &str) -> bool {
    let key = args.split_whitespace().next().unwrap_or_default().to_lowercase();
    SETTING_KEYS.contains(&key.as_str())
}

/// Pick a sample task by number
fn use_sample_task(args: &str) -> CommandResult {
    match args.parse::<usize>().ok().and_then(sample_task) {
        Some(task) => CommandResult::Continue(task.to_string()),
        None => CommandResult::Handled(format!(
            "Usage: use <1-{}>. Type 'examples' to list the sample tasks.",
            SAMPLE_TASKS.len()
        )),
    }
}

/// Handle 'set' subcommands
fn handle_set_command(args: &str, overrides: &mut Overrides) -> String {
    let (key, value) = match args.split_once(' ') {
        Some((key, value)) => (key.to_lowercase(), value.trim()),
        None => (args.to_lowercase(), ""),
    };

    if key.is_empty() || value.is_empty() {
        return "Usage: set <model|region|temperature|steps|headed> <value>\n\
                Examples:\n\
                \x20 set model anthropic.claude-3-haiku-20240307-v1:0\n\
                \x20 set region us-west-2\n\
                \x20 set temperature 0.3\n\
                \x20 set steps 10\n\
                \x20 set headed on"
            .to_string();
    }

    match apply_setting(&key, value, overrides) {
        Ok(message) => message,
        Err(e) => format!("Not changed: {}", e),
    }
}

fn apply_setting(key: &str, value: &str, overrides: &mut Overrides) -> Result<String, ConfigError> {
    match key {
        "model" => {
            let model: ModelId = value.parse()?;
            overrides.model = Some(model.to_string());
            Ok(format!("Model set to: {}", model))
        }
        "region" => {
            let region: Region = value.parse()?;
            overrides.region = Some(region.to_string());
            Ok(format!("Region set to: {}", region))
        }
        "temperature" | "temp" => {
            let temperature: f64 = parse_number(ConfigField::Temperature, value)?;
            if !TEMPERATURE_RANGE.contains(&temperature) {
                return Err(ConfigError::OutOfRange {
                    field: ConfigField::Temperature,
                    value: value.to_string(),
                    range: "0.0..=1.0",
                });
            }
            overrides.temperature = Some(temperature);
            Ok(format!("Temperature set to: {}", temperature))
        }
        "steps" | "max_steps" | "max-steps" => {
            let max_steps: i64 = parse_number(ConfigField::MaxSteps, value)?;
            if !MAX_STEPS_RANGE.contains(&max_steps) {
                return Err(ConfigError::OutOfRange {
                    field: ConfigField::MaxSteps,
                    value: value.to_string(),
                    range: "1..=20",
                });
            }
            overrides.max_steps = Some(max_steps);
            Ok(format!("Max steps set to: {}", max_steps))
        }
        "headed" => {
            let headed = matches!(value.to_lowercase().as_str(), "on" | "true" | "1" | "yes");
            overrides.headed = Some(headed);
            Ok(format!("Headed browser: {}", if headed { "ON" } else { "OFF" }))
        }
        _ => Ok(format!(
            "Unknown setting: {}. Available: model, region, temperature, steps, headed",
            key
        )),
    }
}

fn parse_number<T: std::str::FromStr>(field: ConfigField, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

/// Effective settings for the next task
pub async fn status_text(config: &Config, overrides: &Overrides) -> String {
    let headed = overrides.headed.unwrap_or(config.browser.headed);
    let settings = match overrides.gather(config).await.and_then(|raw| resolve(&raw)) {
        Ok(run) => run
            .summary_lines()
            .into_iter()
            .chain(std::iter::once(format!(
                "Credentials: {}",
                run.credentials.access_key_id_masked()
            )))
            .collect::<Vec<_>>()
            .join("\n"),
        Err(e) => format!("Not ready: {}", e),
    };

    format!(
        "bedrock-browser status:\n\
         ─────────────────────────────\n\
         {}\n\
         Headed:      {}\n\
         Debug:       {}",
        settings,
        if headed { "on" } else { "off" },
        if config.agent.debug { "on" } else { "off" }
    )
}

/// Generate help text
fn help_text() -> String {
    r#"bedrock-browser commands:
─────────────────────────────────────────────
  help, ?          Show this help message
  exit, quit, q    Exit
  status           Show the settings for the next task
  models           List supported Claude models
  regions          List supported AWS regions
  examples         List sample tasks
  use <n>          Run sample task n

  set model <id>             Choose the Claude model
  set region <region>        Choose the AWS region
  set temperature <0.0-1.0>  Sampling temperature
  set steps <1-20>           Maximum browser actions per task
  set headed <on|off>        Show the browser window

Anything else is run as a task, e.g.
  Go to example.com and report the page title
A line that starts with a command word but reads as a sentence
("Set up a GitHub account") also runs as a task; prefix it with /
to force the command.

Keyboard Shortcuts:
  Ctrl+C           Cancel the running task
  Ctrl+D           Exit
─────────────────────────────────────────────"#
        .to_string()
}
