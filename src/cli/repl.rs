//! Interactive REPL for bedrock-browser
//!
//! Every line that is not a command runs as a fresh task with its own
//! session; `set` changes the parameters of the following tasks.

use std::io::{self, BufRead, Write};

use crate::cli::commands::{handle_command, status_text, CommandResult};
use crate::cli::runner::{run_task, Overrides};
use crate::core::{Config, Result};

/// Interactive REPL (Read-Eval-Print Loop)
pub struct Repl {
    config: Config,
    overrides: Overrides,
}

impl Repl {
    /// Create a REPL with the loaded configuration
    pub fn new() -> Self {
        Self::with_config(Config::load(), Overrides::default())
    }

    /// Create a REPL with custom configuration and starting overrides
    pub fn with_config(config: Config, overrides: Overrides) -> Self {
        Self { config, overrides }
    }

    /// Run the REPL
    pub async fn run(&mut self) -> Result<()> {
        self.print_banner();

        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            print!("Task: ");
            stdout.flush()?;

            let mut input = String::new();
            match stdin.lock().read_line(&mut input) {
                Ok(0) => {
                    // EOF (Ctrl+D)
                    println!("\nGoodbye!");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("Error reading input: {}", e);
                    continue;
                }
            }

            let input = input.trim();
            if input.is_empty() {
                continue;
            }

            match handle_command(input, &mut self.overrides) {
                CommandResult::Exit => {
                    println!("\nGoodbye!");
                    break;
                }
                CommandResult::Handled(output) => {
                    println!("{}\n", output);
                }
                CommandResult::Status => {
                    println!("{}\n", status_text(&self.config, &self.overrides).await);
                }
                CommandResult::Continue(task) => {
                    println!();
                    let outcome = run_task(&self.config, &self.overrides, &task, false).await;
                    println!("\n{}", outcome.payload.render_text());
                }
            }
        }

        Ok(())
    }

    /// Print the startup banner
    fn print_banner(&self) {
        let model = self
            .overrides
            .model
            .as_deref()
            .unwrap_or(&self.config.run.model);
        let region = self
            .overrides
            .region
            .as_deref()
            .or(self.config.aws.region.as_deref())
            .unwrap_or("AWS profile, else us-east-1");

        println!(
            r#"
┌───────────────────────────────────────────────┐
│  bedrock-browser                              │
│  Browser automation with Claude on Bedrock    │
└───────────────────────────────────────────────┘"#
        );
        println!("Model:   {}", model);
        println!("Region:  {}", region);
        println!();
        println!("Commands: help, status, models, regions, examples, use, set, exit");
        println!("─────────────────────────────────────────────────");
    }
}

impl Default for Repl {
    fn default() -> Self {
        Self::new()
    }
}
