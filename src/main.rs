//! bedrock-browser - browser automation agent on Amazon Bedrock
//!
//! Main entry point for the CLI application.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use bedrock_browser::cli::{
    format_sample_tasks, run_task, sample_task, Overrides, Repl, EXIT_CONFIG_ERROR, SAMPLE_TASKS,
};
use bedrock_browser::llm::{format_models, format_regions};
use bedrock_browser::Config;

/// bedrock-browser - browser automation agent on Amazon Bedrock
#[derive(Parser, Debug)]
#[command(name = "bedrock-browser")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Enable debug logging
    #[arg(long, short = 'd', global = true)]
    debug: bool,

    /// Run in headed browser mode (visible window)
    #[arg(long, global = true)]
    headed: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a single task and exit
    Run(RunArgs),
    /// List supported models
    Models,
    /// List supported regions
    Regions,
    /// List sample tasks (run one with `run --example <n>`)
    Examples,
    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Natural-language task for the agent
    #[arg(required_unless_present = "example")]
    task: Option<String>,

    /// Run sample task <n> instead (see `bedrock-browser examples`)
    #[arg(long, short = 'e', conflicts_with = "task")]
    example: Option<usize>,

    /// Claude model id on Bedrock
    #[arg(long, short = 'm')]
    model: Option<String>,

    /// AWS region
    #[arg(long, short = 'r')]
    region: Option<String>,

    /// Sampling temperature (0.0 - 1.0)
    #[arg(long, short = 't', allow_negative_numbers = true)]
    temperature: Option<f64>,

    /// Maximum browser actions (1 - 20)
    #[arg(long, short = 's', allow_negative_numbers = true)]
    max_steps: Option<i64>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the config file path
    Path,
}

fn init_tracing(debug: bool) {
    let default_filter = if debug {
        "bedrock_browser=debug"
    } else {
        "bedrock_browser=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let mut config = Config::load();
    if args.debug {
        config.agent.debug = true;
    }
    init_tracing(config.agent.debug);

    let headed = args.headed.then_some(true);

    match args.command {
        Some(Command::Run(run)) => {
            let task = match (run.task, run.example) {
                (Some(task), _) => task,
                (None, number) => match number.and_then(sample_task) {
                    Some(task) => task.to_string(),
                    None => {
                        eprintln!(
                            "No sample task {}. Choose 1-{} (see `bedrock-browser examples`)",
                            number.unwrap_or_default(),
                            SAMPLE_TASKS.len()
                        );
                        return Ok(ExitCode::from(EXIT_CONFIG_ERROR));
                    }
                },
            };
            let overrides = Overrides {
                model: run.model,
                region: run.region,
                temperature: run.temperature,
                max_steps: run.max_steps,
                headed,
            };
            let outcome = run_task(&config, &overrides, &task, run.json).await;
            if run.json {
                println!("{}", outcome.payload.to_json()?);
            } else {
                println!("\n{}", outcome.payload.render_text());
            }
            Ok(ExitCode::from(outcome.exit_code))
        }
        Some(Command::Models) => {
            println!("Supported models:\n{}", format_models());
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Regions) => {
            println!("Supported regions:\n{}", format_regions());
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Examples) => {
            println!("Sample tasks:\n{}", format_sample_tasks());
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Config { action }) => {
            match action {
                ConfigAction::Show => {
                    println!("# {}", Config::config_file().display());
                    print!("{}", config.to_toml()?);
                }
                ConfigAction::Init { force } => {
                    if Config::config_exists() && !force {
                        println!(
                            "Config already exists at {} (use --force to overwrite)",
                            Config::config_file().display()
                        );
                    } else {
                        let path = Config::default().save()?;
                        println!("Wrote default config to {}", path.display());
                    }
                }
                ConfigAction::Path => println!("{}", Config::config_file().display()),
            }
            Ok(ExitCode::SUCCESS)
        }
        None => {
            let overrides = Overrides {
                headed,
                ..Default::default()
            };
            let mut repl = Repl::with_config(config, overrides);
            repl.run().await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
