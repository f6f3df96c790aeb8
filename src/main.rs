//! kubectl-bridge CLI - apply, poll and clean up workloads through kubectl

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use kubectl_bridge::commands::deploy::{JobOverrides, SpawnOptions};
use kubectl_bridge::commands::{self, parse_key_value, CommandContext, DefinitionSource};
use kubectl_bridge::config::settings::Settings;
use kubectl_bridge::utils::{display_error, logger, prereqs};
use kubectl_bridge::{FailurePolicy, PollingConfig};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kubectl-bridge")]
#[command(author, version, about = "Apply, poll and clean up Kubernetes workloads through kubectl", long_about = None)]
struct Cli {
    /// Verbose output (can be used multiple times: -v, -vv, -vvv)
    /// -v: INFO, -vv: DEBUG, -vvv: TRACE
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Settings file (default: .kubectl-bridge.toml, then ~/.config/kubectl-bridge/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to kubeconfig file
    #[arg(short, long, global = true, env = "KUBECONFIG")]
    kubeconfig: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Template file, parameters and optional anchors document
#[derive(Args)]
struct DefinitionArgs {
    /// Definition template (JSON or YAML)
    #[arg(short, long)]
    file: PathBuf,

    /// Template parameter, may be repeated
    #[arg(short, long = "param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    params: Vec<(String, String)>,

    /// YAML document declaring anchors referenced by the definition
    #[arg(long)]
    anchors: Option<PathBuf>,
}

impl DefinitionArgs {
    fn into_source(self) -> DefinitionSource {
        DefinitionSource {
            file: self.file,
            params: self.params.into_iter().collect(),
            anchors: self.anchors,
        }
    }
}

/// Status polling overrides
#[derive(Args)]
struct PollingArgs {
    /// Number of status checks before giving up
    #[arg(long)]
    attempts: Option<u32>,

    /// Seconds between status checks
    #[arg(long)]
    interval: Option<u64>,
}

impl PollingArgs {
    fn resolve(&self, settings: &Settings) -> PollingConfig {
        settings.polling(self.attempts, self.interval)
    }
}

/// What a one-off pod or job runs
#[derive(Args)]
struct SpawnArgs {
    /// Task name, used in the spawned resource's name
    #[arg(short, long)]
    task: String,

    /// Container field override, value parsed as JSON when possible
    #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_key_value)]
    set: Vec<(String, String)>,

    /// Command to run
    #[arg(last = true)]
    command: Vec<String>,
}

impl SpawnArgs {
    fn into_options(self) -> SpawnOptions {
        SpawnOptions {
            task: self.task,
            command: self.command,
            set: self.set,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Render a definition template and print it
    Render {
        #[command(flatten)]
        definition: DefinitionArgs,

        /// Print the parsed definition as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the live object as JSON
    Get {
        #[command(flatten)]
        definition: DefinitionArgs,
    },

    /// Apply a definition
    Apply {
        #[command(flatten)]
        definition: DefinitionArgs,

        /// Log failures instead of exiting with an error
        #[arg(long)]
        ignore_errors: bool,
    },

    /// Delete the object a definition names
    Delete {
        #[command(flatten)]
        definition: DefinitionArgs,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Log failures instead of exiting with an error
        #[arg(long)]
        ignore_errors: bool,
    },

    /// Describe the object a definition names
    Describe {
        #[command(flatten)]
        definition: DefinitionArgs,
    },

    /// Apply a deployment and wait for it, rolling back on timeout
    Deploy {
        #[command(flatten)]
        definition: DefinitionArgs,

        #[command(flatten)]
        polling: PollingArgs,
    },

    /// Roll a deployment back to its previous revision
    Undo {
        #[command(flatten)]
        definition: DefinitionArgs,
    },

    /// Run a Pod or Job definition to completion
    Execute {
        #[command(flatten)]
        definition: DefinitionArgs,

        #[command(flatten)]
        polling: PollingArgs,
    },

    /// Run a one-off pod from a deployment's pod template
    Run {
        #[command(flatten)]
        definition: DefinitionArgs,

        #[command(flatten)]
        spawn: SpawnArgs,

        #[command(flatten)]
        polling: PollingArgs,
    },

    /// Run a job using a deployment's image and environment
    Job {
        #[command(flatten)]
        definition: DefinitionArgs,

        #[command(flatten)]
        spawn: SpawnArgs,

        /// Seconds to keep the finished job
        #[arg(long)]
        ttl: Option<i32>,

        /// Retries before the job is marked failed
        #[arg(long)]
        backoff_limit: Option<i32>,

        #[command(flatten)]
        polling: PollingArgs,
    },

    /// Check that kubectl is installed and the cluster answers
    Check,

    /// Print an example settings file
    Config,

    /// Generate shell completion scripts
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();
    logger::init(cli.verbose);

    if let Err(err) = run(cli) {
        display_error(&err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let (config, kubeconfig, verbose) = (cli.config, cli.kubeconfig, cli.verbose);
    let context = || -> Result<CommandContext> {
        let settings = Settings::load(config.as_deref())?;
        CommandContext::new(settings, kubeconfig.as_deref(), verbose)
    };

    match cli.command {
        Commands::Render { definition, json } => {
            commands::object::render(&definition.into_source(), json)
        }
        Commands::Get { definition } => commands::object::get(&context()?, &definition.into_source()),
        Commands::Apply {
            definition,
            ignore_errors,
        } => commands::object::apply(&context()?, &definition.into_source(), policy(ignore_errors)),
        Commands::Delete {
            definition,
            yes,
            ignore_errors,
        } => commands::object::delete(
            &context()?,
            &definition.into_source(),
            yes,
            policy(ignore_errors),
        ),
        Commands::Describe { definition } => {
            commands::object::describe(&context()?, &definition.into_source())
        }
        Commands::Deploy {
            definition,
            polling,
        } => {
            let ctx = context()?;
            let polling = polling.resolve(&ctx.settings);
            commands::deploy::deploy(&ctx, &definition.into_source(), &polling)
        }
        Commands::Undo { definition } => {
            commands::deploy::undo(&context()?, &definition.into_source())
        }
        Commands::Execute {
            definition,
            polling,
        } => {
            let ctx = context()?;
            let polling = polling.resolve(&ctx.settings);
            commands::execute::execute(&ctx, &definition.into_source(), &polling)
        }
        Commands::Run {
            definition,
            spawn,
            polling,
        } => {
            let ctx = context()?;
            let polling = polling.resolve(&ctx.settings);
            commands::deploy::run_pod(&ctx, &definition.into_source(), spawn.into_options(), &polling)
        }
        Commands::Job {
            definition,
            spawn,
            ttl,
            backoff_limit,
            polling,
        } => {
            let ctx = context()?;
            let polling = polling.resolve(&ctx.settings);
            let overrides = JobOverrides {
                ttl_seconds_after_finished: ttl,
                backoff_limit,
            };
            commands::deploy::run_job(
                &ctx,
                &definition.into_source(),
                spawn.into_options(),
                overrides,
                &polling,
            )
        }
        Commands::Check => handle_check_command(&context()?),
        Commands::Config => handle_config_command(),
        Commands::Completion { shell } => handle_completion_command(shell),
        Commands::Version => handle_version_command(),
    }
}

fn policy(ignore_errors: bool) -> FailurePolicy {
    if ignore_errors {
        FailurePolicy::Tolerate
    } else {
        FailurePolicy::Propagate
    }
}

fn handle_check_command(ctx: &CommandContext) -> Result<()> {
    kubectl_bridge::log_info!("Checking prerequisites...");

    if prereqs::run_checks(ctx.kubectl.bin(), &ctx.kubectl) {
        println!("\nAll checks passed");
        Ok(())
    } else {
        anyhow::bail!("Prerequisite checks failed")
    }
}

fn handle_config_command() -> Result<()> {
    print!("{}", Settings::example_config());
    Ok(())
}

fn handle_completion_command(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "kubectl-bridge", &mut io::stdout());
    Ok(())
}

fn handle_version_command() -> Result<()> {
    println!("kubectl-bridge {}", env!("CARGO_PKG_VERSION"));
    println!("Apply, poll and clean up Kubernetes workloads through kubectl");
    Ok(())
}
