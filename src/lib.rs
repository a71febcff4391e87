// Piano Roll Bridge - LLM tool calls to the FL Studio piano roll
// Module declarations and command-line entry point

use std::env;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

pub mod commands;
pub mod config;
pub mod queue;
pub mod state;
pub mod trigger;

use commands::Bridge;
use config::BridgeConfig;
use queue::RequestQueue;
use trigger::{AutomationError, JournalWriter, OsaScriptWaker, PollSettings, Poller};

const USAGE: &str = "Usage: pianoroll-bridge [--config FILE] [--dir DIR] <command>

Commands:
  watch [--journal FILE]    Trigger the piano roll script whenever requests arrive
  call <tool> [JSON|-]      Run one tool with JSON arguments (- reads stdin)
  tools                     List available tools";

#[derive(Debug, Clone, PartialEq)]
enum CliCommand {
    Watch,
    Call { tool: String, args: Option<String> },
    Tools,
    Help,
}

#[derive(Debug, Clone, PartialEq)]
struct CliArgs {
    config: Option<PathBuf>,
    dir: Option<PathBuf>,
    journal: Option<PathBuf>,
    command: CliCommand,
}

fn parse_cli(args: &[String]) -> Result<CliArgs, String> {
    let mut config = None;
    let mut dir = None;
    let mut journal = None;
    let mut positional = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .map(PathBuf::from)
                .ok_or_else(|| format!("{} requires a value", flag))
        };
        match arg.as_str() {
            "--config" => config = Some(value("--config")?),
            "--dir" => dir = Some(value("--dir")?),
            "--journal" => journal = Some(value("--journal")?),
            "-h" | "--help" => positional.insert(0, "help".to_string()),
            _ => positional.push(arg.clone()),
        }
    }

    let command = match positional.first().map(String::as_str) {
        Some("watch") => CliCommand::Watch,
        Some("call") => {
            let tool = positional
                .get(1)
                .cloned()
                .ok_or_else(|| "call requires a tool name".to_string())?;
            CliCommand::Call {
                tool,
                args: positional.get(2).cloned(),
            }
        }
        Some("tools") => CliCommand::Tools,
        Some("help") | None => CliCommand::Help,
        Some(other) => return Err(format!("Unknown command '{}'", other)),
    };

    Ok(CliArgs {
        config,
        dir,
        journal,
        command,
    })
}

/// Command-line flags take precedence over the config file and environment
fn apply_cli(config: &mut BridgeConfig, cli: &CliArgs) {
    if let Some(dir) = &cli.dir {
        config.bridge_dir = dir.clone();
    }
    if let Some(journal) = &cli.journal {
        config.journal_file = Some(journal.clone());
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Also installs the `log` bridge used throughout the crate
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run() -> ExitCode {
    init_logging();

    let args: Vec<String> = env::args().skip(1).collect();
    let cli = match parse_cli(&args) {
        Ok(cli) => cli,
        Err(message) => {
            eprintln!("{}\n\n{}", message, USAGE);
            return ExitCode::FAILURE;
        }
    };

    let mut config = match BridgeConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load config: {}", e);
            return ExitCode::FAILURE;
        }
    };
    apply_cli(&mut config, &cli);

    match cli.command {
        CliCommand::Help => {
            println!("{}", USAGE);
            ExitCode::SUCCESS
        }
        CliCommand::Tools => {
            for tool in commands::list_tools() {
                println!("{:<26}{}", tool.name, tool.description);
            }
            ExitCode::SUCCESS
        }
        CliCommand::Call { tool, args } => {
            let bridge = Bridge::from_config(&config);
            let outcome = match read_tool_args(args.as_deref()) {
                Ok(args) => commands::invoke(&bridge, &tool, args),
                Err(message) => format!("Error: {}", message),
            };
            println!("{}", outcome);
            ExitCode::SUCCESS
        }
        CliCommand::Watch => {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    log::error!("Failed to start runtime: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            runtime.block_on(watch(config))
        }
    }
}

/// Tool arguments from the command line; `-` reads stdin, nothing means `{}`
fn read_tool_args(raw: Option<&str>) -> Result<serde_json::Value, String> {
    let text = match raw {
        None => return Ok(serde_json::Value::Null),
        Some("-") => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| format!("failed to read stdin: {}", e))?;
            buffer
        }
        Some(text) => text.to_string(),
    };

    serde_json::from_str(&text).map_err(|e| format!("invalid JSON arguments: {}", e))
}

async fn watch(config: BridgeConfig) -> ExitCode {
    let request_file = config.request_file();

    println!("FL Studio piano roll auto-trigger");
    println!("Watching: {}", request_file.display());
    println!("Trigger:  {}", config.host.shortcut_label());
    println!("Stop:     Ctrl+C");
    println!();

    let waker = OsaScriptWaker::new(config.host.clone());
    match waker.is_host_running().await {
        Ok(true) => {
            log::info!("FL Studio is running");
            match waker.find_target_window().await {
                Some(index) => log::info!("Piano roll window found (window {})", index),
                None => log::warn!(
                    "No piano roll window detected. Open a piano roll and detach it for best results"
                ),
            }
        }
        Ok(false) => log::warn!(
            "FL Studio is not currently running. Start it and open a piano roll; it will be picked up when it starts"
        ),
        Err(e @ AutomationError::Spawn(_)) => {
            log::error!("{}", e);
            if let Some(hint) = e.hint() {
                log::warn!("{}", hint);
            }
            return ExitCode::FAILURE;
        }
        Err(e) => {
            log::warn!("Could not check whether FL Studio is running: {}", e);
            if let Some(hint) = e.hint() {
                log::warn!("{}", hint);
            }
        }
    }

    if !request_file.exists() {
        log::warn!("Request file doesn't exist yet; it will be created when the piano roll script runs");
    }

    let mut poller = Poller::new(
        RequestQueue::new(&request_file),
        waker,
        PollSettings::from_config(&config),
    );
    if let Some(path) = &config.journal_file {
        log::info!("Journaling triggers to {}", path.display());
        poller = poller.with_journal(JournalWriter::new(path.clone()));
    }

    log::info!("Auto-trigger is running");

    let state = poller
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    println!();
    println!("Auto-trigger stopped");
    println!("Total triggers sent: {}", state.trigger_count);
    ExitCode::SUCCESS
}
