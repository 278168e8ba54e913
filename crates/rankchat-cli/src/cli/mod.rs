//! CLI entry and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rankchat_core::config::Config;
use rankchat_core::message::ResponseMode;

use crate::logging;

mod commands;

#[derive(Parser)]
#[command(name = "rankchat")]
#[command(version)]
#[command(about = "Terminal SEO assistant chat client")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override the model from config
    #[arg(long, global = true)]
    model: Option<String>,

    /// Override the response mode (short, detailed)
    #[arg(long, global = true, value_name = "MODE")]
    mode: Option<String>,

    /// Disable web search grounding for this run
    #[arg(long = "no-grounding", global = true)]
    no_grounding: bool,

    /// Override the system prompt from config
    #[arg(long, global = true)]
    system_prompt: Option<String>,

    #[command(flatten)]
    session_args: SessionArgs,
}

/// Common session arguments for commands that persist the conversation.
#[derive(clap::Args, Debug, Clone, Default)]
struct SessionArgs {
    /// Append to an existing session by ID
    #[arg(long, value_name = "ID", global = true)]
    session: Option<String>,

    /// Do not save the conversation
    #[arg(long = "no-save", global = true)]
    no_save: bool,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Ask a single question and print the answer
    Ask {
        /// The question to send
        prompt: String,

        /// Attach a file to the prompt
        #[arg(long, value_name = "PATH")]
        attach: Option<PathBuf>,

        /// Print the raw reply without section extraction
        #[arg(long)]
        raw: bool,

        /// Print the parsed sections as JSON
        #[arg(long, conflicts_with = "raw")]
        json: bool,

        /// Also print the extracted reasoning block
        #[arg(long, conflicts_with_all = ["raw", "json"])]
        show_reasoning: bool,
    },

    /// Manage saved sessions
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },

    /// Export the latest answer as a print-ready HTML report
    Export {
        /// Write to this path instead of the exports directory
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,

        /// Open the report in the default browser after writing
        #[arg(long)]
        open: bool,
    },

    /// Synthesize speech for an answer and write it to a WAV file
    Speak {
        /// Text to speak (defaults to the latest answer)
        #[arg(long)]
        text: Option<String>,

        /// Output WAV path
        #[arg(long, value_name = "PATH", default_value = "speech.wav")]
        out: PathBuf,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum SessionCommands {
    /// Lists saved sessions
    List,
    /// Shows a session transcript
    Show {
        /// The ID of the session to show
        #[arg(value_name = "SESSION_ID")]
        id: String,
    },
    /// Resume a previous session in the chat TUI
    Resume {
        /// The ID of the session to resume (uses latest if not provided)
        #[arg(value_name = "SESSION_ID")]
        id: Option<String>,
    },
    /// Rename a session
    Rename {
        /// The ID of the session to rename
        #[arg(value_name = "SESSION_ID")]
        id: String,
        /// New title for the session
        #[arg(value_name = "TITLE")]
        title: String,
    },
    /// Delete a session
    Delete {
        /// The ID of the session to delete
        #[arg(value_name = "SESSION_ID")]
        id: String,
    },
    /// Delete all sessions
    Clear,
    /// Show accumulated usage statistics
    Stats {
        /// Reset the counters to zero
        #[arg(long)]
        reset: bool,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = logging::init();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli).await })
}

fn apply_overrides(config: &mut Config, cli: &Cli) -> Result<()> {
    if let Some(model) = &cli.model {
        config.model.clone_from(model);
    }
    if let Some(mode) = cli.mode.as_deref() {
        config.response_mode = match mode {
            "short" => ResponseMode::Short,
            "detailed" => ResponseMode::Detailed,
            other => anyhow::bail!("Unknown response mode '{other}' (use short or detailed)"),
        };
    }
    if cli.no_grounding {
        config.grounding = false;
    }
    if let Some(sp) = cli.system_prompt.as_deref() {
        let trimmed = sp.trim();
        config.system_prompt = (!trimmed.is_empty()).then(|| trimmed.to_string());
        config.system_prompt_file = None;
    }
    Ok(())
}

async fn dispatch(cli: Cli) -> Result<()> {
    let mut config = Config::load().context("load config")?;
    apply_overrides(&mut config, &cli)?;

    let Cli {
        command,
        session_args,
        ..
    } = cli;

    // default to interactive chat
    let Some(command) = command else {
        return commands::chat::run(config, &session_args);
    };

    match command {
        Commands::Ask {
            prompt,
            attach,
            raw,
            json,
            show_reasoning,
        } => {
            let output = commands::ask::Output {
                raw,
                json,
                show_reasoning,
            };
            commands::ask::run(&config, &session_args, &prompt, attach.as_deref(), output).await
        }

        Commands::Sessions { command } => match command {
            SessionCommands::List => commands::sessions::list(),
            SessionCommands::Show { id } => commands::sessions::show(&id),
            SessionCommands::Resume { id } => commands::sessions::resume(id, config),
            SessionCommands::Rename { id, title } => commands::sessions::rename(&id, &title),
            SessionCommands::Delete { id } => commands::sessions::delete(&id),
            SessionCommands::Clear => commands::sessions::clear(),
            SessionCommands::Stats { reset } => commands::sessions::stats(reset),
        },

        Commands::Export { out, open } => {
            commands::export::run(session_args.session.as_deref(), out.as_deref(), open)
        }

        Commands::Speak { text, out } => {
            commands::speak::run(&config, session_args.session.as_deref(), text, &out).await
        }

        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        },
    }
}
