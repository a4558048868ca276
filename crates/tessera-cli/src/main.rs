use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tessera_core::TesseraConfig;
use tracing_subscriber::EnvFilter;

mod commands;

/// Configuration file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG_FILE: &str = "tessera.yaml";

#[derive(Parser, Debug)]
#[command(name = "tessera", version, about = "Tessera key and token tool")]
struct Cli {
    /// Path to tessera.yaml
    #[arg(long, global = true, env = "TESSERA_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Symmetric key management
    Keys {
        #[command(subcommand)]
        cmd: KeysCommand,
    },

    /// Issue, validate and inspect tokens
    Token {
        #[command(subcommand)]
        cmd: TokenCommand,
    },
}

#[derive(Subcommand, Debug)]
enum KeysCommand {
    /// Generate a new base64url-encoded key
    Generate {
        /// Write the key to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum TokenCommand {
    /// Issue a token with the primary key
    Issue {
        /// User id (UUID)
        #[arg(long)]
        user: String,

        /// Project id (UUID) to scope the token to
        #[arg(long)]
        project: Option<String>,

        /// Trust id (UUID); issues a trust-scoped token, requires --project
        #[arg(long)]
        trust: Option<String>,

        /// Token lifetime, e.g. "30m", "1h", "7d". Defaults to tokens.default_lifetime
        #[arg(long)]
        expires: Option<String>,

        /// Audit ids, newest first. A fresh id is generated when omitted
        #[arg(long = "audit-id")]
        audit_ids: Vec<String>,

        /// Write the token to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Validate a token and print its record as JSON
    Validate {
        /// The token, or a path to a file containing it
        token: String,

        /// YAML or JSON file listing known trusts
        #[arg(long)]
        trusts: Option<PathBuf>,
    },

    /// Show a token's format and creation time without validating it
    Inspect {
        /// The token, or a path to a file containing it
        token: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Keys { cmd } => match cmd {
            KeysCommand::Generate { output } => commands::keys::generate(output)?,
        },

        Command::Token { cmd } => {
            let config = load_config(cli.config.as_deref())?;
            match cmd {
                TokenCommand::Issue {
                    user,
                    project,
                    trust,
                    expires,
                    audit_ids,
                    output,
                } => commands::token::issue(
                    &config,
                    commands::token::IssueRequest {
                        user,
                        project,
                        trust,
                        expires,
                        audit_ids,
                    },
                    output,
                )?,
                TokenCommand::Validate { token, trusts } => {
                    commands::token::validate(&config, token, trusts)?
                }
                TokenCommand::Inspect { token } => commands::token::inspect(token)?,
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<TesseraConfig> {
    use anyhow::Context;

    if let Some(path) = path {
        return TesseraConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    let default_path = Path::new(DEFAULT_CONFIG_FILE);
    if default_path.exists() {
        tracing::debug!(path = DEFAULT_CONFIG_FILE, "Using config from working directory");
        return TesseraConfig::from_file(default_path)
            .with_context(|| format!("Failed to load {DEFAULT_CONFIG_FILE}"));
    }

    Ok(TesseraConfig::default())
}
