pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "listee")]
#[command(about = "Listee CLI - operator tools for the Listee API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Encode and inspect pagination cursors")]
    Cursor {
        #[command(subcommand)]
        cmd: commands::cursor::CursorCommands,
    },

    #[command(about = "Inspect access tokens and talk to the identity provider")]
    Token {
        #[command(subcommand)]
        cmd: commands::token::TokenCommands,
    },

    #[command(about = "Probe a running server")]
    Server {
        #[command(subcommand)]
        cmd: commands::server::ServerCommands,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Cursor { cmd } => commands::cursor::handle(cmd, output_format),
        Commands::Token { cmd } => commands::token::handle(cmd, output_format).await,
        Commands::Server { cmd } => commands::server::handle(cmd, output_format).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_json_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["listee", "cursor", "decode", "abc", "--json"]).unwrap();
        assert_eq!(OutputFormat::from_cli(&cli), OutputFormat::Json);
    }

    #[test]
    fn token_login_takes_provider_arguments() {
        let cli = Cli::try_parse_from([
            "listee",
            "token",
            "login",
            "--project-url",
            "https://abc.supabase.co",
            "--publishable-key",
            "anon-key",
            "--email",
            "user@example.com",
            "--password",
            "secret",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Token {
                cmd: commands::token::TokenCommands::Login { .. }
            }
        ));
        assert!(Cli::try_parse_from(["listee", "token", "refresh"]).is_err());
    }

    #[test]
    fn server_health_url_is_optional() {
        let cli = Cli::try_parse_from(["listee", "server", "health"]).unwrap();
        assert_eq!(OutputFormat::from_cli(&cli), OutputFormat::Text);
        assert!(Cli::try_parse_from(["listee", "server", "health", "--url", "http://x"]).is_ok());
    }
}
