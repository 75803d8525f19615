use clap::{Args, Subcommand};
use serde_json::json;

use crate::auth::claims::parse_access_token;
use crate::auth::client::{AuthClient, TokenPair};
use crate::cli::utils::output;
use crate::cli::OutputFormat;
use crate::database::rls::DatabaseRole;

#[derive(Args)]
pub struct ProviderArgs {
    #[arg(long, env = "AUTH_PROJECT_URL", help = "Identity provider project URL")]
    project_url: String,

    #[arg(long, env = "AUTH_PUBLISHABLE_KEY", help = "Publishable (anon) API key")]
    publishable_key: String,
}

impl ProviderArgs {
    fn client(&self) -> anyhow::Result<AuthClient> {
        Ok(AuthClient::new(&self.project_url, &self.publishable_key)?)
    }
}

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Print a token's claims without verifying its signature")]
    Claims {
        #[arg(help = "Access token (JWT)")]
        token: String,
    },

    #[command(about = "Register an account with the identity provider")]
    Signup {
        #[command(flatten)]
        provider: ProviderArgs,
        #[arg(long)]
        email: String,
        #[arg(long, env = "LISTEE_PASSWORD")]
        password: String,
        #[arg(long, help = "Where the confirmation link should land")]
        redirect_url: Option<String>,
    },

    #[command(about = "Exchange email and password for tokens")]
    Login {
        #[command(flatten)]
        provider: ProviderArgs,
        #[arg(long)]
        email: String,
        #[arg(long, env = "LISTEE_PASSWORD")]
        password: String,
    },

    #[command(about = "Exchange a refresh token for new tokens")]
    Refresh {
        #[command(flatten)]
        provider: ProviderArgs,
        #[arg(help = "Refresh token")]
        refresh_token: String,
    },
}

pub async fn handle(cmd: TokenCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TokenCommands::Claims { token } => {
            let claims = parse_access_token(&token)?;
            let role = DatabaseRole::sanitize(claims.role.as_deref());

            let mut lines = vec![
                format!("sub: {}", claims.sub),
                format!("role: {}", claims.role.as_deref().unwrap_or("(none)")),
                format!("database role: {}", role),
            ];
            if let Some(email) = claims.email() {
                lines.push(format!("email: {}", email));
            }
            if let Some(exp) = claims.exp {
                lines.push(format!("exp: {}", exp));
            }

            output(
                output_format,
                &lines,
                &json!({ "claims": claims, "databaseRole": role.as_str() }),
            )
        }
        TokenCommands::Signup {
            provider,
            email,
            password,
            redirect_url,
        } => {
            provider
                .client()?
                .signup(&email, &password, redirect_url.as_deref())
                .await?;
            output(
                output_format,
                &[format!("signup requested for {}", email)],
                &json!({ "email": email, "status": "pending_confirmation" }),
            )
        }
        TokenCommands::Login {
            provider,
            email,
            password,
        } => {
            let tokens = provider.client()?.login(&email, &password).await?;
            print_tokens(output_format, &tokens)
        }
        TokenCommands::Refresh {
            provider,
            refresh_token,
        } => {
            let tokens = provider.client()?.refresh(&refresh_token).await?;
            print_tokens(output_format, &tokens)
        }
    }
}

fn print_tokens(output_format: OutputFormat, tokens: &TokenPair) -> anyhow::Result<()> {
    output(
        output_format,
        &[
            format!("access token: {}", tokens.access_token),
            format!("refresh token: {}", tokens.refresh_token),
            format!("token type: {}", tokens.token_type),
            format!("expires in: {}s", tokens.expires_in),
        ],
        &serde_json::to_value(tokens)?,
    )
}
