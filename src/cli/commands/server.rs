use clap::Subcommand;
use serde_json::{json, Value};

use crate::cli::utils::output;
use crate::cli::OutputFormat;

const DEFAULT_URL: &str = "http://127.0.0.1:3000";

#[derive(Subcommand)]
pub enum ServerCommands {
    #[command(about = "Check /healthz and /healthz/database")]
    Health {
        #[arg(long, env = "LISTEE_API_URL", help = "Server base URL")]
        url: Option<String>,
    },
}

pub async fn handle(cmd: ServerCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ServerCommands::Health { url } => {
            let base = url.unwrap_or_else(|| DEFAULT_URL.to_string());
            let base = base.trim_end_matches('/');
            let client = reqwest::Client::new();

            let server = fetch_status(&client, &format!("{}/healthz", base)).await;
            let database = fetch_status(&client, &format!("{}/healthz/database", base)).await;

            output(
                output_format,
                &[
                    format!("server: {}", describe(&server)),
                    format!("database: {}", describe(&database)),
                ],
                &json!({ "url": base, "server": server, "database": database }),
            )?;

            if server["status"] != "ok" {
                anyhow::bail!("server at {} is not healthy", base);
            }
            Ok(())
        }
    }
}

/// Status body of one health endpoint, or an error record when unreachable.
async fn fetch_status(client: &reqwest::Client, url: &str) -> Value {
    match client.get(url).send().await {
        Ok(response) => {
            let code = response.status().as_u16();
            match response.json::<Value>().await {
                Ok(Value::Object(mut body)) => {
                    body.insert("httpStatus".to_string(), json!(code));
                    Value::Object(body)
                }
                Ok(other) => json!({ "status": "error", "httpStatus": code, "error": other }),
                Err(e) => json!({ "status": "error", "httpStatus": code, "error": e.to_string() }),
            }
        }
        Err(e) => json!({ "status": "unreachable", "error": e.to_string() }),
    }
}

fn describe(result: &Value) -> String {
    let status = result["status"].as_str().unwrap_or("unknown");
    match result["error"].as_str() {
        Some(error) => format!("{} ({})", status, error),
        None => status.to_string(),
    }
}
