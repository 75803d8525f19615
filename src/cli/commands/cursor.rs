use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::output;
use crate::cli::OutputFormat;
use crate::database::cursor::{decode_cursor, encode_cursor, CursorKey};

#[derive(Subcommand)]
pub enum CursorCommands {
    #[command(about = "Build the cursor that resumes after the given row")]
    Encode {
        #[arg(long, help = "Row creation time (RFC 3339)")]
        created_at: String,
        #[arg(long, help = "Row id")]
        id: String,
    },

    #[command(about = "Show the position a cursor points at")]
    Decode {
        #[arg(help = "Cursor string")]
        cursor: String,
    },
}

pub fn handle(cmd: CursorCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        CursorCommands::Encode { created_at, id } => {
            let created_at = DateTime::parse_from_rfc3339(created_at.trim())
                .with_context(|| format!("invalid --created-at '{}'", created_at))?
                .with_timezone(&Utc);
            let cursor = encode_cursor(&CursorKey::new(created_at, id));
            output(
                output_format,
                &[cursor.clone()],
                &json!({ "cursor": cursor }),
            )
        }
        CursorCommands::Decode { cursor } => match decode_cursor(Some(&cursor)) {
            Some(key) => {
                let created_at = key.created_at.to_rfc3339_opts(SecondsFormat::AutoSi, true);
                output(
                    output_format,
                    &[
                        format!("createdAt: {}", created_at),
                        format!("id: {}", key.id),
                    ],
                    &json!({ "valid": true, "createdAt": created_at, "id": key.id }),
                )
            }
            None => output(
                output_format,
                &["Cursor is not valid; listings treat it as the first page".to_string()],
                &json!({ "valid": false }),
            ),
        },
    }
}
