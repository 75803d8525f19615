use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::cursor::CursorKey;
use crate::database::pagination::Keyset;

/// Kind of the category every account is provisioned with.
pub const DEFAULT_CATEGORY_KIND: &str = "system";
pub const DEFAULT_CATEGORY_NAME: &str = "Inbox";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub kind: String,
    pub created_by: Uuid,
    pub updated_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Keyset for Category {
    fn cursor_key(&self) -> CursorKey {
        CursorKey::new(self.created_at, self.id.to_string())
    }
}
