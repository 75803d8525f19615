use sqlx::postgres::PgDatabaseError;
use thiserror::Error;

/// Structured fields PostgreSQL attaches to an error report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub code: Option<String>,
    pub detail: Option<String>,
    pub hint: Option<String>,
    pub schema: Option<String>,
    pub table: Option<String>,
    pub column: Option<String>,
    pub constraint: Option<String>,
}

impl Diagnostics {
    pub fn is_empty(&self) -> bool {
        self.fields().next().is_none()
    }

    /// Non-empty fields as `(name, value)` pairs, in report order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("code", &self.code),
            ("detail", &self.detail),
            ("hint", &self.hint),
            ("schema", &self.schema),
            ("table", &self.table),
            ("column", &self.column),
            ("constraint", &self.constraint),
        ]
        .into_iter()
        .filter_map(|(name, value)| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| (name, v))
        })
    }

    /// `code: 23505, table: categories`, or `None` when nothing is set.
    pub fn summary(&self) -> Option<String> {
        let parts: Vec<String> = self
            .fields()
            .map(|(name, value)| format!("{}: {}", name, value))
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

/// A database failure with its diagnostic fields and an optional underlying cause.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SqlError {
    message: String,
    diagnostics: Diagnostics,
    #[source]
    cause: Option<Box<SqlError>>,
}

impl SqlError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            diagnostics: Diagnostics::default(),
            cause: None,
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.diagnostics.code = Some(code.into());
        self
    }

    pub fn caused_by(mut self, cause: SqlError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn code(&self) -> Option<&str> {
        self.diagnostics.code.as_deref()
    }

    pub fn cause(&self) -> Option<&SqlError> {
        self.cause.as_deref()
    }

    /// This error followed by each wrapped cause, outermost first.
    pub fn chain(&self) -> impl Iterator<Item = &SqlError> {
        std::iter::successors(Some(self), |err| err.cause())
    }

    /// Messages of the whole chain joined with ` | `, followed by the
    /// deduplicated diagnostic summaries in parentheses.
    pub fn combined_report(&self) -> String {
        let mut messages: Vec<&str> = Vec::new();
        let mut details: Vec<String> = Vec::new();

        for err in self.chain() {
            if !err.message.is_empty() && !messages.contains(&err.message.as_str()) {
                messages.push(&err.message);
            }
            if let Some(summary) = err.diagnostics.summary() {
                if !details.contains(&summary) {
                    details.push(summary);
                }
            }
        }

        let base = if messages.is_empty() {
            "unknown database error".to_string()
        } else {
            messages.join(" | ")
        };

        if details.is_empty() {
            base
        } else {
            format!("{} ({})", base, details.join(" | "))
        }
    }
}

impl From<sqlx::Error> for SqlError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) => {
                let mut diagnostics = Diagnostics {
                    code: db_err.code().map(|c| c.into_owned()),
                    table: db_err.table().map(str::to_string),
                    constraint: db_err.constraint().map(str::to_string),
                    ..Default::default()
                };

                if let Some(pg) = db_err.try_downcast_ref::<PgDatabaseError>() {
                    diagnostics.detail = pg.detail().map(str::to_string);
                    diagnostics.hint = pg.hint().map(str::to_string);
                    diagnostics.schema = pg.schema().map(str::to_string);
                    diagnostics.column = pg.column().map(str::to_string);
                }

                SqlError::new(db_err.message()).with_diagnostics(diagnostics)
            }
            _ => SqlError::new(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_lists_only_present_fields() {
        let diagnostics = Diagnostics {
            code: Some("23505".into()),
            table: Some("categories".into()),
            hint: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(
            diagnostics.summary().as_deref(),
            Some("code: 23505, table: categories")
        );
        assert!(Diagnostics::default().summary().is_none());
        assert!(Diagnostics::default().is_empty());
    }

    #[test]
    fn combined_report_walks_the_cause_chain() {
        let root = SqlError::new("duplicate key value violates unique constraint")
            .with_diagnostics(Diagnostics {
                code: Some("23505".into()),
                constraint: Some("categories_system_name_idx".into()),
                ..Default::default()
            });
        let err = SqlError::new("insert failed").caused_by(root);

        assert_eq!(
            err.combined_report(),
            "insert failed | duplicate key value violates unique constraint \
             (code: 23505, constraint: categories_system_name_idx)"
        );
    }

    #[test]
    fn combined_report_deduplicates_messages_and_details() {
        let inner = SqlError::new("boom").with_code("XX000");
        let err = SqlError::new("boom").with_code("XX000").caused_by(inner);
        assert_eq!(err.combined_report(), "boom (code: XX000)");
    }

    #[test]
    fn non_database_sqlx_errors_keep_their_message() {
        let err = SqlError::from(sqlx::Error::RowNotFound);
        assert!(err.message().contains("no rows"));
        assert!(err.diagnostics().is_empty());
    }
}
