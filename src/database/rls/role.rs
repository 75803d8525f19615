use std::fmt;

/// Role assumed when a claim set names no role, or one that is not a plain identifier.
pub const DEFAULT_ROLE: &str = "anon";

/// A role name that is safe to splice into `SET LOCAL ROLE` as a raw identifier.
///
/// Only `[A-Za-z0-9_]+` survives; everything else becomes [`DEFAULT_ROLE`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatabaseRole(String);

impl DatabaseRole {
    pub fn sanitize(role: Option<&str>) -> Self {
        match role {
            Some(name) if is_plain_identifier(name) => Self(name.to_string()),
            _ => Self(DEFAULT_ROLE.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatabaseRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_plain_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
