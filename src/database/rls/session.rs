use super::role::DatabaseRole;

pub const CLAIMS_SETTING: &str = "request.jwt.claims";
pub const SUBJECT_SETTING: &str = "request.jwt.claim.sub";
pub const ROLE_SETTING: &str = "request.jwt.claim.role";

/// One statement issued against the scoped transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatement {
    /// `select set_config($1, $2, true)`; a `None` value clears the setting.
    SetConfig {
        key: &'static str,
        value: Option<String>,
    },
    /// `set local role <role>`, with the role spliced in as an identifier.
    SetLocalRole(DatabaseRole),
    /// `reset role`
    ResetRole,
}

impl SessionStatement {
    pub fn sql(&self) -> String {
        match self {
            SessionStatement::SetConfig { .. } => "select set_config($1, $2, true)".to_string(),
            SessionStatement::SetLocalRole(role) => format!("set local role {}", role.as_str()),
            SessionStatement::ResetRole => "reset role".to_string(),
        }
    }
}

/// The four pieces of session-local state, in the order they are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStep {
    Claims,
    Subject,
    RoleClaim,
    ActiveRole,
}

impl SessionStep {
    pub const SETUP_ORDER: [SessionStep; 4] = [
        SessionStep::Claims,
        SessionStep::Subject,
        SessionStep::RoleClaim,
        SessionStep::ActiveRole,
    ];
}

/// Everything needed to scope one transaction to one principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub serialized_claims: String,
    pub subject: String,
    pub role: DatabaseRole,
}

impl SessionContext {
    pub fn apply(&self, step: SessionStep) -> SessionStatement {
        match step {
            SessionStep::Claims => SessionStatement::SetConfig {
                key: CLAIMS_SETTING,
                value: Some(self.serialized_claims.clone()),
            },
            SessionStep::Subject => SessionStatement::SetConfig {
                key: SUBJECT_SETTING,
                value: Some(self.subject.clone()),
            },
            SessionStep::RoleClaim => SessionStatement::SetConfig {
                key: ROLE_SETTING,
                value: Some(self.role.as_str().to_string()),
            },
            SessionStep::ActiveRole => SessionStatement::SetLocalRole(self.role.clone()),
        }
    }

    pub fn revert(step: SessionStep) -> SessionStatement {
        match step {
            SessionStep::Claims => SessionStatement::SetConfig {
                key: CLAIMS_SETTING,
                value: None,
            },
            SessionStep::Subject => SessionStatement::SetConfig {
                key: SUBJECT_SETTING,
                value: None,
            },
            SessionStep::RoleClaim => SessionStatement::SetConfig {
                key: ROLE_SETTING,
                value: None,
            },
            SessionStep::ActiveRole => SessionStatement::ResetRole,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_is_rendered_as_identifier() {
        let stmt = SessionStatement::SetLocalRole(DatabaseRole::sanitize(Some("authenticated")));
        assert_eq!(stmt.sql(), "set local role authenticated");

        let hostile = SessionStatement::SetLocalRole(DatabaseRole::sanitize(Some("x; drop table t")));
        assert_eq!(hostile.sql(), "set local role anon");
    }

    #[test]
    fn every_step_reverts_to_a_cleared_value() {
        for step in SessionStep::SETUP_ORDER {
            match SessionContext::revert(step) {
                SessionStatement::SetConfig { value, .. } => assert_eq!(value, None),
                SessionStatement::ResetRole => assert_eq!(step, SessionStep::ActiveRole),
                other => panic!("unexpected revert statement {:?}", other),
            }
        }
    }
}
