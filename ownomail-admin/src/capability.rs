use std::collections::BTreeSet;

/// Required to change OwnOmail settings or send a test email
pub const MANAGE_OPTIONS: &str = "manage_options";

/// The logged-in user behind a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    login: String,
    session: String,
    capabilities: BTreeSet<String>,
}

impl Principal {
    /// A principal with no capabilities
    #[must_use]
    pub fn new(login: impl Into<String>, session: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            session: session.into(),
            capabilities: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn administrator(login: impl Into<String>, session: impl Into<String>) -> Self {
        Self::new(login, session).with_capability(MANAGE_OPTIONS)
    }

    #[must_use]
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.insert(capability.into());
        self
    }

    #[must_use]
    pub fn can(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    #[must_use]
    pub fn login(&self) -> &str {
        &self.login
    }

    #[must_use]
    pub fn session(&self) -> &str {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities() {
        let admin = Principal::administrator("admin", "s1");
        assert!(admin.can(MANAGE_OPTIONS));
        assert_eq!(admin.login(), "admin");
        assert_eq!(admin.session(), "s1");

        let editor = Principal::new("editor", "s2").with_capability("edit_posts");
        assert!(editor.can("edit_posts"));
        assert!(!editor.can(MANAGE_OPTIONS));
    }
}
