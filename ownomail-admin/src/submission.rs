use std::{
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use ownomail_common::{Notice, NoticeCode};

use crate::error::AdminError;

/// Where every submission sends the browser back to
pub const SETTINGS_URL: &str = "admin.php?page=ownomail";

/// Form field carrying the test email recipient
pub const TEST_EMAIL_FIELD: &str = "test_email";

/// The form a submission came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsAction {
    SaveIdentity,
    SaveFormat,
    SaveSmtp,
    SendTestEmail,
}

impl SettingsAction {
    pub const ALL: [Self; 4] = [
        Self::SaveIdentity,
        Self::SaveFormat,
        Self::SaveSmtp,
        Self::SendTestEmail,
    ];

    /// Action name, also the token scope
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SaveIdentity => "ownomail_save_identity",
            Self::SaveFormat => "ownomail_save_format",
            Self::SaveSmtp => "ownomail_save_smtp",
            Self::SendTestEmail => "ownomail_send_test_email",
        }
    }
}

impl Display for SettingsAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingsAction {
    type Err = AdminError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| AdminError::UnknownAction(s.to_string()))
    }
}

/// One posted settings form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub action: SettingsAction,
    pub nonce: Option<String>,
    pub fields: BTreeMap<String, String>,
}

impl Submission {
    #[must_use]
    pub const fn new(action: SettingsAction) -> Self {
        Self {
            action,
            nonce: None,
            fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// A posted field. Fields that were not posted read as empty, the way an
    /// unchecked checkbox or a blank input does.
    #[must_use]
    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map_or("", String::as_str)
    }
}

/// The answer to a submission: go back to the settings view and show these
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub location: &'static str,
    pub notices: Vec<Notice>,
}

impl Redirect {
    #[must_use]
    pub const fn to_settings(notices: Vec<Notice>) -> Self {
        Self {
            location: SETTINGS_URL,
            notices,
        }
    }

    #[must_use]
    pub fn has_notice(&self, code: NoticeCode) -> bool {
        self.notices.iter().any(|notice| notice.code == code)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names_round_trip() {
        for action in SettingsAction::ALL {
            assert_eq!(action.as_str().parse::<SettingsAction>().unwrap(), action);
        }
        assert!("ownomail_delete_everything".parse::<SettingsAction>().is_err());
    }

    #[test]
    fn test_missing_field_reads_empty() {
        let submission = Submission::new(SettingsAction::SaveSmtp).with_field("smtp_host", "mx");

        assert_eq!(submission.field("smtp_host"), "mx");
        assert_eq!(submission.field("use_smtp"), "");
    }
}
