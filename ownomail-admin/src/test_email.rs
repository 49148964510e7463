use ownomail_common::{
    EmailFormat, Notice, NoticeCode, Severity, address_parser, admin, keys, settings::sanitize_email,
};
use ownomail_mailer::{MailSender, Mailer};
use ownomail_store::{ConfigStore, ConfigStoreExt};

pub const SUBJECT: &str = "OwnOmail Test Email";

const HTML_BODY: &str = concat!(
    "<div style=\"font-family: Arial, sans-serif; line-height: 1.5;\">",
    "<h2 style=\"color: #0073aa; margin-top: 0;\">Hello from OwnOmail!</h2>",
    "<p>This is a <strong>test email</strong> confirming that your email settings are configured correctly.</p>",
    "<p>If you can read this message in HTML format, everything is set up right!</p>",
    "<p><em>Custom-made. Made simple.</em></p>",
    "</div>",
);

const TEXT_BODY: &str = "Hello from OwnOmail!\n\n\
    This is a test email in plain text format confirming that your email settings are working.\n\
    If you see this message clearly, everything is good!\n\n\
    Custom-made. Made simple.\n";

#[must_use]
pub const fn body(format: EmailFormat) -> &'static str {
    match format {
        EmailFormat::Html => HTML_BODY,
        EmailFormat::Text => TEXT_BODY,
    }
}

/// Send the test message to `raw_recipient` through the same identity and
/// transport resolution as any other mail.
///
/// Resolution warnings come back alongside the outcome; informational
/// notices are dropped.
pub async fn send_test_email(
    store: &dyn ConfigStore,
    mailer: &Mailer,
    sender: &dyn MailSender,
    raw_recipient: &str,
) -> Vec<Notice> {
    let recipient = sanitize_email(raw_recipient);
    if !address_parser::is_email(&recipient) {
        return vec![Notice::error(
            NoticeCode::TestEmailEmpty,
            "Error: Please enter a valid email address for testing.",
        )];
    }

    let format = store
        .read_site(keys::EMAIL_FORMAT)
        .map_or(EmailFormat::Html, |value| EmailFormat::sanitize(&value.as_text()));

    let (result, notices) = mailer
        .send(sender, &recipient, SUBJECT, body(format).to_string(), format)
        .await
        .into_parts();

    let mut notices: Vec<Notice> = notices
        .into_iter()
        .filter(|notice| notice.severity != Severity::Info)
        .collect();

    match result {
        Ok(()) => {
            admin!(level = INFO, %recipient, %format, "Sent test email");
            notices.push(Notice::success(
                NoticeCode::TestEmailSuccess,
                format!("Test email successfully sent to {recipient}."),
            ));
        }
        Err(err) => {
            admin!(level = ERROR, %recipient, error = %err, "Test email failed");
            notices.push(Notice::error(
                NoticeCode::TestEmailFailure,
                format!("Error: Test email could not be sent to {recipient}."),
            ));
        }
    }

    notices
}
