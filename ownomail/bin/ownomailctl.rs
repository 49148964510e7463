//! Command-line utility for managing OwnOmail
//!
//! This tool provides the administrator surface outside a browser:
//! - Showing stored settings and what they resolve to
//! - Saving the identity, format and SMTP settings groups
//! - Probing for a local relay
//! - Sending a test email
//! - Removing every stored option

use std::{
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
};

use clap::{Parser, Subcommand, ValueEnum};
use ownomail::{App, Ownomail, find_config_file};
use ownomail_admin::{Redirect, SettingsAction, TEST_EMAIL_FIELD};
use ownomail_common::{EmailFormat, Encryption, Notice, keys, logging};
use ownomail_mailer::TransportConfig;

/// Command-line utility for managing OwnOmail
#[derive(Parser, Debug)]
#[command(name = "ownomailctl")]
#[command(about = "Manage OwnOmail sender identity and transport", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print every stored setting
    Show,
    /// Print the sender identity outgoing mail would use
    Identity,
    /// Print the transport outgoing mail would use
    Transport,
    /// Probe the environment for a local relay
    Detect,
    /// Print the relay indicator shown on the settings page
    Status,
    /// Save the sender identity; omitted values keep their current setting
    SaveIdentity {
        /// From address
        #[arg(long)]
        email: Option<String>,
        /// From display name
        #[arg(long)]
        name: Option<String>,
    },
    /// Save the format of mail OwnOmail composes itself
    SaveFormat {
        #[arg(value_enum)]
        format: FormatArg,
    },
    /// Save the SMTP relay settings; omitted values keep their current setting
    SaveSmtp {
        /// Relay through SMTP at all
        #[arg(long)]
        use_smtp: Option<bool>,
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<String>,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        password: Option<String>,
        /// `ssl` or `tls`
        #[arg(long)]
        encryption: Option<String>,
        /// Log SMTP session diagnostics
        #[arg(long)]
        debug: Option<bool>,
    },
    /// Send a test email through the resolved identity and transport
    TestEmail {
        /// Recipient address
        recipient: String,
    },
    /// Remove every OwnOmail option from the store
    Uninstall {
        /// Skip confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Html,
    Text,
}

impl From<FormatArg> for EmailFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Html => Self::Html,
            FormatArg::Text => Self::Text,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    logging::init();

    let cli = Cli::parse();

    let config_path = find_config_file(cli.config.as_deref())?;
    let app = Ownomail::from_file(&config_path)?.build()?;

    let ok = match cli.command {
        Commands::Show => cmd_show(&app),
        Commands::Identity => cmd_identity(&app),
        Commands::Transport => cmd_transport(&app).await,
        Commands::Detect => cmd_detect(&app).await,
        Commands::Status => print_notices(&[app.relay_status().await]),
        Commands::SaveIdentity { email, name } => cmd_save_identity(&app, email, name).await,
        Commands::SaveFormat { format } => {
            let format = EmailFormat::from(format);
            print_redirect(
                &app.submit(SettingsAction::SaveFormat, [(keys::EMAIL_FORMAT, format.as_str())])
                    .await,
            )
        }
        Commands::SaveSmtp {
            use_smtp,
            host,
            port,
            username,
            password,
            encryption,
            debug,
        } => {
            let overrides = SmtpOverrides {
                use_smtp,
                host,
                port,
                username,
                password,
                encryption,
                debug,
            };
            cmd_save_smtp(&app, overrides).await
        }
        Commands::TestEmail { recipient } => print_redirect(
            &app.submit(SettingsAction::SendTestEmail, [(TEST_EMAIL_FIELD, recipient)])
                .await,
        ),
        Commands::Uninstall { yes } => cmd_uninstall(&app, yes)?,
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Print notices, one per line. Returns false if any is an error.
fn print_notices(notices: &[Notice]) -> bool {
    for notice in notices {
        println!("{notice}");
    }

    !notices.iter().any(Notice::is_error)
}

fn print_redirect(redirect: &Redirect) -> bool {
    print_notices(&redirect.notices)
}

const fn checkbox(value: bool) -> &'static str {
    if value { "1" } else { "" }
}

fn cmd_show(app: &App) -> bool {
    let settings = app.settings();

    println!("{:<16} {}", keys::SENDER_EMAIL, settings.sender_email);
    println!("{:<16} {}", keys::SENDER_NAME, settings.sender_name);
    println!("{:<16} {}", keys::EMAIL_FORMAT, settings.email_format);
    println!("{:<16} {}", keys::USE_SMTP, settings.use_smtp);
    println!("{:<16} {}", keys::SMTP_HOST, settings.smtp_host);
    println!("{:<16} {}", keys::SMTP_PORT, settings.smtp_port);
    println!("{:<16} {}", keys::SMTP_USERNAME, settings.smtp_username);
    println!("{:<16} {}", keys::SMTP_PASSWORD, settings.smtp_password);
    println!("{:<16} {}", keys::SMTP_ENCRYPTION, settings.smtp_encryption);
    println!("{:<16} {}", keys::SMTP_DEBUG, settings.smtp_debug);

    true
}

fn cmd_identity(app: &App) -> bool {
    let (identity, notices) = app.identity().into_parts();

    println!("From: {} <{}>", identity.name, identity.email);
    print_notices(&notices)
}

async fn cmd_transport(app: &App) -> bool {
    let (transport, notices) = app.transport().await.into_parts();

    match transport {
        TransportConfig::Local => println!("Transport: local delivery"),
        TransportConfig::Relay(relay) => {
            println!("Transport: SMTP relay {}:{}", relay.host, relay.port);
            println!(
                "Encryption: {}",
                relay.encryption.map_or("none", Encryption::as_str)
            );
            match relay.auth {
                Some(credentials) => println!("Authentication: {}", credentials.username),
                None => println!("Authentication: none"),
            }
        }
    }

    print_notices(&notices)
}

async fn cmd_detect(app: &App) -> bool {
    if app.detect_local_relay().await {
        println!("Local relay detected");
    } else {
        println!("No local relay detected");
    }

    true
}

async fn cmd_save_identity(app: &App, email: Option<String>, name: Option<String>) -> bool {
    let current = app.settings();
    let fields = [
        (keys::SENDER_EMAIL, email.unwrap_or(current.sender_email)),
        (keys::SENDER_NAME, name.unwrap_or(current.sender_name)),
    ];

    print_redirect(&app.submit(SettingsAction::SaveIdentity, fields).await)
}

struct SmtpOverrides {
    use_smtp: Option<bool>,
    host: Option<String>,
    port: Option<String>,
    username: Option<String>,
    password: Option<String>,
    encryption: Option<String>,
    debug: Option<bool>,
}

async fn cmd_save_smtp(app: &App, overrides: SmtpOverrides) -> bool {
    let current = app.settings();
    let fields = [
        (
            keys::USE_SMTP,
            checkbox(overrides.use_smtp.unwrap_or(current.use_smtp)).to_string(),
        ),
        (keys::SMTP_HOST, overrides.host.unwrap_or(current.smtp_host)),
        (
            keys::SMTP_PORT,
            overrides.port.unwrap_or_else(|| current.smtp_port.to_string()),
        ),
        (keys::SMTP_USERNAME, overrides.username.unwrap_or(current.smtp_username)),
        (keys::SMTP_PASSWORD, overrides.password.unwrap_or(current.smtp_password)),
        (
            keys::SMTP_ENCRYPTION,
            overrides
                .encryption
                .unwrap_or_else(|| current.smtp_encryption.to_string()),
        ),
        (
            keys::SMTP_DEBUG,
            checkbox(overrides.debug.unwrap_or(current.smtp_debug)).to_string(),
        ),
    ];

    print_redirect(&app.submit(SettingsAction::SaveSmtp, fields).await)
}

fn cmd_uninstall(app: &App, skip_confirm: bool) -> anyhow::Result<bool> {
    if !skip_confirm {
        print!("Remove every OwnOmail setting? [y/N] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !matches!(input.trim().to_lowercase().as_str(), "y" | "yes") {
            println!("Cancelled.");
            return Ok(true);
        }
    }

    let removed = app.uninstall()?;
    println!("Removed {removed} option(s)");

    Ok(true)
}
