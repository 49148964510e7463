//! Mailbox and hostname syntax validation
//!
//! Sender addresses are checked against the RFC 5321 mailbox grammar, without
//! the angle brackets used on the wire. Relay hosts are checked against the
//! RFC 1123 hostname rules, with IP literals accepted as well.
//!
//! # ABNF Grammar (RFC 5321 Section 4.1.2)
//!
//! ```text
//! Mailbox        = Local-part "@" ( Domain / address-literal )
//! Local-part     = Dot-string / Quoted-string
//! Dot-string     = Atom *("." Atom)
//! Atom           = 1*atext
//! Quoted-string  = DQUOTE *QcontentSMTP DQUOTE
//! Domain         = sub-domain *("." sub-domain)
//! sub-domain     = Let-dig [Ldh-str]
//! address-literal = "[" ( IPv4-address-literal / IPv6-address-literal / General-address-literal ) "]"
//! ```
//!
//! # Size Constraints
//!
//! - Maximum address length: 254 octets
//! - Maximum local-part: 64 octets
//! - Maximum domain: 255 octets
//! - Maximum hostname: 253 octets, 63 octets per label

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for address parsing
pub type Result<T> = std::result::Result<T, AddressError>;

const MAX_ADDRESS_OCTETS: usize = 254;
const MAX_LOCAL_PART_OCTETS: usize = 64;
const MAX_DOMAIN_OCTETS: usize = 255;
const MAX_HOSTNAME_OCTETS: usize = 253;
const MAX_LABEL_OCTETS: usize = 63;

/// Errors that can occur during address and hostname parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("Empty address")]
    Empty,

    #[error("Address exceeds {MAX_ADDRESS_OCTETS} octets")]
    AddressTooLong,

    #[error("Local-part exceeds {MAX_LOCAL_PART_OCTETS} octets")]
    LocalPartTooLong,

    #[error("Domain exceeds {MAX_DOMAIN_OCTETS} octets")]
    DomainTooLong,

    #[error("Missing '@' separator in mailbox")]
    MissingAtSign,

    #[error("Invalid local-part: {0}")]
    InvalidLocalPart(String),

    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    /// The domain is a single label such as `localhost`
    #[error("Domain is not fully qualified: {0}")]
    UnqualifiedDomain(String),

    #[error("Invalid address literal: {0}")]
    InvalidAddressLiteral(String),

    #[error("Unclosed quoted string in local-part")]
    UnclosedQuotedString,

    #[error("Invalid quoted string: {0}")]
    InvalidQuotedString(String),

    #[error("Invalid hostname: {0}")]
    InvalidHostname(String),
}

/// A parsed mailbox (local-part@domain)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mailbox {
    /// The local part (before @)
    pub local_part: String,
    /// The domain or address literal (after @)
    pub domain: String,
}

impl Mailbox {
    /// Whether the domain is a bracketed address literal such as `[192.0.2.1]`
    #[must_use]
    pub fn is_address_literal(&self) -> bool {
        self.domain.starts_with('[')
    }
}

impl std::fmt::Display for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.local_part, self.domain)
    }
}

/// Parse a bare mailbox such as `user@example.com`
///
/// # Errors
///
/// Returns `AddressError` if the input does not follow the mailbox grammar.
pub fn parse_mailbox(input: &str) -> Result<Mailbox> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(AddressError::Empty);
    }

    if trimmed.len() > MAX_ADDRESS_OCTETS {
        return Err(AddressError::AddressTooLong);
    }

    let at_pos = find_unquoted_at(trimmed)?;
    let local_part = &trimmed[..at_pos];
    let domain = &trimmed[at_pos + 1..];

    if local_part.len() > MAX_LOCAL_PART_OCTETS {
        return Err(AddressError::LocalPartTooLong);
    }
    if domain.len() > MAX_DOMAIN_OCTETS {
        return Err(AddressError::DomainTooLong);
    }

    let local = parse_local_part(local_part)?;
    let dom = parse_domain_or_address_literal(domain)?;

    Ok(Mailbox {
        local_part: local,
        domain: dom,
    })
}

/// Parse a sender address: a mailbox whose domain is fully qualified or an
/// address literal.
///
/// # Errors
///
/// Returns `AddressError` if the mailbox is malformed or its domain has a
/// single label.
pub fn parse_sender_address(input: &str) -> Result<Mailbox> {
    let mailbox = parse_mailbox(input)?;

    if !mailbox.is_address_literal() && !mailbox.domain.contains('.') {
        return Err(AddressError::UnqualifiedDomain(mailbox.domain));
    }

    Ok(mailbox)
}

/// Whether `input` is usable as the From address of outgoing mail
#[must_use]
pub fn is_email(input: &str) -> bool {
    parse_sender_address(input).is_ok()
}

/// Validate a relay hostname: a DNS name, an IPv4 address or an IPv6 address
/// (bare or in brackets).
///
/// # Errors
///
/// Returns `AddressError::InvalidHostname` if the input is none of these.
pub fn parse_hostname(input: &str) -> Result<String> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(AddressError::Empty);
    }

    let unbracketed = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(trimmed);

    if unbracketed.parse::<IpAddr>().is_ok() {
        return Ok(trimmed.to_string());
    }

    if trimmed.len() > MAX_HOSTNAME_OCTETS {
        return Err(AddressError::InvalidHostname(format!(
            "hostname exceeds {MAX_HOSTNAME_OCTETS} octets"
        )));
    }

    // A trailing dot marks an absolute name
    let name = trimmed.strip_suffix('.').unwrap_or(trimmed);

    for label in name.split('.') {
        if label.len() > MAX_LABEL_OCTETS {
            return Err(AddressError::InvalidHostname(format!(
                "label '{label}' exceeds {MAX_LABEL_OCTETS} octets"
            )));
        }

        parse_subdomain(label).map_err(|err| match err {
            AddressError::InvalidDomain(reason) => AddressError::InvalidHostname(reason),
            other => other,
        })?;
    }

    Ok(trimmed.to_string())
}

/// Whether `input` is a syntactically valid relay host
#[must_use]
pub fn is_hostname(input: &str) -> bool {
    parse_hostname(input).is_ok()
}

/// Find the position of '@' that is not inside a quoted string or address literal
fn find_unquoted_at(input: &str) -> Result<usize> {
    let mut in_quotes = false;
    let mut in_brackets = false;
    let mut prev_was_backslash = false;

    for (i, ch) in input.char_indices() {
        if ch == '"' && !prev_was_backslash && !in_brackets {
            in_quotes = !in_quotes;
        } else if ch == '[' && !in_quotes {
            in_brackets = true;
        } else if ch == ']' && !in_quotes {
            in_brackets = false;
        } else if ch == '@' && !in_quotes && !in_brackets {
            return Ok(i);
        }

        prev_was_backslash = ch == '\\' && !prev_was_backslash;
    }

    Err(AddressError::MissingAtSign)
}

fn parse_local_part(input: &str) -> Result<String> {
    if input.is_empty() {
        return Err(AddressError::InvalidLocalPart(
            "Empty local-part".to_string(),
        ));
    }

    if input.starts_with('"') {
        parse_quoted_string(input)
    } else {
        parse_dot_string(input)
    }
}

/// Parse a Dot-string: Atom *("." Atom)
fn parse_dot_string(input: &str) -> Result<String> {
    if input.starts_with('.') || input.ends_with('.') {
        return Err(AddressError::InvalidLocalPart(
            "Dot-string cannot start or end with '.'".to_string(),
        ));
    }

    if input.contains("..") {
        return Err(AddressError::InvalidLocalPart(
            "Dot-string cannot contain consecutive dots".to_string(),
        ));
    }

    if let Some(ch) = input.chars().find(|&ch| ch != '.' && !is_atext(ch)) {
        return Err(AddressError::InvalidLocalPart(format!(
            "Invalid character '{ch}' in atom"
        )));
    }

    Ok(input.to_string())
}

/// Parse a Quoted-string: DQUOTE *`QcontentSMTP` DQUOTE
fn parse_quoted_string(input: &str) -> Result<String> {
    if input.len() < 2 || !input.ends_with('"') {
        return Err(AddressError::UnclosedQuotedString);
    }

    let content = &input[1..input.len() - 1];

    let mut chars = content.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some(next_ch) if next_ch.is_ascii_graphic() || next_ch == ' ' => {}
                Some(next_ch) => {
                    return Err(AddressError::InvalidQuotedString(format!(
                        "Invalid quoted-pair: \\{next_ch}"
                    )));
                }
                None => {
                    return Err(AddressError::InvalidQuotedString(
                        "Backslash at end of quoted string".to_string(),
                    ));
                }
            }
        } else if !is_qtext_smtp(ch) {
            return Err(AddressError::InvalidQuotedString(format!(
                "Invalid character '{ch}' in quoted string"
            )));
        }
    }

    Ok(input.to_string())
}

fn parse_domain_or_address_literal(input: &str) -> Result<String> {
    if input.starts_with('[') {
        parse_address_literal(input)
    } else {
        parse_domain(input)
    }
}

/// Parse a Domain: sub-domain *("." sub-domain)
fn parse_domain(input: &str) -> Result<String> {
    if input.is_empty() {
        return Err(AddressError::InvalidDomain("Empty domain".to_string()));
    }

    if input.starts_with('.') || input.ends_with('.') {
        return Err(AddressError::InvalidDomain(
            "Domain cannot start or end with '.'".to_string(),
        ));
    }

    for subdomain in input.split('.') {
        parse_subdomain(subdomain)?;
    }

    Ok(input.to_string())
}

/// Parse a sub-domain: Let-dig [Ldh-str]
fn parse_subdomain(input: &str) -> Result<()> {
    let (Some(first), Some(last)) = (input.chars().next(), input.chars().last()) else {
        return Err(AddressError::InvalidDomain("Empty subdomain".to_string()));
    };

    if !first.is_ascii_alphanumeric() {
        return Err(AddressError::InvalidDomain(format!(
            "Subdomain must start with letter or digit, got '{first}'"
        )));
    }

    if !last.is_ascii_alphanumeric() {
        return Err(AddressError::InvalidDomain(format!(
            "Subdomain must end with letter or digit, got '{last}'"
        )));
    }

    if let Some(ch) = input
        .chars()
        .find(|ch| !ch.is_ascii_alphanumeric() && *ch != '-')
    {
        return Err(AddressError::InvalidDomain(format!(
            "Invalid character '{ch}' in subdomain"
        )));
    }

    Ok(())
}

/// Parse an address-literal: `[IPv4]` or `[IPv6:...]`
fn parse_address_literal(input: &str) -> Result<String> {
    let Some(content) = input
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    else {
        return Err(AddressError::InvalidAddressLiteral(
            "Address literal must be enclosed in brackets".to_string(),
        ));
    };

    if content.parse::<Ipv4Addr>().is_ok() {
        return Ok(input.to_string());
    }

    if let Some(ipv6_str) = content.strip_prefix("IPv6:")
        && ipv6_str.parse::<Ipv6Addr>().is_ok()
    {
        return Ok(input.to_string());
    }

    Err(AddressError::InvalidAddressLiteral(format!(
        "Invalid address literal format: {content}"
    )))
}

/// atext = ALPHA / DIGIT / "!" / "#" / "$" / "%" / "&" / "'" /
///         "*" / "+" / "-" / "/" / "=" / "?" / "^" / "_" / "\`" /
///         "{" / "|" / "}" / "~"
#[inline]
const fn is_atext(ch: char) -> bool {
    ch.is_ascii_alphanumeric()
        || matches!(
            ch,
            '!' | '#'
                | '$'
                | '%'
                | '&'
                | '\''
                | '*'
                | '+'
                | '-'
                | '/'
                | '='
                | '?'
                | '^'
                | '_'
                | '`'
                | '{'
                | '|'
                | '}'
                | '~'
        )
}

/// qtextSMTP = %d32-33 / %d35-91 / %d93-126
#[inline]
const fn is_qtext_smtp(ch: char) -> bool {
    ch.is_ascii() && matches!(ch as u8, 32..=33 | 35..=91 | 93..=126)
}
