//! Output filename templating.
//!
//! | token | value                    |
//! |-------|--------------------------|
//! | `%Y`  | year, 4 digits           |
//! | `%M`  | month, `01`-`12`         |
//! | `%D`  | day of month, 2 digits   |
//! | `%h`  | hour, 2 digits           |
//! | `%m`  | minute, 2 digits         |
//! | `%c`  | vehicle name             |
//! | `%t`  | track name               |
//! | `%d`  | driver name              |
//!
//! The template is scanned once, left to right. Substituted text is never
//! scanned again, and unknown `%` sequences are copied through unchanged.

use chrono::{DateTime, Datelike, Local, Timelike};
use openmotorsport_format::Session;

/// Replace characters that are not allowed in a file name.
pub fn sanitize_component(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Values substituted into a template.
#[derive(Debug, Clone)]
pub struct FilenameFields<'a> {
    pub date: DateTime<Local>,
    pub vehicle: &'a str,
    pub track: &'a str,
    pub user: &'a str,
}

impl<'a> FilenameFields<'a> {
    /// Fields taken from a session's creation time and metadata.
    pub fn from_session(session: &'a Session) -> Self {
        let meta = session.metadata();
        Self {
            date: session.created_at(),
            vehicle: &meta.vehicle,
            track: &meta.track,
            user: &meta.user,
        }
    }
}

/// Expand `template` with `fields`.
pub fn format_filename(template: &str, fields: &FilenameFields<'_>) -> String {
    let mut out = String::with_capacity(template.len() + 32);
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let Some(&token) = chars.peek() else {
            out.push('%');
            break;
        };

        let replacement = match token {
            'Y' => Some(format!("{:04}", fields.date.year())),
            'M' => Some(format!("{:02}", fields.date.month())),
            'D' => Some(format!("{:02}", fields.date.day())),
            'h' => Some(format!("{:02}", fields.date.hour())),
            'm' => Some(format!("{:02}", fields.date.minute())),
            'c' => Some(sanitize_component(fields.vehicle)),
            't' => Some(sanitize_component(fields.track)),
            'd' => Some(sanitize_component(fields.user)),
            _ => None,
        };

        match replacement {
            Some(text) => {
                out.push_str(&text);
                chars.next();
            }
            None => out.push('%'),
        }
    }

    out
}

/// Expand `template` for `session`.
pub fn session_filename(template: &str, session: &Session) -> String {
    format_filename(template, &FilenameFields::from_session(session))
}
