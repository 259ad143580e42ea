//! Server-side HTML rendering.
//!
//! Pages are plain strings built with `format!`. Every value that comes from
//! the user, the calendar or the identity provider goes through
//! [`html_escape`] first.

use std::fmt::Write as _;

use caldash_core::{EventRow, FilterMode, FilterState, format_date, html_escape};

use crate::view::ViewStatus;

/// Application title, shown on both pages.
pub const TITLE: &str = "Calendar Dashboard";

/// Text shown for a missing start or end.
pub const UNKNOWN_TIME: &str = "unknown";

const STYLE: &str = "body{font-family:system-ui,sans-serif;margin:2rem auto;max-width:960px;padding:0 1rem}\
table{border-collapse:collapse;width:100%}th,td{border-bottom:1px solid #ddd;padding:.5rem;text-align:left}\
.toast{background:#fdecea;border:1px solid #f5c2c0;padding:.75rem;margin:1rem 0}\
.notice{background:#e8f4fd;border:1px solid #b6dcfe;padding:.75rem;margin:1rem 0}\
header{display:flex;justify-content:space-between;align-items:center}\
.filters{display:flex;gap:1rem;align-items:end;margin:1rem 0}";

/// A message shown above the sign-in button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Banner {
    Error(&'static str),
    Notice(&'static str),
}

impl Banner {
    /// Looks up the banner for an `auth_error` query code.
    ///
    /// Unknown codes yield `None` so arbitrary text never reaches the page.
    pub fn auth_error(code: &str) -> Option<Self> {
        let message = match code {
            "access_denied" => "Sign-in was cancelled.",
            "invalid_state" => "Your sign-in attempt expired. Please try again.",
            "exchange_failed" => "Could not complete sign-in with Google.",
            "provider_unavailable" => "Sign-in is temporarily unavailable.",
            _ => return None,
        };
        Some(Self::Error(message))
    }

    /// Looks up the banner for a `notice` query code.
    pub fn notice(code: &str) -> Option<Self> {
        let message = match code {
            "signed_out" => "You have been signed out.",
            "signout_failed" => {
                "Google could not confirm the sign-out. Your session on this site has been cleared."
            }
            _ => return None,
        };
        Some(Self::Notice(message))
    }

    fn render(&self) -> String {
        match self {
            Self::Error(msg) => format!(r#"<div class="toast" role="alert">{}</div>"#, html_escape(msg)),
            Self::Notice(msg) => format!(r#"<div class="notice" role="status">{}</div>"#, html_escape(msg)),
        }
    }
}

/// Everything the dashboard page shows.
#[derive(Debug, Clone, Copy)]
pub struct DashboardPage<'a> {
    /// Signed-in user's email or name.
    pub user: Option<&'a str>,
    pub filter: &'a FilterState,
    pub status: ViewStatus,
    pub rows: &'a [EventRow],
    pub notifications: &'a [String],
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n<style>{}</style>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        html_escape(title),
        STYLE,
        body
    )
}

/// The sign-in page.
pub fn entry_page(banner: Option<Banner>) -> String {
    let banner = banner.map(|b| b.render()).unwrap_or_default();
    let body = format!(
        "<main>\n<h1>{TITLE}</h1>\n{banner}\n\
         <p>View and filter your Google Calendar events.</p>\n\
         <a class=\"button\" href=\"/auth/login\">Sign in with Google</a>\n</main>"
    );
    layout(TITLE, &body)
}

/// The events page.
pub fn dashboard_page(page: &DashboardPage<'_>) -> String {
    let mut body = String::new();

    body.push_str("<header>\n");
    let _ = writeln!(body, "<h1>{TITLE}</h1>");
    body.push_str("<div>");
    if let Some(user) = page.user {
        let _ = write!(body, "<span class=\"user\">{}</span> ", html_escape(user));
    }
    body.push_str(
        "<form method=\"post\" action=\"/auth/signout\" style=\"display:inline\">\
         <button type=\"submit\">Sign out</button></form></div>\n</header>\n",
    );

    for message in page.notifications {
        let _ = writeln!(
            body,
            r#"<div class="toast" role="alert">{}</div>"#,
            html_escape(message)
        );
    }

    body.push_str(&filter_form(page.filter));
    body.push('\n');
    body.push_str(&events_table(page.filter, page.status, page.rows));

    layout(TITLE, &format!("<main>\n{body}\n</main>"))
}

/// The filter controls, pre-filled with the current state.
pub fn filter_form(filter: &FilterState) -> String {
    let mut options = String::new();
    for (mode, label) in [
        (FilterMode::All, "All upcoming"),
        (FilterMode::SingleDate, "Single date"),
        (FilterMode::DateRange, "Date range"),
    ] {
        let selected = if mode == filter.mode { " selected" } else { "" };
        let _ = write!(
            options,
            r#"<option value="{}"{selected}>{label}</option>"#,
            mode.as_str()
        );
    }

    let date = filter.anchor_date.map(format_date).unwrap_or_default();
    let end = filter.end_date.map(format_date).unwrap_or_default();

    format!(
        "<form class=\"filters\" method=\"get\" action=\"/dashboard\">\
         <label>Show <select name=\"mode\">{options}</select></label>\
         <label>Date <input type=\"date\" name=\"date\" value=\"{date}\"></label>\
         <label>End date <input type=\"date\" name=\"end\" value=\"{end}\"></label>\
         <button type=\"submit\">Apply</button></form>"
    )
}

fn events_table(filter: &FilterState, status: ViewStatus, rows: &[EventRow]) -> String {
    let status = match status {
        ViewStatus::Loading => "loading",
        ViewStatus::Idle => "idle",
        ViewStatus::Error => "error",
    };

    let mut html = format!(
        "<table data-status=\"{status}\">\n<caption>{}</caption>\n\
         <thead><tr><th>Event</th><th>Location</th><th>Start</th><th>End</th></tr></thead>\n<tbody>\n",
        html_escape(&filter.describe())
    );

    if rows.is_empty() {
        html.push_str("<tr><td colspan=\"4\">No events found</td></tr>\n");
    }
    for row in rows {
        html.push_str(&event_row(row));
        html.push('\n');
    }

    html.push_str("</tbody>\n</table>");
    html
}

/// One table row.
pub fn event_row(row: &EventRow) -> String {
    let title = html_escape(&row.title);
    let title = match row.link.as_deref().filter(|l| is_web_link(l)) {
        Some(link) => format!(
            r#"<a href="{}" target="_blank" rel="noopener">{title}</a>"#,
            html_escape(link)
        ),
        None => title,
    };
    let class = if row.is_all_day { " class=\"all-day\"" } else { "" };

    format!(
        "<tr{class}><td>{title}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
        html_escape(row.location.as_deref().unwrap_or("")),
        html_escape(row.start.as_deref().unwrap_or(UNKNOWN_TIME)),
        html_escape(row.end.as_deref().unwrap_or(UNKNOWN_TIME)),
    )
}

fn is_web_link(link: &str) -> bool {
    link.starts_with("https://") || link.starts_with("http://")
}
