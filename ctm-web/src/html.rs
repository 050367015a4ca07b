//! Server-rendered page layout and small HTML helpers

use axum::http::StatusCode;
use axum::response::Html;
use ctm_common::db::{semester_label, SEMESTERS};

use crate::session::Flash;

/// Escape text for element content and quoted attribute values
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Surroundings of a page: mode badge, curriculum navigation and flashes
#[derive(Debug, Clone, Default)]
pub struct Chrome {
    /// `"edit"` or `"view"`
    pub mode_label: &'static str,
    pub curriculum: Option<(i64, String)>,
    pub flashes: Vec<Flash>,
}

pub fn page(title: &str, chrome: &Chrome, body: &str) -> Html<String> {
    let nav = match &chrome.curriculum {
        Some((id, name)) => format!(
            r#"<a href="/curriculum/{id}/credit-table">{name}</a>
            <span class="mode mode-{mode}">{mode}</span>
            &nbsp;|&nbsp;<a href="/curriculum/{id}/plo-summary">PLO summary</a>
            &nbsp;|&nbsp;<a href="/">Curricula</a>"#,
            id = id,
            name = escape(name),
            mode = chrome.mode_label,
        ),
        None => r#"<a href="/">Curriculum Table Manager</a>"#.to_string(),
    };

    let flashes: String = chrome
        .flashes
        .iter()
        .map(|f| format!(r#"<div class="flash {}">{}</div>"#, f.level.css_class(), escape(&f.message)))
        .collect();

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <link rel="stylesheet" href="/static/ctm.css">
</head>
<body>
<header>
    <div>{nav}</div>
    <div class="build-info">v{version} [{git}]<br>{built}</div>
</header>
<main>
{flashes}
<h1>{title}</h1>
{body}
</main>
</body>
</html>"#,
        title = escape(title),
        nav = nav,
        version = env!("CARGO_PKG_VERSION"),
        git = env!("GIT_HASH"),
        built = env!("BUILD_TIMESTAMP"),
        flashes = flashes,
        body = body,
    ))
}

pub fn error_page(status: StatusCode, message: &str) -> Html<String> {
    let title = format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Error")
    );
    page(
        &title,
        &Chrome::default(),
        &format!(
            r#"<p>{}</p><p><a href="/">Back to curriculum selection</a></p>"#,
            escape(message)
        ),
    )
}

/// `<th>Year 1/1</th>` ... `<th>Year 4/2</th>`
pub fn semester_headers() -> String {
    (1..=SEMESTERS as i64)
        .map(|s| format!("<th>Year {}</th>", semester_label(s)))
        .collect()
}

/// POST button in its own form
pub fn post_button(action: &str, label: &str, class: &str) -> String {
    format!(
        r#"<form method="post" action="{}"><button type="submit" class="{}">{}</button></form>"#,
        escape(action),
        class,
        escape(label)
    )
}

/// `<option>` list with `selected` on the matching value
pub fn options<'a>(values: impl IntoIterator<Item = (&'a str, &'a str)>, selected: &str) -> String {
    values
        .into_iter()
        .map(|(value, label)| {
            format!(
                r#"<option value="{}"{}>{}</option>"#,
                escape(value),
                if value == selected { " selected" } else { "" },
                escape(label)
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<b>"A & B"</b>"#), "&lt;b&gt;&quot;A &amp; B&quot;&lt;/b&gt;");
        assert_eq!(escape("it's"), "it&#39;s");
    }

    #[test]
    fn test_semester_headers() {
        let headers = semester_headers();
        assert!(headers.starts_with("<th>Year 1/1</th>"));
        assert!(headers.ends_with("<th>Year 4/2</th>"));
    }

    #[test]
    fn test_options_marks_selected() {
        let html = options([("", "-"), ("Apply", "Apply")], "Apply");
        assert!(html.contains(r#"<option value="Apply" selected>"#));
        assert!(html.contains(r#"<option value="">-</option>"#));
    }
}
