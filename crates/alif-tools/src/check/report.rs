//! Check results and their HTML report.

use std::fmt::{self, Write as _};

use serde_json::Value;

use crate::config::ReportSettings;
use crate::diff::diff;
use crate::error::Result;
use crate::font::Font;
use crate::shaping::{GlyphRun, Variations};
use crate::svg::run_to_img;

/// Outcome of one reported condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The condition holds.
    Pass,
    /// The condition is violated.
    Fail,
    /// Nothing was checked.
    Skip,
}

impl Status {
    /// Indicator shown in front of the message header.
    #[must_use]
    pub fn indicator(self) -> &'static str {
        match self {
            Self::Pass => "PASS ✅",
            Self::Fail => "FAIL 🔥",
            Self::Skip => "SKIP ⏩",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Skip => "skip",
        })
    }
}

/// A result message: a stable code, a one-line header and HTML items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Machine readable condition code, e.g. `shaping-regression`.
    pub code: String,
    /// Human readable summary.
    pub header: String,
    /// HTML fragments with details.
    pub items: Vec<String>,
}

impl Message {
    /// A message without items.
    #[must_use]
    pub fn new(code: impl Into<String>, header: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            header: header.into(),
            items: Vec::new(),
        }
    }

    /// Attach detail items.
    #[must_use]
    pub fn with_items(mut self, items: Vec<String>) -> Self {
        self.items = items;
        self
    }
}

/// Results of one check, in the order they were produced.
pub type CheckResults = Vec<(Status, Message)>;

/// What a failure expected.
#[derive(Debug, Clone)]
pub enum Expected {
    /// A glyph-name sequence or an expectation that could not be parsed.
    Text(String),
    /// A full expectation parsed into a run, drawn next to the actual run.
    Run(GlyphRun),
}

/// Contents of one report item.
#[derive(Debug, Clone, Default)]
pub struct ReportItem<'a> {
    /// Leading HTML message.
    pub message: &'a str,
    /// Input text, appended to the message.
    pub text: Option<&'a str>,
    /// Free-form note of the test.
    pub note: Option<&'a str>,
    /// Shaping parameters worth showing next to the failure.
    pub extra_data: Option<&'a Value>,
    /// The run the font produced.
    pub actual: Option<&'a GlyphRun>,
    /// The run or string the test expected.
    pub expected: Option<&'a Expected>,
    /// Location used to draw the runs.
    pub variations: Option<&'a Variations>,
}

/// Escape text for inclusion in HTML.
#[must_use]
pub fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render one failure as HTML: heading, parameters, diff and drawings.
///
/// # Errors
///
/// Returns an error if a run cannot be drawn.
pub fn create_report_item(font: &Font, item: &ReportItem<'_>) -> Result<String> {
    let mut html = format!("<h4>{}", item.message);
    if let Some(text) = item.text.filter(|t| !t.is_empty()) {
        let _ = write!(html, ": {}", html_escape(text));
    }
    if let Some(note) = item.note.filter(|n| !n.is_empty()) {
        let _ = write!(html, " ({})", html_escape(note));
    }
    html.push_str("</h4>\n");

    if let Some(extra) = item.extra_data.filter(|v| !is_empty_value(v)) {
        let _ = writeln!(html, "<pre>{}</pre>", html_escape(&extra.to_string()));
    }

    let serialized_expected = item.expected.map(|expected| match expected {
        Expected::Text(text) => text.clone(),
        Expected::Run(run) => run.serialize(false),
    });
    let glyphs_only = matches!(item.expected, Some(Expected::Text(text)) if !text.contains('+'));
    let serialized_actual = item.actual.map(|run| run.serialize(glyphs_only));

    if let (Some(old), Some(new)) = (&serialized_expected, &serialized_actual) {
        if !old.is_empty() && !new.is_empty() {
            let _ = writeln!(html, "{}", diff(old, new));
        }
    }

    if let Some(actual) = item.actual {
        let _ = writeln!(html, "Got: {}", run_to_img(font, actual, item.variations)?);
    }
    if let Some(Expected::Run(expected)) = item.expected {
        let _ = write!(html, "Expected: {}", run_to_img(font, expected, item.variations)?);
    }

    Ok(html)
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Assemble the HTML page for all checks.
///
/// Returns the page and whether no check failed.
#[must_use]
pub fn generate_html(
    results: &[(&str, CheckResults)],
    settings: &ReportSettings,
) -> (String, bool) {
    let mut all_pass = true;
    let title = html_escape(&settings.title);

    let mut html = format!(
        r"
<!DOCTYPE html>
<html>
<head>
    <meta charset='utf-8'>
    <title>{title}</title>
    <style>
        body {{
            font-family: sans-serif;
            max-width: 720px;
            margin: auto;
            padding-bottom: 3rem;
        }}

        h3 {{
            display: flex;
            align-items: baseline;
            margin-inline-start: -6em;
        }}

        h3 .indicator {{
            flex: 0 0 5em;
            text-align: end;
            padding-inline-end: 1em;
        }}

        h3 .text {{
            flex: 1 0;
            font-weight: normal;
        }}

        .item ul {{
            padding-inline-start: 0;
        }}

        .items img {{
            height: {height}px;
            margin: 10px;
        }}

        .items del {{
            background-color: rgba(255, 0, 0, 0.6);
            text-decoration: none;
        }}

        .items ins {{
            background-color: rgba(0, 255, 0, 0.6);
            text-decoration: none;
        }}

        .items pre .expected {{
            background-color: rgba(255, 0, 0, 0.2);
        }}

        .items pre .actual {{
            background-color: rgba(0, 255, 0, 0.2);
        }}
    </style>
</head>
<body>
    <h1>{title}</h1>
",
        height = settings.image_height
    );

    for (check, check_results) in results {
        let _ = writeln!(html, "<h2>{check}</h2>");
        for (status, message) in check_results {
            if *status == Status::Fail {
                all_pass = false;
            }
            let _ = writeln!(
                html,
                "<h3><span class='indicator'>{}</span> <span class='text'>{}</span></h3>",
                status.indicator(),
                html_escape(&message.header)
            );
            if !message.items.is_empty() {
                let _ = writeln!(
                    html,
                    "<div class='items'>\n{}\n</div>",
                    message.items.join("\n")
                );
            }
        }
    }
    html.push_str("\n</body>\n</html>\n");
    (html, all_pass)
}
