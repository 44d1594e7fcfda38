//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stderr().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Colors for status lines written to stderr.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub fn new(mode: ColorMode) -> Self {
        Self {
            enabled: should_color(mode),
        }
    }

    pub fn ok(self, text: &str) -> String {
        if self.enabled {
            text.green().to_string()
        } else {
            text.to_owned()
        }
    }

    pub fn warn(self, text: &str) -> String {
        if self.enabled {
            text.yellow().to_string()
        } else {
            text.to_owned()
        }
    }

    pub fn dim(self, text: &str) -> String {
        if self.enabled {
            text.dimmed().to_string()
        } else {
            text.to_owned()
        }
    }

    /// Alert severities: high in red, medium in yellow, the rest plain.
    pub fn severity(self, severity: &str) -> String {
        if !self.enabled {
            return severity.to_owned();
        }
        match severity.to_ascii_lowercase().as_str() {
            "high" | "critical" => severity.red().bold().to_string(),
            "medium" => severity.yellow().to_string(),
            _ => severity.to_owned(),
        }
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the original data via serde
/// - `yaml`: serializes via serde_yaml
/// - `plain`: calls `id_fn` on each item to emit one identifier per line
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => render_json_pretty(data),
        OutputFormat::JsonCompact => render_json_compact(data),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => data.iter().map(&id_fn).collect::<Vec<_>>().join("\n"),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses a custom `detail_fn` that returns a pre-formatted string,
/// since single-item detail views don't use `Tabled` derive.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize + ?Sized,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => render_json_pretty(data),
        OutputFormat::JsonCompact => render_json_compact(data),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => id_fn(data),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

/// Print a status line to stderr unless `--quiet`.
pub fn status(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{message}");
    }
}

/// `key: value` lines for detail views, skipping empty values.
pub fn detail_lines(pairs: &[(&str, Option<String>)]) -> String {
    let width = pairs
        .iter()
        .filter(|(_, v)| v.is_some())
        .map(|(k, _)| k.len())
        .max()
        .unwrap_or(0);
    pairs
        .iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .map(|v| format!("{key:<width$}  {v}"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Placeholder for absent optional columns.
pub fn or_dash(value: Option<&str>) -> String {
    value.filter(|v| !v.is_empty()).unwrap_or("-").to_owned()
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Pretty-printed JSON.
pub(crate) fn render_json_pretty<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|e| format!("serialization failed: {e}"))
}

/// Compact single-line JSON.
pub(crate) fn render_json_compact<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_json::to_string(data).unwrap_or_else(|e| format!("serialization failed: {e}"))
}

/// YAML output.
pub(crate) fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).unwrap_or_else(|e| format!("serialization failed: {e}"))
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    struct Item {
        ip: String,
    }

    #[derive(Tabled)]
    struct ItemRow {
        #[tabled(rename = "IP")]
        ip: String,
    }

    fn items() -> Vec<Item> {
        vec![
            Item { ip: "10.0.0.1".into() },
            Item { ip: "10.0.0.2".into() },
        ]
    }

    #[test]
    fn plain_is_one_id_per_line() {
        let out = render_list(
            OutputFormat::Plain,
            &items(),
            |i| ItemRow { ip: i.ip.clone() },
            |i| i.ip.clone(),
        );
        assert_eq!(out, "10.0.0.1\n10.0.0.2");
    }

    #[test]
    fn table_has_header_and_rows() {
        let out = render_list(
            OutputFormat::Table,
            &items(),
            |i| ItemRow { ip: i.ip.clone() },
            |i| i.ip.clone(),
        );
        assert!(out.contains("IP"));
        assert!(out.contains("10.0.0.2"));
    }

    #[test]
    fn compact_json_is_single_line() {
        let out = render_list(
            OutputFormat::JsonCompact,
            &items(),
            |i| ItemRow { ip: i.ip.clone() },
            |i| i.ip.clone(),
        );
        assert_eq!(out, r#"[{"ip":"10.0.0.1"},{"ip":"10.0.0.2"}]"#);
    }

    #[test]
    fn detail_lines_align_and_skip_missing() {
        let out = detail_lines(&[
            ("User", Some("admin".into())),
            ("Expires", None),
            ("Mode", Some("bearer".into())),
        ]);
        assert_eq!(out, "User  admin\nMode  bearer");
    }

    #[test]
    fn palette_is_passthrough_when_disabled() {
        let palette = Palette::new(ColorMode::Never);
        assert_eq!(palette.severity("high"), "high");
        assert_eq!(palette.ok("done"), "done");
    }
}
