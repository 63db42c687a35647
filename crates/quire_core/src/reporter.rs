//! Plain text report of files and their messages.

use console::{Style, measure_text_width};

use crate::file::File;
use crate::message::{Message, Severity, sort_messages};
use crate::statistics::Statistics;

/// How to report.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    pub color: bool,
    /// Skip files without messages.
    pub quiet: bool,
    /// Show fatal messages only.
    pub silent: bool,
    /// Show notes, urls and node ancestry.
    pub verbose: bool,
}

struct Styles {
    bold: Style,
    underline: Style,
    red: Style,
    yellow: Style,
    green: Style,
    cyan: Style,
    plain: Style,
}

impl Styles {
    fn new(color: bool) -> Self {
        let style = |style: Style| style.force_styling(color);
        Self {
            bold: style(Style::new().bold()),
            underline: style(Style::new().underlined()),
            red: style(Style::new().red()),
            yellow: style(Style::new().yellow()),
            green: style(Style::new().green()),
            cyan: style(Style::new().cyan()),
            plain: style(Style::new()),
        }
    }
}

enum Row {
    Line(String),
    Cells([String; 5]),
}

/// Renders a report for `files`, sorted by path.
///
/// Returns an empty string when there is nothing to say.
pub fn report(files: &[&File], options: ReportOptions) -> String {
    let styles = Styles::new(options.color);
    let mut files = files.to_vec();
    files.sort_by_key(|file| file.display_path());

    let mut rows = Vec::new();
    let mut shown = Vec::new();
    let mut last_was_message = false;

    for file in files {
        let mut messages = file.messages.clone();
        sort_messages(&mut messages);

        let mut message_rows = Vec::new();
        for message in messages {
            if !options.silent || message.is_fatal() {
                message_rows.extend(message_rows_for(&message, &styles, options));
                shown.push(message);
            }
        }

        if (!options.quiet && !options.silent) || !message_rows.is_empty() {
            if last_was_message {
                rows.push(Row::Line(String::new()));
            }
            rows.push(Row::Line(file_line(file, &styles)));
            last_was_message = !message_rows.is_empty();
            rows.extend(message_rows);
        }
    }

    let stats = Statistics::of_messages(&shown);
    if stats.fatal > 0 || stats.warn > 0 {
        rows.push(Row::Line(String::new()));
        rows.push(Row::Line(byline(&stats, &styles)));
    }

    serialize(rows)
}

fn file_line(file: &File, styles: &Styles) -> String {
    let stats = Statistics::of_messages(&file.messages);
    let origin = file.origin();
    let name = if origin.is_empty() { "<stdin>".to_string() } else { origin };
    let current = file.display_path();

    let color = if stats.fatal > 0 {
        &styles.red
    } else if stats.total() > 0 {
        &styles.yellow
    } else {
        &styles.green
    };
    let mut left = styles.underline.apply_to(color.apply_to(&name)).to_string();
    if file.stored && name != current {
        left.push_str(&format!(" > {current}"));
    }

    if file.stored {
        format!("{left}: {}", styles.yellow.apply_to("written"))
    } else if stats.total() == 0 {
        format!("{left}: no issues found")
    } else {
        left
    }
}

fn message_rows_for(message: &Message, styles: &Styles, options: ReportOptions) -> Vec<Row> {
    let mut lines = message.reason.lines();
    let reason = lines.next().unwrap_or_default();
    let rest: Vec<String> = lines.map(str::to_string).collect();

    let place = message
        .place
        .map(|place| place.to_string())
        .unwrap_or_else(|| "1:1".to_string());
    let label = match message.severity {
        Severity::Error => styles.red.apply_to("error"),
        Severity::Warning => styles.yellow.apply_to("warning"),
        Severity::Info => styles.plain.apply_to("info"),
    };

    let mut rows = vec![Row::Cells([
        place,
        label.to_string(),
        format_reason(reason, styles),
        message.rule_id.clone().unwrap_or_default(),
        message.source.clone().unwrap_or_default(),
    ])];
    rows.extend(rest.into_iter().map(Row::Line));

    if let Some(cause) = &message.cause {
        rows.extend(section("cause", cause, styles));
    }
    if options.verbose {
        if let Some(url) = &message.url {
            rows.extend(section("url", url, styles));
        }
        if let Some(note) = &message.note {
            rows.extend(section("note", note, styles));
        }
        if !message.ancestors.is_empty() {
            let trace: Vec<String> = message
                .ancestors
                .iter()
                .rev()
                .map(|node_type| format!("at {}", styles.yellow.apply_to(node_type.as_str())))
                .collect();
            rows.extend(section("trace", &trace.join("\n"), styles));
        }
    }
    rows
}

fn section(title: &str, body: &str, styles: &Styles) -> Vec<Row> {
    let mut rows = vec![Row::Line(format!(
        "  {}:",
        styles.bold.apply_to(format!("[{title}]"))
    ))];
    rows.extend(body.lines().map(|line| Row::Line(format!("    {line}"))));
    rows
}

/// Highlights code spans in `reason`.
fn format_reason(reason: &str, styles: &Styles) -> String {
    let mut out = String::new();
    let mut rest = reason;
    while let Some(open) = rest.find('`') {
        let ticks = rest[open..].chars().take_while(|c| *c == '`').count();
        let fence = "`".repeat(ticks);
        let after = &rest[open + ticks..];
        let Some(close) = after.find(fence.as_str()) else {
            break;
        };
        let end = open + ticks + close + ticks;
        out.push_str(&rest[..open]);
        out.push_str(&styles.cyan.apply_to(&rest[open..end]).to_string());
        rest = &rest[end..];
    }
    out.push_str(rest);
    styles.bold.apply_to(out).to_string()
}

fn byline(stats: &Statistics, styles: &Styles) -> String {
    let plural = |count: usize, label: &str| {
        format!("{count} {label}{}", if count == 1 { "" } else { "s" })
    };

    let mut parts = Vec::new();
    if stats.fatal > 0 {
        parts.push(format!("{} {}", styles.red.apply_to("✖"), plural(stats.fatal, "error")));
    }
    if stats.warn > 0 {
        parts.push(format!("{} {}", styles.yellow.apply_to("⚠"), plural(stats.warn, "warning")));
    }
    let summary = parts.join(", ");

    if stats.total() != stats.fatal && stats.total() != stats.warn {
        format!("{} messages ({summary})", stats.total())
    } else {
        summary
    }
}

fn serialize(rows: Vec<Row>) -> String {
    let mut widths = [0_usize; 5];
    for row in &rows {
        if let Row::Cells(cells) = row {
            for (width, cell) in widths.iter_mut().zip(cells) {
                *width = (*width).max(measure_text_width(cell));
            }
        }
    }

    rows.into_iter()
        .map(|row| match row {
            Row::Line(line) => line,
            Row::Cells(cells) => {
                let mut line = String::new();
                for (width, cell) in widths.iter().zip(&cells) {
                    line.push_str(cell);
                    line.push_str(&" ".repeat(width + 1 - measure_text_width(cell)));
                }
                line.trim_end().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Place;
    use pretty_assertions::assert_eq;
    use quire_tree::{Point, Position};

    fn place(line: usize, column: usize, end: usize) -> Place {
        Place::Position(Position::new(
            Point::new(line, column),
            Point::new(line, end),
        ))
    }

    #[test]
    fn test_report() {
        let mut a = File::with_path("/", "a.md");
        a.push(
            Message::new("Cannot find file `b.md`")
                .with_place(place(3, 1, 12))
                .with_origin("quire-validate-links", "missing-file"),
        );
        a.push(Message::new("Cannot find heading for `#x`").with_place(place(1, 1, 9)));
        let b = File::with_path("/", "b.md");

        let output = report(&[&b, &a], ReportOptions::default());

        assert_eq!(
            output,
            [
                "a.md",
                "1:1-1:9  warning Cannot find heading for `#x`",
                "3:1-3:12 warning Cannot find file `b.md`      missing-file quire-validate-links",
                "",
                "b.md: no issues found",
                "",
                "⚠ 2 warnings",
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_quiet_and_silent() {
        let mut a = File::with_path("/", "a.md");
        a.push(Message::new("minor"));
        let b = File::with_path("/", "b.md");

        let quiet = report(&[&a, &b], ReportOptions { quiet: true, ..Default::default() });
        assert_eq!(quiet, "a.md\n1:1 warning minor\n\n⚠ 1 warning");

        let silent = report(&[&a, &b], ReportOptions { silent: true, ..Default::default() });
        assert_eq!(silent, "");
    }

    #[test]
    fn test_cause_and_stdin() {
        let mut file = File::new("/");
        file.fail_with("Cannot process file", "boom");
        file.info("fyi");

        let output = report(&[&file], ReportOptions::default());
        assert_eq!(
            output,
            [
                "<stdin>",
                "1:1 error Cannot process file",
                "  [cause]:",
                "    boom",
                "1:1 info  fyi",
                "",
                "2 messages (✖ 1 error)",
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_written() {
        let mut file = File::with_path("/", "a.md");
        file.set_path("out/a.md");
        file.stored = true;

        assert_eq!(
            report(&[&file], ReportOptions::default()),
            "a.md > out/a.md: written"
        );
    }
}
