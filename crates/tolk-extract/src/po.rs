//! Writer for gettext catalog templates (`.pot`).

use crate::catalog::{Catalog, Message};
use regex::Regex;
use std::io::{self, Write};
use std::sync::LazyLock;

/// Line width used for catalog templates.
pub const DEFAULT_WIDTH: usize = 80;

static CHUNK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+|\S+").unwrap());

/// Quote and escape a string for use in a PO file.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            '"' => out.push_str("\\\""),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Render a string as one or more quoted lines no wider than `width`.
///
/// Strings with embedded newlines or that don't fit on one line start with
/// an empty `""` line, followed by one quoted line per chunk.
pub fn normalize(text: &str, prefix: &str, width: usize) -> String {
    let mut lines: Vec<String> = Vec::new();

    for line in text.split_inclusive('\n') {
        if width > 0 && escape(line).chars().count() + prefix.len() > width {
            let mut chunks: Vec<&str> = CHUNK_RE.find_iter(line).map(|m| m.as_str()).collect();
            chunks.reverse();
            while !chunks.is_empty() {
                let mut buf = String::new();
                let mut size = 2;
                while let Some(chunk) = chunks.last() {
                    let length = escape(chunk).chars().count() - 2 + prefix.len();
                    if size + length < width {
                        buf.push_str(chunk);
                        size += length;
                        chunks.pop();
                    } else {
                        if buf.is_empty() {
                            buf.push_str(chunk);
                            chunks.pop();
                        }
                        break;
                    }
                }
                lines.push(buf);
            }
        } else {
            lines.push(line.to_string());
        }
    }

    if lines.len() <= 1 {
        return escape(text);
    }

    let body = lines
        .iter()
        .map(|line| format!("{prefix}{}", escape(line)))
        .collect::<Vec<_>>()
        .join("\n");
    format!("\"\"\n{body}")
}

/// Greedy word wrap for comment lines. Words longer than `width` are kept
/// whole on their own line.
fn wrap_words(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn write_comment<W: Write>(writer: &mut W, comment: &str, prefix: &str, width: usize) -> io::Result<()> {
    for line in wrap_words(comment, width) {
        writeln!(writer, "#{prefix} {line}")?;
    }
    Ok(())
}

fn header(catalog: &Catalog) -> String {
    let meta = &catalog.metadata;
    let bugs_to = if meta.msgid_bugs_address.is_empty() {
        "EMAIL@ADDRESS"
    } else {
        &meta.msgid_bugs_address
    };
    [
        format!("Project-Id-Version: {} {}", meta.project, meta.version),
        format!("Report-Msgid-Bugs-To: {bugs_to}"),
        format!("POT-Creation-Date: {}", meta.creation_date),
        "PO-Revision-Date: YEAR-MO-DA HO:MI+ZONE".to_string(),
        "Last-Translator: FULL NAME <EMAIL@ADDRESS>".to_string(),
        "Language-Team: LANGUAGE <LL@li.org>".to_string(),
        "MIME-Version: 1.0".to_string(),
        format!("Content-Type: text/plain; charset={}", meta.charset),
        "Content-Transfer-Encoding: 8bit".to_string(),
        format!("Generated-By: tolk {}", env!("CARGO_PKG_VERSION")),
    ]
    .iter()
    .map(|line| format!("{line}\n"))
    .collect()
}

fn write_message<W: Write>(writer: &mut W, message: &Message, width: usize) -> io::Result<()> {
    for comment in &message.auto_comments {
        write_comment(writer, comment, ".", width)?;
    }
    if !message.locations.is_empty() {
        let locations = message
            .locations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        write_comment(writer, &locations, ":", width)?;
    }
    if !message.flags.is_empty() {
        let flags = message.flags.iter().cloned().collect::<Vec<_>>().join(", ");
        writeln!(writer, "#, {flags}")?;
    }
    if let Some(context) = &message.context {
        writeln!(writer, "msgctxt {}", normalize(context, "", width))?;
    }
    writeln!(writer, "msgid {}", normalize(message.id.msgid(), "", width))?;
    match message.id.plural() {
        Some(plural) => {
            writeln!(writer, "msgid_plural {}", normalize(plural, "", width))?;
            writeln!(writer, "msgstr[0] \"\"")?;
            writeln!(writer, "msgstr[1] \"\"")?;
        },
        None => writeln!(writer, "msgstr \"\"")?,
    }
    Ok(())
}

/// Write `catalog` as a catalog template.
pub fn write_pot<W: Write>(writer: &mut W, catalog: &Catalog, width: usize) -> io::Result<()> {
    writeln!(writer, "#, fuzzy")?;
    writeln!(writer, "msgid \"\"")?;
    writeln!(writer, "msgstr {}", normalize(&header(catalog), "", width))?;

    for message in catalog.messages() {
        writeln!(writer)?;
        write_message(writer, message, width)?;
    }
    Ok(())
}

/// Render `catalog` to a string.
pub fn to_pot_string(catalog: &Catalog, width: usize) -> io::Result<String> {
    let mut buf = Vec::new();
    write_pot(&mut buf, catalog, width)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
