//! Output formatting for the command-line tool

use crate::index::Coordinate;
use crate::parser::Record;
use crate::table::Table;
use serde::Serialize;
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// One search hit as emitted by `--json`
#[derive(Debug, Serialize)]
pub struct CellMatch<'a> {
    pub row: usize,
    pub column: usize,
    pub text: &'a str,
}

pub fn stdout(color: bool) -> StandardStream {
    StandardStream::stdout(if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    })
}

/// Print hits as `row:column: text`, highlighting the first matched term
pub fn print_cell_matches<W: WriteColor>(
    out: &mut W,
    table: &Table,
    hits: &[Coordinate],
    terms: &[&str],
) -> io::Result<()> {
    for hit in hits {
        let text = table.cell(hit.row, hit.column).unwrap_or("");
        print_match_line(out, *hit, text, find_match(text, terms))?;
    }
    Ok(())
}

fn print_match_line<W: WriteColor>(
    out: &mut W,
    hit: Coordinate,
    content: &str,
    span: Option<(usize, usize)>,
) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
    write!(out, "{}", hit.row)?;
    out.reset()?;
    write!(out, ":")?;
    out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
    write!(out, "{}", hit.column)?;
    out.reset()?;
    write!(out, ": ")?;

    // Embedded newlines would break the one-hit-per-line layout
    let content = content.replace(['\r', '\n'], " ");
    match span {
        Some((start, end)) => {
            write!(out, "{}", &content[..start])?;
            out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
            write!(out, "{}", &content[start..end])?;
            out.reset()?;
            writeln!(out, "{}", &content[end..])
        }
        None => writeln!(out, "{content}"),
    }
}

/// Byte span of the earliest case-insensitive occurrence of any term.
///
/// Only found when lower-casing keeps byte offsets unchanged.
fn find_match(text: &str, terms: &[&str]) -> Option<(usize, usize)> {
    let lowered = text.to_lowercase();
    if lowered.len() != text.len() {
        return None;
    }
    terms
        .iter()
        .filter(|t| !t.is_empty())
        .filter_map(|term| {
            let term = term.to_lowercase();
            lowered.find(&term).map(|start| (start, start + term.len()))
        })
        .filter(|&(start, end)| text.is_char_boundary(start) && text.is_char_boundary(end))
        .min()
}

/// Print hits as one JSON object per line
pub fn print_json_matches<W: Write>(out: &mut W, table: &Table, hits: &[Coordinate]) -> io::Result<()> {
    for hit in hits {
        let record = CellMatch {
            row: hit.row,
            column: hit.column,
            text: table.cell(hit.row, hit.column).unwrap_or(""),
        };
        serde_json::to_writer(&mut *out, &record)?;
        writeln!(out)?;
    }
    Ok(())
}

/// Write a record as tab-separated fields, each double-quoted with inner
/// quotes doubled
pub fn write_quoted_tsv<W: Write>(out: &mut W, record: &Record) -> io::Result<()> {
    for (i, field) in record.iter().enumerate() {
        if i > 0 {
            out.write_all(b"\t")?;
        }
        out.write_all(b"\"")?;
        let mut rest = field.as_str();
        while let Some(idx) = rest.find('"') {
            out.write_all(rest[..=idx].as_bytes())?;
            out.write_all(b"\"")?;
            rest = &rest[idx + 1..];
        }
        out.write_all(rest.as_bytes())?;
        out.write_all(b"\"")?;
    }
    out.write_all(b"\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use termcolor::NoColor;

    fn table() -> Table {
        [
            Record::from(&["id", "Fruit"][..]),
            Record::from(&["1", "Green Apple"][..]),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_quoted_tsv() {
        let mut out = Vec::new();
        write_quoted_tsv(&mut out, &Record::from(&["a", "say \"hi\"", ""][..])).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "\"a\"\t\"say \"\"hi\"\"\"\t\"\"\n");
    }

    #[test]
    fn test_plain_match_lines() {
        let mut out = NoColor::new(Vec::new());
        print_cell_matches(&mut out, &table(), &[Coordinate::new(1, 1)], &["apple"]).unwrap();
        assert_eq!(String::from_utf8(out.into_inner()).unwrap(), "1:1: Green Apple\n");
    }

    #[test]
    fn test_find_match_case_insensitive() {
        assert_eq!(find_match("Green Apple", &["APPLE", "green"]), Some((0, 5)));
        assert_eq!(find_match("Green Apple", &["pear"]), None);
    }

    #[test]
    fn test_json_lines() {
        let mut out = Vec::new();
        print_json_matches(&mut out, &table(), &[Coordinate::new(0, 1)]).unwrap();
        let line = String::from_utf8(out).unwrap();
        let value: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(value["row"], 0);
        assert_eq!(value["text"], "Fruit");
    }
}
