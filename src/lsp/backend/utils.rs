//! Position and location conversions between LSP and the engine
//!
//! LSP positions count UTF-16 code units; the engine works on byte offsets
//! within a line.

use std::path::Path;

use tower_lsp::lsp_types::{Location, Position, Range, TextDocumentContentChangeEvent, Url};

use crate::symbols::Target;

/// Byte offset within `line` of the UTF-16 `character` offset, clamped to the
/// line end
pub(super) fn utf16_to_byte(line: &str, character: u32) -> usize {
    let mut units = 0u32;
    for (offset, c) in line.char_indices() {
        if units >= character {
            return offset;
        }
        units += c.len_utf16() as u32;
    }
    line.len()
}

/// UTF-16 offset of byte offset `byte` within `line`
pub(super) fn byte_to_utf16(line: &str, byte: usize) -> u32 {
    let byte = byte.min(line.len());
    line.char_indices()
        .take_while(|(offset, _)| *offset < byte)
        .map(|(_, c)| c.len_utf16() as u32)
        .sum()
}

/// The text of line `line` without its line terminator
pub(super) fn line_at(text: &str, line: u32) -> Option<&str> {
    text.split('\n').nth(line as usize).map(|l| l.strip_suffix('\r').unwrap_or(l))
}

/// Byte offset of an LSP position in a whole document
fn position_to_offset(text: &str, position: Position) -> usize {
    let mut offset = 0;
    for (idx, line) in text.split_inclusive('\n').enumerate() {
        if idx == position.line as usize {
            let content = line.strip_suffix('\n').unwrap_or(line);
            return offset + utf16_to_byte(content, position.character);
        }
        offset += line.len();
    }
    text.len()
}

/// Apply one incremental (or full) content change to a document
pub(super) fn apply_change(text: &mut String, change: TextDocumentContentChangeEvent) {
    match change.range {
        Some(range) => {
            let start = position_to_offset(text, range.start);
            let end = position_to_offset(text, range.end);
            if start <= end && end <= text.len() {
                text.replace_range(start..end, &change.text);
            }
        }
        None => *text = change.text,
    }
}

/// Range covering bytes `start..end` of line `line`
pub(super) fn line_range(line_text: &str, line: u32, start: usize, end: usize) -> Range {
    Range {
        start: Position { line, character: byte_to_utf16(line_text, start) },
        end: Position { line, character: byte_to_utf16(line_text, end) },
    }
}

/// LSP location of a resolution target
///
/// The target line is read back from disk to convert its byte column; an
/// unreadable file keeps the column as is.
pub(super) fn target_location(target: &Target) -> Option<Location> {
    let uri = Url::from_file_path(target.path()).ok()?;
    let (line, column) = match target {
        Target::File { .. } => (0, 0),
        Target::Location(location) => (location.line, location.column),
    };
    let character = read_line(target.path(), line)
        .map(|text| byte_to_utf16(&text, column))
        .unwrap_or(column as u32);
    let position = Position { line: line as u32, character };
    Some(Location { uri, range: Range { start: position, end: position } })
}

fn read_line(path: &Path, line: usize) -> Option<String> {
    let text = std::fs::read_to_string(path).ok()?;
    text.lines().nth(line).map(str::to_string)
}
