//! Source text position utilities
//!
//! Functions for converting editor line:column positions to offsets, byte
//! offsets to character offsets, and extracting line windows around a click.
//! These are shared between the click resolver and the CLI.

/// Convert line and column (1-based) to byte offset in source
pub fn position_to_offset(source: &str, line: u32, column: u32) -> usize {
    let mut current_line = 1u32;
    let mut current_column = 1u32;

    for (i, ch) in source.char_indices() {
        if current_line == line && current_column == column {
            return i;
        }

        if ch == '\n' {
            current_line += 1;
            current_column = 1;
        } else {
            current_column += 1;
        }
    }

    source.len()
}

/// Parse a "line:col" position string into (line, column) tuple
pub fn parse_position(pos: &str) -> Option<(u32, u32)> {
    let parts: Vec<&str> = pos.split(':').collect();
    if parts.len() != 2 {
        return None;
    }
    let line = parts[0].parse::<u32>().ok()?;
    let column = parts[1].parse::<u32>().ok()?;
    Some((line, column))
}

/// Convert a byte offset into a character offset.
///
/// The byte offset is clamped to the nearest preceding character boundary, so
/// a slightly-off byte index never panics.
pub fn char_offset(source: &str, byte_offset: usize) -> usize {
    let clamped = floor_char_boundary(source, byte_offset);
    source[..clamped].chars().count()
}

/// Largest char boundary less than or equal to `index`
pub fn floor_char_boundary(source: &str, index: usize) -> usize {
    if index >= source.len() {
        return source.len();
    }
    let mut i = index;
    while i > 0 && !source.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Smallest char boundary greater than or equal to `index`
pub fn ceil_char_boundary(source: &str, index: usize) -> usize {
    if index >= source.len() {
        return source.len();
    }
    let mut i = index;
    while i < source.len() && !source.is_char_boundary(i) {
        i += 1;
    }
    i
}

/// Get the text of a single line (1-based), without the trailing newline
pub fn line_text(source: &str, line: u32) -> Option<&str> {
    if line == 0 {
        return None;
    }
    source.lines().nth(line as usize - 1)
}

/// Concatenate a window of lines around `line` (1-based), `radius` lines on
/// each side, joined with newlines. Used by the click resolver to reassemble
/// tags that span multiple lines.
pub fn surrounding_lines(source: &str, line: u32, radius: u32) -> String {
    if line == 0 {
        return String::new();
    }
    let start = (line.saturating_sub(radius + 1)) as usize;
    let end = (line + radius) as usize;
    source
        .lines()
        .skip(start)
        .take(end - start)
        .collect::<Vec<_>>()
        .join("\n")
}
