//! IRCv3 message tag parsing and escaping.
//!
//! Tag values are unescaped the way the chat server expects: `\s` becomes a
//! space, `\:` a semicolon, `\\` a backslash, while escaped line breaks are
//! dropped entirely. Values are trimmed afterwards because some server
//! messages (e.g. `system-msg`) end with an escaped space.

use std::collections::HashMap;
use std::fmt::{Result as FmtResult, Write};

/// Unescaped tags of one message.
pub type Tags = HashMap<String, String>;

/// Escape a tag value for serialization.
pub fn escape_tag_value(f: &mut dyn Write, value: &str) -> FmtResult {
    for c in value.chars() {
        match c {
            ';' => f.write_str("\\:")?,
            ' ' => f.write_str("\\s")?,
            '\\' => f.write_str("\\\\")?,
            '\r' => f.write_str("\\r")?,
            '\n' => f.write_str("\\n")?,
            c => f.write_char(c)?,
        }
    }
    Ok(())
}

/// Unescape a tag value from wire format.
pub fn unescape_tag_value(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut iter = value.chars();
    while let Some(c) = iter.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }
        match iter.next() {
            Some(':') => unescaped.push(';'),
            Some('s') => unescaped.push(' '),
            Some('\\') => unescaped.push('\\'),
            Some('r') | Some('n') => {}
            Some(other) => unescaped.push(other),
            // dangling escape at end of value
            None => break,
        }
    }

    let trimmed = unescaped.trim();
    if trimmed.len() == unescaped.len() {
        unescaped
    } else {
        trimmed.to_string()
    }
}

/// Parse a raw tag block (without the leading `@`) into a map.
///
/// Entries are split on the first `=`; a key without `=` or with an empty
/// value maps to the empty string. Later duplicates overwrite earlier ones.
pub fn parse_tags(block: &str) -> Tags {
    let mut tags = Tags::new();
    for entry in block.split(';') {
        let (key, raw_value) = match entry.split_once('=') {
            Some((key, value)) => (key, value),
            None => (entry, ""),
        };
        if key.is_empty() {
            continue;
        }
        tags.insert(key.to_string(), unescape_tag_value(raw_value));
    }
    tags
}

/// Serialize tags as a `@`-prefixed block, keys in sorted order.
///
/// Writes nothing for an empty map.
pub fn write_tags(f: &mut dyn Write, tags: &Tags) -> FmtResult {
    if tags.is_empty() {
        return Ok(());
    }
    let mut keys: Vec<&String> = tags.keys().collect();
    keys.sort();

    f.write_char('@')?;
    for (i, key) in keys.into_iter().enumerate() {
        if i > 0 {
            f.write_char(';')?;
        }
        f.write_str(key)?;
        let value = &tags[key];
        if !value.is_empty() {
            f.write_char('=')?;
            escape_tag_value(f, value)?;
        }
    }
    Ok(())
}
