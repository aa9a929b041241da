//! Conversion of indented ASCII tree drawings into the nested JSON document.
//!
//! ```text
//! Gyllencreutz
//! |-- Anders
//! |   |-- Karl
//! |   `-- *by 2* Maria
//! `-- Johan
//! ```
//!
//! The first line names the root. Every other non-blank line starts with a
//! run of connector characters (`|`, `` ` ``, `-`, whitespace); its level is
//! the number of `|` and `` ` `` characters in that run. A leading
//! `*by N*` marker is dropped from names. Leaves get no `children` key.

use serde_json::{json, Map, Value};

use crate::error::{AppError, Result};
use crate::tree::model::{CHILDREN_KEY, NAME_KEY};

struct Entry {
    name: String,
    children: Vec<usize>,
}

fn is_connector(c: char) -> bool {
    matches!(c, '|' | '`' | '-') || c.is_whitespace()
}

/// Remove a leading `*by 12*` marker and the whitespace after it.
fn strip_by_marker(name: &str) -> &str {
    let Some(rest) = name.strip_prefix("*by ") else {
        return name;
    };
    let digits = rest.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return name;
    }
    match rest[digits..].strip_prefix('*') {
        Some(after) => after.trim_start(),
        None => name,
    }
}

/// Parse an ASCII drawing into a nested document.
pub fn parse_ascii_tree(text: &str) -> Result<Value> {
    let mut lines = text.trim().lines();
    let root_name = lines
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AppError::InvalidDocument("tree drawing is empty".into()))?;

    let mut entries = vec![Entry {
        name: root_name.to_string(),
        children: Vec::new(),
    }];
    // (entry index, level) from the root down to the last inserted node
    let mut path: Vec<(usize, usize)> = vec![(0, 0)];

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let run_len: usize = line
            .chars()
            .take_while(|&c| is_connector(c))
            .map(char::len_utf8)
            .sum();
        if run_len == 0 {
            tracing::debug!(line, "skipping line without tree connectors");
            continue;
        }
        let (indent, rest) = line.split_at(run_len);
        let level = indent.chars().filter(|&c| c == '|' || c == '`').count();
        let name = strip_by_marker(rest.trim());

        while path.len() > 1 && path.last().is_some_and(|&(_, l)| level <= l) {
            path.pop();
        }
        let index = entries.len();
        entries.push(Entry {
            name: name.to_string(),
            children: Vec::new(),
        });
        if let Some(&(parent, _)) = path.last() {
            entries[parent].children.push(index);
        }
        path.push((index, level));
    }

    Ok(to_value(&entries, 0))
}

fn to_value(entries: &[Entry], index: usize) -> Value {
    let entry = &entries[index];
    let mut object = Map::new();
    object.insert(NAME_KEY.to_string(), json!(entry.name));
    if !entry.children.is_empty() {
        let children = entry
            .children
            .iter()
            .map(|&child| to_value(entries, child))
            .collect();
        object.insert(CHILDREN_KEY.to_string(), Value::Array(children));
    }
    Value::Object(object)
}
