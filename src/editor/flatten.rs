//! Hierarchy ⇄ flat table projection used by the bulk editor.
//!
//! The table is only a view of node fields. Rows are joined back to nodes by
//! id, and the nested document is always re-emitted from the model's own
//! structure, so editing the table can never change the shape of the tree.

use std::io;

use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::error::{AppError, Result};
use crate::tree::model::{NodeId, TreeModel, CHILDREN_KEY};

/// One node's fields, keyed by the node id.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRow {
    pub id: NodeId,
    pub values: Map<String, Value>,
}

impl FlatRow {
    /// Text shown in the cell for `column`; missing values and `null` are
    /// empty.
    pub fn cell_text(&self, column: &str) -> String {
        match self.values.get(column) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// Replace a cell from edited text.
    ///
    /// Numbers and booleans stay numbers and booleans when the text still
    /// parses as one; anything else becomes a string. Text equal to the
    /// current cell text leaves the stored value alone.
    pub fn set_cell(&mut self, column: &str, text: &str) {
        if column == CHILDREN_KEY || self.cell_text(column) == text {
            return;
        }
        let value = match self.values.get(column) {
            Some(Value::Number(_)) => parse_number(text),
            Some(Value::Bool(_)) => text.trim().parse::<bool>().ok().map(Value::Bool),
            Some(Value::Array(_)) | Some(Value::Object(_)) => serde_json::from_str(text)
                .ok()
                .filter(|v: &Value| v.is_array() || v.is_object()),
            _ => None,
        }
        .unwrap_or_else(|| Value::String(text.to_string()));
        self.values.insert(column.to_string(), value);
    }
}

fn parse_number(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(int) = trimmed.parse::<i64>() {
        return Some(Value::Number(int.into()));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

/// Flat projection of a whole tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatTable {
    /// Union of field names over all nodes, in first-seen order.
    pub columns: Vec<String>,
    /// One row per node, in pre-order.
    pub rows: Vec<FlatRow>,
}

/// Outcome of [`apply_edits`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub applied: usize,
    /// Rows whose id no longer resolves to a node.
    pub missed: Vec<NodeId>,
}

/// Project the hierarchy into table rows. Does not touch the model.
pub fn flatten(model: &TreeModel) -> FlatTable {
    let mut columns: Vec<String> = Vec::new();
    let mut rows = Vec::with_capacity(model.len());

    for node in model.traverse() {
        for key in node.fields().keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
        rows.push(FlatRow {
            id: node.id(),
            values: node.fields().clone(),
        });
    }

    FlatTable { columns, rows }
}

/// Write edited rows back into their nodes.
///
/// Each row's values are merged over the node's fields. A `children` value
/// in a row is ignored. Rows whose id does not resolve are skipped.
pub fn apply_edits(model: &mut TreeModel, rows: &[FlatRow]) -> ApplyReport {
    let mut report = ApplyReport::default();
    for row in rows {
        let Some(node) = model.lookup_mut(row.id) else {
            tracing::debug!(row = %row.id, "edited row no longer matches a node; skipped");
            report.missed.push(row.id);
            continue;
        };
        for (key, value) in &row.values {
            node.set_field(key, value.clone());
        }
        report.applied += 1;
    }
    report
}

/// Rebuild the nested document from the model's structure and current
/// field values.
pub fn serialize(model: &TreeModel) -> Value {
    serialize_node(model, model.root())
}

fn serialize_node(model: &TreeModel, id: NodeId) -> Value {
    let Some(node) = model.lookup(id) else {
        return Value::Null;
    };
    let children = node
        .children()
        .iter()
        .map(|&child| serialize_node(model, child))
        .collect();
    Value::Object(node.to_object(children))
}

/// Write a document as 4-space indented JSON.
///
/// Any failure here is an output problem, never a document problem.
pub fn write_pretty_json<W: io::Write>(writer: W, document: &Value) -> Result<()> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);
    document
        .serialize(&mut serializer)
        .map_err(|e| AppError::PersistenceFailure(e.to_string()))
}

/// Render a document as 4-space indented JSON.
pub fn to_pretty_json(document: &Value) -> Result<String> {
    let mut out = Vec::new();
    write_pretty_json(&mut out, document)?;
    String::from_utf8(out).map_err(|e| AppError::PersistenceFailure(e.to_string()))
}
