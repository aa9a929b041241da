use std::fmt;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{AppError, Result};

/// Key holding the nested child array in the source document.
pub const CHILDREN_KEY: &str = "children";
/// Key holding the packed display label and biography.
pub const NAME_KEY: &str = "name";
/// Deepest nesting of JSON objects and arrays accepted. Each generation
/// takes two levels, an object and its `children` array.
pub const MAX_NESTING: usize = 1024;

/// Identifier of a node within one loaded document.
///
/// Ids are assigned densely in pre-order while building, so they double as
/// indices into the model's node arena. They are never written back out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[cfg(test)]
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        self.raw() as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node_{}", self.raw())
    }
}

/// How the `children` key appeared in the source object, so it can be
/// re-emitted in the same shape and position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChildrenSlot {
    Absent,
    Null { position: usize },
    Array { position: usize },
}

/// One entry of the family tree.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    /// Every source key except `children`, in source order.
    fields: Map<String, Value>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    depth: usize,
    slot: ChildrenSlot,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Structural children in display order, regardless of visibility.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Overwrite or add a scalar field. The `children` key is structural and
    /// is refused.
    pub fn set_field(&mut self, key: &str, value: Value) -> bool {
        if key == CHILDREN_KEY {
            return false;
        }
        self.fields.insert(key.to_string(), value);
        true
    }

    /// The full multi-line `name` value, or `""` when absent or not a string.
    pub fn name(&self) -> &str {
        self.fields
            .get(NAME_KEY)
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    /// First line of the name: what the diagram and search show.
    pub fn label(&self) -> &str {
        self.name().lines().next().unwrap_or("")
    }

    /// Everything after the first line of the name.
    pub fn biography(&self) -> &str {
        self.name()
            .split_once('\n')
            .map(|(_, rest)| rest)
            .unwrap_or("")
    }

    /// Repack label and biography into the single `name` field.
    pub fn set_name(&mut self, label: &str, biography: &str) {
        let label = label.replace(['\r', '\n'], " ");
        let packed = if biography.is_empty() {
            label
        } else {
            format!("{}\n{}", label, biography)
        };
        self.fields.insert(NAME_KEY.to_string(), Value::String(packed));
    }

    /// Re-emit this node's own object with the given already-serialized
    /// children, placing the `children` key where it was found.
    pub(crate) fn to_object(&self, children: Vec<Value>) -> Map<String, Value> {
        let children_value = match self.slot {
            ChildrenSlot::Absent if children.is_empty() => None,
            ChildrenSlot::Absent => Some((usize::MAX, Value::Array(children))),
            ChildrenSlot::Null { position } if children.is_empty() => {
                Some((position, Value::Null))
            }
            ChildrenSlot::Null { position } | ChildrenSlot::Array { position } => {
                Some((position, Value::Array(children)))
            }
        };

        let mut object = Map::new();
        let mut pending = children_value;
        for (index, (key, value)) in self.fields.iter().enumerate() {
            if matches!(&pending, Some((position, _)) if *position == index) {
                if let Some((_, children)) = pending.take() {
                    object.insert(CHILDREN_KEY.to_string(), children);
                }
            }
            object.insert(key.clone(), value.clone());
        }
        if let Some((_, children)) = pending {
            object.insert(CHILDREN_KEY.to_string(), children);
        }
        object
    }
}

/// Deepest bracket nesting in JSON text, ignoring brackets inside strings.
fn nesting_depth(text: &str) -> usize {
    let mut depth = 0usize;
    let mut deepest = 0;
    let mut in_string = false;
    let mut escaped = false;
    for byte in text.bytes() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    deepest
}

/// The authoritative hierarchy of one loaded document.
///
/// Nodes live in an arena indexed by [`NodeId`]; parent links are plain ids,
/// so there is no ownership cycle between parents and children.
#[derive(Debug, Clone)]
pub struct TreeModel {
    nodes: Vec<Node>,
}

impl TreeModel {
    /// Build the hierarchy from a parsed document.
    pub fn build(document: &Value) -> Result<Self> {
        let mut model = Self { nodes: Vec::new() };
        model.insert(document, None, 0, "root")?;
        tracing::debug!(nodes = model.nodes.len(), "built tree model");
        Ok(model)
    }

    /// Parse JSON text and build the hierarchy.
    ///
    /// serde_json's own recursion limit would stop at about 64 generations,
    /// so it is replaced by a [`MAX_NESTING`] check before parsing.
    pub fn parse(text: &str) -> Result<Self> {
        let nesting = nesting_depth(text);
        if nesting > MAX_NESTING {
            return Err(AppError::InvalidDocument(format!(
                "nested {} levels deep, limit is {}",
                nesting, MAX_NESTING
            )));
        }
        let mut deserializer = serde_json::Deserializer::from_str(text);
        deserializer.disable_recursion_limit();
        let document = Value::deserialize(&mut deserializer)?;
        deserializer.end()?;
        Self::build(&document)
    }

    fn insert(
        &mut self,
        value: &Value,
        parent: Option<NodeId>,
        depth: usize,
        path: &str,
    ) -> Result<NodeId> {
        let object = value
            .as_object()
            .ok_or_else(|| AppError::InvalidDocument(format!("{} is not an object", path)))?;

        let id = NodeId(self.nodes.len() as u32);
        let mut fields = Map::new();
        let mut slot = ChildrenSlot::Absent;
        let mut child_values: &[Value] = &[];

        for (position, (key, val)) in object.iter().enumerate() {
            if key != CHILDREN_KEY {
                fields.insert(key.clone(), val.clone());
                continue;
            }
            match val {
                Value::Array(items) => {
                    slot = ChildrenSlot::Array { position };
                    child_values = items;
                }
                Value::Null => slot = ChildrenSlot::Null { position },
                _ => {
                    return Err(AppError::InvalidDocument(format!(
                        "{}.children is not an array",
                        path
                    )))
                }
            }
        }

        self.nodes.push(Node {
            id,
            fields,
            children: Vec::with_capacity(child_values.len()),
            parent,
            depth,
            slot,
        });

        for (i, child) in child_values.iter().enumerate() {
            let child_path = format!("{}.children[{}]", path, i);
            let child_id = self.insert(child, Some(id), depth + 1, &child_path)?;
            self.nodes[id.index()].children.push(child_id);
        }

        Ok(id)
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Resolve a node by id.
    pub fn lookup(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn lookup_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Structural children of `id`; empty for leaves and unknown ids.
    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        self.lookup(id).map(Node::children).unwrap_or(&[])
    }

    /// Lazy depth-first pre-order walk over every node.
    pub fn traverse(&self) -> Traverse<'_> {
        Traverse {
            model: self,
            stack: vec![self.root()],
        }
    }

    /// Walk from the parent of `id` up to the root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            model: self,
            next: self.lookup(id).and_then(Node::parent),
        }
    }

    /// Find the first node (in pre-order) whose label equals `label`.
    #[cfg(test)]
    pub fn find_by_label(&self, label: &str) -> Option<NodeId> {
        self.traverse().find(|n| n.label() == label).map(Node::id)
    }
}

/// Pre-order iterator returned by [`TreeModel::traverse`].
pub struct Traverse<'a> {
    model: &'a TreeModel,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Traverse<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = self.model.lookup(id)?;
        self.stack.extend(node.children.iter().rev().copied());
        Some(node)
    }
}

/// Parent-chain iterator returned by [`TreeModel::ancestors`].
pub struct Ancestors<'a> {
    model: &'a TreeModel,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.model.lookup(current).and_then(Node::parent);
        Some(current)
    }
}
