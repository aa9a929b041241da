//! Tidy-tree layout of the visible part of the hierarchy.
//!
//! Two axes:
//! - the depth axis (`x`) is `depth * level_spacing`, so every generation
//!   sits in its own column;
//! - the rank axis (`y`) comes from a contour-merging pass (Reingold–Tilford
//!   style): each visible subtree is laid out on its own, then shifted right
//!   of its left siblings until no level of the two subtrees is closer than
//!   the configured separation. Parents are centred over their first and last
//!   visible child.
//!
//! Rank positions are computed in slot units and scaled by `node_spacing`
//! at the end. The root sits at rank 0.

use crate::tree::model::{NodeId, TreeModel};
use crate::tree::visibility::VisibilityState;

/// Width of a node box along the depth axis.
pub const DEFAULT_NODE_WIDTH: f64 = 180.0;
/// Height of a node box along the rank axis.
pub const DEFAULT_NODE_HEIGHT: f64 = 60.0;
/// Distance between generations: node width plus a 120 unit gutter.
pub const DEFAULT_LEVEL_SPACING: f64 = DEFAULT_NODE_WIDTH + 120.0;
/// One rank slot: node height plus 20 units of padding.
pub const DEFAULT_NODE_SPACING: f64 = DEFAULT_NODE_HEIGHT + 20.0;
/// Smallest canvas height handed to the drawing surface.
pub const DEFAULT_MIN_CANVAS_HEIGHT: f64 = 1200.0;

/// Tunables for the layout pass.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    pub level_spacing: f64,
    pub node_spacing: f64,
    pub node_width: f64,
    pub node_height: f64,
    /// Slots between two siblings.
    pub sibling_separation: f64,
    /// Slots between nodes of neighbouring subtrees that are not siblings.
    pub subtree_separation: f64,
    pub min_canvas_height: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            level_spacing: DEFAULT_LEVEL_SPACING,
            node_spacing: DEFAULT_NODE_SPACING,
            node_width: DEFAULT_NODE_WIDTH,
            node_height: DEFAULT_NODE_HEIGHT,
            sibling_separation: 1.0,
            subtree_separation: 2.0,
            min_canvas_height: DEFAULT_MIN_CANVAS_HEIGHT,
        }
    }
}

/// A position in layout space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Depth axis.
    pub x: f64,
    /// Rank axis.
    pub y: f64,
}

/// Span of the visible tree along the rank axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min: f64,
    pub max: f64,
}

impl Extent {
    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// Size of the area the diagram is shown in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

/// Translation applied by the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transform {
    pub tx: f64,
    pub ty: f64,
}

impl Transform {
    pub fn apply(&self, point: Point) -> Point {
        Point {
            x: point.x + self.tx,
            y: point.y + self.ty,
        }
    }

    pub fn invert(&self, point: Point) -> Point {
        Point {
            x: point.x - self.tx,
            y: point.y - self.ty,
        }
    }
}

/// A visible parent→child link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
}

/// Everything the drawing surface needs to draw one node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDescriptor {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
    pub label: String,
    pub has_hidden_children: bool,
    pub is_expanded: bool,
}

/// Result of one layout pass.
#[derive(Debug, Clone)]
pub struct Layout {
    positions: Vec<Option<Point>>,
    order: Vec<NodeId>,
    edges: Vec<Edge>,
    extent: Extent,
    min_canvas_height: f64,
    half_width: f64,
    half_height: f64,
}

impl Layout {
    pub fn position(&self, id: NodeId) -> Option<Point> {
        self.positions.get(id.index()).copied().flatten()
    }

    /// Visible nodes in pre-order.
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Height the host canvas should have: the rank extent, but never less
    /// than the configured minimum.
    pub fn canvas_height(&self) -> f64 {
        self.extent.span().max(self.min_canvas_height)
    }

    pub fn descriptors(&self, model: &TreeModel, vis: &VisibilityState) -> Vec<NodeDescriptor> {
        self.order
            .iter()
            .filter_map(|&id| {
                let point = self.position(id)?;
                let node = model.lookup(id)?;
                Some(NodeDescriptor {
                    id,
                    x: point.x,
                    y: point.y,
                    label: node.label().to_string(),
                    has_hidden_children: vis.has_hidden_children(id),
                    is_expanded: vis.is_expanded(id),
                })
            })
            .collect()
    }

    /// The node whose box contains `point`, if any.
    pub fn node_at(&self, point: Point) -> Option<NodeId> {
        self.order.iter().copied().find(|&id| {
            self.position(id).is_some_and(|p| {
                (point.x - p.x).abs() <= self.half_width && (point.y - p.y).abs() <= self.half_height
            })
        })
    }
}

/// Translation that puts `id` at the centre of the viewport.
pub fn centering_transform(layout: &Layout, id: NodeId, viewport: Viewport) -> Option<Transform> {
    let point = layout.position(id)?;
    Some(Transform {
        tx: viewport.width / 2.0 - point.x,
        ty: viewport.height / 2.0 - point.y,
    })
}

/// Left and right boundary of a laid-out subtree, one entry per level,
/// relative to the subtree root's rank.
struct Contour {
    left: Vec<f64>,
    right: Vec<f64>,
}

impl Contour {
    fn leaf() -> Self {
        Self {
            left: vec![0.0],
            right: vec![0.0],
        }
    }
}

/// Computes [`Layout`]s for the visible part of a tree.
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn compute(&self, model: &TreeModel, vis: &VisibilityState) -> Layout {
        let root = model.root();
        // Rank offset of each node relative to its parent, in slots.
        let mut offsets = vec![0.0; model.len()];
        self.place(root, vis, &mut offsets);

        let mut positions = vec![None; model.len()];
        let mut order = Vec::new();
        let mut edges = Vec::new();
        let mut extent = Extent { min: 0.0, max: 0.0 };

        let mut stack: Vec<(NodeId, Option<NodeId>, usize, f64)> = vec![(root, None, 0, 0.0)];
        while let Some((id, parent, depth, rank)) = stack.pop() {
            let point = Point {
                x: depth as f64 * self.config.level_spacing,
                y: rank * self.config.node_spacing,
            };
            extent.min = extent.min.min(point.y);
            extent.max = extent.max.max(point.y);
            positions[id.index()] = Some(point);
            order.push(id);
            if let Some(from) = parent {
                edges.push(Edge { from, to: id });
            }

            for &child in vis.visible_children_of(id).iter().rev() {
                stack.push((child, Some(id), depth + 1, rank + offsets[child.index()]));
            }
        }

        tracing::trace!(
            visible = order.len(),
            span = extent.span(),
            "layout computed"
        );

        Layout {
            positions,
            order,
            edges,
            extent,
            min_canvas_height: self.config.min_canvas_height,
            half_width: self.config.node_width / 2.0,
            half_height: self.config.node_height / 2.0,
        }
    }

    /// Lay out the subtree under `id`, recording each visible child's offset
    /// from its parent, and return the subtree's contour.
    fn place(&self, id: NodeId, vis: &VisibilityState, offsets: &mut [f64]) -> Contour {
        let children = vis.visible_children_of(id);
        if children.is_empty() {
            return Contour::leaf();
        }

        let mut merged: Option<Contour> = None;
        let mut slots = Vec::with_capacity(children.len());

        for &child in children {
            let contour = self.place(child, vis, offsets);
            let shift = match &merged {
                None => 0.0,
                Some(acc) => self.required_shift(acc, &contour),
            };
            slots.push(shift);
            merged = Some(match merged {
                None => contour,
                Some(acc) => merge(acc, contour, shift),
            });
        }

        let first = slots.first().copied().unwrap_or(0.0);
        let last = slots.last().copied().unwrap_or(0.0);
        let mid = (first + last) / 2.0;
        for (&child, &slot) in children.iter().zip(&slots) {
            offsets[child.index()] = slot - mid;
        }

        let merged = merged.unwrap_or_else(Contour::leaf);
        let mut left = Vec::with_capacity(merged.left.len() + 1);
        let mut right = Vec::with_capacity(merged.right.len() + 1);
        left.push(0.0);
        right.push(0.0);
        left.extend(merged.left.iter().map(|v| v - mid));
        right.extend(merged.right.iter().map(|v| v - mid));
        Contour { left, right }
    }

    /// How far `next` must move so that, level by level, it clears the
    /// right boundary of everything already placed.
    fn required_shift(&self, placed: &Contour, next: &Contour) -> f64 {
        placed
            .right
            .iter()
            .zip(&next.left)
            .enumerate()
            .map(|(level, (r, l))| {
                let gap = if level == 0 {
                    self.config.sibling_separation
                } else {
                    self.config.subtree_separation
                };
                r + gap - l
            })
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

fn merge(placed: Contour, next: Contour, shift: f64) -> Contour {
    let levels = placed.left.len().max(next.left.len());
    let mut left = Vec::with_capacity(levels);
    let mut right = Vec::with_capacity(levels);
    for level in 0..levels {
        let shifted_left = next.left.get(level).map(|v| v + shift);
        let shifted_right = next.right.get(level).map(|v| v + shift);
        left.push(match (placed.left.get(level), shifted_left) {
            (Some(&a), Some(b)) => a.min(b),
            (Some(&a), None) => a,
            (None, Some(b)) => b,
            (None, None) => 0.0,
        });
        right.push(match (placed.right.get(level), shifted_right) {
            (Some(&a), Some(b)) => a.max(b),
            (Some(&a), None) => a,
            (None, Some(b)) => b,
            (None, None) => 0.0,
        });
    }
    Contour { left, right }
}
