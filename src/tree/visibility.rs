use crate::tree::model::{NodeId, TreeModel};

/// The two child slots of one node. At most one of them is non-empty, and
/// together they always hold the node's structural children in order.
#[derive(Debug, Clone, Default)]
struct Slots {
    visible: Vec<NodeId>,
    stashed: Vec<NodeId>,
}

/// Collapsed/expanded display state, kept apart from the structural model.
///
/// Collapsing moves a node's visible children into its stash as one unit;
/// nothing below the node is touched, so expanding it again shows the
/// subtree exactly as it was left.
#[derive(Debug, Clone)]
pub struct VisibilityState {
    slots: Vec<Slots>,
}

impl VisibilityState {
    /// Root expanded, every other node collapsed.
    pub fn new(model: &TreeModel) -> Self {
        let root = model.root();
        let slots = model
            .traverse()
            .map(|node| {
                let children = node.children().to_vec();
                if node.id() == root {
                    Slots {
                        visible: children,
                        stashed: Vec::new(),
                    }
                } else {
                    Slots {
                        visible: Vec::new(),
                        stashed: children,
                    }
                }
            })
            .collect();
        // traverse() yields ids 0..n in order, so slot i belongs to NodeId(i)
        Self { slots }
    }

    fn slots(&self, id: NodeId) -> Option<&Slots> {
        self.slots.get(id.index())
    }

    fn slots_mut(&mut self, id: NodeId) -> Option<&mut Slots> {
        self.slots.get_mut(id.index())
    }

    /// Stash the visible children. Returns `true` if anything changed.
    pub fn collapse(&mut self, id: NodeId) -> bool {
        match self.slots_mut(id) {
            Some(slots) if !slots.visible.is_empty() => {
                slots.stashed = std::mem::take(&mut slots.visible);
                true
            }
            _ => false,
        }
    }

    /// Restore stashed children. No-op when already expanded or childless.
    pub fn expand(&mut self, id: NodeId) -> bool {
        match self.slots_mut(id) {
            Some(slots) if !slots.stashed.is_empty() => {
                slots.visible = std::mem::take(&mut slots.stashed);
                true
            }
            _ => false,
        }
    }

    /// Flip between expanded and collapsed. Leaves are left alone and
    /// report `false`.
    pub fn toggle(&mut self, id: NodeId) -> bool {
        if self.is_expanded(id) {
            self.collapse(id)
        } else {
            self.expand(id)
        }
    }

    /// Whether the node currently shows its children. Leaves are never
    /// expanded.
    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.slots(id).is_some_and(|s| !s.visible.is_empty())
    }

    pub fn has_hidden_children(&self, id: NodeId) -> bool {
        self.slots(id).is_some_and(|s| !s.stashed.is_empty())
    }

    pub fn visible_children_of(&self, id: NodeId) -> &[NodeId] {
        self.slots(id).map(|s| s.visible.as_slice()).unwrap_or(&[])
    }

    /// Visible and stashed children together, in structural order.
    pub fn total_children(&self, id: NodeId) -> Vec<NodeId> {
        self.slots(id)
            .map(|s| s.visible.iter().chain(s.stashed.iter()).copied().collect())
            .unwrap_or_default()
    }

    /// Expand every collapsed ancestor of `id` so it becomes reachable from
    /// the root. Returns the ancestors that were expanded, nearest first.
    pub fn ensure_ancestors_visible(&mut self, model: &TreeModel, id: NodeId) -> Vec<NodeId> {
        let mut opened = Vec::new();
        for ancestor in model.ancestors(id) {
            if self.expand(ancestor) {
                opened.push(ancestor);
            }
        }
        if !opened.is_empty() {
            tracing::debug!(target_node = %id, expanded = opened.len(), "revealed ancestor chain");
        }
        opened
    }

    /// Pre-order walk of the nodes reachable through visible children.
    pub fn visible_nodes(&self, model: &TreeModel) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![model.root()];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.visible_children_of(id).iter().rev().copied());
        }
        out
    }

    /// Whether `id` is reachable from the root through expanded nodes.
    pub fn is_reachable(&self, model: &TreeModel, id: NodeId) -> bool {
        model.lookup(id).is_some() && model.ancestors(id).all(|a| self.is_expanded(a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn abcd() -> TreeModel {
        TreeModel::build(&json!({
            "name": "A",
            "children": [
                { "name": "B", "children": [ { "name": "D" } ] },
                { "name": "C" }
            ]
        }))
        .unwrap()
    }

    fn deep() -> TreeModel {
        TreeModel::build(&json!({
            "name": "R",
            "children": [
                { "name": "P", "children": [
                    { "name": "Q", "children": [ { "name": "Q1" }, { "name": "Q2" } ] },
                    { "name": "S", "children": [ { "name": "S1" } ] }
                ] }
            ]
        }))
        .unwrap()
    }

    fn visible_labels(model: &TreeModel, vis: &VisibilityState) -> Vec<String> {
        vis.visible_nodes(model)
            .into_iter()
            .map(|id| model.lookup(id).unwrap().label().to_string())
            .collect()
    }

    fn id(model: &TreeModel, label: &str) -> NodeId {
        model.find_by_label(label).unwrap()
    }

    #[test]
    fn initial_state_expands_root_only() {
        let model = abcd();
        let vis = VisibilityState::new(&model);
        assert!(vis.is_expanded(model.root()));
        assert_eq!(visible_labels(&model, &vis), vec!["A", "B", "C"]);
        assert!(!vis.is_expanded(id(&model, "B")));
        assert!(vis.has_hidden_children(id(&model, "B")));
    }

    #[test]
    fn toggling_reveals_one_level_at_a_time() {
        let model = abcd();
        let mut vis = VisibilityState::new(&model);
        let a = model.root();

        vis.toggle(a);
        assert_eq!(visible_labels(&model, &vis), vec!["A"]);

        vis.toggle(a);
        assert_eq!(visible_labels(&model, &vis), vec!["A", "B", "C"]);
        assert!(!visible_labels(&model, &vis).contains(&"D".to_string()));

        vis.toggle(id(&model, "B"));
        assert_eq!(visible_labels(&model, &vis), vec!["A", "B", "D", "C"]);
    }

    #[test]
    fn double_toggle_restores_descendant_states() {
        let model = deep();
        let mut vis = VisibilityState::new(&model);
        let p = id(&model, "P");
        let q = id(&model, "Q");
        vis.expand(p);
        vis.expand(q);
        let before = visible_labels(&model, &vis);
        assert_eq!(before, vec!["R", "P", "Q", "Q1", "Q2", "S"]);

        vis.toggle(p);
        assert_eq!(visible_labels(&model, &vis), vec!["R", "P"]);
        vis.toggle(p);
        assert_eq!(visible_labels(&model, &vis), before);
        assert!(!vis.is_expanded(id(&model, "S")));
    }

    #[test]
    fn collapse_then_expand_keeps_structural_order() {
        let model = deep();
        let mut vis = VisibilityState::new(&model);
        let p = id(&model, "P");
        vis.expand(p);
        vis.collapse(p);
        assert!(vis.visible_children_of(p).is_empty());
        assert_eq!(vis.total_children(p), model.children_of(p));
        vis.expand(p);
        assert_eq!(vis.visible_children_of(p), model.children_of(p));
    }

    #[test]
    fn total_children_always_matches_structure() {
        let model = deep();
        let mut vis = VisibilityState::new(&model);
        for node in model.traverse() {
            vis.toggle(node.id());
        }
        for node in model.traverse() {
            assert_eq!(vis.total_children(node.id()), node.children());
        }
    }

    #[test]
    fn toggle_on_leaf_is_noop() {
        let model = abcd();
        let mut vis = VisibilityState::new(&model);
        let c = id(&model, "C");
        assert!(!vis.toggle(c));
        assert!(!vis.is_expanded(c));
        assert!(!vis.has_hidden_children(c));
    }

    #[test]
    fn expand_when_expanded_is_noop() {
        let model = abcd();
        let mut vis = VisibilityState::new(&model);
        assert!(!vis.expand(model.root()));
        assert!(!vis.collapse(id(&model, "B")));
    }

    #[test]
    fn ensure_ancestors_visible_opens_chain() {
        let model = deep();
        let mut vis = VisibilityState::new(&model);
        let s1 = id(&model, "S1");
        assert!(!vis.is_reachable(&model, s1));

        let opened = vis.ensure_ancestors_visible(&model, s1);
        assert_eq!(opened, vec![id(&model, "S"), id(&model, "P")]);
        assert!(vis.is_reachable(&model, s1));
        assert!(visible_labels(&model, &vis).contains(&"S1".to_string()));
        // siblings keep their own state
        assert!(!vis.is_expanded(id(&model, "Q")));
    }

    #[test]
    fn ensure_ancestors_visible_on_visible_node_changes_nothing() {
        let model = abcd();
        let mut vis = VisibilityState::new(&model);
        assert!(vis.ensure_ancestors_visible(&model, id(&model, "C")).is_empty());
    }
}
