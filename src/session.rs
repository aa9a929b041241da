//! One loaded document and everything derived from it.
//!
//! A [`Session`] owns the model, the collapse state, the search index, the
//! current layout and the view transform. Nothing here is global: reloading
//! builds a complete replacement first and only swaps it in on success.

use serde_json::Value;

use crate::editor::flatten::{self, ApplyReport, FlatRow, FlatTable};
use crate::error::Result;
use crate::tree::layout::{
    centering_transform, Layout, LayoutConfig, LayoutEngine, Point, Transform, Viewport,
};
use crate::tree::model::{NodeId, TreeModel};
use crate::tree::search::{SearchHit, SearchIndex};
use crate::tree::visibility::VisibilityState;

/// Work scheduled to run after the view has settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredAction {
    /// Open (or close, if already open) the details panel of a node.
    OpenDetails(NodeId),
}

/// A scheduled action plus the token that must still be current when it
/// fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deferred {
    pub token: u64,
    pub action: DeferredAction,
}

/// The parts rebuilt on every load.
struct Loaded {
    model: TreeModel,
    visibility: VisibilityState,
    index: SearchIndex,
    layout: Layout,
}

impl Loaded {
    fn from_text(engine: &LayoutEngine, text: &str) -> Result<Self> {
        let model = TreeModel::parse(text)?;
        let visibility = VisibilityState::new(&model);
        let index = SearchIndex::build(&model);
        let layout = engine.compute(&model, &visibility);
        Ok(Self {
            model,
            visibility,
            index,
            layout,
        })
    }
}

pub struct Session {
    engine: LayoutEngine,
    model: TreeModel,
    visibility: VisibilityState,
    index: SearchIndex,
    layout: Layout,
    transform: Transform,
    viewport: Viewport,
    /// Node whose details are open.
    selected: Option<NodeId>,
    /// Keyboard cursor; always a visible node.
    focused: NodeId,
    /// Text of the last successful load or save, for `reset`.
    source: String,
    next_token: u64,
    pending: Option<Deferred>,
}

impl Session {
    /// Parse `text` and open it centred on the root.
    pub fn open(text: &str, config: LayoutConfig, viewport: Viewport) -> Result<Self> {
        let engine = LayoutEngine::new(config);
        let loaded = Loaded::from_text(&engine, text)?;
        let root = loaded.model.root();
        let mut session = Self {
            engine,
            model: loaded.model,
            visibility: loaded.visibility,
            index: loaded.index,
            layout: loaded.layout,
            transform: Transform::default(),
            viewport,
            selected: None,
            focused: root,
            source: text.to_string(),
            next_token: 0,
            pending: None,
        };
        session.center_on(root);
        tracing::info!(nodes = session.model.len(), "document opened");
        Ok(session)
    }

    /// Replace the current document. On error nothing changes.
    pub fn load(&mut self, text: &str) -> Result<()> {
        let loaded = Loaded::from_text(&self.engine, text).inspect_err(|e| {
            tracing::warn!(error = %e, "reload rejected; keeping current document");
        })?;
        self.model = loaded.model;
        self.visibility = loaded.visibility;
        self.index = loaded.index;
        self.layout = loaded.layout;
        self.selected = None;
        self.focused = self.model.root();
        self.source = text.to_string();
        // outstanding tokens refer to ids of the old document
        self.pending = None;
        self.center_on(self.model.root());
        tracing::info!(nodes = self.model.len(), "document loaded");
        Ok(())
    }

    /// Throw away collapse state and edits and reload the last loaded text.
    pub fn reset(&mut self) -> Result<()> {
        let text = std::mem::take(&mut self.source);
        let result = self.load(&text);
        if result.is_err() {
            self.source = text;
        }
        result
    }

    /// Make `document` the state `reset` returns to, after it was written.
    pub fn mark_saved(&mut self, document: &Value) {
        self.source = document.to_string();
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn model(&self) -> &TreeModel {
        &self.model
    }

    pub fn visibility(&self) -> &VisibilityState {
        &self.visibility
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn layout_config(&self) -> &LayoutConfig {
        self.engine.config()
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    pub fn focused(&self) -> NodeId {
        self.focused
    }

    /// The pending deferred action, if any.
    #[cfg(test)]
    pub fn pending(&self) -> Option<Deferred> {
        self.pending
    }

    // ── Interaction ──────────────────────────────────────────────────────

    /// A click on a node: toggle its children, flip the selection, and
    /// centre on it. Returns `false` for unknown ids.
    pub fn click(&mut self, id: NodeId) -> bool {
        let Some(node) = self.model.lookup(id) else {
            return false;
        };
        if node.has_children() {
            self.visibility.toggle(id);
            self.relayout();
        }
        self.toggle_selection(id);
        self.focused = id;
        self.center_on(id);
        true
    }

    /// Click whatever node sits under a point in viewport coordinates.
    pub fn click_at(&mut self, point: Point) -> Option<NodeId> {
        let id = self.hit_test(point)?;
        self.click(id);
        Some(id)
    }

    /// The node drawn under a point in viewport coordinates.
    pub fn hit_test(&self, point: Point) -> Option<NodeId> {
        self.layout.node_at(self.transform.invert(point))
    }

    pub fn search(&self, text: &str) -> Vec<SearchHit> {
        self.index.query(&self.model, text)
    }

    /// Reveal `id`, centre on it, and schedule its details to open.
    ///
    /// Any earlier pending action is superseded: its token will no longer
    /// fire.
    pub fn navigate_to(&mut self, id: NodeId) -> Option<Deferred> {
        self.model.lookup(id)?;
        if !self.visibility.ensure_ancestors_visible(&self.model, id).is_empty() {
            self.relayout();
        }
        self.focused = id;
        self.center_on(id);

        self.next_token += 1;
        let deferred = Deferred {
            token: self.next_token,
            action: DeferredAction::OpenDetails(id),
        };
        if let Some(stale) = self.pending.replace(deferred) {
            tracing::debug!(token = stale.token, "superseded pending navigation");
        }
        tracing::debug!(target_node = %id, token = deferred.token, "navigation scheduled");
        Some(deferred)
    }

    /// Run the pending action if `token` is still current.
    pub fn fire(&mut self, token: u64) -> Option<DeferredAction> {
        match self.pending {
            Some(deferred) if deferred.token == token => {
                self.pending = None;
                match deferred.action {
                    DeferredAction::OpenDetails(id) => {
                        if self.model.lookup(id).is_some() {
                            self.toggle_selection(id);
                        }
                    }
                }
                Some(deferred.action)
            }
            _ => {
                tracing::debug!(token, "ignoring stale deferred action");
                None
            }
        }
    }

    /// Close the details panel.
    pub fn deselect(&mut self) {
        self.selected = None;
    }

    fn toggle_selection(&mut self, id: NodeId) {
        self.selected = if self.selected == Some(id) {
            None
        } else {
            Some(id)
        };
    }

    // ── Editing ──────────────────────────────────────────────────────────

    /// Rename a node in place. Returns `false` for unknown ids.
    pub fn edit_node(&mut self, id: NodeId, label: &str, biography: &str) -> bool {
        match self.model.lookup_mut(id) {
            Some(node) => {
                node.set_name(label, biography);
                tracing::debug!(node = %id, "node renamed");
                true
            }
            None => false,
        }
    }

    pub fn table(&self) -> FlatTable {
        flatten::flatten(&self.model)
    }

    pub fn apply_table(&mut self, rows: &[FlatRow]) -> ApplyReport {
        let report = flatten::apply_edits(&mut self.model, rows);
        tracing::info!(
            applied = report.applied,
            missed = report.missed.len(),
            "table edits applied"
        );
        report
    }

    /// The current document, nested and without synthetic ids.
    pub fn document(&self) -> Value {
        flatten::serialize(&self.model)
    }

    // ── View ─────────────────────────────────────────────────────────────

    /// Resize the view and keep the focused node centred.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.center_on(self.focused);
    }

    /// Move the view by a delta in viewport units.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.transform.tx += dx;
        self.transform.ty += dy;
    }

    pub fn center_on(&mut self, id: NodeId) {
        if let Some(t) = centering_transform(&self.layout, id, self.viewport) {
            self.transform = t;
        }
    }

    fn relayout(&mut self) {
        self.layout = self.engine.compute(&self.model, &self.visibility);
        debug_assert_eq!(
            self.layout.order(),
            self.visibility.visible_nodes(&self.model).as_slice()
        );
        tracing::trace!(
            shown = self.layout.order().len(),
            span = self.layout.extent().span(),
            canvas_height = self.layout.canvas_height(),
            "relayout"
        );
    }

    // ── Focus movement ───────────────────────────────────────────────────

    fn focus(&mut self, id: NodeId) -> bool {
        if id == self.focused || !self.visibility.is_reachable(&self.model, id) {
            return false;
        }
        self.focused = id;
        self.center_on(id);
        true
    }

    /// Next visible node in pre-order.
    pub fn focus_next(&mut self) -> bool {
        let order = self.layout.order();
        let next = order
            .iter()
            .position(|&id| id == self.focused)
            .and_then(|i| order.get(i + 1))
            .copied();
        next.is_some_and(|id| self.focus(id))
    }

    /// Previous visible node in pre-order.
    pub fn focus_prev(&mut self) -> bool {
        let order = self.layout.order();
        let prev = order
            .iter()
            .position(|&id| id == self.focused)
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| order.get(i))
            .copied();
        prev.is_some_and(|id| self.focus(id))
    }

    pub fn focus_parent(&mut self) -> bool {
        let parent = self.model.lookup(self.focused).and_then(|n| n.parent());
        parent.is_some_and(|id| self.focus(id))
    }

    /// First visible child; nothing happens on collapsed nodes.
    pub fn focus_first_child(&mut self) -> bool {
        let child = self
            .visibility
            .visible_children_of(self.focused)
            .first()
            .copied();
        child.is_some_and(|id| self.focus(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "name": "A\nFounder.",
        "children": [
            { "name": "B", "children": [ { "name": "D" } ] },
            { "name": "C" }
        ]
    }"#;

    fn viewport() -> Viewport {
        Viewport {
            width: 1000.0,
            height: 600.0,
        }
    }

    fn session() -> Session {
        Session::open(DOC, LayoutConfig::default(), viewport()).unwrap()
    }

    fn id(s: &Session, label: &str) -> NodeId {
        s.model().find_by_label(label).unwrap()
    }

    fn centre_of(s: &Session, node: NodeId) -> Point {
        s.transform().apply(s.layout().position(node).unwrap())
    }

    #[test]
    fn opens_centred_on_root_with_root_expanded() {
        let s = session();
        let root = s.model().root();
        assert_eq!(s.focused(), root);
        assert_eq!(s.selected(), None);
        assert_eq!(s.layout().order().len(), 3);
        assert_eq!(centre_of(&s, root), Point { x: 500.0, y: 300.0 });
    }

    #[test]
    fn click_toggles_children_and_selection() {
        let mut s = session();
        let b = id(&s, "B");
        assert!(s.click(b));
        assert!(s.visibility().is_expanded(b));
        assert_eq!(s.selected(), Some(b));
        assert_eq!(s.layout().order().len(), 4);
        assert_eq!(centre_of(&s, b), Point { x: 500.0, y: 300.0 });

        assert!(s.click(b));
        assert!(!s.visibility().is_expanded(b));
        assert_eq!(s.selected(), None);
        assert_eq!(s.layout().order().len(), 3);
    }

    #[test]
    fn clicking_a_leaf_only_selects() {
        let mut s = session();
        let c = id(&s, "C");
        s.click(c);
        assert_eq!(s.selected(), Some(c));
        assert_eq!(s.layout().order().len(), 3);
    }

    #[test]
    fn click_unknown_id_is_rejected() {
        let mut s = session();
        assert!(!s.click(NodeId::from_raw(99)));
    }

    #[test]
    fn click_at_uses_inverse_transform() {
        let mut s = session();
        let c = id(&s, "C");
        let point = centre_of(&s, c);
        assert_eq!(s.click_at(point), Some(c));
        assert_eq!(s.selected(), Some(c));
        assert_eq!(s.click_at(Point { x: -5000.0, y: 0.0 }), None);
    }

    #[test]
    fn navigate_reveals_then_fires_once() {
        let mut s = session();
        let d = id(&s, "D");
        let b = id(&s, "B");
        let deferred = s.navigate_to(d).unwrap();
        assert!(s.visibility().is_expanded(b));
        assert_eq!(s.focused(), d);
        assert_eq!(centre_of(&s, d), Point { x: 500.0, y: 300.0 });
        assert_eq!(s.selected(), None);

        assert_eq!(
            s.fire(deferred.token),
            Some(DeferredAction::OpenDetails(d))
        );
        assert_eq!(s.selected(), Some(d));
        assert_eq!(s.fire(deferred.token), None);
        assert_eq!(s.selected(), Some(d));
    }

    #[test]
    fn stale_navigation_is_ignored() {
        let mut s = session();
        let d = id(&s, "D");
        let c = id(&s, "C");
        let first = s.navigate_to(d).unwrap();
        let second = s.navigate_to(c).unwrap();
        assert_ne!(first.token, second.token);

        assert_eq!(s.fire(first.token), None);
        assert_eq!(s.selected(), None);
        assert_eq!(s.fire(second.token), Some(DeferredAction::OpenDetails(c)));
        assert_eq!(s.selected(), Some(c));
    }

    #[test]
    fn reload_invalidates_pending_navigation() {
        let mut s = session();
        let d = id(&s, "D");
        let deferred = s.navigate_to(d).unwrap();
        s.load(r#"{ "name": "Solo" }"#).unwrap();
        assert_eq!(s.fire(deferred.token), None);
        assert_eq!(s.selected(), None);
        assert_eq!(s.model().len(), 1);
    }

    #[test]
    fn failed_reload_keeps_state() {
        let mut s = session();
        let b = id(&s, "B");
        s.click(b);
        assert!(s.load("{ not json").is_err());
        assert!(s.load(r#"[1, 2]"#).is_err());
        assert_eq!(s.model().len(), 4);
        assert!(s.visibility().is_expanded(b));
        assert_eq!(s.selected(), Some(b));
    }

    #[test]
    fn reset_discards_edits_and_collapse_state() {
        let mut s = session();
        let b = id(&s, "B");
        s.click(b);
        s.edit_node(b, "Bertil", "");
        s.reset().unwrap();
        let b = id(&s, "B");
        assert!(!s.visibility().is_expanded(b));
        assert_eq!(s.selected(), None);
        assert!(s.model().find_by_label("Bertil").is_none());
    }

    #[test]
    fn reset_after_save_keeps_saved_edits() {
        let mut s = session();
        let c = id(&s, "C");
        s.edit_node(c, "Cecilia", "");
        let saved = s.document();
        s.mark_saved(&saved);
        s.edit_node(c, "Unsaved", "");
        s.reset().unwrap();
        assert!(s.model().find_by_label("Cecilia").is_some());
        assert!(s.model().find_by_label("Unsaved").is_none());
        assert_eq!(s.document(), saved);
    }

    #[test]
    fn deep_lineage_reveals_and_saves() {
        let mut text = String::new();
        for i in 0..150 {
            text.push_str(&format!(r#"{{"name":"Gen {}","children":["#, i));
        }
        text.push_str(&"]}".repeat(150));
        let mut s = Session::open(&text, LayoutConfig::default(), viewport()).unwrap();
        let last = id(&s, "Gen 149");
        s.navigate_to(last).unwrap();
        assert_eq!(s.layout().order().len(), 150);
        assert_eq!(centre_of(&s, last), Point { x: 500.0, y: 300.0 });

        let saved = s.document();
        s.mark_saved(&saved);
        s.reset().unwrap();
        assert_eq!(s.model().len(), 150);
    }

    #[test]
    fn edits_are_searchable_and_serialized() {
        let mut s = session();
        let c = id(&s, "C");
        assert!(s.edit_node(c, "Cecilia", "Born in Kalmar."));
        let hits = s.search("cecil");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, c);
        assert_eq!(
            s.document()["children"][1]["name"],
            Value::String("Cecilia\nBorn in Kalmar.".into())
        );
    }

    #[test]
    fn table_round_trip_through_session() {
        let mut s = session();
        let before = s.document();
        let table = s.table();
        let report = s.apply_table(&table.rows);
        assert_eq!(report.applied, 4);
        assert_eq!(s.document(), before);
    }

    #[test]
    fn focus_moves_through_visible_nodes() {
        let mut s = session();
        let root = s.model().root();
        let b = id(&s, "B");
        let c = id(&s, "C");

        assert!(s.focus_next());
        assert_eq!(s.focused(), b);
        // D is collapsed under B
        assert!(!s.focus_first_child());
        assert!(s.focus_next());
        assert_eq!(s.focused(), c);
        assert!(!s.focus_next());
        assert!(s.focus_prev());
        assert_eq!(s.focused(), b);
        assert!(s.focus_parent());
        assert_eq!(s.focused(), root);
        assert!(!s.focus_parent());
        assert!(!s.focus_prev());
        assert!(s.focus_first_child());
        assert_eq!(s.focused(), b);
    }

    #[test]
    fn viewport_change_recentres_on_focus() {
        let mut s = session();
        let c = id(&s, "C");
        s.focus_next();
        s.focus_next();
        assert_eq!(s.focused(), c);
        s.set_viewport(Viewport {
            width: 200.0,
            height: 100.0,
        });
        assert_eq!(centre_of(&s, c), Point { x: 100.0, y: 50.0 });
    }
}
