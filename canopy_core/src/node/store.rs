// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays node storage with allocation, topology, and rendering.

use core::any::Any;

use kurbo::{Affine, Point, Rect, Size, Vec2};

use crate::error::SceneError;
use crate::host::WindowBounds;
use crate::surface::Surface;
use crate::transform::GlobalTransform;

use super::drawable::{Drawable, FrameInfo};
use super::id::{INVALID, NodeId, ViewportId};
use super::traverse::{Children, preorder};
use super::{Culling, Node};

/// Counters from one render pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Nodes whose content was drawn.
    pub drawn: u32,
    /// Nodes skipped (with their subtree) because they were off screen.
    pub culled: u32,
    /// Nodes skipped (with their subtree) because `visible` was false.
    pub hidden: u32,
}

/// Struct-of-arrays storage for all nodes of a tree.
///
/// Nodes are addressed by [`NodeId`] handles. Destroyed nodes are recycled
/// via a free list, and generation counters prevent stale handle access.
#[derive(Debug, Default)]
pub struct NodeStore {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) children: Vec<Vec<u32>>,
    pub(crate) index: Vec<u32>,
    pub(crate) viewport: Vec<Option<ViewportId>>,

    // -- Local properties (set by callers) --
    pub(crate) nodes: Vec<Node>,
    pub(crate) content: Vec<Option<Box<dyn Drawable>>>,

    // -- Computed properties (written by render) --
    pub(crate) global: Vec<GlobalTransform>,
    pub(crate) bounds: Vec<Rect>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) alive: Vec<bool>,
    pub(crate) free_list: Vec<u32>,
}

impl NodeStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -- Allocation API --

    /// Creates a detached grouping node.
    pub fn create(&mut self, node: Node) -> NodeId {
        self.alloc(node, None)
    }

    /// Creates a detached node with drawable content.
    pub fn create_with(&mut self, node: Node, content: impl Drawable) -> NodeId {
        self.alloc(node, Some(Box::new(content)))
    }

    fn alloc(&mut self, node: Node, content: Option<Box<dyn Drawable>>) -> NodeId {
        let idx = if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.generation[i] += 1;
            self.alive[i] = true;
            self.parent[i] = INVALID;
            self.children[i].clear();
            self.index[i] = INVALID;
            self.viewport[i] = None;
            self.nodes[i] = node;
            self.content[i] = content;
            self.global[i] = GlobalTransform::IDENTITY;
            self.bounds[i] = Rect::ZERO;
            idx
        } else {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "node count is bounded well below u32::MAX"
            )]
            let idx = self.nodes.len() as u32;
            self.parent.push(INVALID);
            self.children.push(Vec::new());
            self.index.push(INVALID);
            self.viewport.push(None);
            self.nodes.push(node);
            self.content.push(content);
            self.global.push(GlobalTransform::IDENTITY);
            self.bounds.push(Rect::ZERO);
            self.generation.push(0);
            self.alive.push(true);
            idx
        };
        self.id_at(idx)
    }

    /// Destroys a node and its whole subtree, freeing their slots for reuse.
    ///
    /// The node is detached from its parent first (firing `removed`).
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn destroy(&mut self, id: NodeId) {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        if p != INVALID {
            self.detach(p, id.idx);
        }
        for idx in preorder(self, id.idx) {
            let i = idx as usize;
            // Bump generation so old handles immediately fail validation.
            self.generation[i] += 1;
            self.alive[i] = false;
            self.parent[i] = INVALID;
            self.children[i].clear();
            self.index[i] = INVALID;
            self.viewport[i] = None;
            self.content[i] = None;
            self.free_list.push(idx);
        }
    }

    /// Returns whether the given handle refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        let i = id.idx as usize;
        i < self.nodes.len() && self.alive[i] && self.generation[i] == id.generation
    }

    /// Number of live nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free_list.len()
    }

    /// Whether the store holds no live nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // -- Topology API --

    /// Appends `child` to `parent`'s children.
    ///
    /// If `child` already has a parent it is detached from it first. The
    /// child's `added` hook fires, and if `parent` is attached to a viewport
    /// the whole subtree is attached to it too.
    ///
    /// # Errors
    ///
    /// [`SceneError::WouldCycle`] if `child` is `parent` or one of its
    /// ancestors.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        self.insert(parent, child, None)
    }

    /// Inserts `child` at `index` in `parent`'s children, clamped to the
    /// current child count. Otherwise identical to
    /// [`add_child`](Self::add_child).
    ///
    /// # Errors
    ///
    /// [`SceneError::WouldCycle`] if `child` is `parent` or one of its
    /// ancestors.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale.
    pub fn add_child_at(
        &mut self,
        parent: NodeId,
        child: NodeId,
        index: usize,
    ) -> Result<(), SceneError> {
        self.insert(parent, child, Some(index))
    }

    fn insert(
        &mut self,
        parent: NodeId,
        child: NodeId,
        at: Option<usize>,
    ) -> Result<(), SceneError> {
        self.validate(parent);
        self.validate(child);
        let (p, c) = (parent.idx, child.idx);
        if self.is_ancestor_or_self(c, p) {
            return Err(SceneError::WouldCycle);
        }

        let old = self.parent[c as usize];
        if old != INVALID {
            self.detach(old, c);
        }

        let siblings = &mut self.children[p as usize];
        let pos = at.map_or(siblings.len(), |i| i.min(siblings.len()));
        siblings.insert(pos, c);
        self.parent[c as usize] = p;
        self.reindex(p, pos);

        if let Some(content) = self.content[c as usize].as_mut() {
            content.added(&mut self.nodes[c as usize]);
        }
        if let Some(v) = self.viewport[p as usize] {
            self.attach_viewport(c, v);
        }
        Ok(())
    }

    /// Removes `child` from `parent`.
    ///
    /// Fires the child's `removed` hook and clears its parent and viewport
    /// back-references. Descendants of `child` keep their own viewport
    /// reference. Returns `false` if `child` is not a child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        self.validate(parent);
        self.validate(child);
        if self.parent[child.idx as usize] != parent.idx {
            return false;
        }
        self.detach(parent.idx, child.idx);
        true
    }

    /// Removes every child of `parent`, firing `removed` on each.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn remove_children(&mut self, parent: NodeId) {
        self.validate(parent);
        let removed = core::mem::take(&mut self.children[parent.idx as usize]);
        for c in removed {
            self.clear_links(c);
        }
    }

    /// Moves `child` to `index` within its parent's children, clamped to the
    /// last position.
    ///
    /// Returns the new index, or `None` if `child` has no parent.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn set_child_index(&mut self, child: NodeId, index: usize) -> Option<usize> {
        self.validate(child);
        let c = child.idx;
        let p = self.parent[c as usize];
        if p == INVALID {
            return None;
        }
        let old = self.index[c as usize] as usize;
        let siblings = &mut self.children[p as usize];
        siblings.remove(old);
        let new = index.min(siblings.len());
        siblings.insert(new, c);
        self.reindex(p, old.min(new));
        Some(new)
    }

    /// Returns the parent of a node, if any.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        (p != INVALID).then(|| self.id_at(p))
    }

    /// Returns an iterator over the direct children of a node.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Children<'_> {
        self.validate(id);
        Children::new(self, &self.children[id.idx as usize])
    }

    /// Number of direct children.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn child_count(&self, id: NodeId) -> usize {
        self.validate(id);
        self.children[id.idx as usize].len()
    }

    /// Position of the node within its parent's children.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        self.validate(id);
        let i = self.index[id.idx as usize];
        (i != INVALID).then_some(i as usize)
    }

    /// The viewport this node is attached to, if any.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn viewport(&self, id: NodeId) -> Option<ViewportId> {
        self.validate(id);
        self.viewport[id.idx as usize]
    }

    // -- Properties --

    /// Returns the node's properties.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        self.validate(id);
        &self.nodes[id.idx as usize]
    }

    /// Returns the node's properties for mutation.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.validate(id);
        &mut self.nodes[id.idx as usize]
    }

    /// The global transform computed by the last render pass.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn global(&self, id: NodeId) -> GlobalTransform {
        self.validate(id);
        self.global[id.idx as usize]
    }

    /// The culling bounds computed by the last render pass.
    ///
    /// Only meaningful for [`Culling::Viewport`] nodes.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn bounds(&self, id: NodeId) -> Rect {
        self.validate(id);
        self.bounds[id.idx as usize]
    }

    /// Returns the node's content downcast to `T`.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn content<T: Drawable>(&self, id: NodeId) -> Option<&T> {
        self.validate(id);
        let content: &dyn Any = self.content[id.idx as usize].as_deref()?;
        content.downcast_ref::<T>()
    }

    /// Returns the node's content downcast to `T` for mutation.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn content_mut<T: Drawable>(&mut self, id: NodeId) -> Option<&mut T> {
        self.validate(id);
        let content: &mut dyn Any = self.content[id.idx as usize].as_deref_mut()?;
        content.downcast_mut::<T>()
    }

    /// Returns the node's properties and its content downcast to `T`.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn node_and_content_mut<T: Drawable>(&mut self, id: NodeId) -> Option<(&mut Node, &mut T)> {
        self.validate(id);
        let i = id.idx as usize;
        let content: &mut dyn Any = self.content[i].as_deref_mut()?;
        Some((&mut self.nodes[i], content.downcast_mut::<T>()?))
    }

    /// Replaces the node's content, returning the previous content.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn set_content(
        &mut self,
        id: NodeId,
        content: Option<Box<dyn Drawable>>,
    ) -> Option<Box<dyn Drawable>> {
        self.validate(id);
        core::mem::replace(&mut self.content[id.idx as usize], content)
    }

    // -- Visibility --

    /// Whether the node's bounds, from its last computed global transform,
    /// overlap a viewport of size `viewport`.
    ///
    /// Nodes with [`Culling::Off`] are always visible.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn is_visible(&self, id: NodeId, viewport: Size) -> bool {
        self.validate(id);
        let i = id.idx as usize;
        self.nodes[i].culling == Culling::Off || overlaps(self.cull_bounds(i), viewport)
    }

    /// Whether `point` lies in the node's hit box.
    ///
    /// Uses [`HitArea`](super::HitArea) overrides where set, else the last
    /// computed global anchor, the node's center, and its size. Invisible
    /// nodes are never hit.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn hit_test(&self, id: NodeId, point: Point) -> bool {
        self.validate(id);
        let i = id.idx as usize;
        let node = &self.nodes[i];
        if !node.visible {
            return false;
        }
        let anchor = node
            .hit_area
            .position
            .unwrap_or_else(|| self.global[i].position());
        let center = node.hit_area.center.unwrap_or(node.transform.center());
        let size = node.hit_area.size.unwrap_or(node.size);
        let origin = anchor - center;
        point.x >= origin.x
            && point.x <= origin.x + size.width
            && point.y >= origin.y
            && point.y <= origin.y + size.height
    }

    fn cull_bounds(&self, i: usize) -> Rect {
        let node = &self.nodes[i];
        let global = &self.global[i];
        let origin = global.position() - node.transform.center();
        let local = node.bounds_override.or_else(|| {
            self.content[i]
                .as_deref()
                .and_then(|content| content.local_bounds(node))
        });
        if let Some(local) = local {
            return local + origin.to_vec2();
        }
        let rect = Rect::from_origin_size(origin, node.size);
        if global.rotation == 0.0 {
            rect
        } else {
            Affine::rotate_about(global.rotation, global.position()).transform_rect_bbox(rect)
        }
    }

    // -- Render --

    /// Renders the subtree rooted at `root` into `surface`.
    ///
    /// For each node in paint order: recompute the global transform from the
    /// parent's, run the content's `calc` hook, then skip the whole subtree if
    /// the node is invisible or culled. Otherwise the content is drawn between
    /// `save` and `restore` and the children are rendered in order.
    ///
    /// # Errors
    ///
    /// Propagates the first error returned by a drawable; the rest of the
    /// pass is abandoned.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn render(
        &mut self,
        root: NodeId,
        surface: &mut dyn Surface,
        frame: &FrameInfo,
    ) -> Result<RenderStats, SceneError> {
        self.validate(root);
        let mut stats = RenderStats::default();
        self.render_at(root.idx, surface, frame, &mut stats)?;
        Ok(stats)
    }

    fn render_at(
        &mut self,
        idx: u32,
        surface: &mut dyn Surface,
        frame: &FrameInfo,
        stats: &mut RenderStats,
    ) -> Result<bool, SceneError> {
        let i = idx as usize;
        let p = self.parent[i];
        let parent_global = if p == INVALID {
            GlobalTransform::IDENTITY
        } else {
            self.global[p as usize]
        };
        let mut global = GlobalTransform::compose(&parent_global, &self.nodes[i].transform);
        if let Some(content) = self.content[i].as_mut() {
            content.calc(&self.nodes[i], &mut global, frame);
        }
        self.global[i] = global;

        if !self.nodes[i].visible {
            stats.hidden += 1;
            return Ok(false);
        }
        if self.nodes[i].culling == Culling::Viewport {
            let bounds = self.cull_bounds(i);
            self.bounds[i] = bounds;
            if !overlaps(bounds, frame.viewport) {
                stats.culled += 1;
                return Ok(false);
            }
        }

        if let Some(content) = self.content[i].as_mut() {
            let (sx, sy) = global.draw_scale();
            surface.save();
            surface.translate(Vec2::new(global.x, global.y));
            surface.rotate(global.rotation);
            surface.scale(sx, sy);
            surface.set_global_alpha(global.alpha);
            let drawn = content.draw(surface, &mut self.nodes[i], frame);
            surface.restore();
            drawn?;
            stats.drawn += 1;
        }

        let mut n = 0;
        while n < self.children[i].len() {
            let c = self.children[i][n];
            self.render_at(c, surface, frame, stats)?;
            n += 1;
        }
        Ok(true)
    }

    /// Sends new window bounds to the content of every node under `root`.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn resize(&mut self, root: NodeId, bounds: &WindowBounds) {
        self.validate(root);
        for idx in preorder(self, root.idx) {
            let i = idx as usize;
            if let Some(content) = self.content[i].as_mut() {
                content.resize(bounds, &mut self.nodes[i]);
            }
        }
    }

    // -- Internal helpers --

    /// Attaches a subtree to a viewport, firing `added_to_stage` on each
    /// node in preorder.
    pub(crate) fn attach_viewport(&mut self, root: u32, viewport: ViewportId) {
        for idx in preorder(self, root) {
            let i = idx as usize;
            self.viewport[i] = Some(viewport);
            if let Some(content) = self.content[i].as_mut() {
                content.added_to_stage(&mut self.nodes[i], viewport);
            }
        }
    }

    pub(crate) fn id_at(&self, idx: u32) -> NodeId {
        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    fn detach(&mut self, p: u32, c: u32) {
        let pos = self.index[c as usize] as usize;
        self.children[p as usize].remove(pos);
        self.reindex(p, pos);
        self.clear_links(c);
    }

    fn clear_links(&mut self, c: u32) {
        let i = c as usize;
        if let Some(content) = self.content[i].as_mut() {
            content.removed(&mut self.nodes[i]);
        }
        self.parent[i] = INVALID;
        self.index[i] = INVALID;
        self.viewport[i] = None;
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "child positions are bounded by the u32 slot space"
    )]
    fn reindex(&mut self, p: u32, from: usize) {
        for (pos, &c) in self.children[p as usize].iter().enumerate().skip(from) {
            self.index[c as usize] = pos as u32;
        }
    }

    fn is_ancestor_or_self(&self, ancestor: u32, mut of: u32) -> bool {
        while of != INVALID {
            if of == ancestor {
                return true;
            }
            of = self.parent[of as usize];
        }
        false
    }

    #[inline]
    fn validate(&self, id: NodeId) {
        assert!(self.is_alive(id), "stale NodeId {id:?}");
    }
}

fn overlaps(bounds: Rect, viewport: Size) -> bool {
    !(bounds.y1 < 0.0 || bounds.y0 > viewport.height || bounds.x1 < 0.0 || bounds.x0 > viewport.width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{DrawOp, RecordingSurface};
    use crate::transform::Transform;
    use core::cell::Cell;
    use std::rc::Rc;

    const EPSILON: f64 = 1e-9;

    /// Fills its node's rectangle and counts lifecycle hooks.
    #[derive(Debug, Default)]
    struct Tally {
        draws: Rc<Cell<u32>>,
        added: u32,
        removed: u32,
        staged: u32,
    }

    impl Drawable for Tally {
        fn draw(
            &mut self,
            surface: &mut dyn Surface,
            node: &mut Node,
            _frame: &FrameInfo,
        ) -> Result<(), SceneError> {
            self.draws.set(self.draws.get() + 1);
            surface.fill_rect(Rect::from_origin_size(Point::ORIGIN, node.size));
            Ok(())
        }

        fn added(&mut self, _node: &mut Node) {
            self.added += 1;
        }

        fn removed(&mut self, _node: &mut Node) {
            self.removed += 1;
        }

        fn added_to_stage(&mut self, _node: &mut Node, _viewport: ViewportId) {
            self.staged += 1;
        }
    }

    #[derive(Debug)]
    struct Failing;

    impl Drawable for Failing {
        fn draw(
            &mut self,
            _surface: &mut dyn Surface,
            _node: &mut Node,
            _frame: &FrameInfo,
        ) -> Result<(), SceneError> {
            Err(SceneError::EmptyFrames)
        }
    }

    fn view(w: f64, h: f64) -> FrameInfo {
        FrameInfo::still(Size::new(w, h))
    }

    #[test]
    fn create_and_destroy() {
        let mut store = NodeStore::new();
        let a = store.create(Node::display());
        assert!(store.is_alive(a));
        assert_eq!(store.len(), 1);
        store.destroy(a);
        assert!(!store.is_alive(a));
        assert!(store.is_empty());
    }

    #[test]
    fn slot_reuse_bumps_generation() {
        let mut store = NodeStore::new();
        let a = store.create(Node::display());
        store.destroy(a);
        let b = store.create(Node::display());
        assert_eq!(a.index(), b.index(), "slot should be reused");
        assert_ne!(a.generation(), b.generation());
        assert!(!store.is_alive(a));
        assert!(store.is_alive(b));
    }

    #[test]
    #[should_panic(expected = "stale NodeId")]
    fn stale_handle_panics() {
        let mut store = NodeStore::new();
        let a = store.create(Node::display());
        store.destroy(a);
        let _ = store.node(a);
    }

    #[test]
    fn destroy_frees_subtree_and_detaches() {
        let mut store = NodeStore::new();
        let root = store.create(Node::display());
        let a = store.create(Node::display());
        let b = store.create(Node::display());
        store.add_child(root, a).unwrap();
        store.add_child(a, b).unwrap();
        store.destroy(a);
        assert!(!store.is_alive(a));
        assert!(!store.is_alive(b));
        assert_eq!(store.child_count(root), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn child_indices_track_positions() {
        let mut store = NodeStore::new();
        let root = store.create(Node::display());
        let a = store.create(Node::display());
        let b = store.create(Node::display());
        let c = store.create(Node::display());
        store.add_child(root, a).unwrap();
        store.add_child(root, b).unwrap();
        store.add_child_at(root, c, 0).unwrap();

        let order: Vec<_> = store.children(root).collect();
        assert_eq!(order, vec![c, a, b]);
        for (i, id) in order.iter().enumerate() {
            assert_eq!(store.index_in_parent(*id), Some(i), "index of {id:?}");
        }

        assert!(store.remove_child(root, c));
        assert_eq!(store.index_in_parent(a), Some(0));
        assert_eq!(store.index_in_parent(b), Some(1));
        assert_eq!(store.index_in_parent(c), None);
    }

    #[test]
    fn add_child_at_clamps_index() {
        let mut store = NodeStore::new();
        let root = store.create(Node::display());
        let a = store.create(Node::display());
        let b = store.create(Node::display());
        store.add_child(root, a).unwrap();
        store.add_child_at(root, b, 99).unwrap();
        assert_eq!(store.index_in_parent(b), Some(1));
    }

    #[test]
    fn add_then_remove_restores_count_and_clears_links() {
        let mut store = NodeStore::new();
        let root = store.create(Node::display());
        let v = ViewportId(7);
        store.attach_viewport(root.idx, v);
        let child = store.create_with(Node::display(), Tally::default());

        let before = store.child_count(root);
        store.add_child(root, child).unwrap();
        assert_eq!(store.parent(child), Some(root));
        assert_eq!(store.viewport(child), Some(v));
        assert!(store.remove_child(root, child));

        assert_eq!(store.child_count(root), before);
        assert_eq!(store.parent(child), None);
        assert_eq!(store.viewport(child), None);
        let tally = store.content::<Tally>(child).unwrap();
        assert_eq!((tally.added, tally.removed, tally.staged), (1, 1, 1));
    }

    #[test]
    fn remove_missing_child_is_noop() {
        let mut store = NodeStore::new();
        let root = store.create(Node::display());
        let other = store.create(Node::display());
        let stray = store.create(Node::display());
        store.add_child(other, stray).unwrap();
        assert!(!store.remove_child(root, stray));
        assert_eq!(store.parent(stray), Some(other));
    }

    #[test]
    fn viewport_propagates_to_whole_subtree() {
        let mut store = NodeStore::new();
        let root = store.create(Node::display());
        store.attach_viewport(root.idx, ViewportId(1));
        let a = store.create_with(Node::display(), Tally::default());
        let b = store.create_with(Node::display(), Tally::default());
        store.add_child(a, b).unwrap();
        assert_eq!(store.viewport(b), None);

        store.add_child(root, a).unwrap();
        assert_eq!(store.viewport(a), Some(ViewportId(1)));
        assert_eq!(store.viewport(b), Some(ViewportId(1)));
        assert_eq!(store.content::<Tally>(b).unwrap().staged, 1);
    }

    #[test]
    fn remove_is_shallow() {
        let mut store = NodeStore::new();
        let root = store.create(Node::display());
        store.attach_viewport(root.idx, ViewportId(2));
        let a = store.create(Node::display());
        let b = store.create(Node::display());
        store.add_child(root, a).unwrap();
        store.add_child(a, b).unwrap();

        store.remove_child(root, a);
        assert_eq!(store.viewport(a), None);
        assert_eq!(
            store.viewport(b),
            Some(ViewportId(2)),
            "grandchildren keep their viewport reference"
        );
        assert_eq!(store.parent(b), Some(a));
    }

    #[test]
    fn remove_children_fires_removed() {
        let mut store = NodeStore::new();
        let root = store.create(Node::display());
        let a = store.create_with(Node::display(), Tally::default());
        let b = store.create_with(Node::display(), Tally::default());
        store.add_child(root, a).unwrap();
        store.add_child(root, b).unwrap();
        store.remove_children(root);
        assert_eq!(store.child_count(root), 0);
        assert_eq!(store.content::<Tally>(a).unwrap().removed, 1);
        assert_eq!(store.parent(b), None);
    }

    #[test]
    fn cycles_are_rejected() {
        let mut store = NodeStore::new();
        let a = store.create(Node::display());
        let b = store.create(Node::display());
        store.add_child(a, b).unwrap();
        assert_eq!(store.add_child(b, a), Err(SceneError::WouldCycle));
        assert_eq!(store.add_child(a, a), Err(SceneError::WouldCycle));
    }

    #[test]
    fn readding_moves_between_parents() {
        let mut store = NodeStore::new();
        let p1 = store.create(Node::display());
        let p2 = store.create(Node::display());
        let c = store.create(Node::display());
        store.add_child(p1, c).unwrap();
        store.add_child(p2, c).unwrap();
        assert_eq!(store.child_count(p1), 0);
        assert_eq!(store.parent(c), Some(p2));
    }

    #[test]
    fn set_child_index_round_trip() {
        let mut store = NodeStore::new();
        let root = store.create(Node::display());
        let kids: Vec<_> = (0..4).map(|_| store.create(Node::display())).collect();
        for &k in &kids {
            store.add_child(root, k).unwrap();
        }
        assert_eq!(store.set_child_index(kids[0], 2), Some(2));
        assert_eq!(store.children(root).nth(2), Some(kids[0]));
        assert_eq!(store.child_count(root), 4);
        for (i, id) in store.children(root).enumerate() {
            assert_eq!(store.index_in_parent(id), Some(i));
        }

        let orphan = store.create(Node::display());
        assert_eq!(store.set_child_index(orphan, 0), None);
    }

    #[test]
    fn render_composes_globals() {
        let mut store = NodeStore::new();
        let root = store.create(Node::display().at(10.0, 10.0).with_alpha(0.5));
        let mut child_node = Node::display().at(5.0, 0.0).with_rotation(0.25);
        child_node.transform.alpha = 0.5;
        child_node.transform.scale_x = 2.0;
        let child = store.create(child_node);
        let mut grand_node = Node::display().with_rotation(0.25);
        grand_node.transform.delta_y = 3.0;
        grand_node.transform.scale_x = 2.0;
        let grand = store.create(grand_node);
        store.add_child(root, child).unwrap();
        store.add_child(child, grand).unwrap();

        let mut surface = RecordingSurface::new();
        store.render(root, &mut surface, &view(100.0, 100.0)).unwrap();

        let g = store.global(child);
        assert!((g.x - 15.0).abs() < EPSILON && (g.y - 10.0).abs() < EPSILON);
        assert!((g.alpha - 0.25).abs() < EPSILON, "alpha = {}", g.alpha);
        let gg = store.global(grand);
        assert!((gg.y - 13.0).abs() < EPSILON, "y = {}", gg.y);
        assert!((gg.rotation - 0.5).abs() < EPSILON);
        assert!((gg.alpha - 0.25).abs() < EPSILON);
        assert!((gg.scale_x - 4.0).abs() < EPSILON);
    }

    #[test]
    fn globals_follow_parent_moves() {
        let mut store = NodeStore::new();
        let root = store.create(Node::display());
        let child = store.create(Node::display().at(1.0, 1.0));
        store.add_child(root, child).unwrap();
        let mut surface = RecordingSurface::new();
        store.render(root, &mut surface, &view(10.0, 10.0)).unwrap();
        store.node_mut(root).transform = Transform::at(100.0, 0.0);
        store.render(root, &mut surface, &view(10.0, 10.0)).unwrap();
        assert_eq!(store.global(child).position(), Point::new(101.0, 1.0));
    }

    #[test]
    fn invisible_node_skips_subtree() {
        let mut store = NodeStore::new();
        let root = store.create(Node::display());
        let draws = Rc::new(Cell::new(0));
        let tally = || Tally {
            draws: Rc::clone(&draws),
            ..Tally::default()
        };
        let hidden = store.create_with(Node::display().with_size(5.0, 5.0), tally());
        let inner = store.create_with(Node::display().with_size(5.0, 5.0), tally());
        store.add_child(root, hidden).unwrap();
        store.add_child(hidden, inner).unwrap();
        store.node_mut(hidden).visible = false;

        let mut surface = RecordingSurface::new();
        let stats = store.render(root, &mut surface, &view(100.0, 100.0)).unwrap();
        assert_eq!(draws.get(), 0, "neither hidden node nor its child draws");
        assert_eq!(stats.hidden, 1);
        assert!(surface.ops().is_empty());
    }

    #[test]
    fn draw_wraps_content_in_save_restore() {
        let mut store = NodeStore::new();
        let mut node = Node::display().at(3.0, 4.0).with_size(2.0, 2.0);
        node.transform.scale_y = 0.0;
        let root = store.create_with(node, Tally::default());
        let mut surface = RecordingSurface::new();
        store.render(root, &mut surface, &view(10.0, 10.0)).unwrap();
        assert_eq!(
            surface.ops(),
            &[
                DrawOp::Save,
                DrawOp::Translate(Vec2::new(3.0, 4.0)),
                DrawOp::Rotate(0.0),
                DrawOp::Scale(1.0, crate::transform::MIN_DRAW_SCALE),
                DrawOp::GlobalAlpha(1.0),
                DrawOp::FillRect(Rect::new(0.0, 0.0, 2.0, 2.0)),
                DrawOp::Restore,
            ]
        );
    }

    #[test]
    fn culling_scenario() {
        let mut store = NodeStore::new();
        let root = store.create(Node::display());
        let draws = Rc::new(Cell::new(0));
        let c = store.create_with(
            Node::sprite().at(50.0, 50.0).with_size(20.0, 20.0),
            Tally {
                draws: Rc::clone(&draws),
                ..Tally::default()
            },
        );
        store.add_child(root, c).unwrap();
        let viewport = Size::new(100.0, 100.0);
        let mut surface = RecordingSurface::new();

        store.render(root, &mut surface, &view(100.0, 100.0)).unwrap();
        assert!(store.is_visible(c, viewport));
        assert_eq!(draws.get(), 1);

        store.node_mut(c).transform.x = 200.0;
        let stats = store.render(root, &mut surface, &view(100.0, 100.0)).unwrap();
        assert!(!store.is_visible(c, viewport));
        assert_eq!(draws.get(), 1, "culled node does not draw");
        assert_eq!(stats.culled, 1);
        assert_eq!(store.child_count(root), 1, "culled node stays in the tree");
    }

    #[test]
    fn rotated_bounds_contain_shape() {
        let mut store = NodeStore::new();
        let root = store.create(Node::display());
        let node = Node::sprite()
            .at(50.0, 50.0)
            .with_size(20.0, 10.0)
            .with_center(10.0, 5.0)
            .with_rotation(core::f64::consts::FRAC_PI_2);
        let c = store.create(node);
        store.add_child(root, c).unwrap();
        let mut surface = RecordingSurface::new();
        store.render(root, &mut surface, &view(100.0, 100.0)).unwrap();
        let b = store.bounds(c);
        assert!((b.width() - 10.0).abs() < 1e-6, "width = {}", b.width());
        assert!((b.height() - 20.0).abs() < 1e-6, "height = {}", b.height());
        assert!((b.center().x - 50.0).abs() < 1e-6 && (b.center().y - 50.0).abs() < 1e-6);
    }

    #[test]
    fn culling_uses_composed_rotation() {
        let mut store = NodeStore::new();
        let root = store.create(Node::display());
        let parent = store.create(
            Node::display()
                .at(50.0, 50.0)
                .with_rotation(core::f64::consts::FRAC_PI_2),
        );
        let child = store.create(Node::sprite().with_size(40.0, 4.0));
        store.add_child(root, parent).unwrap();
        store.add_child(parent, child).unwrap();
        let mut surface = RecordingSurface::new();
        store.render(root, &mut surface, &view(100.0, 100.0)).unwrap();
        let b = store.bounds(child);
        assert!((b.width() - 4.0).abs() < 1e-6, "width = {}", b.width());
        assert!((b.height() - 40.0).abs() < 1e-6, "height = {}", b.height());
    }

    #[test]
    fn bounds_override_ignores_rotation() {
        let mut store = NodeStore::new();
        let node = Node::sprite()
            .at(10.0, 10.0)
            .with_rotation(1.0)
            .define_bounds(Rect::new(0.0, 0.0, 4.0, 4.0));
        let c = store.create(node);
        let mut surface = RecordingSurface::new();
        store.render(c, &mut surface, &view(100.0, 100.0)).unwrap();
        assert_eq!(store.bounds(c), Rect::new(10.0, 10.0, 14.0, 14.0));
    }

    #[test]
    fn always_visible_never_culls() {
        let mut store = NodeStore::new();
        let c = store.create(Node::sprite().at(-500.0, 0.0).always_visible());
        assert!(store.is_visible(c, Size::new(10.0, 10.0)));
    }

    #[test]
    fn drawable_error_propagates() {
        let mut store = NodeStore::new();
        let root = store.create(Node::display());
        let bad = store.create_with(Node::display(), Failing);
        let after = store.create_with(Node::display(), Tally::default());
        store.add_child(root, bad).unwrap();
        store.add_child(root, after).unwrap();
        let mut surface = RecordingSurface::new();
        let err = store.render(root, &mut surface, &view(10.0, 10.0));
        assert_eq!(err, Err(SceneError::EmptyFrames));
        assert_eq!(
            surface.ops().last(),
            Some(&DrawOp::Restore),
            "state is restored before the error propagates"
        );
    }

    #[test]
    fn hit_test_uses_overrides() {
        let mut store = NodeStore::new();
        let c = store.create(Node::display().at(10.0, 10.0).with_size(10.0, 10.0));
        let mut surface = RecordingSurface::new();
        store.render(c, &mut surface, &view(100.0, 100.0)).unwrap();
        assert!(store.hit_test(c, Point::new(15.0, 15.0)));
        assert!(!store.hit_test(c, Point::new(25.0, 15.0)));

        store.node_mut(c).hit_area.size = Some(Size::new(20.0, 20.0));
        assert!(store.hit_test(c, Point::new(25.0, 15.0)));

        store.node_mut(c).hit_area.position = Some(Point::new(0.0, 0.0));
        assert!(!store.hit_test(c, Point::new(25.0, 25.0)));

        store.node_mut(c).visible = false;
        assert!(!store.hit_test(c, Point::new(5.0, 5.0)));
    }

    #[test]
    fn downcast_content() {
        let mut store = NodeStore::new();
        let a = store.create_with(Node::display(), Tally::default());
        assert!(store.content::<Tally>(a).is_some());
        assert!(store.content::<Failing>(a).is_none());
        store.content_mut::<Tally>(a).unwrap().added = 9;
        assert_eq!(store.content::<Tally>(a).unwrap().added, 9);
        let old = store.set_content(a, None);
        assert!(old.is_some());
        assert!(store.content::<Tally>(a).is_none());
    }
}
