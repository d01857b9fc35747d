use crate::foundation::error::{LayerdocError, LayerdocResult};
use crate::layers::layer::{Layer, LayerId, LayerKind, LayerParams, NewLayer};

/// Where a removed layer sat, enough to put it back exactly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placement {
    /// Layer directly below.
    pub below: Option<LayerId>,
    /// Enclosing group.
    pub parent: Option<LayerId>,
}

/// Ordered, hierarchical arena of layers.
///
/// Layers form a single bottom-to-top list. A group node is followed directly by the contiguous
/// block of its descendants; `parent` handles record membership. Handles are never reused, so a
/// slot freed by a delete stays empty until the same layer is restored into it.
#[derive(Clone, Debug, Default)]
pub struct LayerStore {
    slots: Vec<Option<Layer>>,
    bottom: Option<LayerId>,
    top: Option<LayerId>,
    len: usize,
}

impl LayerStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of linked layers.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Return `true` when no layer is linked.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bottom-most layer.
    pub fn bottom(&self) -> Option<LayerId> {
        self.bottom
    }

    /// Top-most layer.
    pub fn top(&self) -> Option<LayerId> {
        self.top
    }

    /// Borrow a layer.
    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.slots.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.slots.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    /// Borrow a layer or fail with a validation error.
    pub fn layer(&self, id: LayerId) -> LayerdocResult<&Layer> {
        self.get(id)
            .ok_or_else(|| LayerdocError::validation(format!("no layer {id}")))
    }

    pub(crate) fn layer_mut(&mut self, id: LayerId) -> LayerdocResult<&mut Layer> {
        self.get_mut(id)
            .ok_or_else(|| LayerdocError::validation(format!("no layer {id}")))
    }

    /// Return `true` when `id` is linked.
    pub fn contains(&self, id: LayerId) -> bool {
        self.get(id).is_some()
    }

    /// Layers bottom-to-top.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            store: self,
            next: self.bottom,
            remaining: self.len,
        }
    }

    /// Handles bottom-to-top.
    pub fn ids(&self) -> Vec<LayerId> {
        self.iter().map(Layer::id).collect()
    }

    /// First layer with this display name.
    pub fn search_by_name(&self, name: &str) -> Option<LayerId> {
        self.iter().find(|l| l.name == name).map(Layer::id)
    }

    /// Number of enclosing groups.
    pub fn depth(&self, id: LayerId) -> usize {
        let mut depth = 0;
        let mut cur = self.get(id).and_then(|l| l.parent);
        while let Some(p) = cur {
            depth += 1;
            if depth > self.len {
                break;
            }
            cur = self.get(p).and_then(|l| l.parent);
        }
        depth
    }

    /// Return `true` when `ancestor` encloses `id` (directly or transitively).
    pub fn is_ancestor(&self, ancestor: LayerId, id: LayerId) -> bool {
        let mut cur = self.get(id).and_then(|l| l.parent);
        let mut steps = 0;
        while let Some(p) = cur {
            if p == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.len {
                break;
            }
            cur = self.get(p).and_then(|l| l.parent);
        }
        false
    }

    /// Direct children of a group, bottom-to-top.
    pub fn children(&self, group: LayerId) -> Vec<LayerId> {
        self.iter()
            .filter(|l| l.parent == Some(group))
            .map(Layer::id)
            .collect()
    }

    /// Last layer of the block made of `id` and its descendants.
    pub fn block_end(&self, id: LayerId) -> LayerId {
        let mut end = id;
        while let Some(next) = self.get(end).and_then(|l| l.above) {
            if !self.is_ancestor(id, next) {
                break;
            }
            end = next;
        }
        end
    }

    /// Current placement of a layer.
    pub fn placement(&self, id: LayerId) -> LayerdocResult<Placement> {
        let l = self.layer(id)?;
        Ok(Placement {
            below: l.below,
            parent: l.parent,
        })
    }

    /// Group a layer placed directly above `prev` joins by default.
    ///
    /// Above a group header the new layer goes inside that group; otherwise it shares the
    /// group of `prev`.
    pub fn inherited_parent(&self, prev: Option<LayerId>) -> Option<LayerId> {
        let prev = prev.and_then(|p| self.get(p))?;
        if prev.kind() == LayerKind::Group {
            Some(prev.id)
        } else {
            prev.parent
        }
    }

    /// Display name not used by any layer, derived from `base`.
    pub fn unique_name(&self, base: &str) -> String {
        if self.search_by_name(base).is_none() {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{base} ({n})"))
            .find(|candidate| self.search_by_name(candidate).is_none())
            .unwrap_or_else(|| base.to_string())
    }

    /// Insert a layer above `prev` (or at the bottom), inheriting group membership from `prev`.
    pub fn create_layer(&mut self, spec: NewLayer, prev: Option<LayerId>) -> LayerdocResult<LayerId> {
        let parent = self.inherited_parent(prev);
        self.create_layer_in(spec, prev, parent)
    }

    /// Insert a layer above `prev` with an explicit enclosing group.
    pub fn create_layer_in(
        &mut self,
        spec: NewLayer,
        prev: Option<LayerId>,
        parent: Option<LayerId>,
    ) -> LayerdocResult<LayerId> {
        if self.search_by_name(&spec.name).is_some() {
            return Err(LayerdocError::validation(format!(
                "layer name '{}' already exists",
                spec.name
            )));
        }
        if let Some(p) = prev {
            self.layer(p)?;
        }
        let next = self.next_after(prev);
        self.check_placement(prev, next, parent)?;

        let id = LayerId(
            u32::try_from(self.slots.len())
                .map_err(|_| LayerdocError::validation("layer handle overflow"))?,
        );
        let mut layer = Layer::from_new(id, spec)?;
        layer.parent = parent;
        self.slots.push(Some(layer));
        self.link_after(id, id, prev);
        self.len += 1;
        Ok(id)
    }

    /// Put a previously removed layer back into its own slot.
    ///
    /// `children` are re-attached to a restored group.
    pub(crate) fn restore(
        &mut self,
        mut layer: Layer,
        placement: &Placement,
        children: &[LayerId],
    ) -> LayerdocResult<()> {
        let id = layer.id;
        if self.contains(id) {
            return Err(LayerdocError::validation(format!("layer {id} is already linked")));
        }
        if self.search_by_name(&layer.name).is_some() {
            return Err(LayerdocError::validation(format!(
                "layer name '{}' already exists",
                layer.name
            )));
        }
        if let Some(p) = placement.below {
            self.layer(p)?;
        }
        let idx = id.0 as usize;
        if idx >= self.slots.len() {
            self.slots.resize_with(idx + 1, || None);
        }
        layer.parent = placement.parent;
        self.slots[idx] = Some(layer);
        self.link_after(id, id, placement.below);
        self.len += 1;
        for &child in children {
            if let Some(c) = self.get_mut(child) {
                c.parent = Some(id);
            }
        }
        Ok(())
    }

    /// Unlink and return a layer.
    ///
    /// A deleted group's children move to the group's own parent. The last remaining layer
    /// cannot be deleted.
    pub fn delete_layer(&mut self, id: LayerId) -> LayerdocResult<Layer> {
        let parent = self.layer(id)?.parent;
        if self.len <= 1 {
            return Err(LayerdocError::validation(
                "cannot delete the last remaining layer",
            ));
        }
        for child in self.children(id) {
            if let Some(c) = self.get_mut(child) {
                c.parent = parent;
            }
        }
        self.unlink(id, id);
        self.len -= 1;
        let mut layer = self.slots[id.0 as usize]
            .take()
            .ok_or_else(|| LayerdocError::validation(format!("no layer {id}")))?;
        layer.below = None;
        layer.above = None;
        Ok(layer)
    }

    /// Move a layer (with its descendants) directly above `new_prev`, inheriting membership.
    pub fn change_order(&mut self, id: LayerId, new_prev: Option<LayerId>) -> LayerdocResult<()> {
        let parent = self.inherited_parent(new_prev);
        self.change_order_in(id, new_prev, parent)
    }

    /// Move a layer (with its descendants) directly above `new_prev` into `parent`.
    pub fn change_order_in(
        &mut self,
        id: LayerId,
        new_prev: Option<LayerId>,
        parent: Option<LayerId>,
    ) -> LayerdocResult<()> {
        let old = self.placement(id)?;
        let end = self.block_end(id);
        if let Some(p) = new_prev {
            self.layer(p)?;
            if p == id || self.is_ancestor(id, p) {
                return Err(LayerdocError::validation(format!(
                    "cannot move layer {id} above itself or its own descendant"
                )));
            }
        }
        if parent == Some(id) {
            return Err(LayerdocError::validation("a layer cannot be its own parent"));
        }

        self.unlink(id, end);
        let next = self.next_after(new_prev);
        if let Err(e) = self.check_placement(new_prev, next, parent) {
            self.link_after(id, end, old.below);
            return Err(e);
        }
        self.link_after(id, end, new_prev);
        if let Some(l) = self.get_mut(id) {
            l.parent = parent;
        }
        Ok(())
    }

    /// Rename a layer, keeping names unique.
    pub fn rename(&mut self, id: LayerId, name: impl Into<String>) -> LayerdocResult<String> {
        let mut params = self.layer(id)?.params();
        let old = std::mem::replace(&mut params.name, name.into());
        self.set_params(id, params)?;
        Ok(old)
    }

    /// Replace the undoable parameters of a layer, returning the previous ones.
    pub fn set_params(&mut self, id: LayerId, params: LayerParams) -> LayerdocResult<LayerParams> {
        if params.name.is_empty() {
            return Err(LayerdocError::validation("layer name must not be empty"));
        }
        if params.opacity > 100 {
            return Err(LayerdocError::validation(format!(
                "opacity must be 0..=100, got {}",
                params.opacity
            )));
        }
        if let Some(other) = self.search_by_name(&params.name)
            && other != id
        {
            return Err(LayerdocError::validation(format!(
                "layer name '{}' already exists",
                params.name
            )));
        }
        let layer = self.layer_mut(id)?;
        let old = layer.params();
        layer.apply_params(params);
        Ok(old)
    }

    /// Check every structural invariant; used by tests and after loads.
    pub fn validate(&self) -> LayerdocResult<()> {
        let mut count = 0;
        let mut prev: Option<LayerId> = None;
        let mut cur = self.bottom;
        while let Some(id) = cur {
            let l = self.layer(id)?;
            if l.below != prev {
                return Err(LayerdocError::validation(format!("broken below link at {id}")));
            }
            if let Some(p) = l.parent {
                let pl = self.layer(p)?;
                if pl.kind() != LayerKind::Group {
                    return Err(LayerdocError::validation(format!(
                        "parent of {id} is not a group"
                    )));
                }
            }
            if !self.parent_in_chain(prev, l.parent) {
                return Err(LayerdocError::validation(format!(
                    "layer {id} breaks the contiguous block of its group"
                )));
            }
            count += 1;
            if count > self.slots.len() {
                return Err(LayerdocError::validation("layer list has a cycle"));
            }
            prev = Some(id);
            cur = l.above;
        }
        if prev != self.top {
            return Err(LayerdocError::validation("top link does not match the list"));
        }
        if count != self.len {
            return Err(LayerdocError::validation(format!(
                "layer count {} does not match {count} linked layers",
                self.len
            )));
        }
        Ok(())
    }

    fn next_after(&self, prev: Option<LayerId>) -> Option<LayerId> {
        match prev {
            Some(p) => self.get(p).and_then(|l| l.above),
            None => self.bottom,
        }
    }

    // `parent` must be `prev` itself (when a group), an ancestor of `prev`, or top level.
    fn parent_in_chain(&self, prev: Option<LayerId>, parent: Option<LayerId>) -> bool {
        let Some(parent) = parent else {
            return true;
        };
        let Some(prev) = prev else {
            return false;
        };
        let prev_is_group = self.get(prev).is_some_and(|l| l.kind() == LayerKind::Group);
        (prev == parent && prev_is_group) || self.is_ancestor(parent, prev)
    }

    fn check_placement(
        &self,
        prev: Option<LayerId>,
        next: Option<LayerId>,
        parent: Option<LayerId>,
    ) -> LayerdocResult<()> {
        if let Some(p) = parent
            && self.layer(p)?.kind() != LayerKind::Group
        {
            return Err(LayerdocError::validation(format!("layer {p} is not a group")));
        }
        if !self.parent_in_chain(prev, parent) {
            return Err(LayerdocError::validation(
                "parent group must enclose the previous neighbor",
            ));
        }
        // The layer that ends up above must still sit inside its own group's block.
        if let Some(next_parent) = next.and_then(|n| self.get(n)).and_then(|l| l.parent) {
            let ok = parent == Some(next_parent)
                || parent.is_some_and(|p| self.is_ancestor(next_parent, p));
            if !ok {
                return Err(LayerdocError::validation(
                    "insertion would split the block of an enclosing group",
                ));
            }
        }
        Ok(())
    }

    // Link the already-chained block `first..=last` directly above `prev`.
    fn link_after(&mut self, first: LayerId, last: LayerId, prev: Option<LayerId>) {
        let next = self.next_after(prev);
        if let Some(l) = self.get_mut(first) {
            l.below = prev;
        }
        if let Some(l) = self.get_mut(last) {
            l.above = next;
        }
        match prev {
            Some(p) => {
                if let Some(l) = self.get_mut(p) {
                    l.above = Some(first);
                }
            }
            None => self.bottom = Some(first),
        }
        match next {
            Some(n) => {
                if let Some(l) = self.get_mut(n) {
                    l.below = Some(last);
                }
            }
            None => self.top = Some(last),
        }
    }

    // Detach the block `first..=last`, keeping its internal links.
    fn unlink(&mut self, first: LayerId, last: LayerId) {
        let below = self.get(first).and_then(|l| l.below);
        let above = self.get(last).and_then(|l| l.above);
        match below {
            Some(b) => {
                if let Some(l) = self.get_mut(b) {
                    l.above = above;
                }
            }
            None => self.bottom = above,
        }
        match above {
            Some(a) => {
                if let Some(l) = self.get_mut(a) {
                    l.below = below;
                }
            }
            None => self.top = below,
        }
        if let Some(l) = self.get_mut(first) {
            l.below = None;
        }
        if let Some(l) = self.get_mut(last) {
            l.above = None;
        }
    }
}

/// Bottom-to-top iterator over a [`LayerStore`].
#[derive(Debug)]
pub struct Iter<'a> {
    store: &'a LayerStore,
    next: Option<LayerId>,
    remaining: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Layer;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let layer = self.store.get(self.next?)?;
        self.remaining -= 1;
        self.next = layer.above;
        Some(layer)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/layers/store.rs"]
mod tests;
