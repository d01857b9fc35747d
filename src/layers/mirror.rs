use std::collections::HashMap;

use crate::foundation::error::{LayerdocError, LayerdocResult};
use crate::layers::layer::{Layer, LayerFlags, LayerId, LayerKind, NewLayer, PixelBuffer};
use crate::layers::store::LayerStore;

/// Local layer store mirroring a subset of a document's layers for nested-canvas editing.
///
/// Layers are linked by handle in both directions, so renaming on either side never breaks the
/// pairing. Only non-group layers can be mirrored; the local store is flat.
#[derive(Clone, Debug)]
pub struct FocalMirror {
    local: LayerStore,
    to_source: HashMap<LayerId, LayerId>,
    to_local: HashMap<LayerId, LayerId>,
}

impl FocalMirror {
    /// Mirror `ids` (in source stacking order) into a fresh local store.
    pub fn open(source: &LayerStore, ids: &[LayerId]) -> LayerdocResult<Self> {
        if ids.is_empty() {
            return Err(LayerdocError::validation("focal mirror needs at least one layer"));
        }
        for &id in ids {
            if source.layer(id)?.kind() == LayerKind::Group {
                return Err(LayerdocError::validation(format!(
                    "group {id} cannot be mirrored"
                )));
            }
        }

        let mut out = Self {
            local: LayerStore::new(),
            to_source: HashMap::new(),
            to_local: HashMap::new(),
        };
        let mut prev = None;
        for layer in source.iter().filter(|l| ids.contains(&l.id())) {
            let local_id = out.local.create_layer_in(mirror_spec(layer), prev, None)?;
            out.to_source.insert(local_id, layer.id());
            out.to_local.insert(layer.id(), local_id);
            prev = Some(local_id);
        }
        Ok(out)
    }

    /// The local store.
    pub fn local(&self) -> &LayerStore {
        &self.local
    }

    /// Source handle paired with a local layer.
    pub fn source_of(&self, local: LayerId) -> Option<LayerId> {
        self.to_source.get(&local).copied()
    }

    /// Local handle paired with a source layer.
    pub fn local_of(&self, source: LayerId) -> Option<LayerId> {
        self.to_local.get(&source).copied()
    }

    /// Mutable pixels of a local raster layer.
    pub fn local_pixels_mut(&mut self, local: LayerId) -> Option<&mut PixelBuffer> {
        self.local.get_mut(local).and_then(Layer::pixels_mut)
    }

    /// Hide or show a layer on both sides.
    pub fn set_hidden(
        &mut self,
        source: &mut LayerStore,
        local: LayerId,
        hidden: bool,
    ) -> LayerdocResult<()> {
        let src = self.paired(local)?;
        self.local.layer_mut(local)?.flags.set(LayerFlags::HIDDEN, hidden);
        source.layer_mut(src)?.flags.set(LayerFlags::HIDDEN, hidden);
        Ok(())
    }

    /// Reorder a local layer and propagate the new relative order to the source.
    pub fn move_local(
        &mut self,
        source: &mut LayerStore,
        local: LayerId,
        new_prev: Option<LayerId>,
    ) -> LayerdocResult<()> {
        self.paired(local)?;
        self.local.change_order_in(local, new_prev, None)?;
        self.push_order(source)
    }

    /// Copy visibility and payload of every mirrored layer back to the source.
    pub fn push_to_source(&self, source: &mut LayerStore) -> LayerdocResult<()> {
        for layer in self.local.iter() {
            let src = self.paired(layer.id())?;
            let target = source.layer_mut(src)?;
            target
                .flags
                .set(LayerFlags::HIDDEN, layer.flags.contains(LayerFlags::HIDDEN));
            if target.content != layer.content {
                target.content = layer.content.clone();
                target.bounds.width = layer.bounds.width;
                target.bounds.height = layer.bounds.height;
                target.flags.insert(LayerFlags::MODIFIED);
            }
        }
        self.push_order(source)
    }

    /// Refresh visibility, payload and order of the local side from the source.
    pub fn pull_from_source(&mut self, source: &LayerStore) -> LayerdocResult<()> {
        let mut prev = None;
        for src in source.iter().filter(|l| self.to_local.contains_key(&l.id())) {
            let local = self.to_local[&src.id()];
            let target = self.local.layer_mut(local)?;
            target
                .flags
                .set(LayerFlags::HIDDEN, src.flags.contains(LayerFlags::HIDDEN));
            target.content = src.content.clone();
            target.bounds = src.bounds;
            if self.local.layer(local)?.below() != prev {
                self.local.change_order_in(local, prev, None)?;
            }
            prev = Some(local);
        }
        Ok(())
    }

    // Mirrored source layers end up contiguous, stacked above the lowest one, in local order.
    fn push_order(&self, source: &mut LayerStore) -> LayerdocResult<()> {
        let wanted: Vec<LayerId> = self
            .local
            .iter()
            .map(|l| self.paired(l.id()))
            .collect::<LayerdocResult<_>>()?;
        let current: Vec<LayerId> = source
            .iter()
            .map(Layer::id)
            .filter(|id| self.to_local.contains_key(id))
            .collect();
        if wanted == current {
            return Ok(());
        }
        let Some(&anchor) = current.first() else {
            return Ok(());
        };
        if wanted[0] != anchor {
            let below = source.layer(anchor)?.below();
            let parent = source.layer(anchor)?.parent();
            source.change_order_in(wanted[0], below, parent)?;
        }
        for pair in wanted.windows(2) {
            let parent = source.layer(pair[0])?.parent();
            if source.layer(pair[1])?.below() != Some(pair[0]) {
                source.change_order_in(pair[1], Some(pair[0]), parent)?;
            }
        }
        Ok(())
    }

    fn paired(&self, local: LayerId) -> LayerdocResult<LayerId> {
        self.source_of(local)
            .ok_or_else(|| LayerdocError::validation(format!("layer {local} is not mirrored")))
    }
}

fn mirror_spec(layer: &Layer) -> NewLayer {
    NewLayer {
        name: layer.name.clone(),
        content: layer.content.clone(),
        bounds: layer.bounds,
        blend: layer.blend,
        opacity: layer.opacity,
        flags: layer.flags,
        extras: layer.extras.to_vec(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/layers/mirror.rs"]
mod tests;
