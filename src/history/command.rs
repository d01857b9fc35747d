//! Reversible edits recorded in the history log.
//!
//! Region patches, parameter changes and reorders are ping-pong commands: one handler swaps the
//! saved state with the live one and serves as both undo and redo. Creating and deleting a
//! layer are asymmetric; a removed layer is kept as an encoded layer record and rebuilt through
//! the same decode path a file load uses.

use crate::codec::layer::{EncodeOpts, RecordLimits, decode_record, encode_record};
use crate::foundation::config::PngCompression;
use crate::foundation::core::PixelRect;
use crate::foundation::error::{LayerdocError, LayerdocResult};
use crate::history::patch::RegionPatch;
use crate::layers::layer::{Layer, LayerId, LayerParams};
use crate::layers::store::{LayerStore, Placement};

const SNAPSHOT_OPTS: EncodeOpts = EncodeOpts {
    png: PngCompression::Fast,
    vector_level: 1,
};

/// An unlinked layer, encoded as a layer record, plus where it sat.
#[derive(Clone, Debug)]
pub struct LayerSnapshot {
    id: LayerId,
    record: Vec<u8>,
    placement: Placement,
    children: Vec<LayerId>,
}

impl LayerSnapshot {
    /// Encode a linked layer without touching the store.
    pub fn capture(layers: &LayerStore, id: LayerId) -> LayerdocResult<Self> {
        let layer = layers.layer(id)?;
        let depth = u16::try_from(layers.depth(id))
            .map_err(|_| LayerdocError::validation("group nesting too deep to store"))?;
        Ok(Self {
            id,
            record: encode_record(layer, depth, SNAPSHOT_OPTS)?,
            placement: layers.placement(id)?,
            children: layers.children(id),
        })
    }

    /// Handle the layer had and gets back.
    pub fn id(&self) -> LayerId {
        self.id
    }

    /// Encoded size.
    pub fn byte_len(&self) -> usize {
        self.record.len()
    }

    fn remove(layers: &mut LayerStore, id: LayerId) -> LayerdocResult<Self> {
        let snapshot = Self::capture(layers, id)?;
        layers.delete_layer(id)?;
        Ok(snapshot)
    }

    fn restore(&self, layers: &mut LayerStore) -> LayerdocResult<PixelRect> {
        let decoded = decode_record(&self.record, RecordLimits::trusted())?;
        let layer = Layer::from_new(self.id, decoded.into_new_layer())?;
        let bounds = layer.bounds();
        layers.restore(layer, &self.placement, &self.children)?;
        Ok(bounds)
    }
}

/// A recorded, reversible edit.
#[derive(Clone, Debug)]
pub enum Command {
    /// Pixels of one rectangle of a raster layer.
    RegionPatch(RegionPatch),
    /// A layer was created. Holds the removed layer while the creation is undone.
    CreateLayer {
        /// Created layer.
        layer: LayerId,
        /// Filled while the creation is undone.
        removed: Option<LayerSnapshot>,
    },
    /// A layer was deleted. Holds the removed layer while the deletion is in effect.
    DeleteLayer {
        /// Deleted layer.
        layer: LayerId,
        /// Filled while the deletion is in effect.
        removed: Option<LayerSnapshot>,
    },
    /// Name, blend, opacity, flags or position changed; holds the other set of values.
    ParameterChange {
        /// Changed layer.
        layer: LayerId,
        /// Values to swap back in.
        params: LayerParams,
    },
    /// A layer (with its descendants) moved; holds the other placement.
    Reorder {
        /// Moved layer.
        layer: LayerId,
        /// Placement to swap back in.
        placement: Placement,
    },
}

impl Command {
    /// Record the creation of a linked layer.
    pub fn created(layer: LayerId) -> Self {
        Command::CreateLayer {
            layer,
            removed: None,
        }
    }

    /// Delete `id` from the store and record the deletion.
    pub fn delete(layers: &mut LayerStore, id: LayerId) -> LayerdocResult<Self> {
        Ok(Command::DeleteLayer {
            layer: id,
            removed: Some(LayerSnapshot::remove(layers, id)?),
        })
    }

    /// Layer the command touches.
    pub fn layer(&self) -> LayerId {
        match self {
            Command::RegionPatch(p) => p.layer(),
            Command::CreateLayer { layer, .. }
            | Command::DeleteLayer { layer, .. }
            | Command::ParameterChange { layer, .. }
            | Command::Reorder { layer, .. } => *layer,
        }
    }

    /// Revert the edit; returns the damaged canvas rectangle.
    pub fn undo(&mut self, layers: &mut LayerStore) -> LayerdocResult<Option<PixelRect>> {
        match self {
            Command::CreateLayer { layer, removed } => {
                let bounds = layers.layer(*layer)?.bounds();
                *removed = Some(LayerSnapshot::remove(layers, *layer)?);
                Ok(Some(bounds))
            }
            Command::DeleteLayer { removed, .. } => restore(layers, removed),
            _ => self.swap(layers),
        }
    }

    /// Re-apply the edit; returns the damaged canvas rectangle.
    pub fn redo(&mut self, layers: &mut LayerStore) -> LayerdocResult<Option<PixelRect>> {
        match self {
            Command::CreateLayer { removed, .. } => restore(layers, removed),
            Command::DeleteLayer { layer, removed } => {
                let bounds = layers.layer(*layer)?.bounds();
                *removed = Some(LayerSnapshot::remove(layers, *layer)?);
                Ok(Some(bounds))
            }
            _ => self.swap(layers),
        }
    }

    fn swap(&mut self, layers: &mut LayerStore) -> LayerdocResult<Option<PixelRect>> {
        match self {
            Command::RegionPatch(patch) => {
                let layer = layers.layer_mut(patch.layer())?;
                let bounds = layer.bounds();
                let px = layer.pixels_mut().ok_or_else(|| {
                    LayerdocError::validation(format!("layer {} has no pixels", patch.layer()))
                })?;
                patch.swap(px)?;
                Ok(Some(patch.rect().translate(bounds.x, bounds.y)))
            }
            Command::ParameterChange { layer, params } => {
                let before = layers.layer(*layer)?.bounds();
                let old = layers.set_params(*layer, params.clone())?;
                let after = layers.layer(*layer)?.bounds();
                *params = old;
                Ok(Some(before.union(after)))
            }
            Command::Reorder { layer, placement } => {
                let current = layers.placement(*layer)?;
                layers.change_order_in(*layer, placement.below, placement.parent)?;
                *placement = current;
                Ok(Some(layers.layer(*layer)?.bounds()))
            }
            Command::CreateLayer { .. } | Command::DeleteLayer { .. } => Ok(None),
        }
    }
}

fn restore(
    layers: &mut LayerStore,
    removed: &mut Option<LayerSnapshot>,
) -> LayerdocResult<Option<PixelRect>> {
    let snapshot = removed
        .as_ref()
        .ok_or_else(|| LayerdocError::validation("no removed layer to restore"))?;
    let bounds = snapshot.restore(layers)?;
    *removed = None;
    Ok(Some(bounds))
}

#[cfg(test)]
#[path = "../../tests/unit/history/command.rs"]
mod tests;
