pub(crate) mod chunk;
pub(crate) mod document;
pub(crate) mod image;
pub(crate) mod layer;
pub(crate) mod stream;
pub(crate) mod wire;
