pub(crate) mod layer;
pub(crate) mod mirror;
pub(crate) mod store;
