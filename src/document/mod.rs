pub(crate) mod autosave;
pub(crate) mod canvas;
pub(crate) mod document;
pub(crate) mod observer;
