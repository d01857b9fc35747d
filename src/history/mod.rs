pub(crate) mod command;
pub(crate) mod log;
pub(crate) mod patch;
