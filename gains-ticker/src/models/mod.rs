pub(crate) mod account;
pub(crate) mod event;
pub(crate) mod money;
pub(crate) mod settings;
pub(crate) mod summary;
