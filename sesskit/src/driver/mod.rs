pub(crate) mod kv;
pub(crate) mod memory;
pub(crate) mod sql;
