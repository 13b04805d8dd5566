//! Crate-internal prelude.

pub(crate) type Result<T> = std::result::Result<T, crate::errors::Error>;
