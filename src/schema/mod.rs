//! Schema names, the strict variant and the per-run schema cache.
mod cache;
mod names;
mod strict;

pub use cache::{SchemaCache, SchemaError, SchemaKey};
pub use names::{ReferenceRole, SchemaName};
pub use strict::apply_strict;
