mod bindings;
mod platform;

pub(crate) use bindings::*;
pub(crate) use platform::*;

/// Windows never exposes more than 64 processors in a single processor group.
pub(crate) const PROCESSORS_PER_GROUP: u32 = 64;
