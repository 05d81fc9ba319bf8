mod filesystem;
mod platform;

pub(crate) use filesystem::*;
pub(crate) use platform::*;
