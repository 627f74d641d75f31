mod format;
mod partition_bounds;

pub use format::*;
pub use partition_bounds::*;
