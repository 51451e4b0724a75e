//! Export of scheduled work for printing and hand-off.

mod task_sheet;

pub use task_sheet::*;
