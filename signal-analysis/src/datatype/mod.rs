pub(crate) mod sample;
pub(crate) mod trace;

pub use sample::{Sample, TracePoint, get_highest, get_xy};
pub use trace::{Trace, TraceError};
