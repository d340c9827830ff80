pub mod tracer;

pub use tracer::{LogFormat, TracerEngine, TracerOptions};

/// Scalar type used for all times, intensities and fit parameters.
pub type Real = f64;
/// Time of a sample, in seconds.
pub type Time = Real;
/// Light intensity of a sample, in relative light units (RLU).
pub type Intensity = Real;
/// Position of a sample within its trace.
pub type SampleIndex = usize;

/// Extension of time drive files recognised when scanning a directory.
pub const TIME_DRIVE_EXTENSION: &str = "td";
/// Extension appended to the filename of a saved signal group.
pub const SIGNAL_GROUP_EXTENSION: &str = "parsed";
