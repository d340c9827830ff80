//! Extraction and fitting of luminescence signals from time drives.
//!
//! A time drive is read into a [Trace], flash onsets are located by an
//! [OnsetDetector](detectors::OnsetDetector), the ambient level is removed and the
//! trace is cut into [Signal]s. Signals are gathered into a [SignalGroup], fitted
//! to decay models by the [CurveFitEngine] and saved or exported:
//! ```rust,no_run
//! # use signal_analysis::{ParseSettings, TraceStore};
//! # use std::path::Path;
//! let mut store = TraceStore::new(ParseSettings::default());
//! let name = store.load(Path::new("flash.td")).unwrap();
//! let diagnostics = store.update_signals(&name).unwrap();
//! ```
pub mod background;
pub mod datatype;
pub mod detectors;
mod diagnostic;
pub mod expression;
pub mod fitting;
pub mod formats;
pub mod group;
pub mod initializer;
pub mod segmentation;
pub mod settings;
pub mod signal;
pub mod store;
pub(crate) mod window;

pub use background::{Background, BackgroundSource};
pub use datatype::{Sample, Trace};
pub use diagnostic::Diagnostic;
pub use expression::ModelFunction;
pub use fitting::{BuiltinModel, CurveFitEngine, FitError, FitRequest, FitResult};
pub use formats::{FormatError, FormatResult, csv_export::ExportSelection};
pub use group::{GroupError, SignalGroup};
pub use segmentation::{Extraction, extract_signals};
pub use settings::{BackgroundBounds, BackgroundPreset, ParseSettings};
pub use signal::{Datatype, Signal};
pub use store::{StoreError, TraceStore};
