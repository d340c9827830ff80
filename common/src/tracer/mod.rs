mod tracer_engine;

pub use tracer_engine::{LogFormat, TracerEngine, TracerOptions};

/// Should be called at the start of each binary.
/// Installs the stderr subscriber and emits a startup event from the calling module.
#[macro_export]
macro_rules! init_tracer {
    ($options:expr) => {{
        let tracer = TracerEngine::new($options, env!("CARGO_BIN_NAME"));
        tracing::debug!(module = module_path!(), "Tracer initialised");
        tracer
    }};
}
