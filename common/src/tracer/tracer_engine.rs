use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt};

/// Output layout of the stderr tracer.
#[derive(Default, Debug, Clone, Copy, PartialEq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
}

#[derive(Default, Debug, Clone)]
pub struct TracerOptions {
    /// Level used when `RUST_LOG` is not set.
    pub default_level: Option<LevelFilter>,
    pub format: LogFormat,
}

impl TracerOptions {
    pub fn new(default_level: Option<LevelFilter>, format: LogFormat) -> Self {
        Self {
            default_level,
            format,
        }
    }
}

/// This object initialises the stderr tracer, given a TracerOptions struct.
pub struct TracerEngine {
    service_name: String,
}

impl TracerEngine {
    /// Initialises the stderr tracer for the binary
    /// #Arguments
    /// * `options` - The caller-specified instance of TracerOptions.
    /// * `service_name` - The name of the binary, recorded on the engine.
    /// #Returns
    /// An instance of TracerEngine
    pub fn new(options: TracerOptions, service_name: &str) -> Self {
        // This filter is applied to the stderr tracer
        let log_filter = EnvFilter::builder()
            .with_default_directive(options.default_level.unwrap_or(LevelFilter::INFO).into())
            .from_env_lossy();

        let stderr_tracer = match options.format {
            LogFormat::Full => tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .boxed(),
            LogFormat::Compact => tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr)
                .boxed(),
        };

        let subscriber =
            tracing_subscriber::Registry::default().with(stderr_tracer.with_filter(log_filter));

        // A second initialisation (e.g. from tests) leaves the first subscriber in place.
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            tracing::debug!("Global subscriber already set");
        }

        Self {
            service_name: service_name.to_owned(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}
