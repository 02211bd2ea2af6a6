//! Logger builder implementation

use parking_lot::Mutex;
use std::sync::Arc;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config::{Config, Format, WriterConfig};
use crate::error::{LogError, LogResult};

type FilterLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;
type FilteredRegistry = Layered<FilterLayer, Registry>;

/// Logger builder
#[derive(Debug)]
pub struct LoggerBuilder {
    config: Config,
}

/// Guard that keeps the logger alive
#[derive(Debug)]
pub struct LoggerGuard {
    reload_handle: Option<ReloadHandle>,
}

impl LoggerGuard {
    pub(crate) fn noop() -> Self {
        Self {
            reload_handle: None,
        }
    }

    /// Handle for changing the filter at runtime (only when `reloadable` was set)
    pub fn reload_handle(&self) -> Option<&ReloadHandle> {
        self.reload_handle.as_ref()
    }
}

/// Handle for runtime filter changes
#[derive(Clone)]
pub struct ReloadHandle {
    filter: tracing_subscriber::reload::Handle<EnvFilter, Registry>,
    current_filter: Arc<Mutex<String>>,
}

impl std::fmt::Debug for ReloadHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadHandle")
            .field("current_filter", &*self.current_filter.lock())
            .finish()
    }
}

impl ReloadHandle {
    /// Reload the log filter at runtime
    pub fn reload(&self, filter: &str) -> LogResult<()> {
        let new_filter =
            EnvFilter::try_new(filter).map_err(|e| LogError::filter(filter, e.to_string()))?;
        self.filter
            .reload(new_filter)
            .map_err(|e| LogError::Reload(e.to_string()))?;
        *self.current_filter.lock() = filter.to_string();
        Ok(())
    }

    /// Get the current filter string
    pub fn current_filter(&self) -> String {
        self.current_filter.lock().clone()
    }
}

impl LoggerBuilder {
    /// Create builder from config
    #[must_use]
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Build and install the global subscriber
    pub fn build(self) -> LogResult<LoggerGuard> {
        let config = self.config;
        let filter = EnvFilter::try_new(&config.level)
            .map_err(|e| LogError::filter(&config.level, e.to_string()))?;

        let (filter_layer, reload_handle) = if config.reloadable {
            let (layer, handle) = tracing_subscriber::reload::Layer::new(filter);
            let handle = ReloadHandle {
                filter: handle,
                current_filter: Arc::new(Mutex::new(config.level.clone())),
            };
            (Box::new(layer) as FilterLayer, Some(handle))
        } else {
            (Box::new(filter) as FilterLayer, None)
        };

        let display = &config.display;
        match config.format {
            Format::Pretty => {
                let layer = tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(make_writer(config.writer))
                    .with_ansi(display.colors)
                    .with_target(display.target)
                    .with_file(display.source)
                    .with_line_number(display.source);
                install(filter_layer, layer)?;
            }
            Format::Compact => {
                let layer = tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(make_writer(config.writer))
                    .with_ansi(display.colors)
                    .with_target(display.target)
                    .with_file(display.source)
                    .with_line_number(display.source);
                install(filter_layer, layer)?;
            }
            Format::Json => {
                let layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(make_writer(config.writer))
                    .with_current_span(true)
                    .with_span_list(display.span_list)
                    .flatten_event(display.flatten)
                    .with_target(display.target)
                    .with_file(display.source)
                    .with_line_number(display.source);
                install(filter_layer, layer)?;
            }
        }

        Ok(LoggerGuard { reload_handle })
    }
}

fn make_writer(config: WriterConfig) -> BoxMakeWriter {
    match config {
        WriterConfig::Stderr => BoxMakeWriter::new(std::io::stderr),
        WriterConfig::Stdout => BoxMakeWriter::new(std::io::stdout),
    }
}

fn install<L>(filter: FilterLayer, layer: L) -> LogResult<()>
where
    L: Layer<FilteredRegistry> + Send + Sync + 'static,
{
    Registry::default()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|e| LogError::AlreadyInitialized(e.to_string()))
}
