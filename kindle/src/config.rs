//! Build-time configuration and startup parameters.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// What the runtime does with an action failure after the plugin's
/// `on_error` hook has seen it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Swallow the error and keep running.
    #[default]
    Ignore,
    /// Log a warning and keep running.
    LogAndContinue,
    /// Stop the stage's run loop and shut the pipeline down.
    Escalate,
}

/// Which stages observe the shutdown signal directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShutdownPolicy {
    /// Only the loader is cancelled. Each stage cancels its downstream
    /// neighbour once it has stopped, so the processor and distributor
    /// shut down when their input queue is closed.
    #[default]
    LoaderOnly,
    /// Every stage is cancelled at once and drains its input until the
    /// upstream stage closes it.
    AllStages,
}

/// Configuration for a pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Bound of the loader → processor queue (0 = unbounded)
    pub processor_queue_bound: usize,
    /// Bound of the processor → distributor queue (0 = unbounded)
    pub distributor_queue_bound: usize,
    pub shutdown_policy: ShutdownPolicy,
    pub error_policy: ErrorPolicy,
    /// Pause applied when a stage finds nothing to do
    pub idle_pause: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            processor_queue_bound: 0,
            distributor_queue_bound: 0,
            shutdown_policy: ShutdownPolicy::LoaderOnly,
            error_policy: ErrorPolicy::Ignore,
            idle_pause: Duration::from_millis(10),
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub const fn with_processor_queue_bound(mut self, bound: usize) -> Self {
        self.processor_queue_bound = bound;
        self
    }

    #[must_use]
    pub const fn with_distributor_queue_bound(mut self, bound: usize) -> Self {
        self.distributor_queue_bound = bound;
        self
    }

    #[must_use]
    pub const fn with_shutdown_policy(mut self, policy: ShutdownPolicy) -> Self {
        self.shutdown_policy = policy;
        self
    }

    #[must_use]
    pub const fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    #[must_use]
    pub const fn with_idle_pause(mut self, pause: Duration) -> Self {
        self.idle_pause = pause;
        self
    }
}

/// Key/value settings handed to every stage's `startup` hook.
///
/// Cloning is cheap; all stages share the same map.
#[derive(Debug, Clone, Default)]
pub struct StartupParameters {
    values: Arc<HashMap<String, String>>,
}

impl StartupParameters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a setting. Later values for the same key win.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.values).insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Parse a setting; `None` if it is missing or does not parse.
    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|raw| raw.trim().parse().ok())
    }

    /// Split a comma-separated setting, skipping empty entries.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|entry| !entry.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for StartupParameters
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: Arc::new(
                iter.into_iter()
                    .map(|(key, value)| (key.into(), value.into()))
                    .collect(),
            ),
        }
    }
}
