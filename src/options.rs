use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};
use crate::metrics::KernelMetrics;
use crate::schema::ConstraintValidator;

/// How a transaction keeps its mutation log.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TxStateMode {
    /// One log; every read sees the latest writes.
    #[default]
    Single,
    /// A stable generation frozen by `mark_as_stable` next to the active one.
    TwoLayer,
}

/// Configuration options supplied when opening a [`crate::Kernel`].
#[derive(Clone)]
pub struct KernelOptions {
    /// Relationship count at which a node switches to per-type groups.
    pub dense_node_threshold: usize,
    /// Batch size used by `Scan::reserve_next`.
    pub parallel_batch_size: usize,
    /// Mode for transactions begun without an explicit one.
    pub tx_state_mode: TxStateMode,
    /// Optional metrics collection implementation.
    pub metrics: Option<Arc<dyn KernelMetrics>>,
    /// Optional constraint validator consulted on label and property writes.
    pub constraint_validator: Option<Arc<dyn ConstraintValidator>>,
}

impl Default for KernelOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl KernelOptions {
    /// Creates options with default settings.
    pub fn new() -> Self {
        Self {
            dense_node_threshold: 50,
            parallel_batch_size: 1_000,
            tx_state_mode: TxStateMode::Single,
            metrics: None,
            constraint_validator: None,
        }
    }

    /// Sets the dense node threshold (minimum 1).
    pub fn dense_node_threshold(mut self, threshold: usize) -> Self {
        self.dense_node_threshold = threshold.max(1);
        self
    }

    /// Sets the default parallel scan batch size (minimum 1).
    pub fn parallel_batch_size(mut self, size: usize) -> Self {
        self.parallel_batch_size = size.max(1);
        self
    }

    /// Sets the default transaction state mode.
    pub fn tx_state_mode(mut self, mode: TxStateMode) -> Self {
        self.tx_state_mode = mode;
        self
    }

    /// Sets the metrics collection implementation.
    pub fn metrics(mut self, metrics: Arc<dyn KernelMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Sets the constraint validator.
    pub fn constraint_validator(mut self, validator: Arc<dyn ConstraintValidator>) -> Self {
        self.constraint_validator = Some(validator);
        self
    }

    /// Applies settings from a TOML document on top of the defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: KernelConfigFile = toml::from_str(contents)
            .map_err(|err| KernelError::InvalidArgument(format!("kernel config: {err}")))?;
        Ok(file.apply(Self::new()))
    }

    /// Reads and applies a TOML config file.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|err| {
            KernelError::InvalidArgument(format!("kernel config {}: {err}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }
}

impl std::fmt::Debug for KernelOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelOptions")
            .field("dense_node_threshold", &self.dense_node_threshold)
            .field("parallel_batch_size", &self.parallel_batch_size)
            .field("tx_state_mode", &self.tx_state_mode)
            .field("metrics", &self.metrics.is_some())
            .field("constraint_validator", &self.constraint_validator.is_some())
            .finish()
    }
}

/// On-disk shape of the kernel config file.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct KernelConfigFile {
    /// See [`KernelOptions::dense_node_threshold`].
    pub dense_node_threshold: Option<usize>,
    /// See [`KernelOptions::parallel_batch_size`].
    pub parallel_batch_size: Option<usize>,
    /// See [`KernelOptions::tx_state_mode`].
    pub tx_state_mode: Option<TxStateMode>,
}

impl KernelConfigFile {
    fn apply(self, mut options: KernelOptions) -> KernelOptions {
        if let Some(threshold) = self.dense_node_threshold {
            options = options.dense_node_threshold(threshold);
        }
        if let Some(size) = self.parallel_batch_size {
            options = options.parallel_batch_size(size);
        }
        if let Some(mode) = self.tx_state_mode {
            options = options.tx_state_mode(mode);
        }
        options
    }
}
