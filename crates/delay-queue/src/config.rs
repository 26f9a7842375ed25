use crate::metrics::{MetricsConfig, DEFAULT_DURATION_BUCKETS, DEFAULT_METRICS_NAME};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Queue options that can be loaded from YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    pub dedupe: bool,
    pub poll_interval_ms: u64,
    pub metrics: MetricsSettings,
}

/// Serializable subset of [`MetricsConfig`]. Label extractors are code and
/// are added on the config directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub duration_buckets: Vec<f64>,
    pub disable: bool,
}

impl Default for QueueSettings {
    fn default() -> Self {
        QueueSettings {
            dedupe: false,
            poll_interval_ms: 100,
            metrics: MetricsSettings::default(),
        }
    }
}

impl Default for MetricsSettings {
    fn default() -> Self {
        MetricsSettings {
            name: DEFAULT_METRICS_NAME.to_string(),
            labels: BTreeMap::new(),
            duration_buckets: DEFAULT_DURATION_BUCKETS.to_vec(),
            disable: false,
        }
    }
}

impl QueueSettings {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> anyhow::Result<Self> {
        let settings: QueueSettings = serde_yaml::from_str(contents)?;
        Ok(settings)
    }
}

impl MetricsSettings {
    /// Overlay these settings on `config`; static labels are merged and
    /// labellers are left untouched.
    pub fn apply<T>(&self, mut config: MetricsConfig<T>) -> MetricsConfig<T> {
        config.name = self.name.clone();
        config
            .labels
            .extend(self.labels.iter().map(|(k, v)| (k.clone(), v.clone())));
        config.duration_buckets = self.duration_buckets.clone();
        config.disable = self.disable;
        config
    }

    pub fn to_metrics_config<T>(&self) -> MetricsConfig<T> {
        self.apply(MetricsConfig::new())
    }
}
