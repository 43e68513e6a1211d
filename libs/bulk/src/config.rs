use serde::Deserialize;

use crate::error::GenerateError;

fn default_count() -> usize {
    200
}
fn default_max_count() -> usize {
    100_000
}
fn default_chunk_size() -> usize {
    256
}
fn default_prefix() -> String {
    "123456789".into()
}
fn default_suffix_range() -> u32 {
    1000
}

/// `[generator]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    /// Count used by callers when the request carries no usable count.
    #[serde(default = "default_count")]
    pub default_count: usize,
    /// Upper bound on a single request.
    #[serde(default = "default_max_count")]
    pub max_count: usize,
    /// Worker pool size. `0` = available parallelism.
    #[serde(default)]
    pub workers: usize,
    /// Slots handed to a worker per queue pop.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Fixed leading digits of every generated number.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Random suffix is drawn from `0..suffix_range`.
    #[serde(default = "default_suffix_range")]
    pub suffix_range: u32,
    /// Deterministic output when set.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            default_count: default_count(),
            max_count: default_max_count(),
            workers: 0,
            chunk_size: default_chunk_size(),
            prefix: default_prefix(),
            suffix_range: default_suffix_range(),
            seed: None,
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<(), GenerateError> {
        if self.chunk_size == 0 {
            return Err(GenerateError::Config("chunk_size must be > 0".into()));
        }
        if self.suffix_range == 0 {
            return Err(GenerateError::Config("suffix_range must be > 0".into()));
        }
        if self.default_count == 0 {
            return Err(GenerateError::Config("default_count must be > 0".into()));
        }
        if self.max_count < self.default_count {
            return Err(GenerateError::Config(format!(
                "max_count ({}) is below default_count ({})",
                self.max_count, self.default_count
            )));
        }
        Ok(())
    }

    /// Resolved pool size.
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = GeneratorConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.default_count, 200);
        assert!(cfg.effective_workers() >= 1);
    }

    #[test]
    fn rejects_degenerate_values() {
        let cfg = GeneratorConfig {
            chunk_size: 0,
            ..GeneratorConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(GenerateError::Config(_))));

        let cfg = GeneratorConfig {
            max_count: 10,
            ..GeneratorConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(GenerateError::Config(_))));
    }

    #[test]
    fn explicit_workers_win() {
        let cfg = GeneratorConfig {
            workers: 3,
            ..GeneratorConfig::default()
        };
        assert_eq!(cfg.effective_workers(), 3);
    }
}
