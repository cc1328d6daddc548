use crate::core::errors::{CoroError, Result};
use serde::{Deserialize, Serialize};

/// Registry-wide coroutine configuration
///
/// Applied via [`CoroutineRegistry::configure`](crate::CoroutineRegistry::configure);
/// takes effect for subsequently created coroutines only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoroutineConfig {
    /// Stack size in bytes for threads a root runtime spawns; applied when
    /// [`run_in_root`](crate::run_in_root) builds its runtime
    pub stack_size_bytes: usize,
    /// Maximum number of live coroutines per registry
    pub max_coroutines: usize,
}

impl Default for CoroutineConfig {
    fn default() -> Self {
        Self {
            stack_size_bytes: 2 * 1024 * 1024, // 2MB
            max_coroutines: 100_000,
        }
    }
}

impl CoroutineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.stack_size_bytes == 0 {
            return Err(CoroError::configuration_field(
                "stack_size_bytes must be greater than 0",
                "stack_size_bytes",
            ));
        }
        if self.max_coroutines == 0 {
            return Err(CoroError::configuration_field(
                "max_coroutines must be greater than 0",
                "max_coroutines",
            ));
        }
        Ok(())
    }

    /// Create conservative limits for testing
    pub fn conservative() -> Self {
        Self {
            stack_size_bytes: 64 * 1024, // 64KB
            max_coroutines: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(CoroutineConfig::default().validate().is_ok());
        assert!(CoroutineConfig::conservative().validate().is_ok());
    }

    #[test]
    fn test_zero_caps_rejected() {
        let mut config = CoroutineConfig::default();
        config.max_coroutines = 0;
        assert!(config.validate().is_err());

        let mut config = CoroutineConfig::default();
        config.stack_size_bytes = 0;
        assert!(matches!(
            config.validate(),
            Err(CoroError::Configuration { .. })
        ));
    }
}
