/// Per-buffer segmentation tuning
#[derive(Debug, Clone)]
pub struct BufferConfig {
    /// Target segment duration in milliseconds (default: 5000)
    pub target_duration_ms: u64,
    /// Maximum time a buffer may hold audio before a timeout flush (default: 8.0)
    pub timeout_secs: f64,
    /// Fraction of the sample target at which the buffer counts as full
    /// (default: 0.98, tolerates slight sample-count rounding)
    pub ready_threshold: f64,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            target_duration_ms: 5000,
            timeout_secs: 8.0,
            ready_threshold: 0.98,
        }
    }
}

/// Registry-level tuning
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Ceiling on total buffered bytes across all sessions (default: 500 MiB)
    pub max_memory_bytes: usize,
    /// Configuration applied to every lazily created buffer
    pub buffer: BufferConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_memory_bytes: 500 * 1024 * 1024,
            buffer: BufferConfig::default(),
        }
    }
}
