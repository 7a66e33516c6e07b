use std::time::Duration;

/// Builder-style configuration for embedder implementations.
pub struct EmbedConfig {
    pub base_url: String,
    pub dimension: usize,
    pub timeout: Duration,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            dimension: 0,
            timeout: Duration::from_secs(30),
        }
    }
}

impl EmbedConfig {
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_dimension(mut self, dim: usize) -> Self {
        self.dimension = dim;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_strips_trailing_slash() {
        let cfg = EmbedConfig::default().with_base_url("http://ml:9000/");
        assert_eq!(cfg.base_url, "http://ml:9000");
    }
}
