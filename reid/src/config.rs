use std::time::Duration;

/// Engine tuning knobs. Zero-valued fields fall back to defaults via
/// `with_defaults`, so partially filled configs stay usable.
#[derive(Debug, Clone)]
pub struct Config {
    /// Minimum cosine similarity for a candidate to qualify.
    /// Default: 0.7.
    pub similarity_threshold: f32,

    /// Ranked candidate list cut-off. Default: 5.
    pub max_match_results: usize,

    /// Photo quota per profile. Default: 5.
    pub max_photos_per_profile: u32,

    /// Upper bound on one per-photo embedding call; a call exceeding it
    /// counts as a failed embedding for that photo only. Default: 30s.
    pub embed_timeout: Duration,

    /// Page size when the caller passes 0. Default: 20.
    pub default_page_limit: usize,

    /// Largest accepted page size. Default: 100.
    pub max_page_limit: usize,

    /// Lifetime of issued photo retrieval references. Default: 3600s.
    pub url_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.7,
            max_match_results: 5,
            max_photos_per_profile: 5,
            embed_timeout: Duration::from_secs(30),
            default_page_limit: 20,
            max_page_limit: 100,
            url_ttl_secs: 3600,
        }
    }
}

impl Config {
    pub fn with_defaults(mut self) -> Self {
        let d = Config::default();
        if self.similarity_threshold == 0.0 {
            self.similarity_threshold = d.similarity_threshold;
        }
        if self.max_match_results == 0 {
            self.max_match_results = d.max_match_results;
        }
        if self.max_photos_per_profile == 0 {
            self.max_photos_per_profile = d.max_photos_per_profile;
        }
        if self.embed_timeout.is_zero() {
            self.embed_timeout = d.embed_timeout;
        }
        if self.default_page_limit == 0 {
            self.default_page_limit = d.default_page_limit;
        }
        if self.max_page_limit == 0 {
            self.max_page_limit = d.max_page_limit;
        }
        if self.url_ttl_secs == 0 {
            self.url_ttl_secs = d.url_ttl_secs;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_fields_get_defaults() {
        let cfg = Config {
            similarity_threshold: 0.0,
            max_match_results: 0,
            max_photos_per_profile: 0,
            embed_timeout: Duration::ZERO,
            default_page_limit: 0,
            max_page_limit: 0,
            url_ttl_secs: 0,
        }
        .with_defaults();
        assert_eq!(cfg.similarity_threshold, 0.7);
        assert_eq!(cfg.max_match_results, 5);
        assert_eq!(cfg.max_photos_per_profile, 5);
        assert_eq!(cfg.embed_timeout, Duration::from_secs(30));
        assert_eq!(cfg.default_page_limit, 20);
        assert_eq!(cfg.max_page_limit, 100);
    }

    #[test]
    fn explicit_values_kept() {
        let cfg = Config {
            similarity_threshold: 0.9,
            ..Default::default()
        }
        .with_defaults();
        assert_eq!(cfg.similarity_threshold, 0.9);
    }
}
