//! Input safety limits for options building
//!
//! Caps the raw query document size, the nesting depth walked while
//! filtering, and the number of aggregation keys one request may ask for.
//! Violations surface as [`Error::InvalidQuery`] so callers keep seeing the
//! same two public error kinds.

use crate::Error;

/// Configured caps for one endpoint.
#[derive(Debug, Clone)]
pub struct Limits {
    /// Maximum byte length of the raw `query` parameter (default: 8192)
    pub max_query_bytes: usize,
    /// Maximum nesting depth of the `query` document (default: 32)
    pub max_query_depth: usize,
    /// Maximum number of requested aggregation keys (default: 16)
    pub max_aggregate_keys: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_query_bytes: 8 * 1024,
            max_query_depth: 32,
            max_aggregate_keys: 16,
        }
    }
}

impl Limits {
    /// Create limits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum raw query length in bytes
    pub fn with_max_query_bytes(mut self, max: usize) -> Self {
        self.max_query_bytes = max;
        self
    }

    /// Set maximum query nesting depth
    pub fn with_max_query_depth(mut self, max: usize) -> Self {
        self.max_query_depth = max;
        self
    }

    /// Set maximum number of requested aggregation keys
    pub fn with_max_aggregate_keys(mut self, max: usize) -> Self {
        self.max_aggregate_keys = max;
        self
    }

    /// Validate the raw query document length.
    ///
    /// # Errors
    /// Returns `Error::InvalidQuery` if the document exceeds the cap.
    pub fn validate_query_bytes(&self, raw: &str) -> Result<(), Error> {
        if raw.len() > self.max_query_bytes {
            return Err(Error::InvalidQuery(format!(
                "query document exceeds maximum length of {} bytes",
                self.max_query_bytes
            )));
        }
        Ok(())
    }

    /// Validate the number of requested aggregation keys.
    ///
    /// # Errors
    /// Returns `Error::InvalidQuery` if the count exceeds the cap.
    pub fn validate_aggregate_keys(&self, count: usize) -> Result<(), Error> {
        if count > self.max_aggregate_keys {
            return Err(Error::InvalidQuery(format!(
                "too many aggregation keys (max: {})",
                self.max_aggregate_keys
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = Limits::default();
        assert_eq!(limits.max_query_bytes, 8192);
        assert_eq!(limits.max_query_depth, 32);
        assert_eq!(limits.max_aggregate_keys, 16);
    }

    #[test]
    fn test_validate_query_bytes_ok() {
        let limits = Limits::default();
        assert!(limits.validate_query_bytes("{\"status\":\"active\"}").is_ok());
    }

    #[test]
    fn test_validate_query_bytes_exceeds() {
        let limits = Limits::default();
        let long = "x".repeat(8193);
        assert!(limits.validate_query_bytes(&long).is_err());
    }

    #[test]
    fn test_validate_aggregate_keys_ok() {
        let limits = Limits::default();
        assert!(limits.validate_aggregate_keys(16).is_ok());
    }

    #[test]
    fn test_validate_aggregate_keys_exceeds() {
        let limits = Limits::default();
        assert!(limits.validate_aggregate_keys(17).is_err());
    }

    #[test]
    fn test_custom_limits() {
        let limits = Limits::new()
            .with_max_query_bytes(128)
            .with_max_query_depth(4)
            .with_max_aggregate_keys(2);

        assert_eq!(limits.max_query_bytes, 128);
        assert_eq!(limits.max_query_depth, 4);
        assert_eq!(limits.max_aggregate_keys, 2);
    }

    #[test]
    fn test_violations_fold_into_invalid_query() {
        let limits = Limits::new().with_max_aggregate_keys(1);
        let err = limits.validate_aggregate_keys(2).unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)));
    }
}
