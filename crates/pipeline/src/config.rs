use std::time::Duration;

/// What happens when a sink's queue is at capacity (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverflowPolicy {
    /// Drop the record that does not fit; count it.
    DropNewest,
    /// Retry admission until `deadline` elapses, then drop and count.
    Block { deadline: Duration },
    /// Collapse same-signature records waiting behind a full queue into
    /// the most recent one, so a burst of identical lines costs O(1) slots.
    CoalesceBySignature,
}

impl Default for OverflowPolicy {
    fn default() -> Self {
        OverflowPolicy::DropNewest
    }
}

/// Error returned by an invalid [`PipelineConfig`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum PipelineConfigError {
    #[error("queue capacity must be >= 1")]
    ZeroCapacity,
}

/// Tunables for one sink's async pipeline (spec §4.1, §5).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub capacity: usize,
    pub overflow_policy: OverflowPolicy,
    pub shutdown_deadline: Duration,
    pub flush_every: usize,
}

/// Builder for [`PipelineConfig`].
#[derive(Debug, Clone)]
pub struct PipelineConfigBuilder {
    capacity: usize,
    overflow_policy: OverflowPolicy,
    shutdown_deadline: Duration,
    flush_every: usize,
}

impl PipelineConfig {
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            capacity: 8192,
            overflow_policy: OverflowPolicy::DropNewest,
            shutdown_deadline: Duration::from_secs(30),
            flush_every: 1,
        }
    }
}

impl PipelineConfigBuilder {
    #[must_use]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    #[must_use]
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    #[must_use]
    pub fn shutdown_deadline(mut self, deadline: Duration) -> Self {
        self.shutdown_deadline = deadline;
        self
    }

    /// Flush the writer every `n` records (default 1: every record).
    #[must_use]
    pub fn flush_every(mut self, n: usize) -> Self {
        self.flush_every = n.max(1);
        self
    }

    /// # Errors
    ///
    /// Returns [`PipelineConfigError::ZeroCapacity`] when `capacity` is 0.
    pub fn build(self) -> Result<PipelineConfig, PipelineConfigError> {
        if self.capacity == 0 {
            return Err(PipelineConfigError::ZeroCapacity);
        }
        Ok(PipelineConfig {
            capacity: self.capacity,
            overflow_policy: self.overflow_policy,
            shutdown_deadline: self.shutdown_deadline,
            flush_every: self.flush_every,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(PipelineConfig::builder().capacity(0).build().is_err());
    }

    #[test]
    fn defaults_match_spec() {
        let config = PipelineConfig::builder().build().unwrap();
        assert_eq!(config.capacity, 8192);
        assert_eq!(config.shutdown_deadline, Duration::from_secs(30));
        assert_eq!(config.overflow_policy, OverflowPolicy::DropNewest);
    }
}
