//! ProcessorBuilder - TaskProcessor の構築とワイヤリング
//!
//! # Fail-fast 設計
//! - collaborator が揃っていなければ build() で BuildError
//! - 設定値は build() 時に検証する

use std::sync::Arc;
use std::time::Duration;

use crate::app::executor::TaskExecutor;
use crate::app::processor::{ProcessorSettings, TaskProcessor};
use crate::config::{ConfigError, PipelineConfig};
use crate::ports::{QueueClient, ReportAnalyzer, ReportExtractor};
use crate::retry::RetryPolicy;

/// ProcessorBuilder wires collaborators and settings into a `TaskProcessor`.
///
/// # 使用例
/// ```ignore
/// let processor = ProcessorBuilder::new(queue)
///     .analyzer(analyzer)
///     .extractor(extractor)
///     .config(&PipelineConfig::default())
///     .build()?;
/// ```
pub struct ProcessorBuilder {
    queue: Arc<dyn QueueClient>,
    analyzer: Option<Arc<dyn ReportAnalyzer>>,
    extractor: Option<Arc<dyn ReportExtractor>>,
    config: PipelineConfig,
    retry_policy: Option<RetryPolicy>,
    attempt_timeout: Option<Duration>,
    commit_timeout: Option<Duration>,
    reconnect_backoff: Option<(Duration, Duration)>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing collaborator: {0}")]
    MissingCollaborator(&'static str),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ProcessorBuilder {
    pub fn new(queue: Arc<dyn QueueClient>) -> Self {
        Self {
            queue,
            analyzer: None,
            extractor: None,
            config: PipelineConfig::default(),
            retry_policy: None,
            attempt_timeout: None,
            commit_timeout: None,
            reconnect_backoff: None,
        }
    }

    pub fn analyzer(mut self, analyzer: Arc<dyn ReportAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn ReportExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Take every setting from `config`. Call it before the individual setters.
    pub fn config(mut self, config: &PipelineConfig) -> Self {
        self.config = config.clone();
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = Some(capacity);
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    pub fn commit_timeout(mut self, timeout: Duration) -> Self {
        self.commit_timeout = Some(timeout);
        self
    }

    pub fn reconnect_backoff(mut self, seed: Duration, max: Duration) -> Self {
        self.reconnect_backoff = Some((seed, max));
        self
    }

    pub fn build(self) -> Result<TaskProcessor, BuildError> {
        self.config.validate()?;
        let analyzer = self
            .analyzer
            .ok_or(BuildError::MissingCollaborator("analyzer"))?;
        let extractor = self
            .extractor
            .ok_or(BuildError::MissingCollaborator("extractor"))?;

        let retry_policy = self
            .retry_policy
            .unwrap_or_else(|| self.config.retry_policy());
        if retry_policy.max_attempts == 0 {
            return Err(invalid("retry_policy.max_attempts", "must be at least 1"));
        }
        let attempt_timeout = self
            .attempt_timeout
            .unwrap_or_else(|| self.config.attempt_timeout());
        let commit_timeout = self
            .commit_timeout
            .unwrap_or_else(|| self.config.commit_timeout());
        let (reconnect_backoff, reconnect_backoff_max) = self.reconnect_backoff.unwrap_or((
            self.config.reconnect_backoff(),
            self.config.reconnect_backoff_max(),
        ));
        for (field, value) in [
            ("attempt_timeout", attempt_timeout),
            ("commit_timeout", commit_timeout),
            ("reconnect_backoff", reconnect_backoff),
        ] {
            if value.is_zero() {
                return Err(invalid(field, "must be greater than zero"));
            }
        }

        let executor = TaskExecutor::new(analyzer, extractor, retry_policy, attempt_timeout);
        let settings = ProcessorSettings {
            workers: self.config.workers,
            channel_capacity: self.config.channel_capacity(),
            commit_timeout,
            reconnect_backoff,
            reconnect_backoff_max,
        };
        Ok(TaskProcessor::new(self.queue, Arc::new(executor), settings))
    }
}

fn invalid(field: &'static str, reason: &str) -> BuildError {
    BuildError::Config(ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ReportPeriod, TaskError};
    use crate::impls::InMemoryQueueClient;
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl ReportAnalyzer for Noop {
        async fn analyze_report(
            &self,
            _ticker: &str,
            _report_url: &str,
            _year: i32,
            _period: ReportPeriod,
        ) -> Result<String, TaskError> {
            Ok(String::new())
        }
    }

    #[async_trait]
    impl ReportExtractor for Noop {
        async fn extract_data_from_report(
            &self,
            _ticker: &str,
            _report_url: &str,
            _year: i32,
            _period: ReportPeriod,
        ) -> Result<String, TaskError> {
            Ok(String::new())
        }
    }

    fn queue() -> Arc<dyn QueueClient> {
        Arc::new(InMemoryQueueClient::new())
    }

    #[test]
    fn test_build_success_uses_config() {
        let config = PipelineConfig {
            workers: 4,
            ..PipelineConfig::default()
        };
        let processor = ProcessorBuilder::new(queue())
            .analyzer(Arc::new(Noop))
            .extractor(Arc::new(Noop))
            .config(&config)
            .build()
            .unwrap();

        assert_eq!(processor.settings().workers, 4);
        assert_eq!(processor.settings().channel_capacity, 4);
        assert_eq!(processor.settings().commit_timeout, Duration::from_secs(10));
        assert!(!processor.is_running());
    }

    #[test]
    fn test_build_missing_analyzer() {
        let result = ProcessorBuilder::new(queue())
            .extractor(Arc::new(Noop))
            .build();
        assert!(matches!(result, Err(BuildError::MissingCollaborator("analyzer"))));
    }

    #[test]
    fn test_build_missing_extractor() {
        let result = ProcessorBuilder::new(queue())
            .analyzer(Arc::new(Noop))
            .build();
        assert!(matches!(result, Err(BuildError::MissingCollaborator("extractor"))));
    }

    #[test]
    fn test_build_rejects_invalid_settings() {
        let zero_workers = ProcessorBuilder::new(queue())
            .analyzer(Arc::new(Noop))
            .extractor(Arc::new(Noop))
            .workers(0)
            .build();
        assert!(matches!(zero_workers, Err(BuildError::Config(_))));

        let zero_timeout = ProcessorBuilder::new(queue())
            .analyzer(Arc::new(Noop))
            .extractor(Arc::new(Noop))
            .attempt_timeout(Duration::ZERO)
            .build();
        assert!(matches!(zero_timeout, Err(BuildError::Config(_))));
    }

    #[test]
    fn test_setters_override_config() {
        let processor = ProcessorBuilder::new(queue())
            .analyzer(Arc::new(Noop))
            .extractor(Arc::new(Noop))
            .config(&PipelineConfig::default())
            .workers(2)
            .channel_capacity(1)
            .commit_timeout(Duration::from_millis(50))
            .reconnect_backoff(Duration::from_millis(10), Duration::from_millis(80))
            .build()
            .unwrap();

        let settings = processor.settings();
        assert_eq!(settings.workers, 2);
        assert_eq!(settings.channel_capacity, 1);
        assert_eq!(settings.commit_timeout, Duration::from_millis(50));
        assert_eq!(settings.reconnect_backoff, Duration::from_millis(10));
        assert_eq!(settings.reconnect_backoff_max, Duration::from_millis(80));
    }
}
