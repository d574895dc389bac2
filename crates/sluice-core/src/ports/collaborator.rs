//! Collaborator ports - 分析/抽出を実際に行う外部サービス
//!
//! Both operations are slow and failure-prone (document storage, a generative
//! API, a financial-data API). The executor wraps every call in a timeout and
//! retries on any error, so implementations just report what happened.

use async_trait::async_trait;

use crate::domain::{ReportPeriod, TaskError};

#[async_trait]
pub trait ReportAnalyzer: Send + Sync {
    /// `year == 0` asks the analyzer to resolve the latest report.
    async fn analyze_report(
        &self,
        ticker: &str,
        report_url: &str,
        year: i32,
        period: ReportPeriod,
    ) -> Result<String, TaskError>;
}

#[async_trait]
pub trait ReportExtractor: Send + Sync {
    /// `year == 0` asks the extractor to resolve the latest report.
    async fn extract_data_from_report(
        &self,
        ticker: &str,
        report_url: &str,
        year: i32,
        period: ReportPeriod,
    ) -> Result<String, TaskError>;
}
