//! Task - キューから取り出した 1 件の分析/抽出ジョブ
//!
//! Tasks are immutable once decoded. They carry no identity of their own;
//! the source message's offset is the only handle the pipeline keeps.

use serde::Deserialize;
use std::fmt;

/// Report period a task refers to.
///
/// Producers send either month markers (`"3"`, `"6"`, `"9"`, `"12"`) or
/// report markers (`"Q1"`, `"Q2"`, `"Q3"`, `"YEAR"`); both map here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum ReportPeriod {
    Q1,
    Q2,
    Q3,
    Year,
}

impl ReportPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportPeriod::Q1 => "Q1",
            ReportPeriod::Q2 => "Q2",
            ReportPeriod::Q3 => "Q3",
            ReportPeriod::Year => "YEAR",
        }
    }

    /// Months covered by the report (3, 6, 9 or 12).
    pub fn months(self) -> u8 {
        match self {
            ReportPeriod::Q1 => 3,
            ReportPeriod::Q2 => 6,
            ReportPeriod::Q3 => 9,
            ReportPeriod::Year => 12,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "3" | "Q1" => Some(ReportPeriod::Q1),
            "6" | "Q2" => Some(ReportPeriod::Q2),
            "9" | "Q3" => Some(ReportPeriod::Q3),
            "12" | "YEAR" => Some(ReportPeriod::Year),
            _ => None,
        }
    }
}

impl TryFrom<String> for ReportPeriod {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ReportPeriod::parse(&value)
            .ok_or_else(|| format!("unknown report period '{value}' (expected 3, 6, 9, 12, Q1, Q2, Q3 or YEAR)"))
    }
}

impl fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which business operation a task asks for.
///
/// Unknown kinds still decode: the executor owns the policy for them
/// (warn, commit, never retry), so the codec must not treat them as poison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum TaskKind {
    Analyze,
    Extract,
    Unrecognized(String),
}

impl TaskKind {
    pub fn as_str(&self) -> &str {
        match self {
            TaskKind::Analyze => "analyze",
            TaskKind::Extract => "extract",
            TaskKind::Unrecognized(kind) => kind,
        }
    }
}

impl From<String> for TaskKind {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "analyze" => TaskKind::Analyze,
            "extract" => TaskKind::Extract,
            _ => TaskKind::Unrecognized(value),
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit of work decoded from a queue message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Task {
    pub ticker: String,

    /// Report year; 0 asks the collaborator to resolve the latest one.
    #[serde(default)]
    pub year: i32,

    pub period: ReportPeriod,

    #[serde(default)]
    pub report_url: String,

    #[serde(rename = "type")]
    pub kind: TaskKind,
}

impl Task {
    /// `None` when the collaborator should pick the latest available year.
    pub fn requested_year(&self) -> Option<i32> {
        (self.year != 0).then_some(self.year)
    }
}
