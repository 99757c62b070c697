use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::safety::SafetyLevel;

/// 扫描发现的单个可清理项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanTarget {
    pub path: PathBuf,
    pub description: String,
    pub size_bytes: u64,
    pub safety: SafetyLevel,
}

impl CleanTarget {
    pub fn new(
        path: impl Into<PathBuf>,
        description: impl Into<String>,
        size_bytes: u64,
        safety: SafetyLevel,
    ) -> Self {
        Self {
            path: path.into(),
            description: description.into(),
            size_bytes,
            safety,
        }
    }

    /// 获取格式化的大小字符串
    pub fn formatted_size(&self) -> String {
        crate::format_bytes(self.size_bytes)
    }
}

/// 单个目标的清理结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanResult {
    pub target: CleanTarget,
    pub success: bool,
    pub bytes_freed: u64,
    pub error: Option<String>,
}

impl CleanResult {
    /// 目标已删除（试运行时表示将被删除）
    pub fn freed(target: CleanTarget) -> Self {
        let bytes_freed = target.size_bytes;
        Self {
            target,
            success: true,
            bytes_freed,
            error: None,
        }
    }

    pub fn failed(target: CleanTarget, error: impl ToString) -> Self {
        Self {
            target,
            success: false,
            bytes_freed: 0,
            error: Some(error.to_string()),
        }
    }
}

/// 清理结果统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanSummary {
    pub cleaned: usize,
    pub failed: usize,
    pub bytes_freed: u64,
    pub failed_paths: Vec<PathBuf>,
}

impl CleanSummary {
    pub fn from_results(results: &[CleanResult]) -> Self {
        let mut summary = Self::default();
        for result in results {
            if result.success {
                summary.add_success(result.bytes_freed);
            } else {
                summary.add_failure(result.target.path.clone());
            }
        }
        summary
    }

    pub fn add_success(&mut self, size_freed: u64) {
        self.cleaned += 1;
        self.bytes_freed += size_freed;
    }

    pub fn add_failure(&mut self, path: PathBuf) {
        self.failed += 1;
        self.failed_paths.push(path);
    }

    pub fn format_size(&self) -> String {
        crate::format_bytes(self.bytes_freed)
    }
}
