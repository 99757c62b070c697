pub mod cancel;
pub mod catalog;
pub mod collector;
pub mod config;
pub mod detect;
pub mod error;
pub mod orchestrator;
pub mod safety;
pub mod scanner;
pub mod size;
pub mod target;

pub use cancel::CancelToken;
pub use catalog::{CATALOG, CatalogCollector, CatalogEntry, Rule, default_registry};
pub use collector::{Collector, remove_targets};
pub use config::{CleanPolicy, Settings};
pub use detect::{DetectionReport, ToolDetector};
pub use error::{Error, Result};
pub use orchestrator::{
    CleanupOrchestrator, CollectorFailure, Confirm, RunOutcome, RunReport, ScanPhase, ScanReport,
    Stage,
};
pub use safety::{CleanLevel, Domain, SafetyGate, SafetyLevel};
pub use scanner::{PatternScanner, ScanMatch, ScanStream};
pub use size::{SizeAggregator, SizeReport};
pub use target::{CleanResult, CleanSummary, CleanTarget};

/// 格式化字节大小为人类可读格式
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
        assert_eq!(format_bytes(1073741824), "1.00 GB");
    }
}
