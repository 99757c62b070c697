use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::cancel::CancelToken;
use crate::collector::Collector;
use crate::config::CleanPolicy;
use crate::target::{CleanResult, CleanSummary, CleanTarget};

/// 各收集器找到的清理目标，按收集器名称分组
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub targets: BTreeMap<String, Vec<CleanTarget>>,
}

impl ScanReport {
    pub fn total_targets(&self) -> usize {
        self.targets.values().map(Vec::len).sum()
    }

    pub fn total_bytes(&self) -> u64 {
        self.targets
            .values()
            .flatten()
            .map(|target| target.size_bytes)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// 运行阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Detect,
    Scan,
    Clean,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Detect => "detect",
            Stage::Scan => "scan",
            Stage::Clean => "clean",
        };
        f.write_str(name)
    }
}

/// 单个收集器的错误，不会中断其他收集器
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorFailure {
    pub collector: String,
    pub stage: Stage,
    pub message: String,
}

impl CollectorFailure {
    fn new(collector: &str, stage: Stage, error: &anyhow::Error) -> Self {
        Self {
            collector: collector.to_string(),
            stage,
            message: format!("{error:#}"),
        }
    }
}

/// 检测与扫描阶段的结果
#[derive(Debug, Clone, Default)]
pub struct ScanPhase {
    pub report: ScanReport,
    pub failures: Vec<CollectorFailure>,
    /// 检测为适用的收集器名称
    pub detected: Vec<String>,
    pub cancelled: bool,
    /// 按收集器下标保存的目标，清理时只交给扫描出它们的收集器
    buckets: Vec<(usize, Vec<CleanTarget>)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    NothingToClean,
    Declined,
    Cancelled,
}

/// 一次完整运行的结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub scan: ScanReport,
    pub results: Vec<CleanResult>,
    pub failures: Vec<CollectorFailure>,
    pub outcome: RunOutcome,
    pub dry_run: bool,
    pub duration_ms: u64,
}

impl RunReport {
    pub fn summary(&self) -> CleanSummary {
        CleanSummary::from_results(&self.results)
    }

    pub fn is_cancelled(&self) -> bool {
        self.outcome == RunOutcome::Cancelled
    }
}

/// 执行删除前的用户确认
pub trait Confirm {
    fn confirm(&mut self, report: &ScanReport) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&ScanReport) -> bool,
{
    fn confirm(&mut self, report: &ScanReport) -> bool {
        self(report)
    }
}

/// 清理编排器
///
/// 按注册顺序逐个对收集器执行检测、扫描、确认和清理
#[derive(Default)]
pub struct CleanupOrchestrator {
    collectors: Vec<Box<dyn Collector>>,
}

impl CleanupOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collectors(collectors: Vec<Box<dyn Collector>>) -> Self {
        Self { collectors }
    }

    pub fn register(&mut self, collector: Box<dyn Collector>) {
        self.collectors.push(collector);
    }

    pub fn collectors(&self) -> impl Iterator<Item = &dyn Collector> {
        self.collectors.iter().map(|c| c.as_ref())
    }

    /// 只检测和扫描，不删除任何内容
    pub fn scan(&self, policy: &CleanPolicy, cancel: &CancelToken) -> ScanPhase {
        let mut phase = ScanPhase::default();

        info!(
            "开始扫描，清理级别: {}，共 {} 个收集器",
            policy.clean_level,
            self.collectors.len()
        );

        // 已被前面收集器认领的路径
        let mut claimed: Vec<PathBuf> = Vec::new();

        for (index, collector) in self.collectors.iter().enumerate() {
            if cancel.is_cancelled() {
                phase.cancelled = true;
                break;
            }

            let name = collector.name();
            if !policy.includes_domain(collector.domain()) {
                debug!("{}: 领域 {} 未选中，跳过", name, collector.domain());
                continue;
            }

            match collector.detect(cancel) {
                Ok(true) => {}
                Ok(false) => {
                    debug!("{}: 未检测到相关工具", name);
                    continue;
                }
                Err(e) => {
                    debug!("{}: 检测失败，视为不适用: {:#}", name, e);
                    phase
                        .failures
                        .push(CollectorFailure::new(name, Stage::Detect, &e));
                    continue;
                }
            }
            phase.detected.push(name.to_string());

            match collector.scan(cancel, policy) {
                Ok(targets) if targets.is_empty() => {
                    debug!("{}: 没有可清理的目标", name);
                }
                Ok(targets) => {
                    let targets = drop_claimed(name, targets, &mut claimed);
                    if targets.is_empty() {
                        debug!("{}: 目标均已由其他收集器处理", name);
                        continue;
                    }
                    info!("{}: {} 个目标", name, targets.len());
                    // 同名收集器的目标合并到同一分组
                    phase
                        .report
                        .targets
                        .entry(name.to_string())
                        .or_default()
                        .extend(targets.iter().cloned());
                    phase.buckets.push((index, targets));
                }
                Err(_) if cancel.is_cancelled() => {
                    phase.cancelled = true;
                    break;
                }
                Err(e) => {
                    error!("{}: 扫描失败: {:#}", name, e);
                    phase
                        .failures
                        .push(CollectorFailure::new(name, Stage::Scan, &e));
                }
            }
        }

        if cancel.is_cancelled() {
            phase.cancelled = true;
        }

        info!(
            "扫描完成: {} 个目标, 共 {}",
            phase.report.total_targets(),
            crate::format_bytes(phase.report.total_bytes())
        );
        phase
    }

    /// 完整流程。只有交互模式且非试运行时才会调用 `confirm`
    pub fn run(
        &self,
        policy: &CleanPolicy,
        cancel: &CancelToken,
        confirm: &mut dyn Confirm,
    ) -> RunReport {
        let start_time = Instant::now();
        let ScanPhase {
            report: scan,
            failures,
            cancelled,
            buckets,
            ..
        } = self.scan(policy, cancel);

        let mut report = RunReport {
            scan,
            results: Vec::new(),
            failures,
            outcome: RunOutcome::Completed,
            dry_run: policy.dry_run,
            duration_ms: 0,
        };

        if cancelled {
            info!("扫描阶段已取消");
            report.outcome = RunOutcome::Cancelled;
        } else if report.scan.is_empty() {
            info!("没有需要清理的内容");
            report.outcome = RunOutcome::NothingToClean;
        } else if policy.interactive && !policy.dry_run && !confirm.confirm(&report.scan) {
            info!("用户取消了清理");
            report.outcome = RunOutcome::Declined;
        } else {
            self.clean_all(policy, cancel, &buckets, &mut report);
        }

        report.duration_ms = start_time.elapsed().as_millis() as u64;

        let summary = report.summary();
        info!(
            "运行结束 ({:?}): 清理 {} 项, 失败 {} 项, 释放 {}, 耗时 {}ms",
            report.outcome,
            summary.cleaned,
            summary.failed,
            summary.format_size(),
            report.duration_ms
        );
        report
    }

    fn clean_all(
        &self,
        policy: &CleanPolicy,
        cancel: &CancelToken,
        buckets: &[(usize, Vec<CleanTarget>)],
        report: &mut RunReport,
    ) {
        for (index, targets) in buckets {
            let Some(collector) = self.collectors.get(*index) else {
                continue;
            };
            let name = collector.name();

            if cancel.is_cancelled() {
                report.outcome = RunOutcome::Cancelled;
                return;
            }

            info!(
                "{}: 清理 {} 个目标{}",
                name,
                targets.len(),
                if policy.dry_run { " (DRY RUN)" } else { "" }
            );

            match collector.clean(cancel, targets, policy.dry_run) {
                Ok(results) => {
                    if results.len() != targets.len() && !cancel.is_cancelled() {
                        warn!(
                            "{}: 返回了 {} 个结果，期望 {} 个",
                            name,
                            results.len(),
                            targets.len()
                        );
                    }
                    let results = if policy.dry_run {
                        enforce_dry_run(name, results)
                    } else {
                        results
                    };
                    report.results.extend(results);
                }
                Err(_) if cancel.is_cancelled() => {}
                Err(e) => {
                    error!("{}: 清理失败: {:#}", name, e);
                    report
                        .failures
                        .push(CollectorFailure::new(name, Stage::Clean, &e));
                }
            }
        }

        if cancel.is_cancelled() {
            report.outcome = RunOutcome::Cancelled;
        }
    }
}

impl fmt::Debug for CleanupOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CleanupOrchestrator")
            .field(
                "collectors",
                &self.collectors().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// 跨收集器去重：与已认领路径相同、位于其内部或包含它的目标被丢弃
///
/// 同一收集器内部的重叠由收集器自己处理。
fn drop_claimed(
    collector: &str,
    targets: Vec<CleanTarget>,
    claimed: &mut Vec<PathBuf>,
) -> Vec<CleanTarget> {
    let kept: Vec<CleanTarget> = targets
        .into_iter()
        .filter(|target| {
            let owner = claimed
                .iter()
                .find(|path| target.path.starts_with(path) || path.starts_with(&target.path));
            if let Some(owner) = owner {
                debug!(
                    "{}: {:?} 与已有目标 {:?} 重叠，跳过",
                    collector, target.path, owner
                );
            }
            owner.is_none()
        })
        .collect();

    claimed.extend(kept.iter().map(|target| target.path.clone()));
    kept
}

/// 演练模式下所有结果都必须是成功且释放量等于目标大小
fn enforce_dry_run(collector: &str, results: Vec<CleanResult>) -> Vec<CleanResult> {
    results
        .into_iter()
        .map(|result| {
            if result.success
                && result.error.is_none()
                && result.bytes_freed == result.target.size_bytes
            {
                result
            } else {
                warn!(
                    "{}: 演练结果不一致，已修正 {:?}",
                    collector, result.target.path
                );
                CleanResult::freed(result.target)
            }
        })
        .collect()
}
