use anyhow::Result;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::config::CleanPolicy;
use crate::safety::Domain;
use crate::target::{CleanResult, CleanTarget};

/// 某个技术领域的可插拔清理器
///
/// 收集器为每个目标标注安全等级，并在 [`Collector::scan`] 返回前丢弃清理级别不允许的目标。
pub trait Collector: Send + Sync {
    fn name(&self) -> &str;

    fn domain(&self) -> Domain;

    /// 当前机器是否适用此收集器，出错视为不适用
    fn detect(&self, cancel: &CancelToken) -> Result<bool>;

    fn scan(&self, cancel: &CancelToken, policy: &CleanPolicy) -> Result<Vec<CleanTarget>>;

    /// 每个输入目标对应一个结果，顺序与输入一致
    fn clean(
        &self,
        cancel: &CancelToken,
        targets: &[CleanTarget],
        dry_run: bool,
    ) -> Result<Vec<CleanResult>> {
        Ok(remove_targets(targets, dry_run, cancel))
    }
}

/// 删除一组目标，每个目标产生一个结果
///
/// 单个目标失败不会中断其余目标；取消后不再处理剩余目标。
pub fn remove_targets(
    targets: &[CleanTarget],
    dry_run: bool,
    cancel: &CancelToken,
) -> Vec<CleanResult> {
    let mut results = Vec::with_capacity(targets.len());

    for target in targets {
        if cancel.is_cancelled() {
            info!(
                "清理已取消，剩余 {} 个目标未处理",
                targets.len() - results.len()
            );
            break;
        }

        if dry_run {
            info!(
                "DRY RUN: 将删除 {:?} ({})",
                target.path,
                target.formatted_size()
            );
            results.push(CleanResult::freed(target.clone()));
            continue;
        }

        match remove_path(&target.path) {
            Ok(()) => {
                debug!("已删除 {:?}", target.path);
                results.push(CleanResult::freed(target.clone()));
            }
            Err(e) => {
                warn!("删除失败 {:?}: {}", target.path, e);
                results.push(CleanResult::failed(target.clone(), e));
            }
        }
    }

    results
}

/// 删除文件或目录；路径不存在视为已删除
fn remove_path(path: &Path) -> io::Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    let removed = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    match removed {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
