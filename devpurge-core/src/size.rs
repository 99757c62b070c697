use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;
use walkdir::WalkDir;

use crate::cancel::CancelToken;
use crate::error::Result;

/// 目录大小统计使用的默认工作线程数
pub const DEFAULT_SIZE_WORKERS: usize = 10;

/// 大小统计结果
///
/// `bytes` 是尽力而为的结果：当 `skipped > 0` 时，它只是实际占用的下界。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizeReport {
    pub bytes: u64,
    /// 无法读取而被跳过的条目数
    pub skipped: u64,
}

impl SizeReport {
    pub fn is_complete(&self) -> bool {
        self.skipped == 0
    }
}

/// 尽力而为地统计文件或目录树的字节数
///
/// 逐文件读取元数据的工作分发到独立线程池，与扫描线程分开。
/// 符号链接只计自身长度，不跟随；目录本身不计大小。
#[derive(Clone)]
pub struct SizeAggregator {
    pool: Arc<ThreadPool>,
}

impl std::fmt::Debug for SizeAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SizeAggregator")
            .field("workers", &self.pool.current_num_threads())
            .finish()
    }
}

impl SizeAggregator {
    pub fn new(workers: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("devpurge-size-{i}"))
            .build()?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// 计算文件或目录的大小
    pub fn measure(&self, path: &Path) -> SizeReport {
        self.measure_with_cancel(path, &CancelToken::new())
    }

    /// 计算大小，取消后停止遍历（返回已统计的部分）
    pub fn measure_with_cancel(&self, path: &Path, cancel: &CancelToken) -> SizeReport {
        let metadata = match fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(e) => {
                trace!("无法读取 {:?}: {}", path, e);
                return SizeReport {
                    bytes: 0,
                    skipped: 1,
                };
            }
        };

        if !metadata.is_dir() {
            return SizeReport {
                bytes: metadata.len(),
                skipped: 0,
            };
        }

        // 使用原子计数器累加，保证每个文件只计数一次
        let total_size = AtomicU64::new(0);
        let skipped = AtomicU64::new(0);

        self.pool.install(|| {
            WalkDir::new(path)
                .follow_links(false)
                .into_iter()
                .take_while(|_| !cancel.is_cancelled())
                .par_bridge()
                .for_each(|entry| match entry {
                    Ok(entry) if entry.file_type().is_dir() => {}
                    Ok(entry) => match entry.metadata() {
                        Ok(metadata) => {
                            total_size.fetch_add(metadata.len(), Ordering::Relaxed);
                        }
                        Err(e) => {
                            trace!("无法读取 {:?}: {}", entry.path(), e);
                            skipped.fetch_add(1, Ordering::Relaxed);
                        }
                    },
                    Err(e) => {
                        trace!("遍历错误: {}", e);
                        skipped.fetch_add(1, Ordering::Relaxed);
                    }
                });
        });

        SizeReport {
            bytes: total_size.into_inner(),
            skipped: skipped.into_inner(),
        }
    }

    /// 单线程版本，计数规则相同
    pub fn measure_sequential(path: &Path) -> SizeReport {
        let mut report = SizeReport::default();

        for entry in WalkDir::new(path).follow_links(false) {
            match entry {
                Ok(entry) if entry.file_type().is_dir() => {}
                Ok(entry) => match entry.metadata() {
                    Ok(metadata) => report.bytes += metadata.len(),
                    Err(_) => report.skipped += 1,
                },
                Err(_) => report.skipped += 1,
            }
        }

        report
    }
}
