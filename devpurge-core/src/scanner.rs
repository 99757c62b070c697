use crossbeam_channel::{Receiver, SendTimeoutError, Sender, bounded};
use globset::{Glob, GlobMatcher};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, trace, warn};
use walkdir::WalkDir;

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::size::{DEFAULT_SIZE_WORKERS, SizeAggregator};

/// 默认并发遍历的根目录数量
pub const DEFAULT_CONCURRENCY: usize = 4;

/// 结果通道容量
pub const RESULT_BUFFER: usize = 100;

/// 发送阻塞时检查取消信号的间隔
const SEND_POLL: Duration = Duration::from_millis(25);

/// 默认的项目目录（相对于用户主目录）
pub const DEFAULT_SEARCH_DIRS: &[&str] = &[
    "Projects",
    "Code",
    "Development",
    "Developer",
    "Documents",
    "Desktop",
];

/// 一个匹配结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanMatch {
    pub path: PathBuf,
    pub size: u64,
    pub is_dir: bool,
}

/// 按文件名模式并发扫描一组根目录
#[derive(Debug, Clone)]
pub struct PatternScanner {
    roots: Vec<PathBuf>,
    concurrency: usize,
    sizer: SizeAggregator,
}

impl PatternScanner {
    /// 创建扫描器，只保留存在的目录，缺失的根目录会被静默忽略
    pub fn new<I, P>(roots: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let roots: Vec<PathBuf> = roots
            .into_iter()
            .map(Into::into)
            .filter(|root| {
                let keep = root.is_dir();
                if !keep {
                    debug!("忽略不存在的扫描根目录: {:?}", root);
                }
                keep
            })
            .collect();

        Ok(Self {
            roots,
            concurrency: DEFAULT_CONCURRENCY,
            sizer: SizeAggregator::new(DEFAULT_SIZE_WORKERS)?,
        })
    }

    /// 使用默认项目目录（~/Projects、~/Code 等）创建扫描器
    pub fn with_default_roots(home: &Path) -> Result<Self> {
        Self::new(DEFAULT_SEARCH_DIRS.iter().map(|dir| home.join(dir)))
    }

    /// 设置同时遍历的根目录数量
    ///
    /// 传入 0 时保持原值，不做其他截断
    pub fn set_concurrency(&mut self, n: usize) {
        if n > 0 {
            self.concurrency = n;
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn sizer(&self) -> &SizeAggregator {
        &self.sizer
    }

    /// 添加扫描根目录，路径必须存在且是目录
    pub fn add_search_dir<P: Into<PathBuf>>(&mut self, dir: P) -> Result<()> {
        let dir = dir.into();
        let metadata = fs::metadata(&dir).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(dir.clone())
            } else {
                Error::io(&dir, e)
            }
        })?;

        if !metadata.is_dir() {
            return Err(Error::NotADirectory(dir));
        }

        self.roots.push(dir);
        Ok(())
    }

    /// 在所有根目录中查找文件名匹配 `pattern` 的条目
    ///
    /// 结果按到达顺序惰性返回。匹配到的目录只报告一次（附带总大小），不再深入。
    pub fn scan(&self, pattern: &str, cancel: &CancelToken) -> Result<ScanStream> {
        self.spawn_scan(self.roots.clone(), pattern, cancel)
    }

    /// 只扫描一个指定目录（不加入根目录列表）
    pub fn scan_dir(&self, dir: &Path, pattern: &str, cancel: &CancelToken) -> Result<ScanStream> {
        if !dir.is_dir() {
            return Err(Error::NotADirectory(dir.to_path_buf()));
        }
        self.spawn_scan(vec![dir.to_path_buf()], pattern, cancel)
    }

    /// 直接统计已知路径的大小，不做模式匹配
    pub fn find_exact_path(&self, path: &Path) -> Result<ScanMatch> {
        let metadata = fs::metadata(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(path.to_path_buf())
            } else {
                Error::io(path, e)
            }
        })?;

        let size = if metadata.is_dir() {
            self.sizer.measure(path).bytes
        } else {
            metadata.len()
        };

        Ok(ScanMatch {
            path: path.to_path_buf(),
            size,
            is_dir: metadata.is_dir(),
        })
    }

    fn spawn_scan(
        &self,
        roots: Vec<PathBuf>,
        pattern: &str,
        cancel: &CancelToken,
    ) -> Result<ScanStream> {
        let matcher = compile_pattern(pattern)?;
        let width = self.concurrency;

        let (sender, receiver) = bounded::<ScanMatch>(RESULT_BUFFER);
        let skipped = Arc::new(AtomicU64::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        info!("开始扫描 {:?}，共 {} 个根目录", pattern, roots.len());

        let walker = Walker {
            matcher,
            sizer: self.sizer.clone(),
            cancel: cancel.clone(),
            skipped: Arc::clone(&skipped),
            active: AtomicUsize::new(0),
            peak: Arc::clone(&peak),
        };

        thread::Builder::new()
            .name("devpurge-scan".to_string())
            .spawn(move || {
                // 名额通道：容量即同时遍历的根目录上限
                let (permits, release) = bounded::<()>(width);
                thread::scope(|s| {
                    for (index, root) in roots.iter().enumerate() {
                        if !walker.acquire(&permits) {
                            break;
                        }
                        let sender = sender.clone();
                        let done = release.clone();
                        let walker = &walker;
                        let spawned = thread::Builder::new()
                            .name(format!("devpurge-walk-{index}"))
                            .spawn_scoped(s, move || {
                                walker.enter();
                                walker.walk(root, &sender);
                                walker.leave();
                                let _ = done.recv();
                            });
                        if let Err(e) = spawned {
                            warn!("无法启动遍历线程 {:?}: {}", root, e);
                            let _ = release.recv();
                        }
                    }
                });
                // sender 在此处释放，通道随之关闭
                drop(sender);
            })
            .map_err(Error::Spawn)?;

        Ok(ScanStream {
            receiver,
            skipped,
            peak,
            cancel: cancel.clone(),
        })
    }
}

pub(crate) fn compile_pattern(pattern: &str) -> Result<GlobMatcher> {
    Glob::new(pattern)
        .map(|glob| glob.compile_matcher())
        .map_err(|source| Error::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

struct Walker {
    matcher: GlobMatcher,
    sizer: SizeAggregator,
    cancel: CancelToken,
    skipped: Arc<AtomicU64>,
    active: AtomicUsize,
    peak: Arc<AtomicUsize>,
}

impl Walker {
    /// 占用一个遍历名额；取消时返回 false
    fn acquire(&self, permits: &Sender<()>) -> bool {
        loop {
            if self.cancel.is_cancelled() {
                return false;
            }
            match permits.send_timeout((), SEND_POLL) {
                Ok(()) => return true,
                Err(SendTimeoutError::Timeout(())) => {}
                Err(SendTimeoutError::Disconnected(())) => return false,
            }
        }
    }

    fn enter(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    /// 单线程遍历一个根目录
    fn walk(&self, root: &Path, sender: &Sender<ScanMatch>) {
        let mut entries = WalkDir::new(root).follow_links(false).into_iter();

        while let Some(entry) = entries.next() {
            if self.cancel.is_cancelled() {
                debug!("扫描已取消: {:?}", root);
                return;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    trace!("跳过无法访问的条目: {}", e);
                    self.skipped.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
            };

            if !self.matcher.is_match(entry.file_name()) {
                continue;
            }

            let is_dir = entry.file_type().is_dir();
            let size = if is_dir {
                // 匹配的目录不再深入
                entries.skip_current_dir();
                let report = self.sizer.measure_with_cancel(entry.path(), &self.cancel);
                self.skipped.fetch_add(report.skipped, Ordering::Relaxed);
                report.bytes
            } else {
                match entry.metadata() {
                    Ok(metadata) => metadata.len(),
                    Err(e) => {
                        trace!("无法读取 {:?}: {}", entry.path(), e);
                        self.skipped.fetch_add(1, Ordering::Relaxed);
                        0
                    }
                }
            };

            debug!("匹配: {:?} ({} bytes)", entry.path(), size);
            let found = ScanMatch {
                path: entry.into_path(),
                size,
                is_dir,
            };
            if !self.send(sender, found) {
                return;
            }
        }
    }

    /// 发送结果；取消或消费者已离开时返回 false
    fn send(&self, sender: &Sender<ScanMatch>, mut found: ScanMatch) -> bool {
        loop {
            if self.cancel.is_cancelled() {
                return false;
            }
            match sender.send_timeout(found, SEND_POLL) {
                Ok(()) => return true,
                Err(SendTimeoutError::Timeout(back)) => found = back,
                Err(SendTimeoutError::Disconnected(_)) => return false,
            }
        }
    }
}

/// 惰性、有限、不可重启的扫描结果流
///
/// 提前丢弃结果流会断开通道，遍历线程在下一次发送时退出。
#[derive(Debug)]
pub struct ScanStream {
    receiver: Receiver<ScanMatch>,
    skipped: Arc<AtomicU64>,
    peak: Arc<AtomicUsize>,
    cancel: CancelToken,
}

impl ScanStream {
    /// 目前为止因无法读取而跳过的条目数
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    /// 目前为止同时遍历的根目录数峰值
    pub fn peak_walkers(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Iterator for ScanStream {
    type Item = ScanMatch;

    fn next(&mut self) -> Option<ScanMatch> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let found = self.receiver.recv().ok()?;
        if self.cancel.is_cancelled() {
            return None;
        }
        Some(found)
    }
}
