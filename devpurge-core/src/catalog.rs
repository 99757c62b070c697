//! 内置的各技术栈缓存表
//!
//! 每个 [`CatalogEntry`] 都是纯数据：如何判断工具已安装，以及它会在哪里留下可清理的文件。
//! [`CatalogCollector`] 把一个条目包装成 [`Collector`]。

use anyhow::Result;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, trace};

use crate::cancel::CancelToken;
use crate::collector::Collector;
use crate::config::CleanPolicy;
use crate::detect::{Probe, ToolDetector};
use crate::safety::{Domain, SafetyLevel};
use crate::scanner::{PatternScanner, compile_pattern};
use crate::target::CleanTarget;

/// 清理目标的位置规则
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// 相对于用户主目录的固定位置
    Path {
        path: &'static str,
        description: &'static str,
        safety: SafetyLevel,
    },
    /// 绝对路径，路径中的单个组件可以是通配符（如 `/Volumes/*/.Trashes`）
    Absolute {
        path: &'static str,
        description: &'static str,
        safety: SafetyLevel,
    },
    /// 扫描根目录下文件名匹配 `pattern` 的条目。
    /// 设置 `marker` 时，匹配项的父目录必须包含该文件；
    /// 设置 `skip_within` 时，位于该名称目录之下的匹配项会被忽略。
    Pattern {
        pattern: &'static str,
        marker: Option<&'static str>,
        skip_within: Option<&'static str>,
        description: &'static str,
        safety: SafetyLevel,
    },
}

impl Rule {
    pub fn safety(&self) -> SafetyLevel {
        match self {
            Rule::Path { safety, .. }
            | Rule::Absolute { safety, .. }
            | Rule::Pattern { safety, .. } => *safety,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Rule::Path { description, .. }
            | Rule::Absolute { description, .. }
            | Rule::Pattern { description, .. } => description,
        }
    }

    /// 忽略位于名为 `dir` 的目录之下的匹配项
    pub const fn outside(self, dir: &'static str) -> Rule {
        match self {
            Rule::Pattern {
                pattern,
                marker,
                description,
                safety,
                ..
            } => Rule::Pattern {
                pattern,
                marker,
                skip_within: Some(dir),
                description,
                safety,
            },
            other => other,
        }
    }
}

const fn at(path: &'static str, description: &'static str, safety: SafetyLevel) -> Rule {
    Rule::Path {
        path,
        description,
        safety,
    }
}

const fn abs(path: &'static str, description: &'static str, safety: SafetyLevel) -> Rule {
    Rule::Absolute {
        path,
        description,
        safety,
    }
}

const fn named(pattern: &'static str, description: &'static str, safety: SafetyLevel) -> Rule {
    Rule::Pattern {
        pattern,
        marker: None,
        skip_within: None,
        description,
        safety,
    }
}

const fn project(
    pattern: &'static str,
    marker: &'static str,
    description: &'static str,
    safety: SafetyLevel,
) -> Rule {
    Rule::Pattern {
        pattern,
        marker: Some(marker),
        skip_within: None,
        description,
        safety,
    }
}

/// 一个收集器的全部数据
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    pub name: &'static str,
    pub domain: Domain,
    /// 任一探测命中即适用，为空表示总是适用
    pub detect: &'static [Probe],
    pub rules: &'static [Rule],
}

use SafetyLevel::{Dangerous, Moderate, Safe};

/// 内置目录表，顺序即默认注册顺序
///
/// 跨收集器重叠的目标由先注册者保留，所以整体缓存目录排在最前。
pub const CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        name: "System Caches",
        domain: Domain::System,
        detect: &[],
        rules: &[
            at("Library/Caches", "User caches", Safe),
            abs("/Library/Caches", "System caches (may require admin)", Moderate),
        ],
    },
    CatalogEntry {
        name: "Trash",
        domain: Domain::System,
        detect: &[],
        rules: &[
            at(".Trash", "User trash", Safe),
            at(".local/share/Trash", "User trash", Safe),
            abs("/Volumes/*/.Trashes", "External volume trash", Safe),
        ],
    },
    CatalogEntry {
        name: "System Logs",
        domain: Domain::System,
        detect: &[],
        rules: &[
            at("Library/Logs", "User log files", Moderate),
            abs("/private/var/log/*.log", "System log files", Moderate),
            abs("/private/var/log/asl/*.asl", "ASL log files", Moderate),
        ],
    },
    CatalogEntry {
        name: "Temp Files",
        domain: Domain::System,
        detect: &[],
        rules: &[
            abs("/private/var/tmp/*", "Temporary files in /private/var/tmp", Moderate),
            abs("/private/tmp/*", "Temporary files in /private/tmp", Moderate),
        ],
    },
    CatalogEntry {
        name: "Homebrew Cache",
        domain: Domain::System,
        detect: &[Probe::Command(&["brew"])],
        rules: &[
            at("Library/Caches/Homebrew", "Homebrew cache", Safe),
            at(".cache/Homebrew", "Homebrew cache", Safe),
        ],
    },
    CatalogEntry {
        name: "iOS Backups",
        domain: Domain::System,
        detect: &[Probe::HomePath("Library/Application Support/MobileSync")],
        rules: &[at(
            "Library/Application Support/MobileSync/Backup",
            "iOS device backups (may contain important data)",
            Dangerous,
        )],
    },
    CatalogEntry {
        name: "Frontend",
        domain: Domain::Frontend,
        detect: &[Probe::Command(&["node", "npm", "yarn", "pnpm"])],
        rules: &[
            at(".npm", "npm cache", Safe),
            at(".cache/yarn", "Yarn cache", Safe),
            at("Library/Caches/Yarn", "Yarn global cache", Safe),
            at(".pnpm-store", "pnpm store", Safe),
            named("node_modules", "node_modules dependencies", Moderate),
            project("dist", "package.json", "Build output (dist)", Safe).outside("node_modules"),
            project("build", "package.json", "Build output (build)", Safe).outside("node_modules"),
            project("out", "package.json", "Build output (out)", Safe).outside("node_modules"),
            named(".next", "Next.js build cache", Safe),
            named(".vite", "Vite cache", Safe),
            named(".parcel-cache", "Parcel cache", Safe),
            named(".nyc_output", "NYC coverage output", Safe),
            named(".eslintcache", "ESLint cache", Safe),
            named("storybook-static", "Storybook static build", Safe),
            named("npm-debug.log*", "npm debug logs", Safe),
            named("yarn-error.log*", "Yarn error logs", Safe),
            named("yarn-debug.log*", "Yarn debug logs", Safe),
        ],
    },
    CatalogEntry {
        name: "Backend",
        domain: Domain::Backend,
        detect: &[Probe::Command(&[
            "python3", "python", "java", "go", "cargo", "php", "ruby",
        ])],
        rules: &[
            named("__pycache__", "Python bytecode cache", Safe),
            named("*.pyc", "Python compiled files", Safe),
            named(".pytest_cache", "pytest cache", Safe),
            named(".mypy_cache", "mypy cache", Safe),
            named(".tox", "tox environments", Safe),
            at("Library/Caches/pip", "pip cache", Safe),
            at(".cache/pip", "pip cache", Safe),
            at("Library/Caches/pypoetry", "Poetry cache", Safe),
            at(".cache/pypoetry", "Poetry cache", Safe),
            at(".m2/repository", "Maven local repository", Moderate),
            at(".gradle/caches", "Gradle cache", Safe),
            at("Library/Caches/go-build", "Go build cache", Safe),
            at(".cache/go-build", "Go build cache", Safe),
            at("go/pkg/mod", "Go module cache", Moderate),
            at(".cargo/registry", "Cargo registry cache", Safe),
            project("target", "Cargo.toml", "Rust build output (target)", Moderate)
                .outside("node_modules"),
            at(".composer/cache", "Composer cache", Safe),
            project("vendor", "composer.json", "PHP vendor dependencies", Moderate),
            at(".gem/cache", "Ruby gem cache", Safe),
            at(".bundle/cache", "Bundler cache", Safe),
        ],
    },
    CatalogEntry {
        name: "Mobile",
        domain: Domain::Mobile,
        detect: &[
            Probe::Path("/Applications/Xcode.app"),
            Probe::Command(&["adb", "flutter", "pod"]),
            Probe::HomePath("Library/Android"),
        ],
        rules: &[
            at(
                "Library/Developer/Xcode/DerivedData",
                "Xcode DerivedData (rebuilds automatically)",
                Safe,
            ),
            at(
                "Library/Developer/Xcode/DerivedData/ModuleCache.noindex",
                "Xcode Module Cache",
                Safe,
            ),
            at(
                "Library/Developer/Xcode/Archives",
                "Xcode Archives (old app versions)",
                Moderate,
            ),
            at(
                "Library/Developer/Xcode/iOS DeviceSupport",
                "iOS Device Support symbols",
                Safe,
            ),
            at(
                "Library/Developer/Xcode/watchOS DeviceSupport",
                "watchOS Device Support symbols",
                Safe,
            ),
            at(
                "Library/Developer/Xcode/tvOS DeviceSupport",
                "tvOS Device Support symbols",
                Safe,
            ),
            at(
                "Library/Developer/CoreSimulator/Caches",
                "iOS Simulator caches",
                Moderate,
            ),
            at(
                "Library/Developer/CoreSimulator/Devices",
                "iOS Simulator devices (can be recreated)",
                Moderate,
            ),
            at("Library/Caches/com.apple.dt.Xcode", "Xcode general cache", Safe),
            at("Library/Android/sdk/build-cache", "Android SDK build cache", Safe),
            at(".android/avd", "Android Virtual Devices", Moderate),
            at("Library/Caches/CocoaPods", "CocoaPods cache", Safe),
            project(".dart_tool", "pubspec.yaml", "Flutter/Dart build cache", Safe),
            project("build", "pubspec.yaml", "Flutter build output", Safe).outside("node_modules"),
            project("build", "gradle.properties", "Android build output", Safe)
                .outside("node_modules"),
        ],
    },
    CatalogEntry {
        name: "DevOps",
        domain: Domain::DevOps,
        detect: &[Probe::Command(&[
            "docker",
            "kubectl",
            "terraform",
            "helm",
            "vagrant",
        ])],
        rules: &[
            at(".kube/cache", "Kubernetes cache", Safe),
            at(".minikube", "Minikube cache and VMs", Moderate),
            at(".aws/cli/cache", "AWS CLI cache", Safe),
            at(".cache/helm", "Helm cache", Safe),
            at(".vagrant.d/boxes", "Vagrant boxes", Moderate),
            named(".terraform", "Terraform providers and modules", Moderate),
        ],
    },
    CatalogEntry {
        name: "Data/ML",
        domain: Domain::DataMl,
        detect: &[Probe::Command(&["conda", "jupyter", "python3"])],
        rules: &[
            at(".conda/pkgs", "Conda package cache", Safe),
            at(".conda/envs/.pkgs", "Conda environments tarball cache", Safe),
            at(".mamba/pkgs", "Mamba/Miniforge package cache", Safe),
            at("Library/Jupyter/runtime", "Jupyter runtime files", Safe),
            at("Library/Jupyter/kernels", "Jupyter kernels cache", Moderate),
            named(".ipynb_checkpoints", "Jupyter notebook checkpoints", Safe),
            at(".keras/datasets", "Keras/TensorFlow datasets cache", Safe),
            at(".keras/models", "Keras/TensorFlow models cache", Safe),
            at(".cache/torch/hub", "PyTorch Hub cache (pretrained models)", Safe),
            at(
                ".cache/huggingface",
                "Hugging Face model and dataset cache",
                Moderate,
            ),
            at(".cache/wandb", "Weights & Biases cache", Safe),
        ],
    },
];

/// 基于目录表的收集器
#[derive(Debug)]
pub struct CatalogCollector {
    entry: &'static CatalogEntry,
    home: PathBuf,
    scanner: Arc<PatternScanner>,
    detector: ToolDetector,
}

impl CatalogCollector {
    pub fn new(entry: &'static CatalogEntry, home: &Path, scanner: Arc<PatternScanner>) -> Self {
        Self {
            entry,
            home: home.to_path_buf(),
            scanner,
            detector: ToolDetector::new(home),
        }
    }

    fn scan_path(
        &self,
        path: PathBuf,
        description: &str,
        safety: SafetyLevel,
        cancel: &CancelToken,
        skipped: &mut u64,
    ) -> Option<CleanTarget> {
        if fs::symlink_metadata(&path).is_err() {
            return None;
        }

        let report = self.scanner.sizer().measure_with_cancel(&path, cancel);
        *skipped += report.skipped;
        if report.bytes == 0 {
            debug!("跳过空目录 {:?}", path);
            return None;
        }

        Some(CleanTarget::new(path, description, report.bytes, safety))
    }

    fn scan_absolute(
        &self,
        pattern: &str,
        description: &str,
        safety: SafetyLevel,
        cancel: &CancelToken,
        skipped: &mut u64,
    ) -> crate::Result<Vec<CleanTarget>> {
        let mut targets = Vec::new();
        for path in expand_path_pattern(pattern, skipped)? {
            cancel.check()?;
            targets.extend(self.scan_path(path, description, safety, cancel, skipped));
        }
        Ok(targets)
    }

    fn scan_pattern(
        &self,
        rule: &Rule,
        cancel: &CancelToken,
        skipped: &mut u64,
    ) -> crate::Result<Vec<CleanTarget>> {
        let Rule::Pattern {
            pattern,
            marker,
            skip_within,
            description,
            safety,
        } = *rule
        else {
            return Ok(Vec::new());
        };

        let mut stream = self.scanner.scan(pattern, cancel)?;
        let targets = stream
            .by_ref()
            .filter(|found| {
                let Some(parent) = found.path.parent() else {
                    return false;
                };
                let nested = skip_within
                    .is_some_and(|dir| parent.components().any(|c| c.as_os_str() == dir));
                let marked = marker.is_none_or(|marker| parent.join(marker).exists());
                !nested && marked
            })
            .map(|found| CleanTarget::new(found.path, description, found.size, safety))
            .collect();

        *skipped += stream.skipped();
        trace!(
            "{:?}: 同时遍历的根目录最多 {} 个",
            pattern,
            stream.peak_walkers()
        );
        Ok(targets)
    }
}

impl Collector for CatalogCollector {
    fn name(&self) -> &str {
        self.entry.name
    }

    fn domain(&self) -> Domain {
        self.entry.domain
    }

    fn detect(&self, _cancel: &CancelToken) -> Result<bool> {
        if self.entry.detect.is_empty() {
            return Ok(true);
        }
        Ok(self
            .entry
            .detect
            .iter()
            .any(|probe| self.detector.is_present(probe)))
    }

    fn scan(&self, cancel: &CancelToken, policy: &CleanPolicy) -> Result<Vec<CleanTarget>> {
        let mut targets = Vec::new();
        let mut skipped = 0;

        for rule in self.entry.rules {
            cancel.check()?;

            if !policy.allows(rule.safety()) {
                debug!(
                    "{}: {} 被清理级别 {} 排除",
                    self.entry.name,
                    rule.description(),
                    policy.clean_level
                );
                continue;
            }

            match *rule {
                Rule::Path {
                    path,
                    description,
                    safety,
                } => targets.extend(self.scan_path(
                    self.home.join(path),
                    description,
                    safety,
                    cancel,
                    &mut skipped,
                )),
                Rule::Absolute {
                    path,
                    description,
                    safety,
                } => targets.extend(self.scan_absolute(
                    path,
                    description,
                    safety,
                    cancel,
                    &mut skipped,
                )?),
                Rule::Pattern { .. } => {
                    targets.extend(self.scan_pattern(rule, cancel, &mut skipped)?)
                }
            }
        }

        cancel.check()?;

        if skipped > 0 {
            debug!("{}: 跳过 {} 个无法读取的条目", self.entry.name, skipped);
        }

        let targets = retain_outermost(targets);
        info!("{}: 找到 {} 个可清理目标", self.entry.name, targets.len());
        Ok(targets)
    }
}

/// 去掉位于其它目标内部的目标，避免重复计算
fn retain_outermost(mut targets: Vec<CleanTarget>) -> Vec<CleanTarget> {
    targets.sort_by(|a, b| a.path.cmp(&b.path));

    let mut kept: Vec<CleanTarget> = Vec::with_capacity(targets.len());
    for target in targets {
        let covered = kept
            .last()
            .is_some_and(|last| target.path.starts_with(&last.path));
        if !covered {
            kept.push(target);
        }
    }
    kept
}

/// 展开带通配符组件的绝对路径，只返回实际存在的路径
///
/// 无法读取的目录被跳过并计入 `skipped`。
pub(crate) fn expand_path_pattern(pattern: &str, skipped: &mut u64) -> crate::Result<Vec<PathBuf>> {
    let mut candidates = vec![PathBuf::new()];

    for component in Path::new(pattern).components() {
        let part = component.as_os_str();
        let glob = match component {
            Component::Normal(name) => name
                .to_str()
                .filter(|name| name.contains(['*', '?', '['])),
            _ => None,
        };

        let Some(glob) = glob else {
            for candidate in &mut candidates {
                candidate.push(part);
            }
            continue;
        };

        let matcher = compile_pattern(glob)?;
        let mut expanded = Vec::new();
        for dir in &candidates {
            let entries = match fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(e) => {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        trace!("无法读取 {:?}: {}", dir, e);
                        *skipped += 1;
                    }
                    continue;
                }
            };
            expanded.extend(
                entries
                    .flatten()
                    .filter(|entry| matcher.is_match(entry.file_name()))
                    .map(|entry| entry.path()),
            );
        }
        candidates = expanded;
    }

    candidates.retain(|path| fs::symlink_metadata(path).is_ok());
    candidates.sort();
    Ok(candidates)
}

/// 按目录表顺序构建内置收集器列表
pub fn default_registry(home: &Path, scanner: Arc<PatternScanner>) -> Vec<Box<dyn Collector>> {
    CATALOG
        .iter()
        .map(|entry| {
            Box::new(CatalogCollector::new(entry, home, Arc::clone(&scanner))) as Box<dyn Collector>
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::CleanLevel;
    use std::collections::HashSet;
    use std::fs;
    use tempfile::TempDir;

    static TEST_ENTRY: CatalogEntry = CatalogEntry {
        name: "Test",
        domain: Domain::Backend,
        detect: &[],
        rules: &[
            at(".cache/tool", "tool cache", Safe),
            at(".cache/empty", "empty cache", Safe),
            named("__pycache__", "Python bytecode cache", Safe),
            named("*.pyc", "Python compiled files", Safe),
            project("target", "Cargo.toml", "Rust build output", Moderate),
            at(".backups", "backups", Dangerous),
        ],
    };

    static GATED_ENTRY: CatalogEntry = CatalogEntry {
        name: "Gated",
        domain: Domain::DevOps,
        detect: &[Probe::Command(&["devpurge-no-such-tool"])],
        rules: &[],
    };

    struct Fixture {
        _home: TempDir,
        home: PathBuf,
        projects: PathBuf,
    }

    fn fixture() -> anyhow::Result<Fixture> {
        let home = TempDir::new()?;
        let root = home.path().to_path_buf();

        fs::create_dir_all(root.join(".cache/tool"))?;
        fs::write(root.join(".cache/tool/blob"), vec![0u8; 500])?;
        fs::create_dir_all(root.join(".cache/empty"))?;
        fs::create_dir_all(root.join(".backups"))?;
        fs::write(root.join(".backups/db.sqlite"), vec![0u8; 50])?;

        let projects = root.join("Projects");
        let rust = projects.join("crate_a");
        fs::create_dir_all(rust.join("target/debug"))?;
        fs::write(rust.join("Cargo.toml"), "[package]\nname = \"a\"\n")?;
        fs::write(rust.join("target/debug/a"), vec![0u8; 100])?;

        // 没有 Cargo.toml 的 target 目录不应被匹配
        fs::create_dir_all(projects.join("not_rust/target"))?;
        fs::write(projects.join("not_rust/target/x"), "x")?;

        let py = projects.join("py/__pycache__");
        fs::create_dir_all(&py)?;
        fs::write(py.join("m.cpython-312.pyc"), vec![0u8; 30])?;
        fs::write(projects.join("py/loose.pyc"), vec![0u8; 10])?;

        Ok(Fixture {
            home: root,
            projects,
            _home: home,
        })
    }

    fn collector(
        fixture: &Fixture,
        entry: &'static CatalogEntry,
    ) -> anyhow::Result<CatalogCollector> {
        let scanner = PatternScanner::new([fixture.projects.clone()])?;
        Ok(CatalogCollector::new(entry, &fixture.home, Arc::new(scanner)))
    }

    #[test]
    fn test_scan_respects_clean_level() -> anyhow::Result<()> {
        let fixture = fixture()?;
        let collector = collector(&fixture, &TEST_ENTRY)?;

        let conservative = CleanPolicy {
            clean_level: CleanLevel::Conservative,
            ..Default::default()
        };
        let targets = collector.scan(&CancelToken::new(), &conservative)?;
        assert!(targets.iter().all(|t| t.safety == SafetyLevel::Safe));

        let aggressive = CleanPolicy {
            clean_level: CleanLevel::Aggressive,
            ..Default::default()
        };
        let targets = collector.scan(&CancelToken::new(), &aggressive)?;
        let safeties: HashSet<SafetyLevel> = targets.iter().map(|t| t.safety).collect();
        assert_eq!(safeties.len(), 3);
        Ok(())
    }

    #[test]
    fn test_scan_finds_expected_targets() -> anyhow::Result<()> {
        let fixture = fixture()?;
        let collector = collector(&fixture, &TEST_ENTRY)?;
        let targets = collector.scan(&CancelToken::new(), &CleanPolicy::default())?;

        let paths: Vec<&Path> = targets.iter().map(|t| t.path.as_path()).collect();
        assert!(paths.contains(&fixture.home.join(".cache/tool").as_path()));
        assert!(paths.contains(&fixture.projects.join("crate_a/target").as_path()));
        assert!(paths.contains(&fixture.projects.join("py/__pycache__").as_path()));
        assert!(paths.contains(&fixture.projects.join("py/loose.pyc").as_path()));

        // 空目录、缺少标记文件的目录、已被覆盖的文件都不应出现
        assert!(!paths.contains(&fixture.home.join(".cache/empty").as_path()));
        assert!(!paths.contains(&fixture.projects.join("not_rust/target").as_path()));
        assert!(
            !paths
                .iter()
                .any(|p| p.ends_with("__pycache__/m.cpython-312.pyc"))
        );
        assert_eq!(targets.len(), 4);

        let tool = targets
            .iter()
            .find(|t| t.path.ends_with(".cache/tool"))
            .unwrap();
        assert_eq!(tool.size_bytes, 500);
        Ok(())
    }

    #[test]
    fn test_cancelled_scan_errors() -> anyhow::Result<()> {
        let fixture = fixture()?;
        let collector = collector(&fixture, &TEST_ENTRY)?;
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(collector.scan(&cancel, &CleanPolicy::default()).is_err());
        Ok(())
    }

    #[test]
    fn test_detect() -> anyhow::Result<()> {
        let fixture = fixture()?;
        assert!(collector(&fixture, &TEST_ENTRY)?.detect(&CancelToken::new())?);
        assert!(!collector(&fixture, &GATED_ENTRY)?.detect(&CancelToken::new())?);
        Ok(())
    }

    #[test]
    fn test_retain_outermost() {
        let targets = vec![
            CleanTarget::new("/p/a/node_modules/x", "inner", 1, Safe),
            CleanTarget::new("/p/a/node_modules", "outer", 5, Safe),
            CleanTarget::new("/p/b", "other", 2, Safe),
            CleanTarget::new("/p/a/node_modules_extra", "sibling", 3, Safe),
        ];
        let kept = retain_outermost(targets);
        let names: Vec<&str> = kept.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(names, vec!["outer", "sibling", "other"]);
    }

    #[test]
    fn test_catalog_names_are_unique() {
        let names: HashSet<&str> = CATALOG.iter().map(|e| e.name).collect();
        assert_eq!(names.len(), CATALOG.len());
    }

    #[test]
    fn test_default_registry_matches_catalog() -> anyhow::Result<()> {
        let home = TempDir::new()?;
        let scanner = Arc::new(PatternScanner::new(Vec::<PathBuf>::new())?);
        let registry = default_registry(home.path(), scanner);
        assert_eq!(registry.len(), CATALOG.len());
        assert_eq!(registry[0].name(), CATALOG[0].name);
        Ok(())
    }

    #[test]
    fn test_expand_path_pattern_matches_glob_components() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let volumes = temp_dir.path().join("Volumes");
        fs::create_dir_all(volumes.join("Backup/.Trashes/501"))?;
        fs::write(volumes.join("Backup/.Trashes/501/old.mov"), vec![0u8; 700])?;
        fs::create_dir_all(volumes.join("Empty/.Trashes"))?;
        fs::create_dir_all(volumes.join("NoTrash"))?;

        let pattern = format!("{}/*/.Trashes", volumes.display());
        let mut skipped = 0;
        let found = expand_path_pattern(&pattern, &mut skipped)?;
        assert_eq!(
            found,
            vec![
                volumes.join("Backup/.Trashes"),
                volumes.join("Empty/.Trashes"),
            ]
        );
        assert_eq!(skipped, 0);

        // 不含通配符的路径原样返回（存在时）
        let plain = volumes.join("NoTrash");
        let found = expand_path_pattern(&plain.to_string_lossy(), &mut skipped)?;
        assert_eq!(found, vec![plain]);

        let missing = format!("{}/absent/*", temp_dir.path().display());
        assert!(expand_path_pattern(&missing, &mut skipped)?.is_empty());
        assert!(matches!(
            expand_path_pattern("/tmp/[unclosed", &mut skipped),
            Err(crate::Error::InvalidPattern { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_absolute_rule_sizes_expanded_paths() -> anyhow::Result<()> {
        let fixture = fixture()?;
        let collector = collector(&fixture, &TEST_ENTRY)?;
        let logs = fixture.home.join("var/log");
        fs::create_dir_all(&logs)?;
        fs::write(logs.join("system.log"), vec![0u8; 64])?;
        fs::write(logs.join("empty.log"), "")?;
        fs::write(logs.join("notes.txt"), "keep")?;

        let pattern = format!("{}/*.log", logs.display());
        let mut skipped = 0;
        let targets = collector.scan_absolute(
            &pattern,
            "System log files",
            Moderate,
            &CancelToken::new(),
            &mut skipped,
        )?;

        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].path, logs.join("system.log"));
        assert_eq!(targets[0].size_bytes, 64);
        assert_eq!(targets[0].safety, Moderate);
        Ok(())
    }

    #[test]
    fn test_catalog_absolute_rules_are_valid() -> anyhow::Result<()> {
        let mut skipped = 0;
        for entry in CATALOG {
            for rule in entry.rules {
                if let Rule::Absolute { path, .. } = *rule {
                    assert!(Path::new(path).is_absolute(), "{path}");
                    // 展开本身不能因为模式错误而失败
                    expand_path_pattern(path, &mut skipped)?;
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_system_caches_registered_first() {
        assert_eq!(CATALOG[0].name, "System Caches");
        assert_eq!(CATALOG[0].rules[0], at("Library/Caches", "User caches", Safe));
    }
}
