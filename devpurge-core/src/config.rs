use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::safety::{CleanLevel, Domain, SafetyLevel};
use crate::scanner::DEFAULT_CONCURRENCY;

/// 清理策略配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanPolicy {
    pub clean_level: CleanLevel,
    /// 只报告将要清理的内容，不执行删除
    pub dry_run: bool,
    /// 删除前需要确认
    pub interactive: bool,
    /// 要处理的领域（为空表示全部）
    pub domains: Vec<Domain>,
    pub max_concurrent: usize,
}

impl Default for CleanPolicy {
    fn default() -> Self {
        Self {
            clean_level: CleanLevel::Standard,
            dry_run: false,
            interactive: true,
            domains: Vec::new(),
            max_concurrent: DEFAULT_CONCURRENCY,
        }
    }
}

impl CleanPolicy {
    /// 当前清理力度是否允许处理该风险等级
    pub fn allows(&self, safety: SafetyLevel) -> bool {
        self.clean_level.allows(safety)
    }

    /// 领域过滤
    pub fn includes_domain(&self, domain: Domain) -> bool {
        self.domains.is_empty() || self.domains.contains(&domain)
    }
}

/// 磁盘上的配置文件（`config.toml`）
///
/// 所有键都是可选的，命令行参数会覆盖这里的设置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub level: Option<String>,
    pub dry_run: Option<bool>,
    pub interactive: Option<bool>,
    pub domains: Vec<String>,
    pub max_concurrent: Option<usize>,
    pub search_dirs: Vec<String>,
}

impl Settings {
    /// 默认配置文件位置：`<config_dir>/devpurge/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("devpurge").join("config.toml"))
    }

    /// 从 `path` 加载配置，解析失败直接报错
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let settings: Settings = toml::from_str(&content).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        info!("loaded settings from {:?}", path);
        Ok(settings)
    }

    /// 默认配置文件存在时加载它
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => {
                debug!("no settings file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// 将配置合并进 `policy`，同时校验清理级别和领域
    pub fn apply_to(&self, policy: &mut CleanPolicy) -> Result<()> {
        if let Some(level) = &self.level {
            policy.clean_level = level.parse()?;
        }
        if let Some(dry_run) = self.dry_run {
            policy.dry_run = dry_run;
        }
        if let Some(interactive) = self.interactive {
            policy.interactive = interactive;
        }
        if !self.domains.is_empty() {
            policy.domains = parse_domains(&self.domains)?;
        }
        if let Some(n) = self.max_concurrent.filter(|n| *n > 0) {
            policy.max_concurrent = n;
        }
        Ok(())
    }

    /// 展开 `~` 后的搜索目录
    pub fn search_dirs(&self, home: &Path) -> Vec<PathBuf> {
        self.search_dirs
            .iter()
            .map(|dir| expand_home(dir, home))
            .collect()
    }
}

/// 解析领域名称列表，遇到未知名称即失败
pub fn parse_domains<S: AsRef<str>>(names: &[S]) -> Result<Vec<Domain>> {
    let mut domains = Vec::new();
    for name in names {
        let domain: Domain = name.as_ref().parse()?;
        if !domains.contains(&domain) {
            domains.push(domain);
        }
    }
    Ok(domains)
}

/// 将开头的 `~` 或 `~/` 展开为 `home`
pub fn expand_home(path: &str, home: &Path) -> PathBuf {
    if path == "~" {
        home.to_path_buf()
    } else if let Some(rest) = path.strip_prefix("~/") {
        home.join(rest)
    } else {
        PathBuf::from(path)
    }
}
