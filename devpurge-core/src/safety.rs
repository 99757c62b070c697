use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// 清理目标的风险等级
///
/// 由收集器根据领域知识静态指定，从不根据目标内容动态计算。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum SafetyLevel {
    /// 无风险，可轻松重建（缓存、日志）
    #[default]
    Safe,
    /// 需要重新构建（node_modules、构建产物）
    Moderate,
    /// 可能丢失数据（备份、数据卷）
    Dangerous,
}

impl SafetyLevel {
    pub const ALL: [SafetyLevel; 3] = [
        SafetyLevel::Safe,
        SafetyLevel::Moderate,
        SafetyLevel::Dangerous,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SafetyLevel::Safe => "Safe",
            SafetyLevel::Moderate => "Moderate",
            SafetyLevel::Dangerous => "Dangerous",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            SafetyLevel::Safe => "🟢",
            SafetyLevel::Moderate => "🟡",
            SafetyLevel::Dangerous => "🔴",
        }
    }
}

impl fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 操作者选择的清理力度
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum CleanLevel {
    /// 只处理 Safe 目标
    Conservative,
    /// 安全 + 中等
    #[default]
    Standard,
    /// 所有目标，包括 Dangerous
    Aggressive,
}

impl CleanLevel {
    pub const ALL: [CleanLevel; 3] = [
        CleanLevel::Conservative,
        CleanLevel::Standard,
        CleanLevel::Aggressive,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CleanLevel::Conservative => "conservative",
            CleanLevel::Standard => "standard",
            CleanLevel::Aggressive => "aggressive",
        }
    }

    /// 判断该清理力度是否允许处理指定风险等级的目标
    pub fn allows(self, safety: SafetyLevel) -> bool {
        SafetyGate::allows(self, safety)
    }
}

impl fmt::Display for CleanLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 区分大小写的精确匹配，其它任何字符串都是配置错误
impl FromStr for CleanLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "conservative" => Ok(CleanLevel::Conservative),
            "standard" => Ok(CleanLevel::Standard),
            "aggressive" => Ok(CleanLevel::Aggressive),
            other => Err(Error::InvalidCleanLevel(other.to_string())),
        }
    }
}

/// 清理级别到可处理风险等级的纯策略映射
///
/// The permitted sets nest: conservative ⊆ standard ⊆ aggressive.
#[derive(Debug, Clone, Copy, Default)]
pub struct SafetyGate;

impl SafetyGate {
    pub fn allows(level: CleanLevel, safety: SafetyLevel) -> bool {
        match level {
            CleanLevel::Conservative => safety == SafetyLevel::Safe,
            CleanLevel::Standard => matches!(safety, SafetyLevel::Safe | SafetyLevel::Moderate),
            CleanLevel::Aggressive => true,
        }
    }

    /// 按原始级别名称（来自命令行或配置文件）判断
    ///
    /// 无法识别的名称拒绝所有等级
    pub fn allows_named(level: &str, safety: SafetyLevel) -> bool {
        level
            .parse::<CleanLevel>()
            .map(|level| Self::allows(level, safety))
            .unwrap_or(false)
    }

    /// `level` 允许的等级，风险由低到高
    pub fn permitted(level: CleanLevel) -> Vec<SafetyLevel> {
        SafetyLevel::ALL
            .into_iter()
            .filter(|safety| Self::allows(level, *safety))
            .collect()
    }
}

/// 收集器所属的技术领域
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    System,
    Frontend,
    Backend,
    Mobile,
    #[serde(rename = "devops")]
    DevOps,
    #[serde(rename = "dataml", alias = "data/ml")]
    DataMl,
}

impl Domain {
    pub const ALL: [Domain; 6] = [
        Domain::System,
        Domain::Frontend,
        Domain::Backend,
        Domain::Mobile,
        Domain::DevOps,
        Domain::DataMl,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Domain::System => "System",
            Domain::Frontend => "Frontend",
            Domain::Backend => "Backend",
            Domain::Mobile => "Mobile",
            Domain::DevOps => "DevOps",
            Domain::DataMl => "Data/ML",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Domain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "system" => Ok(Domain::System),
            "frontend" => Ok(Domain::Frontend),
            "backend" => Ok(Domain::Backend),
            "mobile" => Ok(Domain::Mobile),
            "devops" => Ok(Domain::DevOps),
            "dataml" | "data/ml" => Ok(Domain::DataMl),
            _ => Err(Error::InvalidDomain(s.to_string())),
        }
    }
}
