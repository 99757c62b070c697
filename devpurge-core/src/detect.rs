use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::safety::Domain;

/// `command` 是否能在 `PATH` 中找到
pub fn command_exists(command: &str) -> bool {
    which::which(command).is_ok()
}

/// 判断工具是否安装的方式
#[derive(Debug, Clone, Copy)]
pub enum Probe {
    /// `PATH` 中存在任意一个命令
    Command(&'static [&'static str]),
    /// 绝对路径
    Path(&'static str),
    /// 相对于用户主目录的路径
    HomePath(&'static str),
}

/// 一个待检测的开发工具
#[derive(Debug, Clone, Copy)]
pub struct ToolProbe {
    pub domain: Domain,
    pub name: &'static str,
    pub probes: &'static [Probe],
}

const fn tool(domain: Domain, name: &'static str, probes: &'static [Probe]) -> ToolProbe {
    ToolProbe {
        domain,
        name,
        probes,
    }
}

pub const TOOL_PROBES: &[ToolProbe] = &[
    tool(Domain::Frontend, "node", &[Probe::Command(&["node"])]),
    tool(Domain::Frontend, "npm", &[Probe::Command(&["npm"])]),
    tool(Domain::Frontend, "yarn", &[Probe::Command(&["yarn"])]),
    tool(Domain::Frontend, "pnpm", &[Probe::Command(&["pnpm"])]),
    tool(Domain::Frontend, "bun", &[Probe::Command(&["bun"])]),
    tool(Domain::Frontend, "deno", &[Probe::Command(&["deno"])]),
    tool(Domain::Backend, "python", &[Probe::Command(&["python3", "python"])]),
    tool(Domain::Backend, "java", &[Probe::Command(&["java"])]),
    tool(Domain::Backend, "go", &[Probe::Command(&["go"])]),
    tool(Domain::Backend, "rust", &[Probe::Command(&["cargo"])]),
    tool(Domain::Backend, "php", &[Probe::Command(&["php"])]),
    tool(Domain::Backend, "ruby", &[Probe::Command(&["ruby"])]),
    tool(Domain::Backend, ".net", &[Probe::Command(&["dotnet"])]),
    tool(Domain::Backend, "maven", &[Probe::Command(&["mvn"])]),
    tool(Domain::Backend, "gradle", &[Probe::Command(&["gradle"])]),
    tool(Domain::Mobile, "xcode", &[Probe::Path("/Applications/Xcode.app")]),
    tool(
        Domain::Mobile,
        "android",
        &[Probe::Command(&["adb"]), Probe::HomePath("Library/Android")],
    ),
    tool(Domain::Mobile, "flutter", &[Probe::Command(&["flutter"])]),
    tool(Domain::Mobile, "cocoapods", &[Probe::Command(&["pod"])]),
    tool(Domain::DevOps, "docker", &[Probe::Command(&["docker"])]),
    tool(Domain::DevOps, "kubernetes", &[Probe::Command(&["kubectl"])]),
    tool(Domain::DevOps, "terraform", &[Probe::Command(&["terraform"])]),
    tool(Domain::DevOps, "helm", &[Probe::Command(&["helm"])]),
    tool(Domain::DevOps, "vagrant", &[Probe::Command(&["vagrant"])]),
    tool(Domain::DataMl, "conda", &[Probe::Command(&["conda"])]),
    tool(Domain::DataMl, "jupyter", &[Probe::Command(&["jupyter"])]),
    tool(Domain::DataMl, "keras", &[Probe::HomePath(".keras")]),
    tool(Domain::DataMl, "pytorch", &[Probe::HomePath(".cache/torch")]),
    tool(Domain::System, "homebrew", &[Probe::Command(&["brew"])]),
];

/// 按领域分组的已安装工具
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionReport {
    pub by_domain: BTreeMap<Domain, Vec<&'static str>>,
}

impl DetectionReport {
    pub fn tools(&self, domain: Domain) -> &[&'static str] {
        self.by_domain.get(&domain).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_domain(&self, domain: Domain) -> bool {
        !self.tools(domain).is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.by_domain.is_empty()
    }
}

/// 开发工具检测器
#[derive(Debug, Clone)]
pub struct ToolDetector {
    home: PathBuf,
}

impl ToolDetector {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    pub fn is_present(&self, probe: &Probe) -> bool {
        match probe {
            Probe::Command(commands) => commands.iter().any(|c| command_exists(c)),
            Probe::Path(path) => Path::new(path).exists(),
            Probe::HomePath(path) => self.home.join(path).exists(),
        }
    }

    pub fn detect_all(&self) -> DetectionReport {
        self.detect_from(TOOL_PROBES)
    }

    pub fn detect_from(&self, table: &[ToolProbe]) -> DetectionReport {
        let mut report = DetectionReport::default();
        for tool in table {
            if tool.probes.iter().any(|p| self.is_present(p)) {
                debug!("检测到 {} ({})", tool.name, tool.domain);
                report.by_domain.entry(tool.domain).or_default().push(tool.name);
            }
        }
        report
    }
}
