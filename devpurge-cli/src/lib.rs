use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use devpurge_core::{
    CancelToken, CleanLevel, CleanPolicy, CleanTarget, CleanupOrchestrator, CollectorFailure,
    DetectionReport, Domain, PatternScanner, RunOutcome, RunReport, ScanReport, Settings,
    ToolDetector, config::parse_domains, default_registry, format_bytes,
};

/// 扫描相关的公共参数
#[derive(Debug, Clone, Default, Args)]
pub struct ScanArgs {
    /// Clean level: conservative, standard or aggressive
    #[arg(short, long)]
    pub level: Option<String>,

    /// Only process these domains (can be specified multiple times)
    #[arg(short = 'D', long = "domain", action = clap::ArgAction::Append)]
    pub domains: Vec<String>,

    /// Extra directories to search for project artifacts
    #[arg(short = 's', long = "search-dir", action = clap::ArgAction::Append)]
    pub search_dirs: Vec<PathBuf>,

    /// Maximum number of scan roots walked at once
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Settings file (defaults to <config dir>/devpurge/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Parser)]
#[command(name = "devpurge")]
#[command(about = "A tool for reclaiming disk space from developer caches and build artifacts")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan and clean developer caches
    Clean {
        #[command(flatten)]
        scan: ScanArgs,

        /// Dry run - show what would be cleaned without actually cleaning
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Show what could be cleaned without deleting anything
    Report {
        #[command(flatten)]
        scan: ScanArgs,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show which development tools are installed
    Detect,
    /// Conservative, non-interactive clean of detected domains
    Smart {
        /// Dry run - show what would be cleaned without actually cleaning
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Extra directories to search for project artifacts
        #[arg(short = 's', long = "search-dir", action = clap::ArgAction::Append)]
        search_dirs: Vec<PathBuf>,
    },
}

pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // 设置日志级别
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "devpurge={log_level},devpurge_core={log_level},devpurge_cli={log_level}"
        ))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let home = dirs::home_dir().ok_or(devpurge_core::Error::NoHomeDir)?;

    match cli.command {
        Commands::Clean { scan, dry_run, yes } => handle_clean_command(&home, &scan, dry_run, yes),
        Commands::Report { scan, json } => handle_report_command(&home, &scan, json),
        Commands::Detect => handle_detect_command(&home),
        Commands::Smart {
            dry_run,
            search_dirs,
        } => handle_smart_command(&home, dry_run, search_dirs),
    }
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let settings = match path {
        Some(path) => Settings::load(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => Settings::load_default().context("failed to load default settings")?,
    };
    Ok(settings)
}

/// 合并配置文件与命令行参数，命令行优先
fn build_policy(args: &ScanArgs, settings: &Settings) -> Result<CleanPolicy> {
    let mut policy = CleanPolicy::default();
    settings.apply_to(&mut policy)?;

    if let Some(level) = &args.level {
        policy.clean_level = level.parse()?;
    }
    if !args.domains.is_empty() {
        policy.domains = parse_domains(&args.domains)?;
    }
    if let Some(n) = args.concurrency.filter(|n| *n > 0) {
        policy.max_concurrent = n;
    }

    Ok(policy)
}

fn build_orchestrator(
    home: &Path,
    search_dirs: impl IntoIterator<Item = PathBuf>,
    policy: &CleanPolicy,
) -> Result<CleanupOrchestrator> {
    let mut scanner =
        PatternScanner::with_default_roots(home).context("failed to create pattern scanner")?;
    for dir in search_dirs {
        if let Err(e) = scanner.add_search_dir(dir.as_path()) {
            warn!("忽略搜索目录 {:?}: {}", dir, e);
        }
    }
    scanner.set_concurrency(policy.max_concurrent);
    info!(
        "搜索目录: {:?}, 并发度: {}",
        scanner.roots(),
        scanner.concurrency()
    );

    Ok(CleanupOrchestrator::with_collectors(default_registry(
        home,
        Arc::new(scanner),
    )))
}

fn prepare(home: &Path, args: &ScanArgs) -> Result<(CleanPolicy, CleanupOrchestrator)> {
    let settings = load_settings(args.config.as_deref())?;
    // 级别或领域无效时在扫描前失败
    let policy = build_policy(args, &settings)?;

    let search_dirs = settings
        .search_dirs(home)
        .into_iter()
        .chain(args.search_dirs.iter().cloned());
    let orchestrator = build_orchestrator(home, search_dirs, &policy)?;
    Ok((policy, orchestrator))
}

fn handle_clean_command(home: &Path, args: &ScanArgs, dry_run: bool, yes: bool) -> Result<()> {
    let (mut policy, orchestrator) = prepare(home, args)?;
    policy.dry_run |= dry_run;
    policy.interactive &= !yes;

    println!("Clean level: {}", policy.clean_level);
    if policy.dry_run {
        println!("DRY RUN - nothing will be deleted");
    }

    let mut prompted = false;
    let mut confirm = |report: &ScanReport| {
        prompted = true;
        display_scan_report(report);
        confirm_clean(report).unwrap_or(false)
    };
    let report = orchestrator.run(&policy, &CancelToken::new(), &mut confirm);

    if !prompted {
        display_scan_report(&report.scan);
    }
    display_run_report(&report);
    Ok(())
}

/// JSON 报告格式
#[derive(Debug, Serialize)]
struct ReportOutput<'a> {
    clean_level: CleanLevel,
    total_targets: usize,
    total_bytes: u64,
    targets: &'a BTreeMap<String, Vec<CleanTarget>>,
    failures: &'a [CollectorFailure],
}

fn handle_report_command(home: &Path, args: &ScanArgs, json: bool) -> Result<()> {
    let (mut policy, orchestrator) = prepare(home, args)?;
    policy.dry_run = true;

    let phase = orchestrator.scan(&policy, &CancelToken::new());

    if json {
        let output = ReportOutput {
            clean_level: policy.clean_level,
            total_targets: phase.report.total_targets(),
            total_bytes: phase.report.total_bytes(),
            targets: &phase.report.targets,
            failures: &phase.failures,
        };
        let json = serde_json::to_string_pretty(&output).context("failed to serialize report")?;
        println!("{json}");
    } else {
        display_scan_report(&phase.report);
        display_failures(&phase.failures);
    }
    Ok(())
}

fn handle_detect_command(home: &Path) -> Result<()> {
    let report = ToolDetector::new(home).detect_all();
    display_detection(&report);
    Ok(())
}

fn handle_smart_command(home: &Path, dry_run: bool, search_dirs: Vec<PathBuf>) -> Result<()> {
    let detection = ToolDetector::new(home).detect_all();
    display_detection(&detection);

    let policy = CleanPolicy {
        clean_level: CleanLevel::Conservative,
        dry_run,
        interactive: false,
        domains: smart_domains(&detection),
        ..Default::default()
    };
    let orchestrator = build_orchestrator(home, search_dirs, &policy)?;

    let report = orchestrator.run(&policy, &CancelToken::new(), &mut |_: &ScanReport| true);
    display_scan_report(&report.scan);
    display_run_report(&report);
    Ok(())
}

/// 系统领域总是包含在内，其余领域需要检测到相关工具
fn smart_domains(detection: &DetectionReport) -> Vec<Domain> {
    Domain::ALL
        .iter()
        .copied()
        .filter(|domain| *domain == Domain::System || detection.has_domain(*domain))
        .collect()
}

fn display_detection(report: &DetectionReport) {
    if report.is_empty() {
        println!("No development tools detected.");
        return;
    }

    println!("\nDetected development tools:");
    for (domain, tools) in &report.by_domain {
        println!("  {:<12} {}", domain.label(), tools.join(", "));
    }
}

fn display_scan_report(report: &ScanReport) {
    if report.is_empty() {
        println!("Nothing to clean.");
        return;
    }

    println!("\nFound {} items to clean:", report.total_targets());
    println!("{:<3} {:<45} {:<12} {:<20}", "", "Description", "Size", "Path");
    println!("{}", "-".repeat(90));

    for (collector, targets) in &report.targets {
        let bytes: u64 = targets.iter().map(|t| t.size_bytes).sum();
        println!("{} ({})", collector, format_bytes(bytes));
        for target in targets {
            println!(
                "{:<3} {:<45} {:<12} {}",
                target.safety.icon(),
                target.description,
                target.formatted_size(),
                target.path.display()
            );
        }
    }

    println!("{}", "-".repeat(90));
    println!("Total size: {}", format_bytes(report.total_bytes()));
}

fn confirm_clean(report: &ScanReport) -> Result<bool> {
    print!(
        "\nThis will delete {} items and free up {}. Continue? [y/N]: ",
        report.total_targets(),
        format_bytes(report.total_bytes())
    );

    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(is_yes(&input))
}

fn is_yes(input: &str) -> bool {
    let answer = input.trim().to_lowercase();
    answer == "y" || answer == "yes"
}

fn display_failures(failures: &[CollectorFailure]) {
    if failures.is_empty() {
        return;
    }

    println!("\n{} collectors reported errors:", failures.len());
    for failure in failures {
        println!(
            "  - {} ({}): {}",
            failure.collector, failure.stage, failure.message
        );
    }
}

fn display_run_report(report: &RunReport) {
    match report.outcome {
        RunOutcome::NothingToClean => {
            display_failures(&report.failures);
            return;
        }
        RunOutcome::Declined => {
            println!("Cleaning cancelled.");
            return;
        }
        RunOutcome::Cancelled => println!("\nCleaning interrupted, partial results:"),
        RunOutcome::Completed if report.dry_run => println!("\nDry run completed!"),
        RunOutcome::Completed => println!("\nCleaning completed!"),
    }

    let summary = report.summary();
    println!("Items cleaned: {}", summary.cleaned);
    if report.dry_run {
        println!("Size that would be freed: {}", summary.format_size());
    } else {
        println!("Size freed: {}", summary.format_size());
    }
    println!("Time: {}ms", report.duration_ms);

    if !report.results.iter().all(|r| r.success) {
        println!("\nFailed to clean {} items:", summary.failed);
        for result in report.results.iter().filter(|r| !r.success) {
            println!(
                "  - {} ({})",
                result.target.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    display_failures(&report.failures);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use devpurge_core::{SafetyLevel, detect::ToolProbe};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_cli_parse_clean_command() {
        let args = vec![
            "devpurge",
            "clean",
            "--level",
            "aggressive",
            "--domain",
            "frontend",
            "-D",
            "mobile",
            "--dry-run",
            "--yes",
        ];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Clean { scan, dry_run, yes } => {
                assert_eq!(scan.level.as_deref(), Some("aggressive"));
                assert_eq!(scan.domains, vec!["frontend", "mobile"]);
                assert!(dry_run);
                assert!(yes);
            }
            _ => panic!("Expected Clean command"),
        }
    }

    #[test]
    fn test_cli_parse_report_command() {
        let args = vec![
            "devpurge",
            "report",
            "--json",
            "--search-dir",
            "/work",
            "-j",
            "8",
            "--verbose",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(cli.verbose);

        match cli.command {
            Commands::Report { scan, json } => {
                assert!(json);
                assert_eq!(scan.search_dirs, vec![PathBuf::from("/work")]);
                assert_eq!(scan.concurrency, Some(8));
            }
            _ => panic!("Expected Report command"),
        }
    }

    #[test]
    fn test_build_policy_flags_override_settings() {
        let settings = Settings {
            level: Some("conservative".to_string()),
            domains: vec!["backend".to_string()],
            max_concurrent: Some(2),
            ..Default::default()
        };
        let args = ScanArgs {
            level: Some("aggressive".to_string()),
            concurrency: Some(6),
            ..Default::default()
        };

        let policy = build_policy(&args, &settings).unwrap();
        assert_eq!(policy.clean_level, CleanLevel::Aggressive);
        assert_eq!(policy.domains, vec![Domain::Backend]);
        assert_eq!(policy.max_concurrent, 6);
        assert!(policy.allows(SafetyLevel::Dangerous));
    }

    #[test]
    fn test_build_policy_rejects_invalid_level() {
        let args = ScanArgs {
            level: Some("extreme".to_string()),
            ..Default::default()
        };
        assert!(build_policy(&args, &Settings::default()).is_err());

        let args = ScanArgs {
            domains: vec!["gamedev".to_string()],
            ..Default::default()
        };
        assert!(build_policy(&args, &Settings::default()).is_err());
    }

    #[test]
    fn test_load_settings_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "level = \"standard\"\nmax_concurrent = 3\n").unwrap();

        let settings = load_settings(Some(&path)).unwrap();
        assert_eq!(settings.level.as_deref(), Some("standard"));
        assert_eq!(settings.max_concurrent, Some(3));

        assert!(load_settings(Some(&temp_dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn test_smart_domains_include_system() {
        let home = TempDir::new().unwrap();
        fs::create_dir_all(home.path().join(".keras")).unwrap();

        let table = [ToolProbe {
            domain: Domain::DataMl,
            name: "keras",
            probes: &[devpurge_core::detect::Probe::HomePath(".keras")],
        }];
        let detection = ToolDetector::new(home.path()).detect_from(&table);

        assert_eq!(smart_domains(&detection), vec![Domain::System, Domain::DataMl]);
        assert_eq!(
            smart_domains(&DetectionReport::default()),
            vec![Domain::System]
        );
    }

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("nope"));
    }

    #[test]
    fn test_display_empty_reports() {
        display_scan_report(&ScanReport::default());
        display_detection(&DetectionReport::default());
        display_failures(&[]);
    }
}
