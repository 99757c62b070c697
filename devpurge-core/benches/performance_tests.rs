use criterion::{Criterion, criterion_group, criterion_main};
use devpurge_core::{
    CancelToken, CleanPolicy, CleanTarget, PatternScanner, SafetyLevel, SizeAggregator,
    remove_targets,
};
use std::fs;
use std::hint::black_box;
use std::path::Path;
use tempfile::TempDir;

/// 创建一个带 node_modules 的前端项目
fn create_node_project(base_path: &Path, name: &str) -> anyhow::Result<()> {
    let project_path = base_path.join(name);
    fs::create_dir_all(&project_path)?;
    fs::write(
        project_path.join("package.json"),
        format!(r#"{{ "name": "{name}", "version": "1.0.0" }}"#),
    )?;

    // 模拟依赖包
    for pkg in 0..8 {
        let pkg_dir = project_path
            .join("node_modules")
            .join(format!("pkg_{pkg}"))
            .join("lib");
        fs::create_dir_all(&pkg_dir)?;
        for i in 0..5 {
            let content = "x".repeat(512 * (i + 1));
            fs::write(pkg_dir.join(format!("file_{i}.js")), &content)?;
        }
    }

    // 构建产物
    let dist = project_path.join("dist");
    fs::create_dir_all(&dist)?;
    fs::write(dist.join("bundle.js"), "b".repeat(4096))?;

    Ok(())
}

fn create_multiple_projects(base_path: &Path, count: usize) -> anyhow::Result<()> {
    for i in 0..count {
        create_node_project(base_path, &format!("project_{i:03}"))?;
    }
    Ok(())
}

/// 基准测试：并行vs串行大小统计
fn bench_size_parallel_vs_sequential(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    create_multiple_projects(temp_dir.path(), 20).unwrap();

    let sizer = SizeAggregator::new(10).unwrap();
    let mut group = c.benchmark_group("size_parallel_vs_sequential");

    group.bench_function("pooled", |b| {
        b.iter(|| {
            let report = sizer.measure(black_box(temp_dir.path()));
            black_box(report);
        })
    });

    group.bench_function("sequential", |b| {
        b.iter(|| {
            let report = SizeAggregator::measure_sequential(black_box(temp_dir.path()));
            black_box(report);
        })
    });

    group.finish();
}

/// 基准测试：按名称扫描 node_modules
fn bench_pattern_scan(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    create_multiple_projects(temp_dir.path(), 50).unwrap();

    let scanner = PatternScanner::new([temp_dir.path()]).unwrap();

    c.bench_function("scan_node_modules_50_projects", |b| {
        b.iter(|| {
            let matches: Vec<_> = scanner
                .scan(black_box("node_modules"), &CancelToken::new())
                .unwrap()
                .collect();
            black_box(matches);
        })
    });
}

/// 基准测试：不同并发度的多根扫描
fn bench_scan_concurrency(c: &mut Criterion) {
    let roots: Vec<TempDir> = (0..8).map(|_| TempDir::new().unwrap()).collect();
    for root in &roots {
        create_multiple_projects(root.path(), 10).unwrap();
    }

    let mut group = c.benchmark_group("scan_concurrency");
    for concurrency in [1, 4, 8] {
        let mut scanner = PatternScanner::new(roots.iter().map(|r| r.path())).unwrap();
        scanner.set_concurrency(concurrency);

        group.bench_function(format!("concurrency_{concurrency}"), |b| {
            b.iter(|| {
                let count = scanner
                    .scan(black_box("dist"), &CancelToken::new())
                    .unwrap()
                    .count();
                black_box(count);
            })
        });
    }
    group.finish();
}

/// 基准测试：清理性能（dry run）
fn bench_clean_dry_run(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    create_multiple_projects(temp_dir.path(), 20).unwrap();

    let scanner = PatternScanner::new([temp_dir.path()]).unwrap();
    let policy = CleanPolicy {
        dry_run: true,
        ..Default::default()
    };
    let targets: Vec<CleanTarget> = scanner
        .scan("node_modules", &CancelToken::new())
        .unwrap()
        .map(|m| CleanTarget::new(m.path, "node_modules", m.size, SafetyLevel::Moderate))
        .collect();

    c.bench_function("clean_20_targets_dry_run", |b| {
        b.iter(|| {
            let results = remove_targets(black_box(&targets), policy.dry_run, &CancelToken::new());
            black_box(results);
        })
    });
}

criterion_group!(
    benches,
    bench_size_parallel_vs_sequential,
    bench_pattern_scan,
    bench_scan_concurrency,
    bench_clean_dry_run
);
criterion_main!(benches);
