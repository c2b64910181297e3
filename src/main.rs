use anyhow::Result;
use memprobe::collector::ProcMemoryReader;
use memprobe::config::Config;
use memprobe::executor::Workload;
use memprobe::history::History;
use memprobe::notifier;
use memprobe::profiler::MemoryProfiler;
use memprobe::report::{format_bytes, ProfileReport};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

struct CliArgs {
    command: String,
    args: Vec<String>,
    interval_ms: Option<u64>,
    format: Option<String>,
    output: Option<PathBuf>,
}

fn parse_args(argv: &[String]) -> Option<CliArgs> {
    let mut interval_ms = None;
    let mut format = None;
    let mut output = None;

    let mut i = 1;
    while i < argv.len() {
        match argv[i].as_str() {
            "--interval" => {
                i += 1;
                interval_ms = Some(argv.get(i)?.parse::<u64>().ok()?);
            }
            "--format" => {
                i += 1;
                format = Some(argv.get(i)?.clone());
            }
            "--output" => {
                i += 1;
                output = Some(PathBuf::from(argv.get(i)?));
            }
            "--" => {
                i += 1;
                break;
            }
            arg if arg.starts_with("--") => return None,
            _ => break,
        }
        i += 1;
    }

    let command = argv.get(i)?.clone();
    let args = argv[i + 1..].to_vec();
    Some(CliArgs {
        command,
        args,
        interval_ms,
        format,
        output,
    })
}

fn print_usage() {
    eprintln!("Usage: memprobe [options] [--] <command> [args...]");
    eprintln!();
    eprintln!("Wraps a command, samples its resident memory while it runs, and");
    eprintln!("writes a JSON report with leak/trend analysis and efficiency scores.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --interval <ms>      Sampling interval in milliseconds (default 100)");
    eprintln!("  --format <json|none> Report file format (default json)");
    eprintln!("  --output <dir>       Report output directory (default memory-profiles)");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  memprobe ./my-app --load-test");
    eprintln!("  memprobe --interval 50 -- cargo run --release");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let argv: Vec<String> = std::env::args().collect();
    let Some(cli) = parse_args(&argv) else {
        print_usage();
        std::process::exit(2);
    };

    let config_path = Config::config_path();
    let mut config = if config_path.exists() {
        Config::load(&config_path).unwrap_or_else(|e| {
            warn!("failed to load config: {}, using defaults", e);
            Config::default()
        })
    } else {
        Config::default()
    };
    if let Some(ms) = cli.interval_ms {
        config.sampling.interval_ms = ms;
    }
    if let Some(format) = &cli.format {
        config.general.report_format = format.clone();
    }
    if let Some(dir) = &cli.output {
        config.general.output_directory = dir.clone();
    }

    info!(
        "profiling {} at {}ms interval",
        cli.command, config.sampling.interval_ms
    );

    let mut workload = Workload::spawn(&cli.command, &cli.args, None)?;
    let reader = Arc::new(ProcMemoryReader::for_pid(workload.pid()));
    let mut profiler = MemoryProfiler::new(config.clone(), reader);

    if let Err(e) = profiler.start(&cli.command, &cli.args) {
        let _ = workload.wait().await;
        return Err(e.into());
    }

    let wait_result = workload.wait().await;

    // a report is produced even when the workload failed
    let report = profiler.stop()?;

    if config.general.report_format == "json" {
        match write_report(&config.general.output_directory, &cli.command, &report) {
            Ok(path) => info!("report saved to {}", path.display()),
            Err(e) => error!("failed to write report: {}", e),
        }
    }

    print_summary(&report);

    if config.history.enabled {
        record_history(&config, &report);
    }

    if config.general.notify_on_issues {
        notifier::notify_issues(&cli.command, &report.analysis.potential_issues);
    }

    let status = wait_result?;
    if !status.success() {
        warn!("workload exited with {}", status);
    }
    std::process::exit(status.code().unwrap_or(1));
}

fn write_report(dir: &Path, command: &str, report: &ProfileReport) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let name = Path::new(command)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("workload");
    let stamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
    let path = dir.join(format!("{}_{}.json", name, stamp));
    std::fs::write(&path, report.to_json()?)?;
    Ok(path)
}

fn print_summary(report: &ProfileReport) {
    println!();
    println!("Memory Profiling Summary:");
    println!(
        "  Peak Memory Usage: {}",
        format_bytes(report.memory.peak_usage as i64)
    );
    println!(
        "  Final Memory Usage: {}",
        format_bytes(report.memory.final_usage as i64)
    );
    let difference = report.memory.difference;
    if difference < 0 {
        println!("  Memory Difference: -{}", format_bytes(-difference));
    } else {
        println!("  Memory Difference: {}", format_bytes(difference));
    }
    println!("  Execution Time: {:.2}s", report.execution.duration);
    println!("  Samples Collected: {}", report.samples.len());
    println!("  Memory Trend: {}", report.memory.trend);
    println!(
        "  Performance Grade: {}",
        report.performance_metrics.performance_grade
    );
    println!(
        "  Efficiency Score: {:.2} ({})",
        report.efficiency_score.overall, report.efficiency_score.grade
    );
    if !report.analysis.potential_issues.is_empty() {
        println!("  Issues:");
        for issue in &report.analysis.potential_issues {
            println!("    [{}] {}", issue.severity.as_str(), issue.message);
        }
    }
}

fn record_history(config: &Config, report: &ProfileReport) {
    let history = match History::open_default() {
        Ok(history) => history,
        Err(e) => {
            warn!("failed to open history database: {}", e);
            return;
        }
    };
    if let Err(e) = history
        .init_schema()
        .and_then(|_| history.insert_session(report))
    {
        warn!("failed to record session history: {}", e);
        return;
    }
    if let Err(e) = history.cleanup_old_data(config.history.retention_days) {
        warn!("failed to clean up old sessions: {}", e);
    }
}
