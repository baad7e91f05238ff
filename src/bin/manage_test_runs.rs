//! CLI tool to inspect test runs and sync the test catalog.
//!
//! Usage:
//!   cargo run --bin manage-test-runs -- list
//!   cargo run --bin manage-test-runs -- show --id <run-id>
//!   cargo run --bin manage-test-runs -- sync-catalog --path <catalog.json>

use std::env;
use std::path::{Path, PathBuf};

use ostf_adapter_lib::config::Config;
use ostf_adapter_lib::db::DbPool;
use ostf_adapter_lib::services::catalog;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let command = &args[1];

    if matches!(command.as_str(), "help" | "--help" | "-h") {
        print_usage();
        return;
    }

    // Initialize database
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };

    let pool = match DbPool::new(&config).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error connecting to database: {}", e);
            std::process::exit(1);
        }
    };

    match command.as_str() {
        "list" | "ls" => list_runs(&pool).await,
        "show" => {
            let id = parse_id_arg(&args);
            show_run(&pool, id).await;
        }
        "sync-catalog" => {
            let path = parse_flag(&args, "--path", "-p")
                .map(PathBuf::from)
                .or_else(|| config.catalog_path.clone())
                .unwrap_or_else(|| {
                    eprintln!("Error: --path is required when OSTF_CATALOG_PATH is not set");
                    std::process::exit(1);
                });
            sync(&pool, &path).await;
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            std::process::exit(1);
        }
    }
}

fn parse_flag(args: &[String], long: &str, short: &str) -> Option<String> {
    let mut i = 2;
    while i < args.len() {
        if (args[i] == long || args[i] == short) && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        i += 1;
    }
    None
}

fn parse_id_arg(args: &[String]) -> i32 {
    let Some(raw) = parse_flag(args, "--id", "-i") else {
        eprintln!("Error: --id is required");
        std::process::exit(1);
    };

    match raw.parse() {
        Ok(id) => id,
        Err(_) => {
            eprintln!("Error: --id must be a number, got '{}'", raw);
            std::process::exit(1);
        }
    }
}

async fn list_runs(pool: &DbPool) {
    let runs = match pool.list_test_runs().await {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error listing test runs: {}", e);
            std::process::exit(1);
        }
    };

    if runs.is_empty() {
        println!("No test runs found.");
        return;
    }

    println!();
    println!(
        "{:<8} {:<24} {:<10} {:<14} {:<8} {:<25}",
        "ID", "TEST SET", "CLUSTER", "STATUS", "TESTS", "STARTED"
    );
    println!("{}", "─".repeat(92));

    for detail in runs {
        let run = &detail.run;

        // Truncate test set if too long
        let test_set = if run.test_set_id.chars().count() > 22 {
            format!("{}...", run.test_set_id.chars().take(19).collect::<String>())
        } else {
            run.test_set_id.clone()
        };

        println!(
            "{:<8} {:<24} {:<10} {:<14} {:<8} {:<25}",
            run.id,
            test_set,
            run.cluster_id,
            run.status,
            detail.enabled_tests().len(),
            run.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    println!();
}

async fn show_run(pool: &DbPool, id: i32) {
    let detail = match pool.get_test_run_detail(id).await {
        Ok(Some(d)) => d,
        Ok(None) => {
            eprintln!("Test run {} not found.", id);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error loading test run: {}", e);
            std::process::exit(1);
        }
    };

    let run = &detail.run;
    println!();
    println!("Test run {}", run.id);
    println!("  Test set: {}", run.test_set_id);
    println!("  Cluster:  {}", run.cluster_id);
    println!("  Status:   {}", run.status);
    println!("  Started:  {}", run.started_at);
    if let Some(ended) = run.ended_at {
        println!("  Ended:    {}", ended);
    }
    if let Some(pid) = run.pid {
        println!("  Pid:      {}", pid);
    }
    println!();
    println!("{:<60} {:<14} {:<10}", "TEST", "STATUS", "TAKEN");
    println!("{}", "─".repeat(86));

    for test in &detail.tests {
        let taken = test
            .time_taken
            .map(|t| format!("{:.2}s", t))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<60} {:<14} {:<10}",
            test.name,
            test.status.as_deref().unwrap_or("-"),
            taken
        );
    }
    println!();
}

async fn sync(pool: &DbPool, path: &Path) {
    if let Err(e) = pool.run_migrations().await {
        eprintln!("Error running migrations: {}", e);
        std::process::exit(1);
    }

    let loaded = match catalog::load_catalog(path).await {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading catalog: {}", e);
            std::process::exit(1);
        }
    };

    match catalog::sync_catalog(pool, loaded).await {
        Ok(summary) => println!(
            "Synced {} test sets ({} tests) from {}.",
            summary.test_sets,
            summary.tests,
            path.display()
        ),
        Err(e) => {
            eprintln!("Error syncing catalog: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!();
    eprintln!("Usage: manage-test-runs <command> [options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  list, ls                  List all test runs");
    eprintln!("  show --id <id>            Show a test run and its tests");
    eprintln!("  sync-catalog --path <p>   Load a JSON test catalog into the database");
    eprintln!("  help                      Show this help");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  manage-test-runs list");
    eprintln!("  manage-test-runs show --id 42");
    eprintln!("  manage-test-runs sync-catalog --path /etc/ostf/catalog.json");
    eprintln!();
}
