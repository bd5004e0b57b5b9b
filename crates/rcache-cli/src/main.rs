#![deny(clippy::all, warnings)]

//! Entry point. Decides between the two personalities of the binary:
//! maintenance tool (invoked under its own name with option arguments) and
//! transparent compiler wrapper (everything else).

use std::env;
use std::fs;
use std::path::Path;

use anyhow::Result;
use clap::Parser;
use serde_json::json;

use rcache_core::{run_compilation, Config, StatsReport};

mod cli;

use cli::MaintenanceCli;

const MYNAME: &str = "rcache";

fn main() {
    let argv: Vec<String> = env::args().collect();
    init_tracing();

    let invoked_as = argv
        .first()
        .map(|arg0| basename(arg0).to_string())
        .unwrap_or_default();

    // `rcache -s`, `rcache --clear`, ... are maintenance commands;
    // `rcache gcc -c x.c` and `gcc -c x.c` (via symlink) are compilations.
    let result = if invoked_as.starts_with(MYNAME) {
        match argv.get(1) {
            Some(first) if !first.starts_with('-') => run_compilation(argv[1..].to_vec()),
            _ => run_maintenance(&argv),
        }
    } else {
        run_compilation(argv)
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{MYNAME}: error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run_maintenance(argv: &[String]) -> Result<i32> {
    let cli = MaintenanceCli::parse_from(argv);
    if !cli.clear && !cli.zero_stats && !cli.show_stats {
        use clap::CommandFactory;
        MaintenanceCli::command().print_help()?;
        return Ok(0);
    }
    let config = Config::from_env()?;

    if cli.clear {
        clear_cache(&config)?;
        if !cli.json {
            println!("Cleared cache");
        }
    }
    if cli.zero_stats {
        StatsReport::zero(&config.cache_dir);
        if !cli.json {
            println!("Statistics zeroed");
        }
    }
    if cli.show_stats {
        let report = StatsReport::collect(&config.cache_dir);
        if cli.json {
            let counters: serde_json::Map<String, serde_json::Value> = report
                .counters
                .iter()
                .map(|(name, value)| (name.clone(), json!(value)))
                .collect();
            let payload = json!({
                "status": "ok",
                "cache_directory": config.cache_dir,
                "counters": counters,
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        } else {
            println!("cache directory  {}", config.cache_dir.display());
            for (name, value) in &report.counters {
                println!("{name:<32} {value}");
            }
        }
    }
    Ok(0)
}

fn clear_cache(config: &Config) -> Result<()> {
    for hex in "0123456789abcdef".chars() {
        let dir = config.cache_dir.join(hex.to_string());
        if dir.is_dir() {
            fs::remove_dir_all(&dir)?;
        }
    }
    let tmp = config.cache_dir.join("tmp");
    if tmp.is_dir() {
        fs::remove_dir_all(&tmp)?;
    }
    Ok(())
}

fn basename(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(path)
}

fn init_tracing() {
    let level = match env::var("CCACHE_DEBUG").ok().as_deref() {
        None | Some("" | "0") => "warn",
        Some("1") => "debug",
        Some(_) => "trace",
    };
    let filter = format!("rcache={level},rcache_cli={level},rcache_core={level},rcache_hash={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
