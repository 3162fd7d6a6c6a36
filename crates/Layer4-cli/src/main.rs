//! Arbor CLI - simulated build rendered as a live task tree

mod demo;

use arbor_task::{logging, Status, TreeConfig};
use clap::Parser;
use std::sync::Arc;

/// Arbor - watch a task tree build itself in the terminal
#[derive(Parser, Debug)]
#[command(name = "arbor")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of asset files to copy
    #[arg(long, default_value = "5")]
    files: usize,

    /// Make one of the compile steps fail
    #[arg(long)]
    fail: bool,

    /// Override the terminal width
    #[arg(long)]
    width: Option<usize>,

    /// Print the final task tree as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "info" };
    logging::init(log_level)?;

    // Load configuration
    let mut config = TreeConfig::load().unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config: {}", e);
        TreeConfig::default()
    });
    if let Some(width) = args.width {
        config = config.with_width(width);
    }
    config.validate()?;
    arbor_task::configure(config);

    let handle = arbor_task::run("Build project", demo::build(args.files, args.fail));
    let root = Arc::clone(handle.task());
    let result = handle.await;

    // late children keep the tree alive after the root operation returns
    arbor_task::drained(&root).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&root.snapshot())?);
    }

    result?;
    if root.status() == Status::Fail {
        anyhow::bail!("build failed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["arbor"]).unwrap();
        assert_eq!(args.files, 5);
        assert!(!args.fail);
        assert!(args.width.is_none());
        assert!(!args.json);
        assert!(!args.debug);
    }

    #[test]
    fn test_args_flags() {
        let args = Args::try_parse_from([
            "arbor", "--files", "12", "--fail", "--width", "60", "--json", "-d",
        ])
        .unwrap();
        assert_eq!(args.files, 12);
        assert!(args.fail);
        assert_eq!(args.width, Some(60));
        assert!(args.json);
        assert!(args.debug);
    }

    #[test]
    fn test_args_reject_bad_count() {
        assert!(Args::try_parse_from(["arbor", "--files", "many"]).is_err());
    }
}
