//! Simulated build driven by the `arbor` binary

use arbor_task::{add_log, run, run_optional, set_message};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

const CRATES: &[&str] = &["arbor-foundation", "arbor-task", "arbor-cli"];

/// Root operation: compile, copy assets and lint side by side
pub async fn build(files: usize, fail: bool) -> anyhow::Result<()> {
    info!(files, "starting build");

    let compile = run("Compile", compile(fail));
    let assets = run("Copy assets", copy_assets(files));
    let lint = run_optional("Lint", lint());

    set_message("waiting for steps");
    compile.await?;
    assets.await?;
    if lint.await?.is_none() {
        warn!("lint skipped");
    }
    Ok(())
}

async fn compile(fail: bool) -> anyhow::Result<()> {
    set_message("resolving crates");
    run("Resolve", resolve(fail));
    Ok(())
}

/// Starts one child per crate, after `Compile` itself already returned
async fn resolve(fail: bool) -> anyhow::Result<()> {
    sleep(Duration::from_millis(150)).await;
    set_message(&format!("{} crates", CRATES.len()));

    for (index, &name) in CRATES.iter().enumerate() {
        let broken = fail && index + 1 == CRATES.len();
        run(name, compile_crate(name, broken));
    }
    Ok(())
}

async fn compile_crate(name: &'static str, broken: bool) -> anyhow::Result<()> {
    set_message("checking");
    sleep(Duration::from_millis(100 + 10 * name.len() as u64)).await;

    if broken {
        add_log(format!("error[E0308]: mismatched types in `{}`", name));
        anyhow::bail!("could not compile `{}`", name);
    }
    info!(krate = name, "compiled");
    Ok(())
}

async fn copy_assets(files: usize) -> anyhow::Result<()> {
    if files == 0 {
        warn!("no assets to copy");
        return Ok(());
    }

    for index in 1..=files {
        let file = format!("assets/image-{:02}.png", index);
        set_message(&format!("copying {}", file));
        sleep(Duration::from_millis(60)).await;
        info!(file = %file, "copied");
    }
    Ok(())
}

async fn lint() -> anyhow::Result<()> {
    sleep(Duration::from_millis(200)).await;
    warn!("no lint configuration found, using defaults");
    anyhow::bail!("linter exited with status 101")
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_task::{MemoryBackend, Status, TreeConfig};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_failing_build_tree() {
        let backend = MemoryBackend::new(80);
        let shared = backend.clone();
        arbor_task::set_backend(move |_| Box::new(shared.clone()));
        arbor_task::configure(TreeConfig::default().with_width(80).with_color(false));

        let handle = run("Build project", build(3, true));
        let root = Arc::clone(handle.task());
        handle.await.unwrap();
        arbor_task::drained(&root).await;

        let children = root.children();
        let labels: Vec<&str> = children.iter().map(|child| child.label()).collect();
        assert_eq!(labels, vec!["Compile", "Copy assets", "Lint"]);

        assert_eq!(children[1].message(), "copying assets/image-0… [3]");
        assert_eq!(children[2].status(), Status::Skip);
        assert_eq!(children[2].message(), "linter exited with status 101");

        let resolve = &children[0].children()[0];
        let crates = resolve.children();
        assert_eq!(crates.len(), CRATES.len());
        assert_eq!(crates[2].status(), Status::Fail);
        assert_eq!(crates[2].message(), "could not compile `arbor-cli`");

        assert_eq!(root.status(), Status::Fail);
        assert!(backend.is_finished());
        assert!(backend.last_frame().unwrap().contains("arbor-cli"));
    }
}
