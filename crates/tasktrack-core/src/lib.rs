pub mod cli;
pub mod collection;
pub mod commands;
pub mod config;
pub mod error;
pub mod filter;
pub mod orchestrator;
pub mod render;
pub mod state;
pub mod stats;
pub mod store;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};

pub use error::{StoreError, StoreErrorKind, StoreResult};
pub use orchestrator::Orchestrator;
pub use store::{HttpStore, MemoryStore, TaskStore};

#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let pre = cli::preprocess_args(&raw_args)?;
    let cli = cli::GlobalCli::parse_from(pre.cleaned_args);

    cli::init_tracing(cli.verbose, cli.quiet)?;

    info!(
        verbose = cli.verbose,
        quiet = cli.quiet,
        "starting tasktrack CLI"
    );
    debug!(?pre.rc_overrides, "preprocessed rc overrides");

    let mut cfg = config::Config::load(cli.trackrc.as_deref())?;
    cfg.apply_overrides(
        pre.rc_overrides
            .into_iter()
            .chain(cli.rc_overrides.into_iter().map(|kv| (kv.key, kv.value))),
    );

    let api_url = cfg.api_url(cli.api_url.as_deref());
    let store = HttpStore::new(&api_url)
        .with_context(|| format!("failed to set up task store client for {api_url}"))?;
    info!(api_url = %store.base_url(), "using task store");

    let mut renderer = render::Renderer::new(&cfg)?;
    let mut orchestrator = Orchestrator::new(store);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(commands::dispatch(
        &mut orchestrator,
        &cfg,
        &mut renderer,
        cli.command.unwrap_or_default(),
    ))?;

    info!("done");
    Ok(())
}
