pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod form;
pub mod i18n;
pub mod prefs;
pub mod render;
pub mod session;
pub mod store;
pub mod task;
pub mod view;

use std::ffi::OsString;
use std::fs::File;
use std::io::{
  self,
  BufReader,
  IsTerminal
};

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting taskboard"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.boardrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let prefs =
    prefs::FilePreferences::open(
      &data_dir
    )
    .with_context(|| {
      format!(
        "failed to open preferences \
         at {}",
        data_dir.display()
      )
    })?;

  let saved = prefs::load_locale(
    &prefs,
    cfg.default_locale()?
  );
  let locale =
    cli.lang.unwrap_or(saved);
  debug!(%locale, %saved, "resolved display language");

  let catalog =
    i18n::Catalog::builtin()?;
  let renderer =
    render::Renderer::new(&cfg)?;

  let mut store =
    store::TaskStore::new();
  if !cli.no_seed
    && cfg.seed_example()?
  {
    store.seed_example();
  }

  let mut session =
    session::Session::new(
      store,
      catalog,
      locale,
      Box::new(prefs),
      renderer
    );

  let stdout = io::stdout();
  let mut out = stdout.lock();

  match cli.script.as_deref() {
    | Some(path) => {
      let file = File::open(path)
        .with_context(|| {
          format!(
            "failed to open script {}",
            path.display()
          )
        })?;
      let mut input =
        BufReader::new(file);
      commands::run_session(
        &mut session,
        &mut input,
        &mut out,
        false
      )?;
    }
    | None => {
      let stdin = io::stdin();
      let interactive =
        stdin.is_terminal();
      let mut input = stdin.lock();
      commands::run_session(
        &mut session,
        &mut input,
        &mut out,
        interactive
      )?;
    }
  }

  info!("done");
  Ok(())
}
