use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

pub const DEFAULT_API_URL: &str =
  "http://localhost:5001/api";
pub const API_URL_ENV: &str =
  "TASKTRACK_API_URL";
pub const TRACKRC_ENV: &str =
  "TASKTRACKRC";

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = HashMap::new();
    map.insert(
      "api.url".to_string(),
      DEFAULT_API_URL.to_string()
    );
    map.insert(
      "color".to_string(),
      "on".to_string()
    );
    map.insert(
      "confirmation".to_string(),
      "on".to_string()
    );
    Self {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    trackrc_override
  ))]
  pub fn load(
    trackrc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let trackrc = resolve_trackrc_path(
      trackrc_override
    )?;
    if let Some(path) = trackrc {
      info!(trackrc = %path.display(), "loading trackrc");
      cfg.load_file(&path)?;
    } else {
      debug!(
        "no trackrc found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn get_bool(
    &self,
    key: &str
  ) -> Option<bool> {
    self
      .map
      .get(key)
      .map(|v| parse_bool(v))
  }

  /// Store root URL: explicit flag,
  /// then the environment, then the
  /// rc file.
  pub fn api_url(
    &self,
    flag: Option<&str>
  ) -> String {
    if let Some(url) = flag {
      return url.to_string();
    }
    if let Ok(url) =
      std::env::var(API_URL_ENV)
      && !url.trim().is_empty()
    {
      return url;
    }
    self
      .get("api.url")
      .unwrap_or_else(|| {
        DEFAULT_API_URL.to_string()
      })
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let raw = expand_tilde(path);
    let path = fs::canonicalize(&raw)
      .with_context(|| {
        format!(
          "failed to read rc file {}",
          raw.display()
        )
      })?;
    // canonical paths, so `..` and
    // symlinked includes are caught
    if self.loaded_files.contains(&path)
    {
      warn!(file = %path.display(), "rc file already loaded; skipping repeat include");
      return Ok(());
    }
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read rc file {}",
            path.display()
          )
        })?;
    self
      .loaded_files
      .push(path.clone());

    let dir = path
      .parent()
      .map(Path::to_path_buf)
      .unwrap_or_default();

    for (idx, raw) in
      text.lines().enumerate()
    {
      let lineno = idx + 1;
      match parse_rc_line(raw) {
        | RcLine::Blank => {}
        | RcLine::Include(target) => {
          let target =
            include_target(&dir, target)
              .with_context(|| {
                format!(
                  "{}:{lineno}",
                  path.display()
                )
              })?;
          if target.is_file() {
            debug!(from = %path.display(), target = %target.display(), lineno, "following include");
            self.load_file(&target)?;
          } else {
            warn!(target = %target.display(), lineno, "included rc file not found");
          }
        }
        | RcLine::Setting(key, value) => {
          if !KNOWN_KEYS.contains(&key) {
            warn!(key, lineno, "unrecognized rc setting");
          }
          trace!(key, value, "rc setting");
          self.map.insert(
            key.to_string(),
            value.to_string()
          );
        }
        | RcLine::Invalid => {
          return Err(anyhow!(
            "invalid config line \
             {}:{lineno}: expected \
             key = value, got {raw:?}",
            path.display()
          ));
        }
      }
    }

    Ok(())
  }
}

const KNOWN_KEYS: [&str; 3] =
  ["api.url", "color", "confirmation"];

#[derive(Debug, PartialEq, Eq)]
enum RcLine<'a> {
  Blank,
  Include(&'a str),
  Setting(&'a str, &'a str),
  Invalid
}

fn parse_rc_line(raw: &str) -> RcLine<'_> {
  let content = raw
    .split('#')
    .next()
    .unwrap_or_default()
    .trim();
  if content.is_empty() {
    return RcLine::Blank;
  }
  if let Some(target) =
    content.strip_prefix("include ")
  {
    return RcLine::Include(
      target.trim()
    );
  }
  match content.split_once('=') {
    | Some((key, value))
      if !key.trim().is_empty() =>
    {
      RcLine::Setting(
        key.trim(),
        value.trim()
      )
    }
    | _ => RcLine::Invalid
  }
}

/// Locates the rc file: explicit
/// `--trackrc`, then `$TASKTRACKRC`
/// (`/dev/null` disables it), then
/// `~/.tasktrackrc` if present.
#[tracing::instrument]
fn resolve_trackrc_path(
  explicit: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = explicit {
    return Ok(Some(path.into()));
  }

  match std::env::var_os(TRACKRC_ENV) {
    | Some(value) if value == "/dev/null" => {
      return Ok(None);
    }
    | Some(value) => {
      return Ok(Some(value.into()));
    }
    | None => {}
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!(
      "home directory unknown; \
       running without trackrc"
    );
    return Ok(None);
  };
  let candidate =
    home.join(".tasktrackrc");
  Ok(candidate
    .is_file()
    .then_some(candidate))
}

fn include_target(
  dir: &Path,
  target: &str
) -> anyhow::Result<PathBuf> {
  if target.is_empty() {
    return Err(anyhow!(
      "include needs a file name"
    ));
  }
  let expanded =
    expand_tilde(Path::new(target));
  Ok(if expanded.is_absolute() {
    expanded
  } else {
    dir.join(expanded)
  })
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  match (
    path.strip_prefix("~"),
    dirs::home_dir()
  ) {
    | (Ok(rest), Some(home)) => {
      home.join(rest)
    }
    | _ => path.to_path_buf()
  }
}

fn parse_bool(s: &str) -> bool {
  let s = s.trim();
  ["1", "y", "yes", "on", "true"]
    .iter()
    .any(|t| s.eq_ignore_ascii_case(t))
}
