use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};
use crate::request::{Request, ResponseHeaders};

/// Longest response body prefix written into debug events.
const MAX_LOGGED_BODY: usize = 2048;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugTarget {
    Console,
    File(PathBuf),
}

impl DebugTarget {
    /// `None`, `""` and `"console"` select the console; a directory selects
    /// `debug.log` inside it; anything else is used as a file path.
    pub fn parse(target: Option<&str>) -> Self {
        match target {
            None => DebugTarget::Console,
            Some(t) if t.is_empty() || t.eq_ignore_ascii_case("console") => DebugTarget::Console,
            Some(t) => {
                let path = Path::new(t);
                if path.is_dir() {
                    DebugTarget::File(path.join("debug.log"))
                } else {
                    DebugTarget::File(path.to_path_buf())
                }
            }
        }
    }
}

/// `RUST_LOG` overrides the default `curling=debug` filter.
pub fn init_debug(target: DebugTarget) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("curling=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match target {
        DebugTarget::Console => builder.try_init(),
        DebugTarget::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| Error::Logging(format!("{}: {}", path.display(), e)))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
    };

    installed.map_err(|e| Error::Logging(e.to_string()))
}

pub(crate) fn debug_log(request: &Request, status: u16, headers: &ResponseHeaders, body: &[u8]) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }
    let shown = &body[..body.len().min(MAX_LOGGED_BODY)];
    tracing::debug!(
        method = %request.method(),
        url = request.url(),
        status,
        headers = ?headers,
        body_len = body.len(),
        body = %String::from_utf8_lossy(shown),
        "response received"
    );
}
