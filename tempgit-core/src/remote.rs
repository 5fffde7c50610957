//! Clone sources

use std::path::PathBuf;

use url::Url;

use crate::{Error, Result};

const URL_SCHEMES: &[&str] = &["http", "https", "ssh", "git", "file"];

/// Where a repository is cloned from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteSource {
    /// `https://host/owner/repo.git`, `ssh://git@host/repo`, `file:///srv/repo`
    Url(Url),
    /// `git@github.com:owner/repo.git`
    ScpLike(String),
    /// An existing local repository directory or bundle file
    Local(PathBuf),
}

impl RemoteSource {
    /// Parse a URL, an scp-like address or a local path
    ///
    /// Local paths may name a directory or a regular file such as a
    /// `git bundle`; git decides whether the contents are usable.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        if input.is_empty() {
            return Err(Error::InvalidRemote("empty clone source".to_string()));
        }

        if input.contains("://") {
            let url = Url::parse(input)
                .map_err(|e| Error::InvalidRemote(format!("{}: {}", input, e)))?;

            if !URL_SCHEMES.contains(&url.scheme()) {
                return Err(Error::InvalidRemote(format!(
                    "unsupported scheme '{}' in {}",
                    url.scheme(),
                    input
                )));
            }
            if url.scheme() != "file" && url.host_str().map_or(true, str::is_empty) {
                return Err(Error::InvalidRemote(format!("missing host in {}", input)));
            }

            return Ok(Self::Url(url));
        }

        if is_scp_like(input) {
            return Ok(Self::ScpLike(input.to_string()));
        }

        match std::fs::canonicalize(input) {
            Ok(path) if path.is_dir() || path.is_file() => Ok(Self::Local(path)),
            _ => Err(Error::InvalidRemote(format!(
                "{} is neither a URL nor an existing path",
                input
            ))),
        }
    }

    /// The argument handed to `git clone`
    pub fn as_clone_arg(&self) -> String {
        match self {
            Self::Url(url) => url.to_string(),
            Self::ScpLike(addr) => addr.clone(),
            Self::Local(path) => path.to_string_lossy().into_owned(),
        }
    }
}

/// `[user@]host:path`, where the host part has no slash and is longer than
/// a drive letter
fn is_scp_like(input: &str) -> bool {
    let Some((host, path)) = input.split_once(':') else {
        return false;
    };
    let bare_host = host.rsplit('@').next().unwrap_or(host);

    !path.is_empty() && bare_host.len() > 1 && !host.contains('/') && !host.contains('\\')
}
