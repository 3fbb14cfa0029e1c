//! Origin URL parsing.

/// The host and repository path of a parsed remote URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginUrl {
    pub host: String,
    /// `owner/repository`, without a trailing `.git`.
    pub path: String,
}

impl OriginUrl {
    /// Parse the SSH (`git@host:owner/repo.git`) and HTTPS
    /// (`https://host/owner/repo.git`) remote URL forms.
    pub fn parse(url: &str) -> Option<Self> {
        let url = url.trim();
        if url.is_empty() {
            return None;
        }
        let rest = if let Some(rest) = url.strip_prefix("https://") {
            rest
        } else if let Some(rest) = url.strip_prefix("http://") {
            rest
        } else if let Some(rest) = url.strip_prefix("ssh://") {
            rest.strip_prefix("git@").unwrap_or(rest)
        } else if let Some(rest) = url.strip_prefix("git@") {
            // scp-like syntax: host and path are colon-separated
            let (host, path) = rest.split_once(':')?;
            return Self::from_parts(host, path);
        } else {
            return None;
        };
        let (host, path) = rest.split_once('/')?;
        Self::from_parts(host, path)
    }

    fn from_parts(host: &str, path: &str) -> Option<Self> {
        let host = host.split('@').next_back()?;
        let path = path.trim_matches('/').trim_end_matches(".git");
        if host.is_empty() || path.is_empty() {
            return None;
        }
        Some(Self {
            host: host.to_string(),
            path: path.to_string(),
        })
    }

    /// The repository owner (the first path segment).
    pub fn owner(&self) -> &str {
        self.path.split('/').next().unwrap_or_default()
    }

    /// The repository name (the last path segment).
    pub fn repository(&self) -> &str {
        self.path.split('/').next_back().unwrap_or_default()
    }
}
