//! Parse linked repository strings and pasted GitHub issue links.

use boardsync_core::BoardError;
use url::Url;

/// A repository addressed as `owner/repo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    /// Canonical `owner/repo` string.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Strips whitespace, then any trailing `/` and `.git` in either order.
///
/// `"owner/repo.git/"` becomes `"owner/repo"`.
pub fn normalize_repo(input: &str) -> String {
    let mut s = input.trim();
    loop {
        let before = s.len();
        s = s.trim_end_matches('/');
        s = s.strip_suffix(".git").unwrap_or(s);
        if s.len() == before {
            break;
        }
    }
    s.to_string()
}

/// Parses `owner/repo` after normalization.
///
/// Exactly two non-empty segments are required; anything else is
/// `BoardError::InvalidRepoFormat`.
pub fn parse_repo(input: &str) -> Result<RepoRef, BoardError> {
    let normalized = normalize_repo(input);
    let segments: Vec<&str> = normalized.split('/').collect();

    match segments.as_slice() {
        [owner, repo] if !owner.trim().is_empty() && !repo.trim().is_empty() => Ok(RepoRef {
            owner: owner.trim().to_string(),
            repo: repo.trim().to_string(),
        }),
        _ => Err(BoardError::InvalidRepoFormat(input.to_string())),
    }
}

/// Extracts `(owner/repo, number)` from an issue link such as
/// `https://github.com/acme/widgets/issues/42`.
///
/// Returns `None` for anything that is not a github.com issue URL.
pub fn parse_issue_url(input: &str) -> Option<(String, i64)> {
    let url = Url::parse(input.trim()).ok()?;
    if url.scheme() != "https" && url.scheme() != "http" {
        return None;
    }
    let host = url.host_str()?;
    if host != "github.com" && host != "www.github.com" {
        return None;
    }

    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [owner, repo, "issues", number, ..] => {
            let number: i64 = number.parse().ok().filter(|n| *n > 0)?;
            let repo = parse_repo(&format!("{owner}/{repo}")).ok()?;
            Some((repo.full_name(), number))
        }
        _ => None,
    }
}
