//! Hosted Git repositories and how their web views link to files.

use serde::Deserialize;
use url::Url;

/// A known Git host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Host {
    GitHub,
    GitLab,
    Bitbucket,
}

impl Host {
    fn from_domain(domain: &str) -> Option<Self> {
        match domain.trim_start_matches("www.") {
            "github.com" => Some(Self::GitHub),
            "gitlab.com" => Some(Self::GitLab),
            "bitbucket.org" => Some(Self::Bitbucket),
            _ => None,
        }
    }

    fn from_shortcut(shortcut: &str) -> Option<Self> {
        match shortcut {
            "github" => Some(Self::GitHub),
            "gitlab" => Some(Self::GitLab),
            "bitbucket" => Some(Self::Bitbucket),
            _ => None,
        }
    }

    pub fn domain(self) -> &'static str {
        match self {
            Self::GitHub => "github.com",
            Self::GitLab => "gitlab.com",
            Self::Bitbucket => "bitbucket.org",
        }
    }

    /// Path segment between the project and the branch in file URLs.
    fn view_path(self) -> &'static str {
        match self {
            Self::GitHub | Self::GitLab => "blob",
            Self::Bitbucket => "src",
        }
    }

    fn heading_prefix(self) -> &'static str {
        match self {
            Self::GitHub | Self::GitLab => "#",
            Self::Bitbucket => "#markdown-header-",
        }
    }

    fn top_anchor(self) -> Option<&'static str> {
        match self {
            Self::GitHub | Self::GitLab => Some("#readme"),
            Self::Bitbucket => None,
        }
    }

    fn lines(self) -> bool {
        matches!(self, Self::GitHub | Self::GitLab)
    }
}

/// A repository on a known host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedRepo {
    pub host: Host,
    /// Owner, or owner and subgroups on GitLab.
    pub user: String,
    pub project: String,
}

impl HostedRepo {
    /// Recognizes a repository from a remote URL or a shortcut.
    ///
    /// Accepts `https://github.com/user/project`, `git@github.com:user/project.git`,
    /// `git+ssh://git@gitlab.com/group/sub/project.git`, `bitbucket:user/project`
    /// and the GitHub shorthand `user/project`.
    pub fn parse(repository: &str) -> Option<Self> {
        let repository = repository.trim();
        let repository = repository
            .split_once('#')
            .map_or(repository, |(before, _)| before);

        if repository.contains("://") {
            let url = Url::parse(repository).ok()?;
            let host = Host::from_domain(url.host_str()?)?;
            return Self::from_path(host, url.path());
        }

        if let Some((before, path)) = repository.split_once(':') {
            if let Some(host) = Host::from_shortcut(before) {
                return Self::from_path(host, path);
            }

            // `git@github.com:user/project.git`
            let domain = before.rsplit_once('@').map_or(before, |(_, domain)| domain);
            return Self::from_path(Host::from_domain(domain)?, path);
        }

        let segments: Vec<&str> = repository.split('/').collect();
        match segments.as_slice() {
            [user, project]
                if is_name(user) && is_name(project.trim_end_matches(".git")) =>
            {
                Self::from_path(Host::GitHub, repository)
            }
            _ => None,
        }
    }

    fn from_path(host: Host, path: &str) -> Option<Self> {
        let path = path.trim_matches('/');
        let path = path.strip_suffix(".git").unwrap_or(path);
        let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match host {
            // Everything after `/-/` is a view of the project.
            Host::GitLab => {
                if let Some(index) = segments.iter().position(|segment| *segment == "-") {
                    segments.truncate(index);
                }
            }
            Host::GitHub | Host::Bitbucket => segments.truncate(2),
        }

        let (project, user) = segments.split_last()?;
        if user.is_empty() {
            return None;
        }

        Some(Self {
            host,
            user: user.join("/"),
            project: project.strip_suffix(".git").unwrap_or(project).to_string(),
        })
    }

    /// `user/project`.
    pub fn path(&self) -> String {
        format!("{}/{}", self.user, self.project)
    }
}

fn is_name(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// How URLs to files and headings look on the host of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlConfig {
    /// Domain of URLs, such as `github.com`.
    pub hostname: Option<String>,
    /// Path before the branch in file URLs, such as `/user/project/blob/`.
    #[serde(default)]
    pub prefix: String,
    /// Prefix of heading hashes, such as `#` or `#markdown-header-`.
    pub heading_prefix: Option<String>,
    /// Hash linking to the top of a readme, such as `#readme`.
    pub top_anchor: Option<String>,
    /// Whether hashes can link to lines, such as `#L12`.
    #[serde(default)]
    pub lines: bool,
    /// Whether `/folder/file.md` is a path in the repository.
    #[serde(default)]
    pub resolve_absolute_paths_in_repo: bool,
}

impl Default for UrlConfig {
    fn default() -> Self {
        Self {
            hostname: None,
            prefix: String::new(),
            heading_prefix: Some("#".to_string()),
            top_anchor: None,
            lines: false,
            resolve_absolute_paths_in_repo: false,
        }
    }
}

impl UrlConfig {
    /// Derives the config from a remote URL, falling back to the default
    /// for unknown hosts.
    pub fn detect(repository: Option<&str>) -> Self {
        let Some(repo) = repository.and_then(HostedRepo::parse) else {
            return Self::default();
        };
        let host = repo.host;

        Self {
            hostname: Some(host.domain().to_string()),
            prefix: format!("/{}/{}/", repo.path(), host.view_path()),
            heading_prefix: Some(host.heading_prefix().to_string()),
            top_anchor: host.top_anchor().map(str::to_string),
            lines: host.lines(),
            resolve_absolute_paths_in_repo: host == Host::GitHub,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("https://github.com/quire/docs", Host::GitHub, "quire", "docs")]
    #[case("https://github.com/quire/docs.git", Host::GitHub, "quire", "docs")]
    #[case("git@github.com:quire/docs.git", Host::GitHub, "quire", "docs")]
    #[case("git+ssh://git@gitlab.com/group/sub/docs.git", Host::GitLab, "group/sub", "docs")]
    #[case("https://gitlab.com/group/docs/-/tree/main", Host::GitLab, "group", "docs")]
    #[case("bitbucket:quire/docs", Host::Bitbucket, "quire", "docs")]
    #[case("https://bitbucket.org/quire/docs/src/main", Host::Bitbucket, "quire", "docs")]
    #[case("quire/docs", Host::GitHub, "quire", "docs")]
    #[case("github:quire/docs#main", Host::GitHub, "quire", "docs")]
    fn test_parse(
        #[case] repository: &str,
        #[case] host: Host,
        #[case] user: &str,
        #[case] project: &str,
    ) {
        assert_eq!(
            HostedRepo::parse(repository),
            Some(HostedRepo {
                host,
                user: user.to_string(),
                project: project.to_string(),
            })
        );
    }

    #[rstest]
    #[case("https://example.com/quire/docs")]
    #[case("git@example.com:quire/docs.git")]
    #[case("https://github.com/quire")]
    #[case("docs")]
    #[case("")]
    fn test_parse_unknown(#[case] repository: &str) {
        assert_eq!(HostedRepo::parse(repository), None);
    }

    #[test]
    fn test_detect_github() {
        let config = UrlConfig::detect(Some("git@github.com:quire/docs.git"));

        assert_eq!(
            config,
            UrlConfig {
                hostname: Some("github.com".to_string()),
                prefix: "/quire/docs/blob/".to_string(),
                heading_prefix: Some("#".to_string()),
                top_anchor: Some("#readme".to_string()),
                lines: true,
                resolve_absolute_paths_in_repo: true,
            }
        );
    }

    #[test]
    fn test_detect_bitbucket() {
        let config = UrlConfig::detect(Some("https://bitbucket.org/quire/docs"));

        assert_eq!(config.prefix, "/quire/docs/src/");
        assert_eq!(config.heading_prefix.as_deref(), Some("#markdown-header-"));
        assert_eq!(config.top_anchor, None);
        assert!(!config.lines);
    }

    #[test]
    fn test_detect_unknown() {
        assert_eq!(UrlConfig::detect(Some("https://example.com/x/y")), UrlConfig::default());
        assert_eq!(UrlConfig::detect(None), UrlConfig::default());
    }

    #[test]
    fn test_deserialize() {
        let config: UrlConfig = serde_json::from_value(serde_json::json!({
            "hostname": "git.example.com",
            "prefix": "/docs/view/",
            "headingPrefix": "#h-",
        }))
        .unwrap();

        assert_eq!(config.hostname.as_deref(), Some("git.example.com"));
        assert_eq!(config.heading_prefix.as_deref(), Some("#h-"));
        assert!(!config.lines);
    }
}
