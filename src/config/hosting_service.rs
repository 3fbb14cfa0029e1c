//! The code-hosting service a repository's origin lives on.

use serde::{Deserialize, Serialize};

use super::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostingService {
    Github,
    Gitlab,
    Gitea,
    Bitbucket,
    None,
}

impl HostingService {
    /// Parse a configured override. The empty string means "no override".
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        match text {
            "github" => Ok(HostingService::Github),
            "gitlab" => Ok(HostingService::Gitlab),
            "gitea" => Ok(HostingService::Gitea),
            "bitbucket" => Ok(HostingService::Bitbucket),
            "" => Ok(HostingService::None),
            _ => Err(ConfigError::UnknownHostingService(text.to_string())),
        }
    }

    /// The hostname this service is detected from in origin URLs.
    pub fn default_hostname(&self) -> Option<&'static str> {
        match self {
            HostingService::Github => Some("github.com"),
            HostingService::Gitlab => Some("gitlab.com"),
            HostingService::Gitea => Some("gitea.com"),
            HostingService::Bitbucket => Some("bitbucket.org"),
            HostingService::None => None,
        }
    }
}

impl std::fmt::Display for HostingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HostingService::Github => "github",
            HostingService::Gitlab => "gitlab",
            HostingService::Gitea => "gitea",
            HostingService::Bitbucket => "bitbucket",
            HostingService::None => "none",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_content() {
        let tests = [
            ("bitbucket", HostingService::Bitbucket),
            ("github", HostingService::Github),
            ("gitlab", HostingService::Gitlab),
            ("gitea", HostingService::Gitea),
            ("", HostingService::None),
        ];
        for (give, want) in tests {
            assert_eq!(HostingService::parse(give).unwrap(), want);
        }
    }

    #[test]
    fn test_parse_invalid_content() {
        assert!(HostingService::parse("zonk").is_err());
    }
}
