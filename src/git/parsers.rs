//! Parsers for the porcelain output of the Git commands the engine probes.

/// Parse the NUL-separated output of `git config -lz` into key/value pairs.
///
/// Each record is `key\nvalue`; a key without a newline has an empty value
/// (git omits the separator for valueless keys).
pub fn parse_config_list(output: &str) -> Vec<(String, String)> {
    output
        .split('\0')
        .filter(|record| !record.is_empty())
        .map(|record| match record.split_once('\n') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (record.to_string(), String::new()),
        })
        .collect()
}

/// Extract the branches whose tracking branch is gone from `git branch -vv`.
///
/// Deleted upstreams are marked `[origin/name: gone]` in the verbose listing.
pub fn parse_branches_with_gone_tracking(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| line.contains(": gone]"))
        .filter_map(|line| {
            line.trim_start_matches(['*', '+', ' '])
                .split_whitespace()
                .next()
                .map(|name| name.to_string())
        })
        .collect()
}

/// Whether `git status --porcelain` output contains unmerged paths.
pub fn has_conflict_entries(output: &str) -> bool {
    output.lines().any(|line| {
        let code = line.get(..2).unwrap_or("");
        code.contains('U') || code == "AA" || code == "DD"
    })
}

/// Parse `git shortlog -s -n -e` output into author strings.
pub fn parse_shortlog_authors(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.split_once('\t').map(|(_, author)| author.to_string()))
        .collect()
}

/// Branch names from `git branch -r --format=%(refname:short)`, skipping
/// the symbolic `origin/HEAD` entry.
pub fn parse_remote_branches(output: &str) -> Vec<String> {
    output
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty() && !line.contains("HEAD"))
        .map(|line| line.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_list() {
        let output = "towline.main-branch-name\nmain\0towline.offline\ntrue\0user.name\nTest User\0";
        let entries = parse_config_list(output);
        assert_eq!(
            entries,
            vec![
                ("towline.main-branch-name".to_string(), "main".to_string()),
                ("towline.offline".to_string(), "true".to_string()),
                ("user.name".to_string(), "Test User".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_config_list_empty() {
        assert!(parse_config_list("").is_empty());
    }

    #[test]
    fn test_parse_config_list_valueless_key() {
        let entries = parse_config_list("towline.offline\0");
        assert_eq!(entries, vec![("towline.offline".to_string(), String::new())]);
    }

    #[test]
    fn test_parse_branches_with_gone_tracking() {
        let output = "\
  feature    abc1234 [origin/feature] add feature
* stale      def5678 [origin/stale: gone] old work
  other      aaa9999 [origin/other: ahead 1] wip
  local-only bbb0000 no upstream here\n";
        assert_eq!(
            parse_branches_with_gone_tracking(output),
            vec!["stale".to_string()]
        );
    }

    #[test]
    fn test_has_conflict_entries() {
        assert!(has_conflict_entries("UU src/main.rs\n"));
        assert!(has_conflict_entries("AA both-added.txt\n"));
        assert!(!has_conflict_entries(" M modified.rs\n?? new.txt\n"));
        assert!(!has_conflict_entries(""));
    }

    #[test]
    fn test_parse_shortlog_authors() {
        let output = "     5\tAlice <alice@example.com>\n     2\tBob <bob@example.com>\n";
        assert_eq!(
            parse_shortlog_authors(output),
            vec![
                "Alice <alice@example.com>".to_string(),
                "Bob <bob@example.com>".to_string(),
            ]
        );
    }

    #[test]
    fn test_parse_remote_branches() {
        let output = "  origin/HEAD -> origin/main\n  origin/main\n  origin/feature\n";
        assert_eq!(
            parse_remote_branches(output),
            vec!["origin/main".to_string(), "origin/feature".to_string()]
        );
    }
}
