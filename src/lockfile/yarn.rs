//! yarn v1 `yarn.lock` parser.

use crate::lockfile::LockRemotes;

const ENTRY_SUFFIX: char = ':';
const RESOLVED_PREFIX: &str = "  resolved \"";
const VERSION_SEPARATOR: char = '@';

/// Parser for yarn v1 lockfiles.
#[derive(Clone, Default)]
pub struct YarnParser;

impl YarnParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, content: &str) -> LockRemotes {
        let mut remotes = LockRemotes::new();
        let mut current: Option<String> = None;

        for line in content.lines() {
            if line.trim().is_empty() {
                current = None;
            } else if current.is_none() && !line.starts_with(' ') && line.ends_with(ENTRY_SUFFIX) {
                current = package_name(line);
            } else if let (Some(name), Some(resolved)) =
                (current.as_deref(), line.strip_prefix(RESOLVED_PREFIX))
            {
                remotes.add_dependency(&remote_url(resolved, name), name);
            }
        }

        remotes
    }
}

/// Name from an entry header such as `"@babel/core@^7.0.0", "@babel/core@^7.1.0":`.
fn package_name(header: &str) -> Option<String> {
    let spec = header.strip_prefix('"').unwrap_or(header);

    let name = match spec.strip_prefix(VERSION_SEPARATOR) {
        Some(scoped) => format!("@{}", scoped.split(VERSION_SEPARATOR).next()?),
        None => spec.split(VERSION_SEPARATOR).next()?.to_string(),
    };

    let name = name.trim_end_matches(ENTRY_SUFFIX);
    if name.is_empty() || name == "@" || name.starts_with('#') {
        None
    } else {
        Some(name.to_string())
    }
}

/// Registry prefix of a tarball URL, e.g. `https://registry.yarnpkg.com`.
fn remote_url(resolved: &str, name: &str) -> String {
    let resolved = resolved.trim_end_matches('"');
    let separator = format!("/{}/", name);
    match resolved.split_once(&separator) {
        Some((remote, _)) => remote.to_string(),
        None => resolved.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCKFILE: &str = r#"# THIS IS AN AUTOGENERATED FILE. DO NOT EDIT THIS FILE DIRECTLY.
# yarn lockfile v1


"@acme/design-system@^2.0.0":
  version "2.3.1"
  resolved "https://registry.yarnpkg.com/@acme/design-system/-/design-system-2.3.1.tgz#abc"
  integrity sha512-xyz

"@babel/core@^7.0.0", "@babel/core@^7.1.0":
  version "7.1.0"
  resolved "https://npm.acme.io/@babel/core/-/core-7.1.0.tgz#def"
  dependencies:
    "@babel/code-frame" "^7.0.0"

lodash@^4.17.21:
  version "4.17.21"
  resolved "https://registry.yarnpkg.com/lodash/-/lodash-4.17.21.tgz#123"
"#;

    #[test]
    fn test_parse_remotes() {
        let remotes = YarnParser::new().parse(LOCKFILE);

        assert_eq!(remotes.len(), 2);
        let public = remotes.get("https://registry.yarnpkg.com").unwrap();
        assert!(public.has_dependency("@acme/design-system"));
        assert!(public.has_dependency("lodash"));

        let private = remotes.get("https://npm.acme.io").unwrap();
        assert!(private.has_dependency("@babel/core"));
        assert!(!private.has_dependency("@babel/code-frame"));
    }

    #[test]
    fn test_package_name() {
        assert_eq!(package_name("lodash@^4.17.21:").as_deref(), Some("lodash"));
        assert_eq!(
            package_name(r#""@babel/core@^7.0.0", "@babel/core@^7.1.0":"#).as_deref(),
            Some("@babel/core")
        );
        assert_eq!(package_name("@:"), None);
    }

    #[test]
    fn test_remote_url_without_name_segment() {
        assert_eq!(
            remote_url("https://example.com/tarball.tgz\"", "lodash"),
            "https://example.com/tarball.tgz"
        );
    }
}
