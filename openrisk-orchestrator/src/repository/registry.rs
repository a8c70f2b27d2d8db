//! Registry Repository
//!
//! Reads and appends the registry document. The format is a small,
//! indentation-based subset of YAML:
//!
//! ```text
//! defaults:
//!   platform: github
//!   cache_dir: data/cache
//! repos:
//! - org: acme
//!   repo: widgets
//!   enabled: true
//!   registered_at: 2024-05-01T10:00:00.000Z
//! ```
//!
//! Parsing is line-oriented and permissive: lines it does not recognise are
//! skipped and never abort the parse. Writes only ever append; existing
//! content is left byte-for-byte intact.

use openrisk_core::domain::registry::{Registry, RegistryDefaults, RepoName, RepositoryRecord};
use std::path::Path;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read registry {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write registry {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Defaults,
    Repos,
}

/// Parses a registry document
pub fn parse(content: &str) -> Registry {
    let mut defaults = RegistryDefaults::new();
    let mut repos: Vec<RepositoryRecord> = Vec::new();
    let mut section = Section::None;

    for raw in content.lines() {
        let line = raw.trim_end();
        if line.is_empty() {
            continue;
        }

        // Section headers are only recognised at column 0
        if line.starts_with("defaults:") {
            section = Section::Defaults;
            continue;
        }
        if line.starts_with("repos:") {
            section = Section::Repos;
            continue;
        }

        match section {
            Section::None => {}
            Section::Defaults => {
                if let Some((key, value)) = key_value(line) {
                    defaults.set(key, value);
                }
            }
            Section::Repos => {
                if let Some(org) = item_start(line) {
                    repos.push(RepositoryRecord {
                        org: org.to_string(),
                        repo: String::new(),
                        platform: None,
                        enabled: true,
                        registered_at: None,
                    });
                    continue;
                }

                let (Some(current), Some((key, value))) = (repos.last_mut(), key_value(line))
                else {
                    continue;
                };

                match key {
                    "repo" => current.repo = value.to_string(),
                    "platform" => current.platform = Some(value.to_string()),
                    "enabled" => current.enabled = value != "false",
                    "registered_at" => current.registered_at = Some(value.to_string()),
                    _ => {}
                }
            }
        }
    }

    Registry { defaults, repos }
}

/// `  key: value` with a word key and a non-empty value
fn key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.trim_start().split_once(':')?;
    let value = value.trim();

    let word_key = !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !word_key || value.is_empty() {
        return None;
    }

    Some((key, value))
}

/// `- org: <value>` opening a new repository item
fn item_start(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix('-')?;
    let value = rest.trim_start().strip_prefix("org:")?.trim();
    (!value.is_empty()).then_some(value)
}

/// Reads and parses the registry at `path`
///
/// A missing file is an empty registry, not an error.
pub async fn read(path: &Path) -> Result<Registry, RegistryError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(parse(&content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("Registry {} not found, using empty registry", path.display());
            Ok(Registry::default())
        }
        Err(source) => Err(RegistryError::Read {
            path: path.display().to_string(),
            source,
        }),
    }
}

/// Renders the block appended for a new repository
pub fn render_record(org: &str, repo: &str, registered_at: &str) -> String {
    format!("- org: {org}\n  repo: {repo}\n  enabled: true\n  registered_at: {registered_at}\n")
}

/// Computes what must be written after `existing` to append `block`
///
/// Adds a newline if the document does not end with one and a `repos:` header
/// if the document has none, so the new item lands in the repos section.
pub fn append_text(existing: &str, block: &str) -> String {
    let mut out = String::new();

    if !existing.is_empty() && !existing.ends_with('\n') {
        out.push('\n');
    }
    if !existing.lines().any(|l| l.starts_with("repos:")) {
        out.push_str("repos:\n");
    }
    out.push_str(block);
    out
}

/// Appends a new repository record to the registry at `path`
///
/// The caller is responsible for the existence check and for serialising
/// concurrent appends.
pub async fn append(
    path: &Path,
    org: &str,
    repo: &str,
    registered_at: &str,
) -> Result<(), RegistryError> {
    let write_err = |source| RegistryError::Write {
        path: path.display().to_string(),
        source,
    };

    let existing = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(source) => {
            return Err(RegistryError::Read {
                path: path.display().to_string(),
                source,
            });
        }
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let text = append_text(&existing, &render_record(org, repo, registered_at));

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(write_err)?;
    file.write_all(text.as_bytes()).await.map_err(write_err)?;
    file.flush().await.map_err(write_err)?;

    Ok(())
}

/// Renders a registry document holding only `name` plus the global defaults
///
/// Every default is written out, falling back to the built-in values.
pub fn render_scoped(defaults: &RegistryDefaults, name: &RepoName) -> String {
    [
        "version: 1".to_string(),
        "defaults:".to_string(),
        format!("  platform: {}", defaults.platform_or_default()),
        format!("  base_url: {}", defaults.base_url_or_default()),
        format!("  cache_dir: {}", defaults.cache_dir_or_default()),
        format!("  sqlite_path: {}", defaults.sqlite_path_or_default()),
        "repos:".to_string(),
        format!("- org: {}", name.org),
        format!("  repo: {}", name.repo),
        "  enabled: true".to_string(),
        String::new(),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
version: 1
defaults:
  platform: gitee
  base_url: https://oss.open-digger.cn
  cache_dir: data/cache
repos:
- org: acme
  repo: widgets
  platform: github
  enabled: true
- org: acme
  repo: gadgets
  enabled: false
  registered_at: 2024-05-01T10:00:00.000Z
";

    #[test]
    fn test_parse_defaults_and_repos() {
        let reg = parse(SAMPLE);
        assert_eq!(reg.defaults.platform(), Some("gitee"));
        assert_eq!(reg.defaults.cache_dir(), Some("data/cache"));
        assert_eq!(reg.repos.len(), 2);

        assert_eq!(reg.repos[0].org, "acme");
        assert_eq!(reg.repos[0].repo, "widgets");
        assert_eq!(reg.repos[0].platform.as_deref(), Some("github"));
        assert!(reg.repos[0].enabled);

        assert_eq!(reg.repos[1].repo, "gadgets");
        assert!(!reg.repos[1].enabled);
        assert_eq!(
            reg.repos[1].registered_at.as_deref(),
            Some("2024-05-01T10:00:00.000Z")
        );
    }

    #[test]
    fn test_platform_resolution_from_document() {
        let reg = parse(SAMPLE);
        assert_eq!(reg.resolve_platform("acme", "widgets"), "github");
        assert_eq!(reg.resolve_platform("acme", "gadgets"), "gitee");
    }

    #[test]
    fn test_enabled_defaults_true_and_only_false_disables() {
        let reg = parse("repos:\n- org: a\n  repo: one\n- org: a\n  repo: two\n  enabled: no\n- org: a\n  repo: three\n  enabled: False\n");
        assert!(reg.repos.iter().all(|r| r.enabled));
    }

    #[test]
    fn test_stray_line_between_records() {
        let doc = "repos:\n- org: a\n  repo: one\n  ??? not a field\n# comment\n  weird line without colon\n- org: b\n  repo: two\n";
        let reg = parse(doc);
        assert_eq!(reg.repos.len(), 2);
        assert!(reg.contains("a", "one"));
        assert!(reg.contains("b", "two"));
    }

    #[test]
    fn test_fields_before_any_item_are_ignored() {
        let reg = parse("repos:\n  repo: orphan\n- org: a\n  repo: one\n");
        assert_eq!(reg.repos.len(), 1);
        assert_eq!(reg.repos[0].repo, "one");
    }

    #[test]
    fn test_empty_document() {
        let reg = parse("");
        assert!(reg.repos.is_empty());
        assert_eq!(reg.defaults, RegistryDefaults::new());
    }

    #[test]
    fn test_append_text_adds_header_and_newline() {
        let block = render_record("acme", "widgets", "T");
        assert_eq!(append_text("", &block), format!("repos:\n{block}"));
        assert_eq!(
            append_text("defaults:\n  platform: github", &block),
            format!("\nrepos:\n{block}")
        );
        assert_eq!(append_text("repos:\n", &block), block);
    }

    #[tokio::test]
    async fn test_read_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let reg = read(&dir.path().join("nope.yaml")).await.unwrap();
        assert!(reg.repos.is_empty());
    }

    #[tokio::test]
    async fn test_append_preserves_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sources.yaml");
        let original = "# hand-edited\ndefaults:\n    platform:   github\nrepos:\n- org: acme\n  repo: widgets   \n";
        std::fs::write(&path, original).unwrap();

        append(&path, "acme", "gadgets", "2024-06-01T00:00:00.000Z")
            .await
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(original));
        let reg = parse(&content);
        assert_eq!(reg.repos.len(), 2);
        assert_eq!(reg.repos[1].repo, "gadgets");
        assert_eq!(
            reg.repos[1].registered_at.as_deref(),
            Some("2024-06-01T00:00:00.000Z")
        );
    }

    #[tokio::test]
    async fn test_append_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("configs").join("sources.yaml");

        append(&path, "acme", "widgets", "T").await.unwrap();

        let reg = read(&path).await.unwrap();
        assert_eq!(reg.repos.len(), 1);
        assert!(reg.repos[0].enabled);
    }

    #[test]
    fn test_render_scoped() {
        let mut defaults = RegistryDefaults::new();
        defaults.set("platform", "gitee");
        let name: RepoName = "acme/widgets".parse().unwrap();

        let doc = render_scoped(&defaults, &name);
        assert!(doc.contains("  platform: gitee\n"));
        assert!(doc.contains("  cache_dir: data/cache\n"));

        let reg = parse(&doc);
        assert_eq!(reg.repos.len(), 1);
        assert!(reg.contains("acme", "widgets"));
        assert_eq!(reg.defaults.sqlite_path(), Some("data/sqlite/opendigger.db"));
    }
}
