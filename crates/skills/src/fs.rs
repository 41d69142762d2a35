//! Filesystem skill loader: `<root>/<name>/SKILL.md`.
//!
//! SKILL.md files may start with a simple `key: value` front matter block:
//! ```markdown
//! ---
//! name: prospecting
//! description: How to spot buying signals
//! ---
//!
//! Full instructions for the agent...
//! ```

use agentrelay_core::Skill;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::SkillLoader;

const SKILL_FILENAME: &str = "SKILL.md";

/// Loads skills from a directory of `<name>/SKILL.md` documents.
#[derive(Debug, Clone)]
pub struct FsSkillLoader {
    root: PathBuf,
}

impl FsSkillLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn skill_path(&self, name: &str) -> PathBuf {
        self.root.join(name).join(SKILL_FILENAME)
    }
}

#[async_trait]
impl SkillLoader for FsSkillLoader {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn load(&self, name: &str) -> Skill {
        let path = self.skill_path(name);
        if !is_plain_name(name) {
            return Skill::failed(name, Some(path), format!("invalid skill name: {name}"));
        }
        match fs::read_to_string(&path).await {
            Ok(content) => {
                let (meta, body) = parse_front_matter(&content);
                Skill::loaded(name, content, Some(path), meta, body)
            }
            Err(e) => Skill::failed(name, Some(path), e.to_string()),
        }
    }

    async fn load_reference(&self, name: &str, file: &str) -> Result<String, String> {
        if !is_plain_name(name) || !is_plain_name(file) {
            return Err(format!("invalid reference: {name}/{file}"));
        }
        let path = self.root.join(name).join("references").join(file);
        fs::read_to_string(&path)
            .await
            .map_err(|e| format!("{}: {e}", path.display()))
    }

    async fn list(&self) -> Vec<String> {
        let Ok(mut entries) = fs::read_dir(&self.root).await else {
            return Vec::new();
        };
        let mut names = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let is_dir = entry.file_type().await.is_ok_and(|t| t.is_dir());
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if is_dir && !name.starts_with('.') {
                names.push(name);
            }
        }
        names.sort();
        names
    }
}

/// Names are single path components; no separators or parent references.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
}

/// Split a document into its front matter map and body.
///
/// Documents without a closed `---` block are all body.
pub fn parse_front_matter(content: &str) -> (BTreeMap<String, String>, String) {
    let mut meta = BTreeMap::new();
    let Some(rest) = content.strip_prefix("---\n") else {
        return (meta, content.to_string());
    };
    let Some(end) = rest.find("\n---\n") else {
        return (meta, content.to_string());
    };

    for line in rest[..end].lines() {
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            if !key.is_empty() {
                meta.insert(key.to_string(), value.trim().to_string());
            }
        }
    }
    let body = rest[end + "\n---\n".len()..].to_string();
    (meta, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_skill(root: &Path, name: &str, content: &str) {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(SKILL_FILENAME), content).unwrap();
    }

    #[test]
    fn front_matter_is_split_from_body() {
        let (meta, body) = parse_front_matter(
            "---\nname: prospecting\nsource: https://example.com/a:b\n---\n# Prospecting\n",
        );
        assert_eq!(meta["name"], "prospecting");
        assert_eq!(meta["source"], "https://example.com/a:b");
        assert_eq!(body, "# Prospecting\n");
    }

    #[test]
    fn documents_without_front_matter_are_all_body() {
        let (meta, body) = parse_front_matter("# Just text\n");
        assert!(meta.is_empty());
        assert_eq!(body, "# Just text\n");

        let (meta, body) = parse_front_matter("---\nname: unterminated\n");
        assert!(meta.is_empty());
        assert!(body.starts_with("---"));
    }

    #[tokio::test]
    async fn loads_existing_skill() {
        let tmp = TempDir::new().unwrap();
        write_skill(tmp.path(), "prospecting", "---\ntier: core\n---\nFind leads.\n");
        let skill = FsSkillLoader::new(tmp.path()).load("prospecting").await;
        assert!(skill.loaded);
        assert_eq!(skill.meta["tier"], "core");
        assert_eq!(skill.body.as_deref(), Some("Find leads.\n"));
        assert!(skill.loaded_at.is_some());
    }

    #[tokio::test]
    async fn missing_skill_is_a_failed_load() {
        let tmp = TempDir::new().unwrap();
        let skill = FsSkillLoader::new(tmp.path()).load("nope").await;
        assert!(!skill.loaded);
        assert!(skill.content.is_none());
        assert!(skill.error.is_some());
    }

    #[tokio::test]
    async fn path_traversal_is_refused() {
        let tmp = TempDir::new().unwrap();
        let loader = FsSkillLoader::new(tmp.path());
        assert!(!loader.load("../etc").await.loaded);
        assert!(loader.load_reference("x", "../../secret").await.is_err());
    }

    #[tokio::test]
    async fn lists_skill_directories_sorted() {
        let tmp = TempDir::new().unwrap();
        write_skill(tmp.path(), "writing", "w");
        write_skill(tmp.path(), "analysis", "a");
        std::fs::create_dir_all(tmp.path().join(".drafts")).unwrap();
        std::fs::write(tmp.path().join("README.md"), "x").unwrap();
        let names = FsSkillLoader::new(tmp.path()).list().await;
        assert_eq!(names, vec!["analysis", "writing"]);
    }

    #[tokio::test]
    async fn reads_reference_files() {
        let tmp = TempDir::new().unwrap();
        let refs = tmp.path().join("prospecting").join("references");
        std::fs::create_dir_all(&refs).unwrap();
        std::fs::write(refs.join("bant.md"), "Budget, Authority").unwrap();
        let loader = FsSkillLoader::new(tmp.path());
        assert_eq!(
            loader.load_reference("prospecting", "bant.md").await.unwrap(),
            "Budget, Authority"
        );
        assert!(loader.load_reference("prospecting", "missing.md").await.is_err());
    }
}
