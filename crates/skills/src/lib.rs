//! Skill loading and the process-scoped skill cache.
//!
//! A [`SkillCache`] is constructed once per orchestrator process and memoizes
//! every load outcome by name, failures included, so a missing skill is not
//! re-read on every step. Nothing is persisted: a new process starts cold.

mod fs;

pub use fs::{FsSkillLoader, parse_front_matter};

use agentrelay_core::Skill;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Characters of each skill injected into a prompt.
const INJECT_LIMIT: usize = 2000;

/// Reads skill documents from some backing source.
#[async_trait]
pub trait SkillLoader: Send + Sync {
    /// Directory the skills are read from.
    fn root(&self) -> &Path;

    /// Load one skill. Failures are returned as a `Skill` with `loaded == false`.
    async fn load(&self, name: &str) -> Skill;

    /// Read `references/<file>` of a skill. Never cached.
    async fn load_reference(&self, name: &str, file: &str) -> Result<String, String>;

    /// Names of all available skills, sorted.
    async fn list(&self) -> Vec<String>;
}

/// Memoizing cache in front of a [`SkillLoader`].
pub struct SkillCache {
    loader: Arc<dyn SkillLoader>,
    cache: RwLock<HashMap<String, Arc<Skill>>>,
}

impl SkillCache {
    pub fn new(loader: Arc<dyn SkillLoader>) -> Self {
        Self {
            loader,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Cache over skills stored under `root`.
    pub fn from_dir(root: impl Into<std::path::PathBuf>) -> Self {
        Self::new(Arc::new(FsSkillLoader::new(root)))
    }

    /// Get a skill, loading it on first use.
    ///
    /// Two tasks asking for the same uncached name at once may both load it;
    /// the first stored outcome is kept and returned to both.
    pub async fn get(&self, name: &str) -> Arc<Skill> {
        if let Some(skill) = self.cache.read().await.get(name) {
            return skill.clone();
        }

        let skill = self.loader.load(name).await;
        if skill.loaded {
            debug!(skill = %name, "Skill loaded");
        } else {
            debug!(skill = %name, error = ?skill.error, "Skill failed to load");
        }

        self.cache
            .write()
            .await
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(skill))
            .clone()
    }

    /// Load a batch concurrently; returns only the skills that loaded.
    pub async fn preload(&self, names: &[String]) -> Vec<Arc<Skill>> {
        let skills = futures::future::join_all(names.iter().map(|name| self.get(name))).await;

        let (loaded, failed): (Vec<_>, Vec<_>) = skills.into_iter().partition(|s| s.loaded);
        if !failed.is_empty() {
            let names: Vec<&str> = failed.iter().map(|s| s.name.as_str()).collect();
            warn!(skills = %names.join(", "), "Failed to load skills");
        }
        loaded
    }

    /// Whether an outcome for `name` is cached.
    pub async fn is_cached(&self, name: &str) -> bool {
        self.cache.read().await.contains_key(name)
    }

    pub async fn list_available(&self) -> Vec<String> {
        self.loader.list().await
    }

    pub async fn load_reference(&self, name: &str, file: &str) -> Result<String, String> {
        self.loader.load_reference(name, file).await
    }

    pub fn root(&self) -> &Path {
        self.loader.root()
    }
}

/// Prepend the first [`INJECT_LIMIT`] characters of each loaded skill to a prompt.
pub fn inject_context<'a>(prompt: &str, skills: impl IntoIterator<Item = &'a Skill>) -> String {
    let sections: Vec<String> = skills
        .into_iter()
        .filter(|s| s.loaded)
        .filter_map(|s| {
            let content = s.content.as_deref()?;
            let excerpt: String = content.chars().take(INJECT_LIMIT).collect();
            Some(format!("## {} SKILL\n\n{excerpt}...", s.name.to_uppercase()))
        })
        .collect();

    if sections.is_empty() {
        return prompt.to_string();
    }
    format!("{}\n\n---\n\n{prompt}", sections.join("\n\n---\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Loader that counts loads; names starting with `missing` fail.
    struct CountingLoader {
        root: PathBuf,
        loads: AtomicUsize,
    }

    impl CountingLoader {
        fn new() -> Self {
            Self {
                root: PathBuf::from("/skills"),
                loads: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SkillLoader for CountingLoader {
        fn root(&self) -> &Path {
            &self.root
        }

        async fn load(&self, name: &str) -> Skill {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if name.starts_with("missing") {
                Skill::failed(name, None, "not found")
            } else {
                Skill::loaded(name, format!("# {name}"), None, BTreeMap::new(), format!("# {name}"))
            }
        }

        async fn load_reference(&self, _name: &str, _file: &str) -> Result<String, String> {
            Err("no references".into())
        }

        async fn list(&self) -> Vec<String> {
            vec!["analysis".into(), "prospecting".into()]
        }
    }

    #[tokio::test]
    async fn second_get_hits_the_cache() {
        let loader = Arc::new(CountingLoader::new());
        let cache = SkillCache::new(loader.clone());

        let first = cache.get("prospecting").await;
        let second = cache.get("prospecting").await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_loads_are_cached_too() {
        let loader = Arc::new(CountingLoader::new());
        let cache = SkillCache::new(loader.clone());

        assert!(!cache.get("missing-one").await.loaded);
        assert!(!cache.get("missing-one").await.loaded);
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
        assert!(cache.is_cached("missing-one").await);
    }

    #[tokio::test]
    async fn preload_returns_only_loaded_skills() {
        let loader = Arc::new(CountingLoader::new());
        let cache = SkillCache::new(loader.clone());

        let names = vec![
            "prospecting".to_string(),
            "missing-x".to_string(),
            "writing".to_string(),
        ];
        let loaded = cache.preload(&names).await;
        let loaded_names: Vec<&str> = loaded.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(loaded_names, vec!["prospecting", "writing"]);

        cache.get("writing").await;
        assert_eq!(loader.loads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn concurrent_first_gets_agree() {
        let loader = Arc::new(CountingLoader::new());
        let cache = Arc::new(SkillCache::new(loader.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get("analysis").await })
            })
            .collect();
        let mut skills = Vec::new();
        for h in handles {
            skills.push(h.await.unwrap());
        }
        assert!(skills.iter().all(|s| Arc::ptr_eq(s, &skills[0])));
        assert!(loader.loads.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn list_and_reference_pass_through() {
        let cache = SkillCache::new(Arc::new(CountingLoader::new()));
        assert_eq!(cache.list_available().await, vec!["analysis", "prospecting"]);
        assert!(cache.load_reference("analysis", "x.md").await.is_err());
        assert_eq!(cache.root(), Path::new("/skills"));
    }

    #[test]
    fn inject_context_prepends_loaded_skills() {
        let long = "x".repeat(3000);
        let skills = vec![
            Skill::loaded("prospecting", long.clone(), None, BTreeMap::new(), long),
            Skill::failed("writing", None, "gone"),
        ];
        let prompt = inject_context("Draft an email", &skills);
        assert!(prompt.starts_with("## PROSPECTING SKILL\n\n"));
        assert!(prompt.ends_with("\n\n---\n\nDraft an email"));
        assert!(!prompt.contains("WRITING"));
        assert_eq!(prompt.matches('x').count(), 2000);
    }

    #[test]
    fn inject_context_without_skills_is_the_prompt() {
        assert_eq!(inject_context("Hello", &[] as &[Skill]), "Hello");
    }
}
