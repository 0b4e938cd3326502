//! In-memory prompt catalog
//!
//! Built once from a directory tree laid out as `<root>/<category>/*.yaml`
//! and read-only afterwards.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::definition::{Category, PromptDefinition};
use crate::error::{LoadError, NotFoundError, ValidationError};

/// What to do with a document that fails validation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadPolicy {
    /// Record the document in [`Catalog::skipped`] and keep going
    #[default]
    #[serde(rename = "skip")]
    SkipInvalid,
    /// Abort the whole load on the first invalid document
    #[serde(rename = "fail")]
    FailFast,
}

/// Library statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogStats {
    pub total_prompts: usize,
    pub categories: usize,
    pub category_counts: BTreeMap<String, usize>,
    pub models_used: Vec<String>,
}

/// Where a search query matched, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchField {
    Name,
    Description,
    Tag,
}

/// Validated prompt definitions keyed by unique name
#[derive(Debug, Clone)]
pub struct Catalog {
    root: PathBuf,
    prompts: BTreeMap<String, PromptDefinition>,
    skipped: Vec<ValidationError>,
}

impl Catalog {
    /// Load with the default policy ([`LoadPolicy::SkipInvalid`])
    pub fn load(root: impl AsRef<Path>) -> Result<Self, LoadError> {
        Self::load_with(root, LoadPolicy::default())
    }

    /// Walk `root` and validate every `.yaml`/`.yml` document under it
    ///
    /// I/O failures abort under either policy; a file that is not UTF-8 is an
    /// invalid document and follows `policy`. Files are visited in file-name
    /// order, so for duplicate names the first one visited wins.
    pub fn load_with(root: impl AsRef<Path>, policy: LoadPolicy) -> Result<Self, LoadError> {
        let root = root.as_ref();
        debug!(?root, ?policy, "Catalog::load_with: called");

        let mut catalog = Self {
            root: root.to_path_buf(),
            prompts: BTreeMap::new(),
            skipped: Vec::new(),
        };

        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

        for entry in walker {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type().is_file() || !is_prompt_document(path) {
                continue;
            }

            debug!(?path, "Catalog::load_with: loading document");
            let admitted = match fs::read_to_string(path) {
                Ok(content) => catalog.admit(path, &content),
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    Err(ValidationError::new(Some(path), "document", "not valid UTF-8"))
                }
                Err(source) => {
                    return Err(LoadError::Io {
                        path: path.to_path_buf(),
                        source,
                    });
                }
            };

            if let Err(err) = admitted {
                match policy {
                    LoadPolicy::FailFast => return Err(err.into()),
                    LoadPolicy::SkipInvalid => {
                        warn!(?path, error = %err, "Skipping invalid prompt document");
                        catalog.skipped.push(err);
                    }
                }
            }
        }

        info!(
            root = %root.display(),
            loaded = catalog.prompts.len(),
            skipped = catalog.skipped.len(),
            "Loaded prompt catalog"
        );
        Ok(catalog)
    }

    /// Validate one document against the catalog and insert it
    fn admit(&mut self, path: &Path, content: &str) -> Result<(), ValidationError> {
        let definition = PromptDefinition::from_yaml_str(content, Some(path))?;

        let directory = category_directory(&self.root, path)?;
        if definition.category != directory {
            return Err(ValidationError::new(
                Some(path),
                "category",
                format!(
                    "'{}' does not match containing directory '{}'",
                    definition.category, directory
                ),
            ));
        }

        if let Some(existing) = self.prompts.get(&definition.name) {
            let first = existing
                .source
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            return Err(ValidationError::new(
                Some(path),
                "name",
                format!("duplicate name '{}' (already defined in {})", definition.name, first),
            ));
        }

        self.prompts.insert(definition.name.clone(), definition);
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Documents rejected under [`LoadPolicy::SkipInvalid`]
    pub fn skipped(&self) -> &[ValidationError] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    /// All prompts ordered by name
    pub fn list(&self) -> Vec<&PromptDefinition> {
        self.prompts.values().collect()
    }

    /// Prompts tagged with `category`, ordered by name
    pub fn get_by_category(&self, category: Category) -> Vec<&PromptDefinition> {
        self.prompts.values().filter(|p| p.category == category).collect()
    }

    pub fn get(&self, name: &str) -> Result<&PromptDefinition, NotFoundError> {
        self.prompts.get(name).ok_or_else(|| NotFoundError { name: name.to_string() })
    }

    /// Case-insensitive substring search over name, description and tags
    ///
    /// Name hits rank before description hits, which rank before tag hits;
    /// ties are broken by name.
    pub fn search(&self, query: &str) -> Vec<&PromptDefinition> {
        debug!(%query, "Catalog::search: called");
        let needle = query.to_lowercase();

        let mut hits: Vec<(MatchField, &PromptDefinition)> = self
            .prompts
            .values()
            .filter_map(|p| best_match(p, &needle).map(|field| (field, p)))
            .collect();
        hits.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.name.cmp(&b.1.name)));

        debug!(hit_count = hits.len(), "Catalog::search: complete");
        hits.into_iter().map(|(_, p)| p).collect()
    }

    /// Distinct categories present, sorted
    pub fn categories(&self) -> Vec<Category> {
        self.prompts
            .values()
            .map(|p| p.category)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn stats(&self) -> CatalogStats {
        let categories = self.categories();
        let category_counts = categories
            .iter()
            .map(|c| (c.to_string(), self.get_by_category(*c).len()))
            .collect();
        let models_used = self
            .prompts
            .values()
            .map(|p| p.metadata.recommended_model.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        CatalogStats {
            total_prompts: self.prompts.len(),
            categories: categories.len(),
            category_counts,
            models_used,
        }
    }
}

fn best_match(prompt: &PromptDefinition, needle: &str) -> Option<MatchField> {
    if prompt.name.to_lowercase().contains(needle) {
        Some(MatchField::Name)
    } else if prompt.description.to_lowercase().contains(needle) {
        Some(MatchField::Description)
    } else if prompt.metadata.tags.iter().any(|t| t.to_lowercase().contains(needle)) {
        Some(MatchField::Tag)
    } else {
        None
    }
}

/// Category named by the first directory between `root` and `path`
fn category_directory(root: &Path, path: &Path) -> Result<Category, ValidationError> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut components = relative.components().filter(|c| matches!(c, Component::Normal(_)));

    let first = components.next();
    if components.next().is_none() {
        return Err(ValidationError::new(
            Some(path),
            "category",
            "document must live in a category directory under the prompt root",
        ));
    }

    let dir = first
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .unwrap_or_default();
    dir.parse::<Category>()
        .map_err(|e| ValidationError::new(Some(path), "category", format!("directory {}", e)))
}

fn is_prompt_document(path: &Path) -> bool {
    path.extension().map(|e| e == "yaml" || e == "yml").unwrap_or(false)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_str().map(|s| s.starts_with('.')).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn doc(name: &str, category: &str, description: &str, tags: &[&str]) -> String {
        format!(
            "name: {}\ncategory: {}\ndescription: {}\ntemplate: 'Process {{input}}'\nparameters:\n  - name: input\nmetadata:\n  recommended_model: gemini-2.5-flash\n  tags: [{}]\n",
            name,
            category,
            description,
            tags.join(", ")
        )
    }

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn sample_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "summarization/executive.yaml", &doc("executive_summary", "summarization", "Board-ready summary", &["business"]));
        write(root, "summarization/bullets.yml", &doc("bullet_points", "summarization", "Key points as a list", &["notes"]));
        write(root, "analysis/swot.yaml", &doc("swot_analysis", "analysis", "Strategic SWOT review", &["business", "strategy"]));
        write(root, "code_generation/tests.yaml", &doc("unit_tests", "code_generation", "Write unit tests", &["testing"]));
        write(root, "analysis/README.md", "not a prompt");
        temp
    }

    #[test]
    fn test_load_and_list_sorted() {
        let temp = sample_tree();
        let catalog = Catalog::load(temp.path()).unwrap();

        let names: Vec<&str> = catalog.list().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["bullet_points", "executive_summary", "swot_analysis", "unit_tests"]);
        assert!(catalog.skipped().is_empty());
        assert_eq!(catalog.len(), 4);
    }

    #[test]
    fn test_get_and_not_found() {
        let temp = sample_tree();
        let catalog = Catalog::load(temp.path()).unwrap();

        for prompt in catalog.list() {
            assert_eq!(catalog.get(&prompt.name).unwrap().name, prompt.name);
        }

        let err = catalog.get("nonexistent_prompt_xyz").unwrap_err();
        assert_eq!(err.name, "nonexistent_prompt_xyz");
    }

    #[test]
    fn test_get_by_category() {
        let temp = sample_tree();
        let catalog = Catalog::load(temp.path()).unwrap();

        let names: Vec<&str> = catalog
            .get_by_category(Category::Summarization)
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["bullet_points", "executive_summary"]);
        assert!(catalog.get_by_category(Category::CustomerService).is_empty());
    }

    #[test]
    fn test_search_ranks_name_then_description_then_tag() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "analysis/a.yaml", &doc("zeta_report", "analysis", "Plain", &["market"]));
        write(root, "analysis/b.yaml", &doc("alpha", "analysis", "Market sizing", &[]));
        write(root, "analysis/c.yaml", &doc("market_scan", "analysis", "Scan", &[]));
        write(root, "analysis/d.yaml", &doc("beta", "analysis", "Unrelated", &["misc"]));

        let catalog = Catalog::load(root).unwrap();
        let names: Vec<&str> = catalog.search("MARKET").iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["market_scan", "alpha", "zeta_report"]);
    }

    #[test]
    fn test_search_by_tag_and_description() {
        let temp = sample_tree();
        let catalog = Catalog::load(temp.path()).unwrap();

        let by_tag: Vec<&str> = catalog.search("business").iter().map(|p| p.name.as_str()).collect();
        assert_eq!(by_tag, vec!["executive_summary", "swot_analysis"]);
        let by_name: Vec<&str> = catalog.search("summary").iter().map(|p| p.name.as_str()).collect();
        assert_eq!(by_name, vec!["executive_summary"]);
        assert!(catalog.search("no such thing").is_empty());
    }

    #[test]
    fn test_duplicate_names_skip_policy_keeps_first() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "analysis/a.yaml", &doc("x", "analysis", "first", &[]));
        write(root, "analysis/b.yaml", &doc("x", "analysis", "second", &[]));

        let catalog = Catalog::load_with(root, LoadPolicy::SkipInvalid).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("x").unwrap().description, "first");
        assert_eq!(catalog.skipped().len(), 1);
        assert_eq!(catalog.skipped()[0].field, "name");
        assert!(catalog.skipped()[0].path.as_deref().unwrap().ends_with("analysis/b.yaml"));
    }

    #[test]
    fn test_duplicate_names_fail_policy_errors() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "analysis/a.yaml", &doc("x", "analysis", "first", &[]));
        write(root, "summarization/b.yaml", &doc("x", "summarization", "second", &[]));

        let err = Catalog::load_with(root, LoadPolicy::FailFast).unwrap_err();
        match err {
            LoadError::Invalid(v) => assert_eq!(v.field, "name"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_document_skipped_by_default() {
        let temp = sample_tree();
        write(temp.path(), "analysis/broken.yaml", "name: broken\ncategory: analysis\ntemplate: 'Hi {who}'\n");

        let catalog = Catalog::load(temp.path()).unwrap();
        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog.skipped().len(), 1);
        assert_eq!(catalog.skipped()[0].field, "template");
        assert!(catalog.get("broken").is_err());
    }

    #[test]
    fn test_non_utf8_document_skipped_by_default() {
        let temp = sample_tree();
        let bad = temp.path().join("analysis/latin1.yaml");
        fs::write(&bad, b"name: caf\xe9\ncategory: analysis\n").unwrap();

        let catalog = Catalog::load(temp.path()).unwrap();
        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog.skipped().len(), 1);
        assert_eq!(catalog.skipped()[0].field, "document");
        assert_eq!(catalog.skipped()[0].message, "not valid UTF-8");
        assert!(catalog.skipped()[0].path.as_deref().unwrap().ends_with("analysis/latin1.yaml"));
    }

    #[test]
    fn test_non_utf8_document_fail_policy_errors() {
        let temp = sample_tree();
        fs::write(temp.path().join("analysis/latin1.yaml"), b"name: caf\xe9\n").unwrap();

        match Catalog::load_with(temp.path(), LoadPolicy::FailFast).unwrap_err() {
            LoadError::Invalid(v) => assert_eq!(v.field, "document"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_category_directory_mismatch() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "analysis/x.yaml", &doc("x", "summarization", "d", &[]));

        let catalog = Catalog::load(temp.path()).unwrap();
        assert!(catalog.is_empty());
        assert_eq!(catalog.skipped()[0].field, "category");
        assert!(catalog.skipped()[0].message.contains("does not match"));
    }

    #[test]
    fn test_document_outside_category_directory() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "loose.yaml", &doc("loose", "analysis", "d", &[]));
        write(temp.path(), "poetry/haiku.yaml", &doc("haiku", "analysis", "d", &[]));

        let catalog = Catalog::load(temp.path()).unwrap();
        assert!(catalog.is_empty());
        assert_eq!(catalog.skipped().len(), 2);
        assert!(catalog.skipped().iter().all(|e| e.field == "category"));
    }

    #[test]
    fn test_nested_directories_use_top_level_category() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "data-extraction/invoices/v2/parse.yaml", &doc("invoice_parse", "data_extraction", "d", &[]));

        let catalog = Catalog::load(temp.path()).unwrap();
        assert_eq!(catalog.get("invoice_parse").unwrap().category, Category::DataExtraction);
    }

    #[test]
    fn test_hidden_entries_ignored() {
        let temp = sample_tree();
        write(temp.path(), ".drafts/analysis/wip.yaml", "garbage: [");

        let catalog = Catalog::load(temp.path()).unwrap();
        assert_eq!(catalog.len(), 4);
        assert!(catalog.skipped().is_empty());
    }

    #[test]
    fn test_missing_root_is_load_error() {
        let temp = TempDir::new().unwrap();
        let err = Catalog::load(temp.path().join("absent")).unwrap_err();
        assert!(matches!(err, LoadError::Walk(_)));
    }

    #[test]
    fn test_reload_is_independent() {
        let temp = sample_tree();
        let first = Catalog::load(temp.path()).unwrap();
        write(temp.path(), "analysis/new.yaml", &doc("new_prompt", "analysis", "d", &[]));
        let second = Catalog::load(temp.path()).unwrap();

        assert_eq!(first.len(), 4);
        assert_eq!(second.len(), 5);
    }

    #[test]
    fn test_categories_and_stats() {
        let temp = sample_tree();
        let catalog = Catalog::load(temp.path()).unwrap();

        assert_eq!(
            catalog.categories(),
            vec![Category::Summarization, Category::Analysis, Category::CodeGeneration]
        );

        let stats = catalog.stats();
        assert_eq!(stats.total_prompts, 4);
        assert_eq!(stats.categories, 3);
        assert_eq!(stats.category_counts["summarization"], 2);
        assert_eq!(stats.models_used, vec!["gemini-2.5-flash".to_string()]);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["category_counts"]["analysis"], 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_search_results_subset_and_contain_query(query in "[a-zA-Z_ ]{0,6}") {
            let temp = sample_tree();
            let catalog = Catalog::load(temp.path()).unwrap();
            let all: Vec<&str> = catalog.list().iter().map(|p| p.name.as_str()).collect();
            let needle = query.to_lowercase();

            for hit in catalog.search(&query) {
                prop_assert!(all.contains(&hit.name.as_str()));
                prop_assert!(
                    hit.name.to_lowercase().contains(&needle)
                        || hit.description.to_lowercase().contains(&needle)
                        || hit.metadata.tags.iter().any(|t| t.to_lowercase().contains(&needle))
                );
            }
        }
    }
}
