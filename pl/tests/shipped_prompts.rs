//! The prompt library shipped with the repo must load cleanly

use std::path::PathBuf;

use promptcatalog::{Catalog, Category, LoadPolicy};

fn library() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..").join("prompts")
}

#[test]
fn test_shipped_library_is_valid() {
    let catalog = Catalog::load_with(library(), LoadPolicy::FailFast).expect("shipped prompts must be valid");
    assert!(catalog.skipped().is_empty());
    assert!(catalog.len() >= Category::ALL.len());
}

#[test]
fn test_every_category_is_populated() {
    let catalog = Catalog::load(library()).unwrap();
    assert_eq!(catalog.categories(), Category::ALL.to_vec());
}

#[test]
fn test_every_shipped_example_renders() {
    let catalog = Catalog::load(library()).unwrap();
    for prompt in catalog.list() {
        for example in &prompt.examples {
            let rendered = prompt
                .render(&example.input)
                .unwrap_or_else(|e| panic!("{}: {}", prompt.name, e));
            assert!(!rendered.trim().is_empty(), "{}", prompt.name);
        }
    }
}

#[test]
fn test_executive_summary_is_searchable() {
    let catalog = Catalog::load(library()).unwrap();
    let hits: Vec<&str> = catalog.search("executive").iter().map(|p| p.name.as_str()).collect();
    assert_eq!(hits.first(), Some(&"executive_summary"));
}
