use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

use crate::model::DocumentNode;
use crate::tree::DocumentTree;

/// Nodes whose name fuzzily matches `query`, best match first. Equal scores
/// keep tree order.
pub fn find<'t>(tree: &'t DocumentTree, query: &str) -> Vec<(&'t DocumentNode, i64)> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }
    let matcher = SkimMatcherV2::default().ignore_case();
    let mut hits: Vec<_> = tree
        .iter()
        .filter_map(|n| matcher.fuzzy_match(&n.name, query).map(|s| (n, s)))
        .collect();
    hits.sort_by(|a, b| b.1.cmp(&a.1));
    hits
}
