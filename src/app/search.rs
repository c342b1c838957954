use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::content::ContentIndex;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct SearchHit {
    pub(super) id: String,
    pub(super) title: String,
    score: i64,
}

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_lowercase(), &query.to_lowercase()))
}

/// Best `limit` pages whose title or identifier fuzzily matches `query`,
/// highest score first. Ties keep index order.
pub(super) fn search_pages(index: &ContentIndex, query: &str, limit: usize) -> Vec<SearchHit> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }

    let matcher = SkimMatcherV2::default();
    let mut hits = index
        .ids()
        .filter_map(|id| {
            let title = index.title_of(id);
            let score = [
                fuzzy_match_score(&matcher, title, query),
                fuzzy_match_score(&matcher, id, query),
            ]
            .into_iter()
            .flatten()
            .max()?;
            Some(SearchHit {
                id: id.to_owned(),
                title: title.to_owned(),
                score,
            })
        })
        .collect::<Vec<_>>();

    hits.sort_by(|a, b| b.score.cmp(&a.score));
    hits.truncate(limit);
    hits
}
