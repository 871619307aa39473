//! Filter, search and sort pipeline over the locally held record set.

use crate::types::{CategoryFilter, PolicyRecord, SortMode};

/// Filter result indicating whether a record should be kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterResult {
    Keep,
    FilterOut,
}

impl From<bool> for FilterResult {
    fn from(keep: bool) -> Self {
        if keep {
            FilterResult::Keep
        } else {
            FilterResult::FilterOut
        }
    }
}

/// Filter trait for policy records
pub trait PolicyFilter {
    fn should_keep(&self, record: &PolicyRecord) -> FilterResult;
}

impl PolicyFilter for CategoryFilter {
    fn should_keep(&self, record: &PolicyRecord) -> FilterResult {
        self.matches(&record.category).into()
    }
}

/// Free-text search over name, description and tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSearch {
    needle: String,
}

impl TextSearch {
    pub fn new(query: &str) -> Self {
        Self {
            needle: query.trim().to_lowercase(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.needle.is_empty()
    }
}

impl PolicyFilter for TextSearch {
    fn should_keep(&self, record: &PolicyRecord) -> FilterResult {
        if self.is_empty() {
            return FilterResult::Keep;
        }
        let hit = record.name.to_lowercase().contains(&self.needle)
            || record.description.to_lowercase().contains(&self.needle)
            || record
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(&self.needle));
        hit.into()
    }
}

/// Number of a record's tags that contain any of the interest terms.
pub fn relevance_score(record: &PolicyRecord, interests: &[String]) -> usize {
    let interests: Vec<String> = interests
        .iter()
        .map(|i| i.trim().to_lowercase())
        .filter(|i| !i.is_empty())
        .collect();
    count_matching_tags(record, &interests)
}

fn count_matching_tags(record: &PolicyRecord, lowered_interests: &[String]) -> usize {
    record
        .tags
        .iter()
        .filter(|tag| {
            let tag = tag.to_lowercase();
            lowered_interests.iter().any(|interest| tag.contains(interest.as_str()))
        })
        .count()
}

/// Produce the ordered result list for the given inputs.
///
/// Category then search are applied conjunctively, then the sort mode.
/// All sorts are stable, so records with equal keys keep the order the
/// store returned them in. The input slice is never modified.
pub fn compute(
    records: &[PolicyRecord],
    category: &CategoryFilter,
    query: &str,
    sort_mode: SortMode,
    interests: &[String],
) -> Vec<PolicyRecord> {
    let search = TextSearch::new(query);

    let mut ordered: Vec<PolicyRecord> = records
        .iter()
        .filter(|r| category.should_keep(r) == FilterResult::Keep)
        .filter(|r| search.should_keep(r) == FilterResult::Keep)
        .cloned()
        .collect();

    match sort_mode {
        SortMode::Latest => {
            ordered.sort_by(|a, b| b.id.cmp(&a.id));
        }
        SortMode::MostPopular => {
            ordered.sort_by_key(|r| r.id.0 % 3);
        }
        SortMode::Relevance => {
            let lowered: Vec<String> = interests
                .iter()
                .map(|i| i.trim().to_lowercase())
                .filter(|i| !i.is_empty())
                .collect();
            if !lowered.is_empty() {
                // Score once per record, then a stable sort on the cached key
                ordered.sort_by_cached_key(|r| std::cmp::Reverse(count_matching_tags(r, &lowered)));
            }
        }
    }

    ordered
}
