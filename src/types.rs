use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Unique identifier of a policy record.
///
/// Higher identifiers are treated as more recent by the `Latest` sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyId(pub u64);

impl fmt::Display for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PolicyId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(PolicyId)
            .map_err(|_| Error::Config(format!("Invalid policy id '{}'", s)))
    }
}

/// Policy category; unknown labels are kept verbatim
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Financial,
    Social,
    Legal,
    Other(String),
}

impl Category {
    /// Display label, as stored in the policy table
    pub fn label(&self) -> &str {
        match self {
            Category::Financial => "Financial",
            Category::Social => "Social",
            Category::Legal => "Legal",
            Category::Other(raw) => raw,
        }
    }
}

impl From<&str> for Category {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "financial" => Category::Financial,
            "social" => Category::Social,
            "legal" => Category::Legal,
            _ => Category::Other(s.to_string()),
        }
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        Category::from(s.as_str())
    }
}

impl From<Category> for String {
    fn from(c: Category) -> Self {
        c.label().to_string()
    }
}

/// A single government policy entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub id: PolicyId,
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub eligibility: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
    /// Opaque icon key, resolved by [`crate::icons::IconKey`]
    #[serde(default)]
    pub icon: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Category filter applied before search
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(String),
}

impl CategoryFilter {
    /// Case-insensitive category match
    pub fn matches(&self, category: &Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(wanted) => category.label().to_lowercase() == wanted.to_lowercase(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            CategoryFilter::All => "All",
            CategoryFilter::Only(c) => c,
        }
    }

    /// Filters offered to the user, in display order
    pub fn choices() -> Vec<CategoryFilter> {
        vec![
            CategoryFilter::All,
            CategoryFilter::Only("Financial".to_string()),
            CategoryFilter::Only("Social".to_string()),
            CategoryFilter::Only("Legal".to_string()),
        ]
    }
}

impl From<&str> for CategoryFilter {
    fn from(s: &str) -> Self {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            CategoryFilter::All
        } else {
            CategoryFilter::Only(trimmed.to_string())
        }
    }
}

/// Sort order for the browse list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    #[default]
    Relevance,
    Latest,
    /// Placeholder ordering by `id mod 3`; not a real popularity metric.
    MostPopular,
}

impl From<&str> for SortMode {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "latest" => SortMode::Latest,
            "popular" | "most_popular" | "mostpopular" => SortMode::MostPopular,
            _ => SortMode::Relevance,
        }
    }
}

/// Occupation choices offered by the profile form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profession {
    Student,
    Farmer,
    Salaried,
    SelfEmployed,
    BusinessOwner,
    Unemployed,
    Retired,
}

impl Profession {
    pub const ALL: [Profession; 7] = [
        Profession::Student,
        Profession::Farmer,
        Profession::Salaried,
        Profession::SelfEmployed,
        Profession::BusinessOwner,
        Profession::Unemployed,
        Profession::Retired,
    ];

    /// Term matched against policy description and eligibility text
    pub fn search_term(&self) -> &'static str {
        match self {
            Profession::Student => "student",
            Profession::Farmer => "farmer",
            Profession::Salaried => "salaried",
            Profession::SelfEmployed => "self-employed",
            Profession::BusinessOwner => "business",
            Profession::Unemployed => "unemployed",
            Profession::Retired => "retired",
        }
    }
}

impl FromStr for Profession {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '_'], "-");
        Profession::ALL
            .into_iter()
            .find(|p| p.search_term() == normalized || normalized == format!("{:?}", p).to_lowercase())
            .or(match normalized.as_str() {
                "business-owner" => Some(Profession::BusinessOwner),
                _ => None,
            })
            .ok_or_else(|| Error::Config(format!("Unknown profession '{}'", s)))
    }
}

/// Yearly household income bands offered by the profile form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncomeRange {
    #[serde(rename = "under_25k")]
    Under25k,
    #[serde(rename = "25k_50k")]
    From25kTo50k,
    #[serde(rename = "50k_100k")]
    From50kTo100k,
    #[serde(rename = "over_100k")]
    Over100k,
}

impl FromStr for IncomeRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "under_25k" | "<25k" => Ok(IncomeRange::Under25k),
            "25k_50k" | "25k-50k" => Ok(IncomeRange::From25kTo50k),
            "50k_100k" | "50k-100k" => Ok(IncomeRange::From50kTo100k),
            "over_100k" | ">100k" => Ok(IncomeRange::Over100k),
            _ => Err(Error::Config(format!("Unknown income range '{}'", s))),
        }
    }
}

/// What the user told us about themselves
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfileCriteria {
    pub age: Option<u32>,
    pub profession: Option<Profession>,
    pub income_range: Option<IncomeRange>,
    pub location: Option<String>,
    /// Interest terms in insertion order; membership is case-insensitive.
    #[serde(default)]
    pub interests: Vec<String>,
}

impl ProfileCriteria {
    /// Add the interest if absent, remove it if present.
    /// Blank terms are ignored.
    pub fn toggle_interest(&mut self, interest: &str) {
        let term = interest.trim();
        if term.is_empty() {
            return;
        }
        let lowered = term.to_lowercase();
        if let Some(pos) = self.interests.iter().position(|i| i.to_lowercase() == lowered) {
            self.interests.remove(pos);
        } else {
            self.interests.push(term.to_string());
        }
    }

    pub fn has_interest(&self, interest: &str) -> bool {
        let lowered = interest.trim().to_lowercase();
        self.interests.iter().any(|i| i.to_lowercase() == lowered)
    }
}

/// Coarse server-side query derived from the profile.
///
/// Only the profession is matched; other profile fields do not narrow the query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchCriteria {
    pub profession: Option<String>,
}

impl From<&ProfileCriteria> for SearchCriteria {
    fn from(profile: &ProfileCriteria) -> Self {
        Self {
            profession: profile.profession.map(|p| p.search_term().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parsing_is_case_insensitive() {
        assert_eq!(Category::from("FINANCIAL"), Category::Financial);
        assert_eq!(Category::from("legal"), Category::Legal);
        assert_eq!(Category::from("Housing"), Category::Other("Housing".to_string()));
        assert_eq!(Category::from("Housing").label(), "Housing");
    }

    #[test]
    fn test_record_with_null_tags() {
        let json = serde_json::json!({
            "id": 4,
            "name": "Rural Credit",
            "category": "financial",
            "description": "Low interest loans",
            "eligibility": "Farmers",
            "tags": null,
            "icon": "wallet"
        });
        let record: PolicyRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.id, PolicyId(4));
        assert_eq!(record.category, Category::Financial);
        assert!(record.tags.is_empty());
    }

    #[test]
    fn test_sort_mode_from_str() {
        assert_eq!(SortMode::from("latest"), SortMode::Latest);
        assert_eq!(SortMode::from("Most Popular"), SortMode::MostPopular);
        assert_eq!(SortMode::from("popular"), SortMode::MostPopular);
        assert_eq!(SortMode::from("anything"), SortMode::Relevance);
    }

    #[test]
    fn test_category_filter_all() {
        assert_eq!(CategoryFilter::from("All"), CategoryFilter::All);
        assert_eq!(CategoryFilter::from(""), CategoryFilter::All);
        assert!(CategoryFilter::from("social").matches(&Category::Social));
        assert!(!CategoryFilter::from("social").matches(&Category::Legal));
    }

    #[test]
    fn test_toggle_interest() {
        let mut profile = ProfileCriteria::default();
        profile.toggle_interest("Education");
        profile.toggle_interest("Health");
        profile.toggle_interest("  ");
        assert_eq!(profile.interests, vec!["Education", "Health"]);

        profile.toggle_interest("education");
        assert_eq!(profile.interests, vec!["Health"]);
        assert!(!profile.has_interest("Education"));
    }

    #[test]
    fn test_profession_parsing() {
        assert_eq!("Farmer".parse::<Profession>().unwrap(), Profession::Farmer);
        assert_eq!("self employed".parse::<Profession>().unwrap(), Profession::SelfEmployed);
        assert_eq!("business_owner".parse::<Profession>().unwrap(), Profession::BusinessOwner);
        assert!("astronaut".parse::<Profession>().is_err());
    }

    #[test]
    fn test_search_criteria_uses_profession_only() {
        let profile = ProfileCriteria {
            age: Some(30),
            profession: Some(Profession::Student),
            income_range: Some(IncomeRange::Under25k),
            location: Some("Springfield".to_string()),
            interests: vec!["Education".to_string()],
        };
        let criteria = SearchCriteria::from(&profile);
        assert_eq!(criteria.profession.as_deref(), Some("student"));
    }
}
