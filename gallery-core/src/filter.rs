use crate::models::Image;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub search: String,
    /// Empty means no tag filter.
    pub tag: String,
}

impl FilterCriteria {
    pub fn new(search: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            tag: tag.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty() && self.tag.trim().is_empty()
    }
}

/// Criteria lowered once so the per-image check doesn't allocate for them.
struct Normalized {
    search: String,
    tag: String,
}

impl Normalized {
    fn from_criteria(criteria: &FilterCriteria) -> Self {
        Self {
            search: criteria.search.trim().to_lowercase(),
            tag: criteria.tag.trim().to_lowercase(),
        }
    }

    fn matches(&self, image: &Image) -> bool {
        self.matches_search(image) && self.matches_tag(image)
    }

    fn matches_search(&self, image: &Image) -> bool {
        if self.search.is_empty() {
            return true;
        }
        image.title.to_lowercase().contains(&self.search)
            || image
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&self.search))
    }

    fn matches_tag(&self, image: &Image) -> bool {
        self.tag.is_empty() || image.tags.iter().any(|t| t.to_lowercase() == self.tag)
    }
}

pub fn matches(image: &Image, criteria: &FilterCriteria) -> bool {
    Normalized::from_criteria(criteria).matches(image)
}

/// Ordered subsequence of `images` satisfying `criteria`.
pub fn filter(images: &[Image], criteria: &FilterCriteria) -> Vec<Image> {
    let norm = Normalized::from_criteria(criteria);
    images.iter().filter(|img| norm.matches(img)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ImageId, UserId};

    fn image(id: i64, title: &str, description: Option<&str>, tags: &[&str]) -> Image {
        Image {
            id: ImageId::new(id),
            filename: format!("{id}.jpg"),
            title: title.into(),
            description: description.map(String::from),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            uploaded_by: Some(UserId::new(1)),
            created_at: "2024-01-01 00:00:00".into(),
        }
    }

    fn collection() -> Vec<Image> {
        vec![
            image(1, "Sunset", Some("Orange sky over the bay"), &["nature", "orange"]),
            image(2, "City", None, &["urban"]),
            image(3, "Sunflower field", Some("Summer"), &["Nature", "yellow"]),
            image(4, "Night", Some("city lights at dusk"), &["urban", "night"]),
        ]
    }

    fn ids(images: &[Image]) -> Vec<i64> {
        images.iter().map(|i| i.id.get()).collect()
    }

    #[test]
    fn test_empty_criteria_is_identity() {
        let all = collection();
        assert_eq!(filter(&all, &FilterCriteria::default()), all);
    }

    #[test]
    fn test_search_title_or_description_case_insensitive() {
        let all = collection();
        assert_eq!(ids(&filter(&all, &FilterCriteria::new("SUN", ""))), vec![1, 3]);
        // description match, missing description never matches
        assert_eq!(ids(&filter(&all, &FilterCriteria::new("city", ""))), vec![2, 4]);
        assert_eq!(ids(&filter(&all, &FilterCriteria::new("bay", ""))), vec![1]);
    }

    #[test]
    fn test_search_is_trimmed() {
        let all = collection();
        assert_eq!(ids(&filter(&all, &FilterCriteria::new("  night  ", ""))), vec![4]);
        assert_eq!(filter(&all, &FilterCriteria::new("   ", "")).len(), 4);
    }

    #[test]
    fn test_tag_exact_case_insensitive() {
        let all = collection();
        assert_eq!(ids(&filter(&all, &FilterCriteria::new("", "nature"))), vec![1, 3]);
        assert_eq!(ids(&filter(&all, &FilterCriteria::new("", "URBAN"))), vec![2, 4]);
        // exact, not substring
        assert!(filter(&all, &FilterCriteria::new("", "urb")).is_empty());
    }

    #[test]
    fn test_combined_is_intersection() {
        let all = collection();
        let both = FilterCriteria::new("city", "night");
        let by_search = filter(&all, &FilterCriteria::new("city", ""));
        let by_tag = filter(&all, &FilterCriteria::new("", "night"));
        let expected: Vec<Image> = by_search
            .into_iter()
            .filter(|i| by_tag.contains(i))
            .collect();
        assert_eq!(filter(&all, &both), expected);
        assert_eq!(ids(&expected), vec![4]);
    }

    #[test]
    fn test_idempotent_ordered_subset() {
        let all = collection();
        for crit in [
            FilterCriteria::new("s", ""),
            FilterCriteria::new("", "urban"),
            FilterCriteria::new("i", "nature"),
            FilterCriteria::new("zzz", ""),
        ] {
            let once = filter(&all, &crit);
            assert_eq!(filter(&once, &crit), once);

            // relative order of the input is preserved
            let positions: Vec<usize> = once
                .iter()
                .map(|i| all.iter().position(|a| a == i).unwrap())
                .collect();
            assert!(positions.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_scenario_sun_and_urban() {
        let all = vec![
            image(1, "Sunset", None, &["nature", "orange"]),
            image(2, "City", None, &["urban"]),
        ];
        assert_eq!(ids(&filter(&all, &FilterCriteria::new("sun", ""))), vec![1]);
        assert_eq!(ids(&filter(&all, &FilterCriteria::new("", "urban"))), vec![2]);
    }

    #[test]
    fn test_matches_single() {
        let img = image(9, "Harbor", None, &["sea"]);
        assert!(matches(&img, &FilterCriteria::new("harb", "SEA")));
        assert!(!matches(&img, &FilterCriteria::new("harb", "lake")));
    }
}
