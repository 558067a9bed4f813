//! Comma-delimited tag strings, as accepted by the create and update endpoints.
//!
//! Pieces are trimmed and empty pieces dropped. Case, order and duplicates are
//! kept as typed.

use std::collections::BTreeSet;

use crate::models::Image;

pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

pub fn join_tags(tags: &[String]) -> String {
    tags.join(", ")
}

/// Distinct tags across all images, sorted.
pub fn vocabulary(images: &[Image]) -> Vec<String> {
    images
        .iter()
        .flat_map(|img| img.tags.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImageId;

    #[test]
    fn test_split_trims_and_drops_empty() {
        assert_eq!(
            split_tags(" nature ,, Orange,  ,sky "),
            vec!["nature", "Orange", "sky"]
        );
        assert!(split_tags("").is_empty());
        assert!(split_tags(" , ,").is_empty());
    }

    #[test]
    fn test_split_keeps_duplicates_and_case() {
        assert_eq!(split_tags("a,A,a"), vec!["a", "A", "a"]);
    }

    #[test]
    fn test_join_then_split_is_stable() {
        let tags = vec!["nature".to_string(), "orange".into()];
        assert_eq!(join_tags(&tags), "nature, orange");
        assert_eq!(split_tags(&join_tags(&tags)), tags);
    }

    #[test]
    fn test_vocabulary_sorted_distinct() {
        let img = |id, tags: &[&str]| Image {
            id: ImageId::new(id),
            filename: format!("{id}.png"),
            title: "t".into(),
            description: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            uploaded_by: None,
            created_at: String::new(),
        };
        let images = vec![img(1, &["urban", "night"]), img(2, &["nature", "urban"])];
        assert_eq!(vocabulary(&images), vec!["nature", "night", "urban"]);
    }
}
