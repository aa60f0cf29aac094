//! Creator matching: a pure category-set intersection filter.
//!
//! A brand's `target_categories` are intersected with each creator's
//! preference wishlist. No ranking, no persistence - recomputed on demand,
//! ordered stably by creator id.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::offer::CreatorId;

/// A creator's matching profile: their id, display name, and the category
/// wishlist they registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorProfile {
    pub creator_id: CreatorId,
    pub display_name: String,
    pub categories: BTreeSet<String>,
}

/// Result of a matching query, shaped like the wire payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedCreators {
    pub count: usize,
    pub message: String,
    pub creators: Vec<CreatorProfile>,
}

/// Creators whose wishlist intersects the target categories.
pub fn matched_creators(
    target_categories: &BTreeSet<String>,
    profiles: impl IntoIterator<Item = CreatorProfile>,
) -> MatchedCreators {
    let mut creators: Vec<CreatorProfile> = profiles
        .into_iter()
        .filter(|profile| {
            profile
                .categories
                .intersection(target_categories)
                .next()
                .is_some()
        })
        .collect();
    creators.sort_by(|a, b| a.creator_id.cmp(&b.creator_id));

    let count = creators.len();
    let message = match count {
        0 => "No creators match your target categories".to_string(),
        1 => "1 creator matches your target categories".to_string(),
        n => format!("{} creators match your target categories", n),
    };

    MatchedCreators {
        count,
        message,
        creators,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn profile(categories: &[&str]) -> CreatorProfile {
        CreatorProfile {
            creator_id: CreatorId(Uuid::new_v4()),
            display_name: "creator".to_string(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn targets(categories: &[&str]) -> BTreeSet<String> {
        categories.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_matches_on_any_shared_category() {
        let profiles = vec![
            profile(&["Skincare & Beauty", "Wellness"]),
            profile(&["Gaming"]),
            profile(&["Wellness"]),
        ];
        let result = matched_creators(&targets(&["Skincare & Beauty", "Wellness"]), profiles);
        assert_eq!(result.count, 2);
        assert_eq!(result.creators.len(), 2);
    }

    #[test]
    fn test_no_match_yields_empty_list_and_message() {
        let result = matched_creators(&targets(&["Gaming"]), vec![profile(&["Wellness"])]);
        assert_eq!(result.count, 0);
        assert!(result.creators.is_empty());
        assert_eq!(result.message, "No creators match your target categories");
    }

    #[test]
    fn test_singular_message() {
        let result = matched_creators(&targets(&["Wellness"]), vec![profile(&["Wellness"])]);
        assert_eq!(result.message, "1 creator matches your target categories");
    }

    #[test]
    fn test_order_is_stable_by_creator_id() {
        let mut a = profile(&["Wellness"]);
        let mut b = profile(&["Wellness"]);
        a.creator_id = CreatorId(Uuid::from_u128(2));
        b.creator_id = CreatorId(Uuid::from_u128(1));
        let result = matched_creators(&targets(&["Wellness"]), vec![a.clone(), b.clone()]);
        assert_eq!(result.creators, vec![b, a]);
    }

    #[test]
    fn test_empty_target_set_matches_nobody() {
        let result = matched_creators(&BTreeSet::new(), vec![profile(&["Wellness"])]);
        assert_eq!(result.count, 0);
    }
}
