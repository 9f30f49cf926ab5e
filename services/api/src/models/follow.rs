//! Follow edge model and social-graph query results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::{Profile, UserSummary};

/// Directed follow edge between two users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Follow {
    pub id: Uuid,
    pub follower_id: Uuid,
    pub following_id: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Follower/following counts for a user
#[derive(Debug, Clone, Serialize)]
pub struct FollowStats {
    pub followers_count: i64,
    pub following_count: i64,
}

/// A user on either end of a follow edge, with the edge timestamp
#[derive(Debug, Clone, Serialize)]
pub struct FollowedUser {
    pub user: UserSummary,
    pub followed_at: DateTime<Utc>,
}

/// Candidate produced by the "people my followers follow" query
#[derive(Debug, Clone, Serialize)]
pub struct SuggestedFollow {
    pub user: UserSummary,
    pub connection_count: i64,
    pub path_count: i64,
}

/// Candidate produced by interest/location matching
#[derive(Debug, Clone, Serialize)]
pub struct InterestRecommendation {
    pub user: UserSummary,
    pub similarity_score: u32,
    pub interest_matches: u32,
    pub location_match: bool,
}

/// Relationship of the current user to another user
#[derive(Debug, Clone, Serialize)]
pub struct Relationship {
    pub is_following: bool,
    pub is_followed_by: bool,
    pub is_mutual: bool,
    pub is_self: bool,
}

/// Score a candidate profile against the current user's interests and
/// location: two points per shared interest plus one for a city or state
/// match.
pub fn similarity(
    candidate: &Profile,
    interests: &[String],
    city: Option<&str>,
    state: Option<&str>,
) -> (u32, u32, bool) {
    let interest_matches = candidate
        .interests
        .iter()
        .filter(|i| interests.contains(i))
        .count() as u32;

    let location_match = candidate.address.as_ref().is_some_and(|addr| {
        let city_match = match (addr.city.as_deref(), city) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        };
        let state_match = match (addr.state.as_deref(), state) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        };
        city_match || state_match
    });

    let score = interest_matches * 2 + u32::from(location_match);
    (score, interest_matches, location_match)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Address;

    fn profile_with(interests: &[&str], city: Option<&str>, state: Option<&str>) -> Profile {
        Profile {
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            interests: interests.iter().map(|s| s.to_string()).collect(),
            address: if city.is_some() || state.is_some() {
                Some(Address {
                    street: None,
                    city: city.map(|s| s.to_string()),
                    state: state.map(|s| s.to_string()),
                    zip_code: None,
                    country: "US".to_string(),
                })
            } else {
                None
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_similarity_weights_interests_over_location() {
        let candidate = profile_with(&["hiking", "chess"], Some("Austin"), None);
        let mine = vec!["chess".to_string(), "cooking".to_string()];

        let (score, matches, location) = similarity(&candidate, &mine, Some("Austin"), None);
        assert_eq!(matches, 1);
        assert!(location);
        assert_eq!(score, 3);
    }

    #[test]
    fn test_similarity_zero_when_nothing_shared() {
        let candidate = profile_with(&["hiking"], Some("Austin"), Some("TX"));
        let (score, matches, location) =
            similarity(&candidate, &["chess".to_string()], Some("Dallas"), Some("CA"));
        assert_eq!(matches, 0);
        assert!(!location);
        assert_eq!(score, 0);
    }

    #[test]
    fn test_similarity_state_match_counts_once() {
        let candidate = profile_with(&[], Some("Austin"), Some("TX"));
        let (score, _, location) = similarity(&candidate, &[], Some("Houston"), Some("TX"));
        assert!(location);
        assert_eq!(score, 1);
    }
}
