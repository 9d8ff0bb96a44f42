use std::cmp::Ordering;

use lingo_types::User;

/// Discover-page ordering for two candidates.
///
/// Higher `match_percentage` first (unknown last), then nearer `distance`
/// (unknown last), then name, then id.
pub fn compare_matches(a: &User, b: &User) -> Ordering {
    desc_known_first(a.match_percentage, b.match_percentage)
        .then_with(|| asc_known_first(a.distance, b.distance))
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.id.cmp(&b.id))
}

pub fn sort_matches(users: &mut [User]) {
    users.sort_by(compare_matches);
}

fn desc_known_first(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn asc_known_first(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Formats a distance for a match card
pub fn distance_label(distance: Option<f64>) -> Option<String> {
    let km = distance.filter(|d| d.is_finite() && *d >= 0.0)?;
    Some(if km < 1.0 {
        "< 1 km away".to_string()
    } else {
        format!("{:.0} km away", km)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn candidate(id: &str, pct: Option<f64>, distance: Option<f64>) -> User {
        User {
            id: id.to_string(),
            name: format!("user {}", id),
            match_percentage: pct,
            distance,
            ..Default::default()
        }
    }

    fn ids(users: &[User]) -> Vec<&str> {
        users.iter().map(|u| u.id.as_str()).collect()
    }

    #[test]
    fn test_percentage_descending() {
        let mut users = vec![
            candidate("a", Some(40.0), None),
            candidate("b", Some(90.0), None),
            candidate("c", None, Some(1.0)),
        ];
        sort_matches(&mut users);
        assert_eq!(ids(&users), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_tie_falls_back_to_distance() {
        let mut users = vec![
            candidate("far", Some(80.0), Some(120.0)),
            candidate("unknown", Some(80.0), None),
            candidate("near", Some(80.0), Some(3.5)),
        ];
        sort_matches(&mut users);
        assert_eq!(ids(&users), vec!["near", "far", "unknown"]);
    }

    #[test]
    fn test_distance_label() {
        assert_eq!(distance_label(Some(0.4)).as_deref(), Some("< 1 km away"));
        assert_eq!(distance_label(Some(12.6)).as_deref(), Some("13 km away"));
        assert_eq!(distance_label(None), None);
        assert_eq!(distance_label(Some(f64::NAN)), None);
    }

    fn arb_user() -> impl Strategy<Value = User> {
        (
            "[a-z]{1,6}",
            prop::option::of(prop::sample::select(vec![50.0, 75.0, 100.0])),
            prop::option::of(0.0f64..500.0),
        )
            .prop_map(|(id, pct, distance)| candidate(&id, pct, distance))
    }

    proptest! {
        #[test]
        fn prop_sorted_order_respects_rules(mut users in prop::collection::vec(arb_user(), 0..20)) {
            sort_matches(&mut users);
            for pair in users.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                match (a.match_percentage, b.match_percentage) {
                    (Some(x), Some(y)) => prop_assert!(x >= y),
                    (None, Some(_)) => prop_assert!(false, "unknown percentage sorted first"),
                    _ => {}
                }
                if a.match_percentage == b.match_percentage {
                    match (a.distance, b.distance) {
                        (Some(x), Some(y)) => prop_assert!(x <= y),
                        (None, Some(_)) => prop_assert!(false, "unknown distance sorted first"),
                        _ => {}
                    }
                }
            }
        }
    }
}
