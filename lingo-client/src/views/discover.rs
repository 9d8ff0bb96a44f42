use std::collections::HashSet;

use lingo_types::{MatchStatus, Pagination, User, UserQuery};

use super::PageState;
use crate::api::{ApiResult, Backend};
use crate::matching::sort_matches;

#[derive(Debug, Clone, PartialEq)]
pub struct MatchCard {
    pub user: User,
    /// The viewer already sent this user a request
    pub request_pending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscoverPage {
    pub me: User,
    pub matches: Vec<MatchCard>,
    pub pagination: Pagination,
}

/// Loads the discover page: the viewer, the candidate search and the
/// viewer's outgoing requests, fetched in parallel. Any failure fails the
/// whole page.
pub async fn load_discover(backend: &dyn Backend, query: &UserQuery) -> PageState<DiscoverPage> {
    PageState::from_result(fetch(backend, query).await)
}

async fn fetch(backend: &dyn Backend, query: &UserQuery) -> ApiResult<DiscoverPage> {
    let (me, page, requests) = tokio::try_join!(
        backend.current_user(),
        backend.search_users(query),
        backend.outgoing_requests(),
    )?;

    let pending: HashSet<String> = requests
        .into_iter()
        .filter(|r| r.status == MatchStatus::Pending && r.sender_id == me.id)
        .map(|r| r.receiver_id)
        .collect();

    let mut candidates: Vec<User> = page.items.into_iter().filter(|u| u.id != me.id).collect();
    sort_matches(&mut candidates);

    let matches = candidates
        .into_iter()
        .map(|user| MatchCard {
            request_pending: pending.contains(&user.id),
            user,
        })
        .collect();

    Ok(DiscoverPage {
        me,
        matches,
        pagination: page.pagination,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{pending_request, user, FakeBackend};

    fn fake() -> FakeBackend {
        let fake = FakeBackend::with_me(user("me", "Me"));
        {
            let mut state = fake.state.lock().unwrap();
            let mut near = user("near", "Bea");
            near.match_percentage = Some(90.0);
            near.distance = Some(2.0);
            let mut far = user("far", "Carl");
            far.match_percentage = Some(90.0);
            far.distance = Some(80.0);
            let mut low = user("low", "Dana");
            low.match_percentage = Some(30.0);
            state.users = vec![low, far, user("me", "Me"), near];
            state.requests = vec![pending_request("r1", "me", "far")];
        }
        fake
    }

    #[tokio::test]
    async fn test_loads_sorted_matches_with_pending_flags() {
        let backend = fake();
        let page = load_discover(&backend, &UserQuery::default()).await;
        let page = page.ready().expect("page should load");

        let ids: Vec<&str> = page.matches.iter().map(|m| m.user.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "far", "low"]);
        assert!(page.matches[1].request_pending);
        assert!(!page.matches[0].request_pending);
        assert_eq!(page.me.id, "me");
    }

    #[tokio::test]
    async fn test_any_failure_fails_the_page() {
        let backend = fake();
        backend.fail("outgoing_requests");
        let page = load_discover(&backend, &UserQuery::default()).await;
        assert!(page.is_failed());
    }

    #[tokio::test]
    async fn test_fetches_run_together() {
        let backend = fake();
        let _ = load_discover(&backend, &UserQuery::default()).await;
        let mut calls = backend.calls();
        calls.sort();
        assert_eq!(calls, vec!["current_user", "outgoing_requests", "search_users"]);
    }
}
