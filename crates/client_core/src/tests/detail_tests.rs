use super::*;

use std::time::Duration;

use futures::StreamExt;
use shared::{
    domain::{SortDirection, SortKey},
    error::TransportError,
};

use crate::scripted_gateway::{profile, repository, GatewayCall, ScriptedGateway};

fn controller(gateway: &Arc<ScriptedGateway>) -> Arc<DetailController> {
    DetailController::new(
        Arc::clone(gateway) as Arc<dyn UserGateway>,
        Handle::current(),
        RepoQuery::default(),
    )
}

async fn script_octocat(gateway: &ScriptedGateway, delay: Duration) {
    gateway
        .script_profile("octocat", delay, Ok(profile(583231, "octocat")))
        .await;
    gateway
        .script_repos(
            "octocat",
            delay,
            Ok(vec![
                repository(1, "octocat", "Hello-World"),
                repository(2, "octocat", "Spoon-Knife"),
            ]),
        )
        .await;
}

#[tokio::test(start_paused = true)]
async fn publishes_profile_and_repos_together() {
    let gateway = ScriptedGateway::new();
    script_octocat(&gateway, Duration::ZERO).await;
    let detail = controller(&gateway);

    detail.load("octocat");
    tokio::time::sleep(Duration::from_millis(1)).await;

    match detail.state() {
        DetailState::Ready { profile, repos } => {
            assert_eq!(profile.login(), "octocat");
            assert_eq!(
                repos.iter().map(|repo| repo.name.as_str()).collect::<Vec<_>>(),
                vec!["Hello-World", "Spoon-Knife"]
            );
        }
        other => panic!("expected ready state, got {other:?}"),
    }
    assert_eq!(detail.subject().as_deref(), Some("octocat"));
}

#[tokio::test(start_paused = true)]
async fn publishes_loading_before_any_fetch_completes() {
    let gateway = ScriptedGateway::new();
    script_octocat(&gateway, Duration::from_millis(100)).await;
    let detail = controller(&gateway);

    detail.load("octocat");
    assert!(detail.state().is_loading());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(detail.state().is_loading());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(matches!(detail.state(), DetailState::Ready { .. }));
}

#[tokio::test(start_paused = true)]
async fn reloading_the_same_subject_shows_loading_again() {
    let gateway = ScriptedGateway::new();
    script_octocat(&gateway, Duration::from_millis(10)).await;
    let detail = controller(&gateway);

    detail.load("octocat");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(matches!(detail.state(), DetailState::Ready { .. }));

    detail.load("octocat");
    assert!(detail.state().is_loading());
}

#[tokio::test(start_paused = true)]
async fn repository_failure_fails_the_whole_load() {
    let gateway = ScriptedGateway::new();
    gateway
        .script_profile("octocat", Duration::ZERO, Ok(profile(583231, "octocat")))
        .await;
    gateway
        .script_repos(
            "octocat",
            Duration::ZERO,
            Err(TransportError::other("rate limited")),
        )
        .await;
    let detail = controller(&gateway);

    detail.load("octocat");
    tokio::time::sleep(Duration::from_millis(1)).await;

    assert_eq!(detail.state(), DetailState::Failed("rate limited".to_string()));
}

#[tokio::test(start_paused = true)]
async fn profile_failure_fails_the_whole_load() {
    let gateway = ScriptedGateway::new();
    gateway
        .script_profile(
            "ghost",
            Duration::ZERO,
            Err(TransportError::Status {
                status: 404,
                body: "Not Found".into(),
            }),
        )
        .await;
    gateway
        .script_repos("ghost", Duration::from_millis(100), Ok(Vec::new()))
        .await;
    let detail = controller(&gateway);

    detail.load("ghost");
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(detail.state().failure(), Some("HTTP 404: Not Found"));
}

#[tokio::test(start_paused = true)]
async fn failure_without_a_message_uses_fallback_reason() {
    let gateway = ScriptedGateway::new();
    gateway
        .script_profile("octocat", Duration::ZERO, Err(TransportError::other("")))
        .await;
    gateway
        .script_repos("octocat", Duration::ZERO, Ok(Vec::new()))
        .await;
    let detail = controller(&gateway);

    detail.load("octocat");
    tokio::time::sleep(Duration::from_millis(1)).await;

    assert_eq!(detail.state().failure(), Some(DETAIL_LOAD_FAILED));
}

#[tokio::test(start_paused = true)]
async fn latest_load_wins_over_slower_earlier_one() {
    let gateway = ScriptedGateway::new();
    gateway
        .script_profile("slow", Duration::from_millis(500), Ok(profile(1, "slow")))
        .await;
    gateway
        .script_repos("slow", Duration::from_millis(500), Ok(Vec::new()))
        .await;
    gateway
        .script_profile("fast", Duration::from_millis(10), Ok(profile(2, "fast")))
        .await;
    gateway
        .script_repos("fast", Duration::from_millis(10), Ok(Vec::new()))
        .await;
    let detail = controller(&gateway);
    let mut rx = detail.subscribe();

    detail.load("slow");
    detail.load("fast");
    tokio::time::sleep(Duration::from_millis(1_000)).await;

    match &*rx.borrow_and_update() {
        DetailState::Ready { profile, .. } => assert_eq!(profile.login(), "fast"),
        other => panic!("expected ready state, got {other:?}"),
    }
    assert_eq!(detail.subject().as_deref(), Some("fast"));
}

#[tokio::test(start_paused = true)]
async fn repositories_are_requested_most_recently_updated_first() {
    let gateway = ScriptedGateway::new();
    script_octocat(&gateway, Duration::ZERO).await;
    let detail = controller(&gateway);

    detail.load("octocat");
    tokio::time::sleep(Duration::from_millis(1)).await;

    let repo_calls: Vec<RepoQuery> = gateway
        .calls()
        .await
        .into_iter()
        .filter_map(|call| match call {
            GatewayCall::Repos { login, query } if login == "octocat" => Some(query),
            _ => None,
        })
        .collect();
    assert_eq!(
        repo_calls,
        vec![RepoQuery {
            page: 1,
            per_page: 30,
            sort: SortKey::Updated,
            direction: SortDirection::Desc,
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn state_stream_yields_loading_then_ready() {
    let gateway = ScriptedGateway::new();
    script_octocat(&gateway, Duration::from_millis(50)).await;
    let detail = controller(&gateway);

    detail.load("octocat");
    let mut states = detail.state_stream();

    assert_eq!(states.next().await, Some(DetailState::Loading));
    match states.next().await {
        Some(DetailState::Ready { profile, repos }) => {
            assert_eq!(profile.login(), "octocat");
            assert_eq!(repos.len(), 2);
        }
        other => panic!("expected ready state, got {other:?}"),
    }
}
