mod common;

use common::{admin, ids, voter, TestContest};
use photo_vote::handlers::{handle_request, Request, Response};
use photo_vote::models::{StartOptions, VotingPhase};
use photo_vote::VoteError;

#[tokio::test]
async fn test_requests_require_an_identity() {
    let contest = TestContest::new().await;

    let result = handle_request(&contest.engine, None, Request::GetSettings).await;
    let error = result.unwrap_err();
    assert!(matches!(error, VoteError::Unauthenticated));
    assert_eq!(error.to_body().code, "UNAUTHENTICATED");
}

#[tokio::test]
async fn test_settings_response_carries_phase() {
    let contest = TestContest::new().await;

    let response = handle_request(
        &contest.engine,
        Some(&admin()),
        Request::StartVoting(StartOptions::default()),
    )
    .await
    .unwrap();
    match response {
        Response::Settings { settings, phase } => {
            assert!(settings.is_active);
            assert_eq!(phase, VotingPhase::Active);
        }
        other => panic!("unexpected response: {:?}", other),
    }
}

#[tokio::test]
async fn test_cast_vote_and_read_it_back() {
    let contest = TestContest::new().await;
    let photo = contest.add_photo("Harbour").await;
    let user = voter(7);
    contest.engine.start(&admin(), StartOptions::default()).await.unwrap();

    let response = handle_request(
        &contest.engine,
        Some(&user),
        Request::CastVote {
            photo_id: photo.id.clone(),
        },
    )
    .await
    .unwrap();
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["message"], "Vote recorded successfully");
    assert_eq!(json["vote"]["photoId"], photo.id.as_str());
    assert_eq!(json["vote"]["userId"], "user-7");

    match handle_request(&contest.engine, Some(&user), Request::GetMyVote).await.unwrap() {
        Response::MyVote { vote } => assert_eq!(vote.map(|b| b.photo_id), Some(photo.id.clone())),
        other => panic!("unexpected response: {:?}", other),
    }

    let again = handle_request(
        &contest.engine,
        Some(&user),
        Request::CastVote { photo_id: photo.id },
    )
    .await
    .unwrap_err();
    assert_eq!(again.to_body().code, "ALREADY_VOTED");
}

#[tokio::test]
async fn test_results_hidden_from_users_until_published() {
    let contest = TestContest::new().await;
    let photos = contest.add_photos(&["A", "B", "C"]).await;
    let user = voter(1);

    for request in [Request::GetWinners, Request::GetStandings] {
        let error = handle_request(&contest.engine, Some(&user), request).await.unwrap_err();
        assert!(matches!(error, VoteError::ResultsNotPublished));
        assert_eq!(error.to_body().code, "RESULTS_NOT_PUBLISHED");
    }

    // Admins see standings at any time.
    let response = handle_request(&contest.engine, Some(&admin()), Request::GetStandings)
        .await
        .unwrap();
    match response {
        Response::Standings { standings } => assert_eq!(standings.entries.len(), 3),
        other => panic!("unexpected response: {:?}", other),
    }

    handle_request(
        &contest.engine,
        Some(&admin()),
        Request::DeclareWinners {
            winner_ids: ids(&[&photos[2], &photos[0], &photos[1]]),
        },
    )
    .await
    .unwrap();

    match handle_request(&contest.engine, Some(&user), Request::GetWinners).await.unwrap() {
        Response::Winners { winners } => {
            assert_eq!(winners[0].id, photos[2].id);
            assert_eq!(winners[0].winner_position, Some(1));
        }
        other => panic!("unexpected response: {:?}", other),
    }
}

#[tokio::test]
async fn test_error_codes_at_the_boundary() {
    let contest = TestContest::new().await;
    let user = voter(1);

    let cases = [
        (Some(user.clone()), Request::StopVoting, "FORBIDDEN"),
        (Some(user.clone()), Request::GetAnalytics, "FORBIDDEN"),
        (
            Some(user.clone()),
            Request::CastVote {
                photo_id: "anything".to_string(),
            },
            "VOTING_NOT_ACTIVE",
        ),
        (
            Some(admin()),
            Request::DeclareWinners {
                winner_ids: vec!["a".to_string(), "b".to_string()],
            },
            "INVALID_WINNER_COUNT",
        ),
        (
            Some(admin()),
            Request::StartVoting(StartOptions {
                start_time: None,
                duration_hours: Some(0),
            }),
            "INVALID_SETTINGS",
        ),
    ];

    for (actor, request, code) in cases {
        let name = request.name();
        let error = handle_request(&contest.engine, actor.as_ref(), request)
            .await
            .unwrap_err();
        assert_eq!(error.to_body().code, code, "wrong code for {}", name);
    }
}

#[tokio::test]
async fn test_results_hidden_again_after_reset() {
    let contest = TestContest::new().await;
    let photos = contest.add_photos(&["A", "B", "C"]).await;
    let user = voter(2);
    contest
        .engine
        .declare_winners(&admin(), &ids(&[&photos[0], &photos[1], &photos[2]]))
        .await
        .unwrap();
    handle_request(&contest.engine, Some(&user), Request::GetStandings)
        .await
        .unwrap();

    contest.engine.reset_voting(&admin()).await.unwrap();

    for request in [Request::GetWinners, Request::GetStandings] {
        let error = handle_request(&contest.engine, Some(&user), request).await.unwrap_err();
        assert!(matches!(error, VoteError::ResultsNotPublished));
    }
    match handle_request(&contest.engine, Some(&admin()), Request::GetWinners).await.unwrap() {
        Response::Winners { winners } => assert!(winners.is_empty()),
        other => panic!("unexpected response: {:?}", other),
    }
}

#[tokio::test]
async fn test_reset_response() {
    let contest = TestContest::new().await;

    let response = handle_request(&contest.engine, Some(&admin()), Request::ResetVoting)
        .await
        .unwrap();
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["message"], "Voting system reset successfully");
    assert_eq!(json["reset"]["ballotsRemoved"], 0);
}
