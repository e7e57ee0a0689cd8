//! A coordinator driving both participants through prepare, then commit or abort.
//!
//! No atomicity across participants is claimed; these flows check that each
//! participant follows the coordinator's decision.

use super::support::{auth_service, flashcards_service, Client};
use axum::http::StatusCode;
use serde_json::{json, Value};

/// Prepare on every participant; on the first refusal, abort the ones
/// already prepared. Returns whether every participant committed.
async fn coordinate(participants: &[&Client], id: &str, data: Value) -> bool {
    let mut prepared: Vec<&Client> = Vec::new();
    for participant in participants {
        let (status, _) = participant
            .post(
                "/transactions/prepare",
                json!({"transaction_id": id, "data": data}),
            )
            .await;
        if status != StatusCode::OK {
            for done in prepared {
                let (status, _) = done
                    .post("/transactions/abort", json!({"transaction_id": id}))
                    .await;
                assert_eq!(status, StatusCode::OK);
            }
            return false;
        }
        prepared.push(*participant);
    }

    for participant in participants {
        let (status, _) = participant
            .post("/transactions/commit", json!({"transaction_id": id}))
            .await;
        assert_eq!(status, StatusCode::OK);
    }
    true
}

#[tokio::test]
async fn test_prepare_then_commit_on_both() {
    let auth = auth_service();
    let flashcards = flashcards_service();

    let committed = coordinate(&[&auth, &flashcards], "tx-commit", json!({"op": "share"})).await;
    assert!(committed);

    for participant in [&auth, &flashcards] {
        let (status, body) = participant.get("/transactions/tx-commit").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "committed");
        assert_eq!(body["data"], json!({"op": "share"}));
    }

    // A retried commit from the coordinator is acknowledged.
    let (status, body) = flashcards
        .post("/transactions/commit", json!({"transaction_id": "tx-commit"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["already_finalized"], true);
}

#[tokio::test]
async fn test_refused_prepare_aborts_the_other_participant() {
    let auth = auth_service();
    let flashcards = flashcards_service();

    // Flashcards already holds this id, so its prepare is refused.
    let (status, _) = flashcards
        .post("/transactions/prepare", json!({"transaction_id": "tx-clash"}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let committed = coordinate(&[&auth, &flashcards], "tx-clash", json!({})).await;
    assert!(!committed);

    let (status, _) = auth.get("/transactions/tx-clash").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = flashcards.get("/transactions/tx-clash").await;
    assert_eq!(body["status"], "prepared");
}

#[tokio::test]
async fn test_abort_on_both_then_commit_is_refused() {
    let auth = auth_service();
    let flashcards = flashcards_service();

    for participant in [&auth, &flashcards] {
        let (status, _) = participant
            .post("/transactions/prepare", json!({"transaction_id": "tx-abort"}))
            .await;
        assert_eq!(status, StatusCode::OK);
    }
    for participant in [&auth, &flashcards] {
        let (status, body) = participant
            .post("/transactions/abort", json!({"transaction_id": "tx-abort"}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "aborted and deleted");
    }
    for participant in [&auth, &flashcards] {
        let (status, body) = participant
            .post("/transactions/commit", json!({"transaction_id": "tx-abort"}))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Transaction not found or not prepared");
    }
}
