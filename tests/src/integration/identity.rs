//! Tokens issued by the auth service authorize writes on the flashcards service.

use super::support::{auth_service, flashcards_service, login};
use axum::http::{Method, StatusCode};
use serde_json::json;
use shared_types::{SubjectId, TokenSigner, DEFAULT_TOKEN_TTL};

#[tokio::test]
async fn test_login_token_authorizes_flashcard_create() {
    let auth = auth_service();
    let flashcards = flashcards_service();
    let token = login(&auth, "student", "student@example.com").await;

    let (status, body) = flashcards
        .send(
            Method::POST,
            "/flashcards",
            Some(token.as_str()),
            Some(json!({
                "title": "Biology 101",
                "subject": "Science",
                "cards": [{"question": "What is DNA?", "answer": "Genetic material"}],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = flashcards
        .get(&format!("/flashcards/{}", body["setId"]))
        .await;
    assert_eq!(status, StatusCode::OK);
    // The creator is the user id the auth service assigned.
    assert_eq!(body["data"]["creatorId"], 1);
    assert_eq!(body["data"]["cards"][0]["question"], "What is DNA?");
}

#[tokio::test]
async fn test_flashcards_rejects_token_from_other_secret() {
    let flashcards = flashcards_service();
    let foreign = TokenSigner::new("other-secret", DEFAULT_TOKEN_TTL)
        .unwrap()
        .issue(SubjectId(1));

    let (status, body) = flashcards
        .send(
            Method::POST,
            "/flashcards",
            Some(foreign.as_str()),
            Some(json!({"title": "X", "subject": "Y"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_auth_accepts_own_token_for_profile_update() {
    let auth = auth_service();
    let token = login(&auth, "student", "student@example.com").await;

    let (status, _) = auth
        .send(
            Method::PUT,
            "/auth/users/1",
            Some(token.as_str()),
            Some(json!({"username": "renamed"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, users) = auth.get("/auth/users").await;
    assert_eq!(users[0]["username"], "renamed");
}
