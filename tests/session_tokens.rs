//! Token lifecycle exercised through the public crate surface.

use secrecy::SecretString;
use uuid::Uuid;
use vidtube::api::handlers::auth::{
    tokens::{fingerprint, TokenError, TokenKind},
    AuthConfig, AuthState,
};

fn state() -> AuthState {
    AuthState::new(AuthConfig::new(
        SecretString::from("integration-access-secret"),
        SecretString::from("integration-refresh-secret"),
    ))
}

#[test]
fn issued_pair_verifies_for_the_same_identity() {
    let state = state();
    let user_id = Uuid::new_v4();

    let access = state
        .tokens()
        .issue(TokenKind::Access, user_id)
        .expect("issue access");
    let refresh = state
        .tokens()
        .issue(TokenKind::Refresh, user_id)
        .expect("issue refresh");

    let access_claims = state
        .tokens()
        .verify(&access, TokenKind::Access)
        .expect("verify access");
    let refresh_claims = state
        .tokens()
        .verify(&refresh, TokenKind::Refresh)
        .expect("verify refresh");

    assert_eq!(access_claims.sub, user_id);
    assert_eq!(refresh_claims.sub, user_id);
    assert_ne!(access_claims.jti, refresh_claims.jti);
}

#[test]
fn tokens_are_not_interchangeable() {
    let state = state();
    let user_id = Uuid::new_v4();

    let access = state
        .tokens()
        .issue(TokenKind::Access, user_id)
        .expect("issue access");
    let refresh = state
        .tokens()
        .issue(TokenKind::Refresh, user_id)
        .expect("issue refresh");

    assert!(matches!(
        state.tokens().verify(&access, TokenKind::Refresh),
        Err(TokenError::Invalid)
    ));
    assert!(matches!(
        state.tokens().verify(&refresh, TokenKind::Access),
        Err(TokenError::Invalid)
    ));
}

#[test]
fn rotation_changes_the_fingerprint() {
    let state = state();
    let user_id = Uuid::new_v4();

    let first = state
        .tokens()
        .issue(TokenKind::Refresh, user_id)
        .expect("issue first");
    let second = state
        .tokens()
        .issue(TokenKind::Refresh, user_id)
        .expect("issue second");

    // Same identity, same secret; the jti still makes each token unique,
    // so a rotated session invalidates the previous fingerprint.
    assert_ne!(fingerprint(&first), fingerprint(&second));
}

#[test]
fn verification_is_bound_to_the_signing_secret() {
    let user_id = Uuid::new_v4();
    let token = state()
        .tokens()
        .issue(TokenKind::Access, user_id)
        .expect("issue");

    let other = AuthState::new(AuthConfig::new(
        SecretString::from("a-different-secret"),
        SecretString::from("another-different-secret"),
    ));
    assert!(other.tokens().verify(&token, TokenKind::Access).is_err());
}
