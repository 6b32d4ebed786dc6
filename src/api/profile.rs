//! Profile routes. There is no signup flow: the first profile fetch for an
//! email creates the builder, and profile updates overwrite the whole
//! profile block (an omitted field clears the stored value).

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::api::{bad_request, db_error, ApiError, AppState};
use crate::models::{UpdateProfileRequest, User};

#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    pub email: Option<String>,
}

/// Fetch a profile by email, creating the builder on first sight
pub async fn get_profile(
    State(state): State<AppState>,
    Query(query): Query<ProfileQuery>,
) -> Result<Json<User>, ApiError> {
    let email = query
        .email
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| bad_request("Email is required"))?;

    let user = state
        .db
        .upsert_user(email, "builder")
        .await
        .map_err(|e| db_error(e, "User not found", "fetch profile"))?;

    Ok(Json(User::from(user)))
}

/// Create or overwrite a profile
pub async fn update_profile(
    State(state): State<AppState>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<User>, ApiError> {
    let email = req
        .email
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| bad_request("Email is required"))?;

    let user = state
        .db
        .upsert_profile(
            email,
            req.name.as_deref(),
            req.wallet_address.as_deref(),
            req.bio.as_deref(),
            req.location.as_deref(),
            req.twitter.as_deref(),
        )
        .await
        .map_err(|e| db_error(e, "User not found", "update profile"))?;

    info!(email, "Profile updated");

    Ok(Json(User::from(user)))
}

/// Expose a builder's wallet address for payout flows
pub async fn get_builder_wallet(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = state
        .db
        .get_user_by_id(id)
        .await
        .map_err(|e| db_error(e, "Builder not found", "fetch wallet"))?;

    Ok(Json(
        serde_json::json!({ "walletAddress": user.wallet_address }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::test_state;
    use crate::models::Role;
    use axum::http::StatusCode;
    use serde_json::json;

    fn email_query(email: &str) -> ProfileQuery {
        ProfileQuery {
            email: Some(email.to_string()),
        }
    }

    #[tokio::test]
    async fn first_fetch_creates_the_builder_and_stays_stable() {
        let state = test_state().await;

        let Json(first) = get_profile(State(state.clone()), Query(email_query("ada@example.com")))
            .await
            .unwrap();
        assert_eq!(first.role, Role::Builder);

        let Json(second) =
            get_profile(State(state), Query(email_query("ada@example.com")))
                .await
                .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
    }

    #[tokio::test]
    async fn fetch_without_an_email_is_rejected() {
        let state = test_state().await;
        let err = get_profile(State(state), Query(ProfileQuery { email: None }))
            .await
            .err()
            .unwrap();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
        assert_eq!(err.1["error"], "Email is required");
    }

    #[tokio::test]
    async fn update_overwrites_the_whole_profile() {
        let state = test_state().await;

        let req: UpdateProfileRequest = serde_json::from_value(json!({
            "email": "ada@example.com",
            "name": "Ada",
            "walletAddress": "GABC123",
            "bio": "Community builder",
            "twitter": "@ada"
        }))
        .unwrap();
        let Json(updated) = update_profile(State(state.clone()), Json(req))
            .await
            .unwrap();
        assert_eq!(updated.name.as_deref(), Some("Ada"));
        assert_eq!(updated.wallet_address.as_deref(), Some("GABC123"));

        // A second update without the wallet clears it
        let req: UpdateProfileRequest = serde_json::from_value(json!({
            "email": "ada@example.com",
            "name": "Ada Lovelace"
        }))
        .unwrap();
        let Json(updated) = update_profile(State(state), Json(req)).await.unwrap();
        assert_eq!(updated.name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(updated.wallet_address, None);
        assert_eq!(updated.bio, None);
    }

    #[tokio::test]
    async fn update_preserves_an_existing_role() {
        let state = test_state().await;
        state
            .db
            .upsert_user("admin@example.com", "admin")
            .await
            .unwrap();

        let req: UpdateProfileRequest = serde_json::from_value(json!({
            "email": "admin@example.com",
            "name": "Ops"
        }))
        .unwrap();
        let Json(updated) = update_profile(State(state), Json(req)).await.unwrap();
        assert_eq!(updated.role, Role::Admin);
    }

    #[tokio::test]
    async fn wallet_lookup_returns_the_address_or_null() {
        let state = test_state().await;
        let req: UpdateProfileRequest = serde_json::from_value(json!({
            "email": "ada@example.com",
            "walletAddress": "GABC123"
        }))
        .unwrap();
        let Json(user) = update_profile(State(state.clone()), Json(req))
            .await
            .unwrap();

        let Json(wallet) = get_builder_wallet(State(state.clone()), Path(user.id))
            .await
            .unwrap();
        assert_eq!(wallet["walletAddress"], "GABC123");

        let err = get_builder_wallet(State(state), Path(9999))
            .await
            .err()
            .unwrap();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
        assert_eq!(err.1["error"], "Builder not found");
    }
}
