//! Wishlist route handlers. Bagisto only keeps wishlists for signed-in
//! customers, so every handler needs a credential.

use axum::extract::{Path, State};
use serde_json::Value;
use tracing::instrument;

use crate::bagisto::Operation;
use crate::error::Result;
use crate::middleware::RequireCredentials;
use crate::routes::ProxyReply;
use crate::routes::cart::product_id;
use crate::state::AppState;

/// Wishlist items.
#[instrument(skip(state, auth))]
pub async fn index(
    State(state): State<AppState>,
    RequireCredentials(auth): RequireCredentials,
) -> Result<ProxyReply> {
    let upstream = state.bagisto().get_wishlist(&auth).await?;
    Ok(ProxyReply::envelope(
        &state,
        Operation::GetWishlist,
        upstream,
        "data",
        |body| body.get("data").cloned().unwrap_or(Value::Null),
    ))
}

/// Add a product.
#[instrument(skip(state, auth))]
pub async fn add(
    State(state): State<AppState>,
    RequireCredentials(auth): RequireCredentials,
    Path(raw_id): Path<String>,
) -> Result<ProxyReply> {
    let product_id = product_id(&raw_id)?;
    let upstream = state.bagisto().add_to_wishlist(&auth, product_id).await?;
    Ok(ProxyReply::envelope(
        &state,
        Operation::AddToWishlist,
        upstream,
        "data",
        |body| body,
    ))
}

/// Remove a product.
#[instrument(skip(state, auth))]
pub async fn remove(
    State(state): State<AppState>,
    RequireCredentials(auth): RequireCredentials,
    Path(raw_id): Path<String>,
) -> Result<ProxyReply> {
    let product_id = product_id(&raw_id)?;
    let upstream = state
        .bagisto()
        .remove_from_wishlist(&auth, product_id)
        .await?;
    Ok(ProxyReply::envelope(
        &state,
        Operation::RemoveFromWishlist,
        upstream,
        "data",
        |body| body,
    ))
}
