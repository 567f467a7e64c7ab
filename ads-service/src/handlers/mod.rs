pub mod ad_handlers;

use serde_json::Value;

use adflow_shared::models::keys;
use adflow_shared::store::{get_required, KvStore};

use crate::error::{AppError, Result};

/// Resolves the caller's linked ad account and access token from the user
/// record.
pub(crate) async fn user_context<S>(store: &S, user_id: &str) -> Result<(String, String)>
where
    S: KvStore,
{
    let user = get_required(store, keys::USER, user_id).await?;

    let fb_account_id = user
        .get("fb_account_id")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::not_found("No Facebook account linked to this user"))?
        .to_string();

    let fb_access_token = user
        .get("fb_access_token")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::not_found("No Facebook access token for this user"))?
        .to_string();

    Ok((fb_account_id, fb_access_token))
}
