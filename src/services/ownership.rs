use crate::{
    error::{AppError, AppResult},
    models::{Principal, SequenceKey},
    store::OrderStore,
};

/// Verifies that `principal` owns the parent of `key`.
///
/// Watchlists are parented by their user, so no read is needed. Lists and
/// playlists cost one collection lookup.
pub async fn assert_ownership(
    store: &dyn OrderStore,
    principal: &Principal,
    key: SequenceKey,
) -> AppResult<()> {
    let Some(collection_kind) = key.kind.parent_collection() else {
        return if key.parent_id == principal.user_id() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "You do not own this watchlist".to_string(),
            ))
        };
    };

    let collection = store
        .find_collection(key.parent_id)
        .await?
        .filter(|collection| collection.kind == collection_kind)
        .ok_or_else(|| {
            AppError::NotFound(format!("{} {} not found", collection_kind, key.parent_id))
        })?;

    if collection.owner_id != principal.user_id() {
        tracing::warn!(
            user_id = %principal.user_id(),
            sequence = %key,
            "Rejected access to collection owned by another user"
        );
        return Err(AppError::Forbidden(format!(
            "You do not own this {}",
            collection_kind
        )));
    }

    Ok(())
}
