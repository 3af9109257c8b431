//! Recreates an index from scratch with the schema of its retrieval strategy

use crate::indexing::{IndexProvisioningError, IndexSchema};
use crate::store::DocumentStore;
use tracing::info;

/// Delete `index` if present, then create it with `schema`.
///
/// Store errors are returned as they come; nothing is retried.
pub async fn provision(
    store: &dyn DocumentStore,
    index: &str,
    schema: &IndexSchema,
) -> Result<(), IndexProvisioningError> {
    store
        .delete_index(index)
        .await
        .map_err(|source| IndexProvisioningError::Delete {
            index: index.to_string(),
            source,
        })?;

    store
        .create_index(index, schema)
        .await
        .map_err(|source| IndexProvisioningError::Create {
            index: index.to_string(),
            source,
        })?;

    info!(
        index = %index,
        schema = %schema.kind(),
        backend = store.backend_name(),
        "Index provisioned"
    );
    Ok(())
}
