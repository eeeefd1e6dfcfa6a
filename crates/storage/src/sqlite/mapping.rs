use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::repository::StorageError;

/// Serialize an entity into its JSON document column.
pub(crate) fn to_doc<T: Serialize>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Rehydrate an entity from its JSON document column.
pub(crate) fn from_doc<T: DeserializeOwned>(doc: &str) -> Result<T, StorageError> {
    serde_json::from_str(doc).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Map a sqlx error onto the storage error taxonomy, surfacing unique-key
/// violations as conflicts.
pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StorageError::Conflict;
        }
    }
    StorageError::Connection(e.to_string())
}
