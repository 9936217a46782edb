//! Stable per-installation device identity.

use keygate_core::Result;
use tracing::info;

use crate::record::DeviceId;
use crate::store::KeyValueStore;

/// Store key of the current device id.
pub const DEVICE_ID_KEY: &str = "device_id.v2";

/// Older keys, checked in order when the current key is empty.
const LEGACY_KEYS: [&str; 2] = ["device_id.fixed", "device_id"];

/// Load this installation's device id, creating it on first run.
///
/// Resolution order: the current key, then each legacy key, then a freshly
/// generated id. Whatever is found is written back under the current key
/// so later runs take the fast path.
///
/// # Errors
///
/// Returns a store error if reading or persisting fails.
pub async fn load_or_create_device_id(store: &dyn KeyValueStore) -> Result<DeviceId> {
    if let Some(id) = read_id(store, DEVICE_ID_KEY).await? {
        return Ok(id);
    }

    let mut found = None;
    for key in LEGACY_KEYS {
        if let Some(id) = read_id(store, key).await? {
            info!(device_id = %id, legacy_key = key, "Migrating device id");
            found = Some(id);
            break;
        }
    }

    let id = found.unwrap_or_else(|| {
        let id = DeviceId::generate();
        info!(device_id = %id, "Generated new device id");
        id
    });

    let encoded = serde_json::to_string(&id)
        .map_err(|e| keygate_core::Error::serialization(e.to_string()))?;
    store.put(DEVICE_ID_KEY, encoded).await?;
    Ok(id)
}

/// Ids are stored as JSON strings; legacy values may be bare text.
async fn read_id(store: &dyn KeyValueStore, key: &str) -> Result<Option<DeviceId>> {
    Ok(store.get(key).await?.and_then(|raw| {
        let text = serde_json::from_str::<String>(&raw).unwrap_or(raw);
        DeviceId::parse(&text).ok()
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    #[tokio::test]
    async fn test_first_run_generates_and_persists() {
        let store = InMemoryStore::new();
        let first = load_or_create_device_id(&store).await.unwrap();
        assert!(first.as_str().starts_with("DEV-"));

        let second = load_or_create_device_id(&store).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_legacy_key_is_migrated() {
        let store = InMemoryStore::new();
        store.put("device_id", "DEV-424242".to_string()).await.unwrap();

        let id = load_or_create_device_id(&store).await.unwrap();
        assert_eq!(id.as_str(), "DEV-424242");
        assert_eq!(
            store.get(DEVICE_ID_KEY).await.unwrap().as_deref(),
            Some("\"DEV-424242\"")
        );
    }

    #[tokio::test]
    async fn test_fixed_legacy_key_wins_over_oldest() {
        let store = InMemoryStore::new();
        store.put("device_id", "DEV-000001".to_string()).await.unwrap();
        store
            .put("device_id.fixed", "\"DEV-000002\"".to_string())
            .await
            .unwrap();

        let id = load_or_create_device_id(&store).await.unwrap();
        assert_eq!(id.as_str(), "DEV-000002");
    }
}
