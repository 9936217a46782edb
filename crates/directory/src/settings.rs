//! Product settings merged over defaults.

use std::sync::Arc;

use async_trait::async_trait;
use keygate_core::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::store::{decode, update_document, KeyValueStore, Write};

/// Store key of the settings record.
pub const SETTINGS_KEY: &str = "settings";

const SETTINGS_MAX_ATTEMPTS: u32 = 8;

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Opaque URL of the externally rendered destination.
    pub destination_url: String,
    pub display_name: String,
    pub admin_credential: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            destination_url: "https://example.com/".to_string(),
            display_name: "BOSS MURAD VIP".to_string(),
            admin_credential: "ADMIN123".to_string(),
        }
    }
}

/// Partial settings: the stored form, and the argument to `set`.
///
/// Older records used `gameUrl`, `appName` and `adminPassword`; those
/// names are still accepted on read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, alias = "gameUrl", skip_serializing_if = "Option::is_none")]
    pub destination_url: Option<String>,
    #[serde(default, alias = "appName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, alias = "adminPassword", skip_serializing_if = "Option::is_none")]
    pub admin_credential: Option<String>,
}

impl SettingsPatch {
    #[must_use]
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn destination_url(mut self, url: impl Into<String>) -> Self {
        self.destination_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn admin_credential(mut self, credential: impl Into<String>) -> Self {
        self.admin_credential = Some(credential.into());
        self
    }

    /// Overlay `other` on top of `self`, field by field.
    pub fn overlay(&mut self, other: Self) {
        if other.destination_url.is_some() {
            self.destination_url = other.destination_url;
        }
        if other.display_name.is_some() {
            self.display_name = other.display_name;
        }
        if other.admin_credential.is_some() {
            self.admin_credential = other.admin_credential;
        }
    }

    /// Resolve against `defaults`; a missing field falls back to the
    /// default for that field only.
    pub fn resolve(self, defaults: &Settings) -> Settings {
        Settings {
            destination_url: self
                .destination_url
                .unwrap_or_else(|| defaults.destination_url.clone()),
            display_name: self
                .display_name
                .unwrap_or_else(|| defaults.display_name.clone()),
            admin_credential: self
                .admin_credential
                .unwrap_or_else(|| defaults.admin_credential.clone()),
        }
    }
}

/// Source of the current product settings.
#[async_trait]
pub trait ConfigurationProvider: Send + Sync {
    /// Current settings, merged over defaults.
    async fn get(&self) -> Result<Settings>;

    /// Update any subset of fields; returns the merged result.
    async fn set(&self, patch: SettingsPatch) -> Result<Settings>;
}

/// Settings persisted in a [`KeyValueStore`].
#[derive(Clone)]
pub struct StoredSettings {
    store: Arc<dyn KeyValueStore>,
    defaults: Settings,
}

impl StoredSettings {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_defaults(store, Settings::default())
    }

    pub fn with_defaults(store: Arc<dyn KeyValueStore>, defaults: Settings) -> Self {
        Self { store, defaults }
    }

    pub const fn defaults(&self) -> &Settings {
        &self.defaults
    }
}

#[async_trait]
impl ConfigurationProvider for StoredSettings {
    async fn get(&self) -> Result<Settings> {
        let raw = self.store.get(SETTINGS_KEY).await?;
        let stored: SettingsPatch = decode(raw.as_deref())?;
        Ok(stored.resolve(&self.defaults))
    }

    async fn set(&self, patch: SettingsPatch) -> Result<Settings> {
        let changed_credential = patch.admin_credential.is_some();
        let stored = update_document(
            self.store.as_ref(),
            SETTINGS_KEY,
            SETTINGS_MAX_ATTEMPTS,
            |stored: &mut SettingsPatch| {
                stored.overlay(patch.clone());
                Ok(Write::Commit(stored.clone()))
            },
        )
        .await?;

        let settings = stored.resolve(&self.defaults);
        info!(
            display_name = %settings.display_name,
            credential_changed = changed_credential,
            "Settings updated"
        );
        Ok(settings)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    #[tokio::test]
    async fn test_empty_store_yields_defaults() {
        let settings = StoredSettings::new(InMemoryStore::new_arc());
        assert_eq!(settings.get().await.unwrap(), Settings::default());
    }

    #[tokio::test]
    async fn test_missing_field_falls_back_individually() {
        let store = InMemoryStore::new_arc();
        store
            .put(SETTINGS_KEY, r#"{"displayName":"NIGHT OPS"}"#.to_string())
            .await
            .unwrap();

        let settings = StoredSettings::new(store).get().await.unwrap();
        assert_eq!(settings.display_name, "NIGHT OPS");
        assert_eq!(settings.admin_credential, "ADMIN123");
        assert_eq!(settings.destination_url, Settings::default().destination_url);
    }

    #[tokio::test]
    async fn test_legacy_field_names_are_read() {
        let store = InMemoryStore::new_arc();
        store
            .put(
                SETTINGS_KEY,
                r#"{"gameUrl":"https://old.example/","appName":"OLD","adminPassword":"pw"}"#
                    .to_string(),
            )
            .await
            .unwrap();

        let settings = StoredSettings::new(store).get().await.unwrap();
        assert_eq!(settings.destination_url, "https://old.example/");
        assert_eq!(settings.display_name, "OLD");
        assert_eq!(settings.admin_credential, "pw");
    }

    #[tokio::test]
    async fn test_partial_set_keeps_other_fields() {
        let settings = StoredSettings::new(InMemoryStore::new_arc());
        settings
            .set(SettingsPatch::default().display_name("ALPHA"))
            .await
            .unwrap();
        let merged = settings
            .set(SettingsPatch::default().admin_credential("s3cret"))
            .await
            .unwrap();

        assert_eq!(merged.display_name, "ALPHA");
        assert_eq!(merged.admin_credential, "s3cret");
        assert_eq!(settings.get().await.unwrap(), merged);
    }

    #[test]
    fn test_stored_form_omits_unset_fields() {
        let patch = SettingsPatch::default().display_name("X");
        assert_eq!(
            serde_json::to_string(&patch).unwrap(),
            r#"{"displayName":"X"}"#
        );
    }
}
