use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::storage::{KeyValueStore, StorageError, SETTINGS_KEY};
use crate::providers::StopSequences;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_THEME: &str = "system";
pub const DEFAULT_STREAM: &str = "true";

/// User-configurable request parameters plus the client-only API key and
/// theme. Every optional field persists as an explicit `null` rather than
/// being defaulted away, so a stored record round-trips exactly. Field
/// names on disk are camelCase, matching records persisted by earlier
/// versions of the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub api_key: Option<String>,
    pub theme: String,
    pub system_message: Option<String>,
    pub frequency_penalty: Option<f64>,
    pub logit_bias: Option<HashMap<String, serde_json::Value>>,
    pub max_tokens: Option<u32>,
    pub model: String,
    pub n: Option<u32>,
    pub presence_penalty: Option<f64>,
    pub response_format: Option<serde_json::Value>,
    pub seed: Option<i64>,
    pub stop: Option<StopSequences>,
    pub stream: String,
    pub temperature: Option<f64>,
    pub tool_choice: Option<serde_json::Value>,
    pub tools: Option<Vec<serde_json::Value>>,
    pub top_p: Option<f64>,
    pub user: Option<String>,
}

impl Settings {
    /// Streaming is on unless `stream` is the literal `"false"`, compared
    /// case-insensitively. Any other value of the tri-state flag streams.
    pub fn streaming_enabled(&self) -> bool {
        !self.stream.eq_ignore_ascii_case("false")
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            theme: DEFAULT_THEME.to_string(),
            system_message: None,
            frequency_penalty: None,
            logit_bias: None,
            max_tokens: None,
            model: DEFAULT_MODEL.to_string(),
            n: None,
            presence_penalty: None,
            response_format: None,
            seed: None,
            stop: None,
            stream: DEFAULT_STREAM.to_string(),
            temperature: None,
            tool_choice: None,
            tools: None,
            top_p: None,
            user: None,
        }
    }
}

pub struct SettingsService;

impl SettingsService {
    /// Restore settings from the store. An absent record yields defaults;
    /// a present but malformed record is a fatal error.
    pub fn load(store: &dyn KeyValueStore) -> Result<Settings, StorageError> {
        match store.get(SETTINGS_KEY)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Settings::default()),
        }
    }

    /// Serialize and overwrite the stored settings record.
    pub fn save(store: &mut dyn KeyValueStore, settings: &Settings) -> Result<(), StorageError> {
        let json = serde_json::to_string(settings)?;
        store.set(SETTINGS_KEY, &json)
    }

    pub fn clear(store: &mut dyn KeyValueStore) -> Result<(), StorageError> {
        store.remove(SETTINGS_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::storage::MemoryStore;

    #[test]
    fn defaults_match_the_documented_baseline() {
        let settings = Settings::default();
        assert_eq!(settings.theme, "system");
        assert_eq!(settings.model, "gpt-3.5-turbo");
        assert_eq!(settings.stream, "true");
        assert!(settings.api_key.is_none());
        assert!(settings.temperature.is_none());
        assert!(settings.streaming_enabled());
    }

    #[test]
    fn unset_fields_serialize_as_explicit_null() {
        let value = serde_json::to_value(Settings::default()).unwrap();
        assert!(value["apiKey"].is_null());
        assert!(value["frequencyPenalty"].is_null());
        assert!(value["logitBias"].is_null());
        assert!(value["toolChoice"].is_null());
        assert_eq!(value["theme"], "system");
        assert_eq!(value["stream"], "true");
    }

    #[test]
    fn null_fields_round_trip_to_none() {
        let json = serde_json::to_string(&Settings::default()).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Settings::default());
    }

    #[test]
    fn stream_flag_comparison_is_case_insensitive() {
        let mut settings = Settings::default();
        settings.stream = "FALSE".to_string();
        assert!(!settings.streaming_enabled());

        settings.stream = "anything-else".to_string();
        assert!(settings.streaming_enabled());
    }

    #[test]
    fn load_from_empty_store_returns_defaults() {
        let store = MemoryStore::new();
        let settings = SettingsService::load(&store).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let mut store = MemoryStore::new();
        let mut settings = Settings::default();
        settings.api_key = Some("sk-test".to_string());
        settings.temperature = Some(0.7);
        settings.stop = Some(StopSequences::Many(vec!["END".to_string()]));

        SettingsService::save(&mut store, &settings).unwrap();
        let back = SettingsService::load(&store).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn malformed_record_is_fatal() {
        let mut store = MemoryStore::new();
        store.set(SETTINGS_KEY, "{not json").unwrap();
        assert!(matches!(
            SettingsService::load(&store),
            Err(StorageError::Malformed(_))
        ));
    }

    #[test]
    fn clear_removes_the_record() {
        let mut store = MemoryStore::new();
        SettingsService::save(&mut store, &Settings::default()).unwrap();
        SettingsService::clear(&mut store).unwrap();
        assert!(store.get(SETTINGS_KEY).unwrap().is_none());
    }
}
