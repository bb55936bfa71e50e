use std::collections::HashMap;

use super::OrganizeError;

const SERVICE_NAME: &str = "timebox";
const KEYRING_SERVER: &str = "anthropic-api";
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

fn attributes() -> HashMap<&'static str, &'static str> {
    let mut attrs = HashMap::new();
    attrs.insert("service", SERVICE_NAME);
    attrs.insert("server", KEYRING_SERVER);
    attrs
}

async fn open_keyring() -> Result<oo7::Keyring, OrganizeError> {
    oo7::Keyring::new()
        .await
        .map_err(|e| OrganizeError::Keyring(format!("Failed to connect to keyring: {}", e)))
}

/// Store the Anthropic API key in the system keyring, replacing any old one.
pub async fn store_api_key(key: &str) -> Result<(), OrganizeError> {
    let keyring = open_keyring().await?;
    keyring
        .create_item("Timebox Anthropic API Key", &attributes(), key.as_bytes(), true)
        .await
        .map_err(|e| OrganizeError::Keyring(format!("Failed to store API key: {}", e)))
}

/// Load the Anthropic API key from the system keyring.
pub async fn load_api_key() -> Result<Option<String>, OrganizeError> {
    let keyring = open_keyring().await?;
    let items = keyring
        .search_items(&attributes())
        .await
        .map_err(|e| OrganizeError::Keyring(format!("Failed to search keyring: {}", e)))?;

    let Some(item) = items.first() else {
        return Ok(None);
    };
    let secret = item
        .secret()
        .await
        .map_err(|e| OrganizeError::Keyring(format!("Failed to read secret: {}", e)))?;
    let key = String::from_utf8(secret.to_vec())
        .map_err(|e| OrganizeError::Keyring(format!("Invalid UTF-8 in secret: {}", e)))?;

    Ok((!key.is_empty()).then_some(key))
}

/// The environment wins over the keyring.
pub async fn resolve_api_key() -> Result<String, OrganizeError> {
    if let Some(key) = std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty()) {
        return Ok(key);
    }
    match load_api_key().await {
        Ok(Some(key)) => Ok(key),
        Ok(None) => Err(OrganizeError::MissingApiKey),
        Err(e) => {
            log::warn!("{}", e);
            Err(OrganizeError::MissingApiKey)
        }
    }
}
