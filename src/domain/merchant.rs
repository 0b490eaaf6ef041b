use serde::{Deserialize, Serialize};
use url::Url;

/// A website registered to take payments through the proxy.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Merchant {
    pub id: u64,
    pub name: String,
    /// Host that every callback URL must point at, stored lowercase.
    pub domain: String,
    pub api_key: String,
    #[serde(alias = "active")]
    pub is_active: bool,
}

impl Merchant {
    pub fn new(id: u64, name: &str, domain: &str, api_key: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            domain: domain.trim().to_ascii_lowercase(),
            api_key: api_key.to_string(),
            is_active: true,
        }
    }

    /// Whether `callback` is an http(s) URL whose host is this merchant's domain.
    pub fn owns_callback(&self, callback: &Url) -> bool {
        matches!(callback.scheme(), "http" | "https")
            && callback
                .host_str()
                .is_some_and(|host| host.eq_ignore_ascii_case(&self.domain))
    }
}

/// Shortens an API key for log output.
pub fn mask_api_key(api_key: &str) -> String {
    let prefix: String = api_key.chars().take(4).collect();
    format!("{prefix}***")
}
