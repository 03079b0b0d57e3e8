use axum::http::HeaderMap;

use battleboard_domain::RuntimeConfig;

/// Open when no `api_token` is configured.
pub fn authorize(config: &RuntimeConfig, headers: &HeaderMap) -> bool {
    if let Some(api_token) = &config.api_token {
        return extract_bearer(headers)
            .map(|v| v == *api_token)
            .unwrap_or(false);
    }
    true
}

fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let value = headers.get("Authorization")?.to_str().ok()?.trim();
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_str(value).expect("header"));
        headers
    }

    #[test]
    fn open_without_token() {
        assert!(authorize(&RuntimeConfig::default(), &HeaderMap::new()));
    }

    #[test]
    fn bearer_must_match() {
        let config = RuntimeConfig {
            api_token: Some("s3cret".to_string()),
            ..RuntimeConfig::default()
        };
        assert!(authorize(&config, &with_auth("Bearer s3cret")));
        assert!(!authorize(&config, &with_auth("Bearer nope")));
        assert!(!authorize(&config, &with_auth("s3cret")));
        assert!(!authorize(&config, &with_auth("Bearer ")));
        assert!(!authorize(&config, &HeaderMap::new()));
    }
}
