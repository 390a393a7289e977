use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An AWS account visible through SSO
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Account {
    pub account_id: String,
    pub account_name: String,
}

impl Account {
    pub fn new(account_id: impl Into<String>, account_name: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            account_name: account_name.into(),
        }
    }
}

/// Values written into every generated profile alongside the account id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileDefaults {
    pub role_name: String,
    pub sso_region: String,
    pub sso_start_url: String,
    pub region: String,
}

/// Cached SSO-OIDC token (AWS CLI v2 compatible format)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SsoToken {
    #[serde(rename = "accessToken")]
    pub access_token: String,

    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,

    #[serde(rename = "refreshToken", skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(rename = "startUrl", skip_serializing_if = "Option::is_none")]
    pub start_url: Option<String>,
}

impl SsoToken {
    pub fn expires_in_seconds(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds().max(0)
    }

    pub fn expires_in_minutes(&self) -> i64 {
        self.expires_in_seconds() / 60
    }

    /// Format expiration time as human-readable string
    pub fn expiration_display(&self) -> String {
        let mins = self.expires_in_minutes();

        if mins >= 60 {
            let hours = mins / 60;
            let remaining_mins = mins % 60;
            if remaining_mins > 0 {
                format!("{}h {}m", hours, remaining_mins)
            } else {
                format!("{}h", hours)
            }
        } else if mins > 0 {
            format!("{} minutes", mins)
        } else {
            "EXPIRED".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token(expires_at: DateTime<Utc>) -> SsoToken {
        SsoToken {
            access_token: "test".to_string(),
            expires_at,
            refresh_token: None,
            region: None,
            start_url: None,
        }
    }

    #[test]
    fn test_sso_token_expiration_display() {
        let display = token(Utc::now() + Duration::minutes(90)).expiration_display();
        assert!(display.contains("1h"));

        let expired = token(Utc::now() - Duration::minutes(10));
        assert_eq!(expired.expiration_display(), "EXPIRED");
    }

    #[test]
    fn test_sso_token_serializes_in_cli_layout() {
        let mut t = token(Utc::now() + Duration::hours(1));
        t.start_url = Some("https://example.awsapps.com/start".to_string());
        let json = serde_json::to_value(&t).unwrap();

        assert_eq!(json["accessToken"], "test");
        assert!(json.get("expiresAt").is_some());
        assert_eq!(json["startUrl"], "https://example.awsapps.com/start");
        assert!(json.get("refreshToken").is_none());
    }

    #[test]
    fn test_account_new() {
        let account = Account::new("123456789012", "Production");
        assert_eq!(account.account_id, "123456789012");
        assert_eq!(account.account_name, "Production");
    }
}
