use crate::error::{Error, Result};
use crate::models::SsoToken;
use aws_sdk_ssooidc::Client as SsoOidcClient;
use chrono::{Duration, Utc};
use std::io::{self, BufRead};
use std::time::Duration as StdDuration;
use tokio::time::sleep;

const CLIENT_NAME: &str = "aws-sso-config";
const CLIENT_TYPE: &str = "public";
const CLIENT_SCOPE: &str = "sso-portal:*";
const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";
const POLL_INTERVAL_SECONDS: u64 = 5;

/// Obtains a fresh SSO access token interactively
#[allow(async_fn_in_trait)]
pub trait DeviceFlow {
    async fn authorize(&self, start_url: &str) -> Result<SsoToken>;
}

/// Device authorization information from StartDeviceAuthorization
#[derive(Debug, Clone)]
pub struct DeviceAuthorizationInfo {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub verification_uri_complete: Option<String>,
    pub interval: Option<i32>,
}

/// OIDC client for AWS SSO device flow authentication
pub struct OidcClient {
    client: SsoOidcClient,
    region: String,
    headless: bool,
}

impl OidcClient {
    pub async fn new(region: &str, headless: bool) -> Result<Self> {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;

        let client = SsoOidcClient::new(&config);

        Ok(Self {
            client,
            region: region.to_string(),
            headless,
        })
    }

    /// Register this client with AWS SSO OIDC
    async fn register_client(&self) -> Result<(String, String)> {
        tracing::debug!("Registering client with SSO-OIDC");

        let response = self
            .client
            .register_client()
            .client_name(CLIENT_NAME)
            .client_type(CLIENT_TYPE)
            .scopes(CLIENT_SCOPE)
            .send()
            .await
            .map_err(|e| Error::AwsSdk(format!("Failed to register client: {}", e)))?;

        let client_id = response
            .client_id()
            .ok_or_else(|| Error::AwsSdk("No client_id in response".to_string()))?
            .to_string();

        let client_secret = response
            .client_secret()
            .ok_or_else(|| Error::AwsSdk("No client_secret in response".to_string()))?
            .to_string();

        tracing::debug!("Client registered successfully");
        Ok((client_id, client_secret))
    }

    /// Start device authorization flow
    async fn start_device_authorization(
        &self,
        client_id: &str,
        client_secret: &str,
        start_url: &str,
    ) -> Result<DeviceAuthorizationInfo> {
        tracing::debug!("Starting device authorization for: {}", start_url);

        let response = self
            .client
            .start_device_authorization()
            .client_id(client_id)
            .client_secret(client_secret)
            .start_url(start_url)
            .send()
            .await
            .map_err(|e| Error::AwsSdk(format!("Failed to start device authorization: {}", e)))?;

        Ok(DeviceAuthorizationInfo {
            device_code: response
                .device_code()
                .ok_or_else(|| Error::AwsSdk("No device_code in response".to_string()))?
                .to_string(),
            user_code: response
                .user_code()
                .ok_or_else(|| Error::AwsSdk("No user_code in response".to_string()))?
                .to_string(),
            verification_uri: response
                .verification_uri()
                .ok_or_else(|| Error::AwsSdk("No verification_uri in response".to_string()))?
                .to_string(),
            verification_uri_complete: response.verification_uri_complete().map(|s| s.to_string()),
            interval: Some(response.interval()),
        })
    }

    /// Exchange the device code for a token.
    ///
    /// The user has already confirmed the browser login, so a pending answer only
    /// means the service has not caught up yet; keep asking at the advertised interval.
    async fn create_token(
        &self,
        client_id: &str,
        client_secret: &str,
        start_url: &str,
        device_code: &str,
        poll_interval: u64,
    ) -> Result<SsoToken> {
        loop {
            match self
                .client
                .create_token()
                .client_id(client_id)
                .client_secret(client_secret)
                .grant_type(DEVICE_CODE_GRANT)
                .device_code(device_code)
                .send()
                .await
            {
                Ok(response) => {
                    let access_token = response
                        .access_token()
                        .ok_or_else(|| Error::AwsSdk("No access_token in response".to_string()))?
                        .to_string();

                    let expires_in = response.expires_in();
                    tracing::debug!("Token expires in {} seconds", expires_in);

                    return Ok(SsoToken {
                        access_token,
                        expires_at: Utc::now() + Duration::seconds(expires_in as i64),
                        refresh_token: response.refresh_token().map(|s| s.to_string()),
                        region: Some(self.region.clone()),
                        start_url: Some(start_url.to_string()),
                    });
                }
                Err(err) => {
                    use aws_sdk_ssooidc::error::ProvideErrorMetadata;

                    let Some(code) = err.code() else {
                        return Err(Error::AwsSdk(format!("Token creation failed: {}", err)));
                    };
                    tracing::debug!(
                        "CreateToken error: {} - {}",
                        code,
                        err.message().unwrap_or("")
                    );

                    match code {
                        "AuthorizationPendingException" => {
                            eprintln!("Login not completed yet, waiting...");
                            sleep(StdDuration::from_secs(poll_interval)).await;
                        }
                        "SlowDownException" => {
                            sleep(StdDuration::from_secs(poll_interval + 5)).await;
                        }
                        "ExpiredTokenException" => return Err(Error::AuthorizationExpired),
                        _ => {
                            return Err(Error::AuthenticationFailed(format!(
                                "token creation failed with error code '{}': {}",
                                code,
                                err.message().unwrap_or("unknown error")
                            )));
                        }
                    }
                }
            }
        }
    }

    /// Show the verification URL, try the browser, then wait for ENTER
    async fn prompt_user(&self, auth_info: &DeviceAuthorizationInfo) -> Result<()> {
        let url = auth_info
            .verification_uri_complete
            .as_deref()
            .unwrap_or(&auth_info.verification_uri);

        eprintln!("\n=== AWS SSO Login ===");
        eprintln!("If browser is not opened automatically, please open link:\n{}", url);
        eprintln!("Code: {}\n", auth_info.user_code);

        if self.headless {
            tracing::debug!("Headless environment, not opening a browser");
        } else if let Err(e) = webbrowser::open(url) {
            tracing::warn!("Could not open browser automatically: {}", e);
        }

        eprintln!("Press ENTER key once login is done");
        wait_for_enter(io::BufReader::new(io::stdin())).await
    }
}

/// Read one line from `reader` on the blocking pool; end of input counts as ENTER
async fn wait_for_enter<R>(mut reader: R) -> Result<()>
where
    R: BufRead + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut line = String::new();
        reader.read_line(&mut line).map(|_| ())
    })
    .await
    .map_err(|e| Error::AuthenticationFailed(format!("login prompt was interrupted: {}", e)))??;

    Ok(())
}

impl DeviceFlow for OidcClient {
    async fn authorize(&self, start_url: &str) -> Result<SsoToken> {
        let (client_id, client_secret) = self.register_client().await?;

        let auth_info = self
            .start_device_authorization(&client_id, &client_secret, start_url)
            .await?;

        self.prompt_user(&auth_info).await?;

        let poll_interval = auth_info
            .interval
            .filter(|i| *i > 0)
            .map(|i| i as u64)
            .unwrap_or(POLL_INTERVAL_SECONDS);

        self.create_token(
            &client_id,
            &client_secret,
            start_url,
            &auth_info.device_code,
            poll_interval,
        )
        .await
    }
}
