// Authentication module: turns the base64 service-account blob into bearer
// tokens for the Drive API. Token minting and caching is left to
// `yup_oauth2`'s service-account authenticator, driven by a private
// current-thread runtime so the rest of the crate stays blocking.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fmt;
use tokio::runtime::{Builder, Runtime};
use yup_oauth2::authenticator::DefaultAuthenticator;
use yup_oauth2::ServiceAccountAuthenticator;

/// File-scoped write access only: the service account can touch files it
/// created or that were shared with it, nothing else.
pub const DRIVE_FILE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

/// Anything able to hand out a bearer token for Drive requests.
pub trait TokenSource {
    fn bearer_token(&self) -> Result<String>;
}

/// A token minted elsewhere, used as-is.
#[derive(Clone)]
pub struct StaticToken(pub String);

impl TokenSource for StaticToken {
    fn bearer_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// A parsed service-account JSON key.
pub struct ServiceAccountKey(yup_oauth2::ServiceAccountKey);

impl ServiceAccountKey {
    /// Decode the base64 blob and parse the JSON key inside it.
    pub fn from_base64(blob: &str) -> Result<Self> {
        let decoded = STANDARD
            .decode(blob.trim())
            .context("Failed to decode credentials")?;
        let key = yup_oauth2::parse_service_account_key(decoded)
            .context("Failed to parse service account credentials")?;
        Ok(ServiceAccountKey(key))
    }

    pub fn client_email(&self) -> &str {
        &self.0.client_email
    }

    pub fn token_uri(&self) -> &str {
        &self.0.token_uri
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.0.client_email)
            .field("token_uri", &self.0.token_uri)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Mints and caches `drive.file` access tokens for one service account.
pub struct ServiceAccountAuth {
    runtime: Runtime,
    authenticator: DefaultAuthenticator,
}

impl ServiceAccountAuth {
    /// Build the authenticator. The private key is parsed here, so a broken
    /// credential fails before any file is touched.
    pub fn new(key: ServiceAccountKey) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start auth runtime")?;
        let authenticator = runtime
            .block_on(ServiceAccountAuthenticator::builder(key.0).build())
            .context("Failed to create JWT config")?;
        Ok(ServiceAccountAuth {
            runtime,
            authenticator,
        })
    }
}

impl TokenSource for ServiceAccountAuth {
    fn bearer_token(&self) -> Result<String> {
        let token = self
            .runtime
            .block_on(self.authenticator.token(&[DRIVE_FILE_SCOPE]))
            .context("Failed to obtain access token")?;
        token
            .token()
            .map(str::to_string)
            .context("Token response carried no access token")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(json: &str) -> String {
        STANDARD.encode(json)
    }

    #[test]
    fn parses_key_fields() {
        let blob = encode(
            r#"{"type":"service_account","client_email":"ci@proj.iam.gserviceaccount.com",
                "private_key":"pem","token_uri":"https://oauth2.googleapis.com/token"}"#,
        );
        let key = ServiceAccountKey::from_base64(&blob).unwrap();
        assert_eq!(key.client_email(), "ci@proj.iam.gserviceaccount.com");
        assert_eq!(key.token_uri(), "https://oauth2.googleapis.com/token");
    }

    #[test]
    fn debug_output_hides_private_key() {
        let blob = encode(
            r#"{"client_email":"ci@proj.iam.gserviceaccount.com",
                "private_key":"SECRET-PEM","token_uri":"https://oauth2.googleapis.com/token"}"#,
        );
        let key = ServiceAccountKey::from_base64(&blob).unwrap();
        let debug = format!("{:?}", key);
        assert!(!debug.contains("SECRET-PEM"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn invalid_base64_is_reported_as_decode_failure() {
        let err = ServiceAccountKey::from_base64("not base64 !!").unwrap_err();
        assert_eq!(err.to_string(), "Failed to decode credentials");
        assert!(format!("{:#}", err).len() > "Failed to decode credentials".len());
    }

    #[test]
    fn non_key_json_is_reported_as_parse_failure() {
        let err = ServiceAccountKey::from_base64(&encode(r#"{"client_email":"x"}"#)).unwrap_err();
        assert_eq!(err.to_string(), "Failed to parse service account credentials");
    }

    #[test]
    fn rejects_key_that_is_not_pem() {
        let blob = encode(
            r#"{"client_email":"ci@proj.iam.gserviceaccount.com",
                "private_key":"definitely not a key",
                "token_uri":"https://oauth2.googleapis.com/token"}"#,
        );
        let key = ServiceAccountKey::from_base64(&blob).unwrap();
        let err = ServiceAccountAuth::new(key).err().unwrap();
        assert_eq!(err.to_string(), "Failed to create JWT config");
    }

    #[test]
    fn static_token_is_returned_verbatim() {
        assert_eq!(StaticToken("abc".into()).bearer_token().unwrap(), "abc");
    }
}
