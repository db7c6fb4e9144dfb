//! AWS credentials and region discovery
//!
//! Keys come from the `AWS_*` environment variables first, then from the
//! shared profile files (`~/.aws/credentials` and `~/.aws/config`, honoring
//! `AWS_SHARED_CREDENTIALS_FILE`, `AWS_CONFIG_FILE` and `AWS_PROFILE`). Profiles
//! using SSO or `credential_process` resolve through the same providers. The
//! profile's `region` is read as well, so `aws configure` alone is enough.

use std::fmt;
use std::path::Path;

use aws_config::environment::credentials::EnvironmentVariableCredentialsProvider;
use aws_config::meta::credentials::CredentialsProviderChain;
use aws_config::meta::region::ProvideRegion;
use aws_config::profile::profile_file::{ProfileFileKind, ProfileFiles};
use aws_config::profile::{ProfileFileCredentialsProvider, ProfileFileRegionProvider};
use aws_credential_types::provider::error::CredentialsError;
use aws_credential_types::provider::ProvideCredentials;
use tracing::{debug, warn};

use crate::core::config::Config;

const PROVIDER_NAME: &str = "bedrock-browser";

/// AWS access credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id_masked())
            .field("secret_access_key", &"<redacted>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Access key id with all but the first four characters hidden
    pub fn access_key_id_masked(&self) -> String {
        let visible: String = self.access_key_id.chars().take(4).collect();
        format!("{}****", visible)
    }

    /// Static SDK credentials for a Bedrock client
    pub fn to_sdk(&self) -> aws_credential_types::Credentials {
        aws_credential_types::Credentials::new(
            self.access_key_id.clone(),
            self.secret_access_key.clone(),
            self.session_token.clone(),
            None,
            PROVIDER_NAME,
        )
    }

    pub(crate) fn is_blank(&self) -> bool {
        self.access_key_id.trim().is_empty() || self.secret_access_key.trim().is_empty()
    }
}

impl From<&aws_credential_types::Credentials> for Credentials {
    fn from(creds: &aws_credential_types::Credentials) -> Self {
        Self {
            access_key_id: creds.access_key_id().to_string(),
            secret_access_key: creds.secret_access_key().to_string(),
            session_token: creds
                .session_token()
                .filter(|t| !t.trim().is_empty())
                .map(|t| t.to_string()),
        }
    }
}

/// What the AWS environment and profile files supplied
#[derive(Debug, Clone, Default)]
pub struct AwsSettings {
    /// `region` of the selected profile
    pub region: Option<String>,
    pub credentials: Option<Credentials>,
}

/// Where AWS credentials and region are looked up
#[derive(Debug, Clone)]
pub struct AwsSource {
    profile: Option<String>,
    profile_files: Option<ProfileFiles>,
    environment: bool,
}

impl Default for AwsSource {
    fn default() -> Self {
        Self {
            profile: None,
            profile_files: None,
            environment: true,
        }
    }
}

impl AwsSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// `AWS_PROFILE` wins; otherwise the profile named in the config file
    pub fn from_config(config: &Config) -> Self {
        let profile = std::env::var("AWS_PROFILE")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .or_else(|| config.aws.profile.clone());
        Self {
            profile,
            ..Self::default()
        }
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Read profiles from these files instead of the default locations
    pub fn with_profile_files(mut self, config_file: &Path, credentials_file: &Path) -> Self {
        self.profile_files = Some(
            ProfileFiles::builder()
                .with_file(ProfileFileKind::Config, config_file)
                .with_file(ProfileFileKind::Credentials, credentials_file)
                .build(),
        );
        self
    }

    /// Ignore `AWS_ACCESS_KEY_ID` and friends
    pub fn without_environment(mut self) -> Self {
        self.environment = false;
        self
    }

    /// Look up credentials and region
    ///
    /// Missing or broken sources yield `None`; the resolver reports that as
    /// missing credentials.
    pub async fn load(&self) -> AwsSettings {
        let region = self
            .region_provider()
            .region()
            .await
            .map(|r| r.to_string());

        let credentials = match self.credentials_chain().provide_credentials().await {
            Ok(creds) => Some(Credentials::from(&creds)),
            Err(CredentialsError::CredentialsNotLoaded(_)) => {
                debug!("No AWS credentials in environment or profile files");
                None
            }
            Err(e) => {
                warn!(error = %e, profile = ?self.profile, "Failed to load AWS credentials");
                None
            }
        };

        AwsSettings {
            region,
            credentials,
        }
    }

    fn credentials_chain(&self) -> CredentialsProviderChain {
        let mut profile = ProfileFileCredentialsProvider::builder();
        if let Some(name) = &self.profile {
            profile = profile.profile_name(name);
        }
        if let Some(files) = &self.profile_files {
            profile = profile.profile_files(files.clone());
        }
        let profile = profile.build();

        if self.environment {
            CredentialsProviderChain::first_try(
                "Environment",
                EnvironmentVariableCredentialsProvider::new(),
            )
            .or_else("Profile", profile)
        } else {
            CredentialsProviderChain::first_try("Profile", profile)
        }
    }

    fn region_provider(&self) -> ProfileFileRegionProvider {
        let mut builder = ProfileFileRegionProvider::builder();
        if let Some(name) = &self.profile {
            builder = builder.profile_name(name);
        }
        if let Some(files) = &self.profile_files {
            builder = builder.profile_files(files.clone());
        }
        builder.build()
    }
}
