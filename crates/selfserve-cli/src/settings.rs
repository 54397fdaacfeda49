//! Environment-backed settings for the operator binary.

use std::time::Duration;

use clap::Args;
use selfserve_db::{
    DEFAULT_DATABASE, DEFAULT_DB_URL, DEFAULT_NAMESPACE, DEFAULT_PASSWORD, DEFAULT_USERNAME,
    DbConfig,
};
use selfserve_lifecycle::{ClusterConfig, OrganizationConfig};
use selfserve_upstream::{ClientCredentials, UpstreamConfig};

/// Portal store connection.
#[derive(Args, Clone)]
pub struct DbSettings {
    #[arg(long = "db-url", env = "SELFSERVE_DB_URL", default_value = DEFAULT_DB_URL)]
    pub url: String,

    #[arg(long = "db-namespace", env = "SELFSERVE_DB_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    #[arg(long = "db-database", env = "SELFSERVE_DB_DATABASE", default_value = DEFAULT_DATABASE)]
    pub database: String,

    #[arg(long = "db-username", env = "SELFSERVE_DB_USERNAME", default_value = DEFAULT_USERNAME)]
    pub username: String,

    #[arg(
        long = "db-password",
        env = "SELFSERVE_DB_PASSWORD",
        default_value = DEFAULT_PASSWORD,
        hide_env_values = true
    )]
    pub password: String,
}

impl From<&DbSettings> for DbConfig {
    fn from(s: &DbSettings) -> Self {
        DbConfig {
            url: s.url.clone(),
            namespace: s.namespace.clone(),
            database: s.database.clone(),
            username: s.username.clone(),
            password: s.password.clone(),
        }
    }
}

impl std::fmt::Debug for DbSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&DbConfig::from(self), f)
    }
}

/// Cluster broker and issued-kubeconfig settings.
#[derive(Args, Debug, Clone)]
pub struct ClusterSettings {
    /// Broker API base URL.
    #[arg(long, env = "TKGI_API_URL")]
    pub tkgi_api_url: String,

    /// Broker UAA base URL; the token endpoint is `/oauth/token` under it.
    #[arg(long, env = "TKGI_UAA_URL")]
    pub tkgi_uaa_url: String,

    #[arg(long, env = "TKGI_CLIENT_ID")]
    pub tkgi_client_id: String,

    #[arg(long, env = "TKGI_CLIENT_SECRET", hide_env_values = true)]
    pub tkgi_client_secret: String,

    /// Domain cluster masters are published under.
    #[arg(long, env = "TKGI_CLUSTER_BASE_URL")]
    pub tkgi_cluster_base_url: String,

    /// Base64 CA bundle embedded in issued kubeconfigs.
    #[arg(long, env = "TKGI_CA_CERT", default_value = "")]
    pub tkgi_ca_cert: String,

    #[arg(long, env = "TKGI_CLUSTER_CLIENT_ID")]
    pub tkgi_cluster_client_id: String,

    /// OIDC issuer used by `kubectl oidc-login`.
    #[arg(long, env = "OIDC_AUTH_ENDPOINT")]
    pub oidc_auth_endpoint: String,
}

impl ClusterSettings {
    pub fn credentials(&self) -> ClientCredentials {
        ClientCredentials {
            platform: "tkgi".into(),
            token_url: format!("{}/oauth/token", self.tkgi_uaa_url.trim_end_matches('/')),
            client_id: self.tkgi_client_id.clone(),
            client_secret: self.tkgi_client_secret.clone(),
        }
    }

    pub fn cluster_config(&self) -> ClusterConfig {
        ClusterConfig {
            api_url: self.tkgi_api_url.clone(),
            base_domain: self.tkgi_cluster_base_url.clone(),
            ca_cert: self.tkgi_ca_cert.clone(),
            oidc_issuer_url: self.oidc_auth_endpoint.clone(),
            oidc_client_id: self.tkgi_cluster_client_id.clone(),
            ..Default::default()
        }
    }
}

/// Organization platform settings.
#[derive(Args, Debug, Clone)]
pub struct OrganizationSettings {
    /// Platform system domain.
    #[arg(long, env = "TAS_SYS_URL")]
    pub tas_sys_url: String,

    #[arg(long, env = "TAS_CLIENT_ID")]
    pub tas_client_id: String,

    #[arg(long, env = "TAS_CLIENT_SECRET", hide_env_values = true)]
    pub tas_client_secret: String,

    /// Identity-provider origin for created platform users.
    #[arg(long, env = "TAS_ORIGIN", default_value = "uaa")]
    pub tas_origin: String,
}

impl OrganizationSettings {
    pub fn organization_config(&self) -> OrganizationConfig {
        OrganizationConfig {
            sys_domain: self.tas_sys_url.clone(),
            origin: self.tas_origin.clone(),
        }
    }

    pub fn credentials(&self) -> ClientCredentials {
        ClientCredentials {
            platform: "tas".into(),
            token_url: self.organization_config().token_url(),
            client_id: self.tas_client_id.clone(),
            client_secret: self.tas_client_secret.clone(),
        }
    }
}

/// Build an upstream config with the request timeout applied.
pub fn upstream_config(credentials: ClientCredentials, timeout_secs: u64) -> UpstreamConfig {
    let mut config = UpstreamConfig::new(credentials);
    config.request_timeout = Duration::from_secs(timeout_secs);
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_token_url_is_derived_from_uaa() {
        let settings = ClusterSettings {
            tkgi_api_url: "https://api.pks.example.com:9021".into(),
            tkgi_uaa_url: "https://api.pks.example.com:8443/".into(),
            tkgi_client_id: "portal".into(),
            tkgi_client_secret: "s".into(),
            tkgi_cluster_base_url: "k8s.example.com".into(),
            tkgi_ca_cert: String::new(),
            tkgi_cluster_client_id: "k8s".into(),
            oidc_auth_endpoint: "https://login.example.com".into(),
        };

        assert_eq!(
            settings.credentials().token_url,
            "https://api.pks.example.com:8443/oauth/token"
        );
        let config = settings.cluster_config();
        assert_eq!(config.master_port, 8443);
        assert_eq!(config.master_host("demo"), "demo.k8s.example.com");
    }

    #[test]
    fn db_settings_debug_hides_password() {
        let settings = DbSettings {
            url: DEFAULT_DB_URL.into(),
            namespace: DEFAULT_NAMESPACE.into(),
            database: DEFAULT_DATABASE.into(),
            username: DEFAULT_USERNAME.into(),
            password: "hunter2".into(),
        };

        let config = DbConfig::from(&settings);
        assert_eq!(config.database, "portal");
        assert!(!format!("{settings:?}").contains("hunter2"));
    }

    #[test]
    fn platform_token_url_uses_sys_domain() {
        let settings = OrganizationSettings {
            tas_sys_url: "sys.example.com".into(),
            tas_client_id: "portal".into(),
            tas_client_secret: "s".into(),
            tas_origin: "sso".into(),
        };

        assert_eq!(
            settings.credentials().token_url,
            "https://uaa.sys.example.com/oauth/token"
        );
        assert_eq!(settings.organization_config().origin, "sso");
    }
}
