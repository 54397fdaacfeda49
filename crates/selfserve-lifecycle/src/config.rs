//! Lifecycle configuration for the cluster broker and the organization
//! platform.

use url::Url;

/// Settings for cluster provisioning and kubeconfig issuance.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Broker API base URL, without trailing slash.
    pub api_url: String,
    /// Cluster masters are published as `{name}.{base_domain}`.
    pub base_domain: String,
    /// Port requested for every cluster master (default: 8443).
    pub master_port: u16,
    /// Broker plan used for new clusters (default: `small`).
    pub plan_name: String,
    /// Broker Kubernetes profile (default: `oidc-config`).
    pub profile_name: String,
    /// Base64 CA bundle embedded in issued kubeconfigs.
    pub ca_cert: String,
    /// OIDC issuer the `kubectl oidc-login` plugin authenticates against.
    pub oidc_issuer_url: String,
    /// OIDC client id registered for cluster access.
    pub oidc_client_id: String,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            base_domain: String::new(),
            master_port: 8443,
            plan_name: "small".into(),
            profile_name: "oidc-config".into(),
            ca_cert: String::new(),
            oidc_issuer_url: String::new(),
            oidc_client_id: String::new(),
        }
    }
}

impl ClusterConfig {
    pub fn clusters_url(&self) -> String {
        format!("{}/v1/clusters", self.api_url.trim_end_matches('/'))
    }

    pub fn cluster_url(&self, name: &str) -> String {
        format!("{}/{}", self.clusters_url(), name)
    }

    pub fn admin_bind_url(&self, name: &str) -> String {
        format!("{}/binds/admin", self.cluster_url(name))
    }

    pub fn master_host(&self, name: &str) -> String {
        format!("{}.{}", name, self.base_domain)
    }
}

/// Settings for the organization platform.
#[derive(Debug, Clone)]
pub struct OrganizationConfig {
    /// System domain; UAA, API and console live at `uaa.`, `api.` and
    /// `console.` under it.
    pub sys_domain: String,
    /// Identity-provider origin for platform users created by the portal.
    pub origin: String,
}

impl Default for OrganizationConfig {
    fn default() -> Self {
        Self {
            sys_domain: String::new(),
            origin: "uaa".into(),
        }
    }
}

impl OrganizationConfig {
    pub fn token_url(&self) -> String {
        format!("{}/oauth/token", self.uaa_url())
    }

    pub fn uaa_url(&self) -> String {
        format!("https://uaa.{}", self.sys_domain)
    }

    pub fn api_url(&self) -> String {
        format!("https://api.{}", self.sys_domain)
    }

    pub fn console_url(&self) -> String {
        format!("https://console.{}", self.sys_domain)
    }

    pub fn users_url(&self) -> String {
        format!("{}/Users", self.uaa_url())
    }

    /// SCIM lookup of `email` within the configured origin.
    pub fn user_lookup_url(&self, email: &str) -> Result<String, url::ParseError> {
        let filter = format!(
            "userName eq \"{}\" and origin eq \"{}\"",
            email, self.origin
        );
        let url = Url::parse_with_params(&self.users_url(), &[("filter", filter)])?;
        Ok(url.into())
    }

    pub fn organizations_url(&self) -> String {
        format!("{}/v3/organizations", self.api_url())
    }

    pub fn organization_url(&self, guid: &str) -> String {
        format!("{}/{}", self.organizations_url(), guid)
    }

    pub fn roles_url(&self) -> String {
        format!("{}/v3/roles", self.api_url())
    }
}
