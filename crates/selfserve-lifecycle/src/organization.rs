//! Organization lifecycle: platform user provisioning, organization
//! creation with manager role assignment, and deletion.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Value, json};
use selfserve_core::access::ensure_owner;
use selfserve_core::error::{PortalError, PortalResult};
use selfserve_core::models::organization::{CreateOrganization, ProvisionedOrganization};
use selfserve_core::models::user::UserIdentity;
use selfserve_core::repository::OrganizationRepository;
use selfserve_upstream::{AccessToken, UpstreamApi};
use tracing::{info, warn};

use crate::config::OrganizationConfig;

/// A non-fatal step that failed while creating an organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningWarning {
    UserLookupFailed { status: u16 },
    UserCreationFailed { status: u16, body: String },
    RoleAssignmentFailed { reason: String },
}

impl std::fmt::Display for ProvisioningWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UserLookupFailed { status } => {
                write!(f, "platform user lookup returned status {status}")
            }
            Self::UserCreationFailed { status, body } => {
                write!(f, "platform user creation returned status {status}: {body}")
            }
            Self::RoleAssignmentFailed { reason } => {
                write!(f, "organization manager role not assigned: {reason}")
            }
        }
    }
}

/// A created organization together with the steps that did not succeed.
#[derive(Debug, Clone)]
pub struct OrganizationCreated {
    pub organization: ProvisionedOrganization,
    pub warnings: Vec<ProvisioningWarning>,
}

/// Organizations owned by a user and where to manage them.
#[derive(Debug, Clone)]
pub struct OrganizationListing {
    pub console_url: String,
    pub organizations: Vec<ProvisionedOrganization>,
}

/// Organization lifecycle manager.
pub struct OrganizationManager<R: OrganizationRepository, U: UpstreamApi> {
    repo: R,
    platform: U,
    config: OrganizationConfig,
}

impl<R: OrganizationRepository, U: UpstreamApi> OrganizationManager<R, U> {
    pub fn new(repo: R, platform: U, config: OrganizationConfig) -> Self {
        Self {
            repo,
            platform,
            config,
        }
    }

    pub fn config(&self) -> &OrganizationConfig {
        &self.config
    }

    pub async fn list(&self, user: &UserIdentity) -> PortalResult<OrganizationListing> {
        Ok(OrganizationListing {
            console_url: self.config.console_url(),
            organizations: self.repo.list_by_owner(user.id).await?,
        })
    }

    /// Create an organization managed by `user`.
    ///
    /// The platform user is created on demand. Only a rejected
    /// organization aborts; user and role failures come back as warnings
    /// and the organization is still recorded.
    pub async fn create(&self, user: &UserIdentity, name: &str) -> PortalResult<OrganizationCreated> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PortalError::validation("organization name must not be empty"));
        }

        let token = self.platform.authenticate().await?;
        let mut warnings = Vec::new();

        if let Some(warning) = self.ensure_platform_user(&token, &user.email).await? {
            warn!(user = %user.email, %warning, "Platform user not provisioned");
            warnings.push(warning);
        }

        let response = self
            .platform
            .post(&token, &self.config.organizations_url(), json!({ "name": name }))
            .await?;
        if response.status != 201 {
            warn!(
                organization = %name,
                status = response.status,
                body = %response.body_text(),
                "Platform rejected organization creation"
            );
            return Err(PortalError::CreationFailed {
                entity: "Organization".into(),
                name: name.into(),
                status: response.status,
                body: response.body_text(),
            });
        }

        let guid = response
            .body
            .get("guid")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                PortalError::Internal(format!("organization {name} created without a guid"))
            })?
            .to_string();

        if let Some(warning) = self.assign_manager(&token, &user.email, &guid).await {
            warn!(organization = %name, user = %user.email, %warning, "Role assignment failed");
            warnings.push(warning);
        }

        let organization = self
            .repo
            .create(CreateOrganization {
                name: name.into(),
                remote_id: guid,
                owner_id: user.id,
            })
            .await?;

        info!(
            organization = %organization.name,
            remote_id = %organization.remote_id,
            owner = %user.email,
            warnings = warnings.len(),
            "Organization created"
        );
        Ok(OrganizationCreated {
            organization,
            warnings,
        })
    }

    /// Look the user up in the configured origin and create it if absent.
    ///
    /// Transport failures abort; unexpected statuses become a warning.
    async fn ensure_platform_user(
        &self,
        token: &AccessToken,
        email: &str,
    ) -> PortalResult<Option<ProvisioningWarning>> {
        let lookup_url = self
            .config
            .user_lookup_url(email)
            .map_err(|e| PortalError::Internal(format!("invalid user lookup URL: {e}")))?;
        let lookup = self.platform.get(token, &lookup_url).await?;
        if lookup.status != 200 {
            return Ok(Some(ProvisioningWarning::UserLookupFailed {
                status: lookup.status,
            }));
        }

        let total = lookup
            .body
            .get("totalResults")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        if total > 0 {
            return Ok(None);
        }

        let payload = json!({
            "emails": [{ "value": email, "primary": true }],
            "name": { "familyName": email, "givenName": email },
            "origin": self.config.origin,
            "password": placeholder_password(),
            "userName": email,
        });
        let created = self
            .platform
            .post(token, &self.config.users_url(), payload)
            .await?;
        if created.status != 201 {
            return Ok(Some(ProvisioningWarning::UserCreationFailed {
                status: created.status,
                body: created.body_text(),
            }));
        }

        info!(user = %email, origin = %self.config.origin, "Platform user created");
        Ok(None)
    }

    async fn assign_manager(
        &self,
        token: &AccessToken,
        email: &str,
        guid: &str,
    ) -> Option<ProvisioningWarning> {
        let payload = json!({
            "type": "organization_manager",
            "relationships": {
                "user": { "data": { "username": email } },
                "organization": { "data": { "guid": guid } },
            },
        });

        match self.platform.post(token, &self.config.roles_url(), payload).await {
            Ok(response) if response.status == 201 => None,
            Ok(response) => Some(ProvisioningWarning::RoleAssignmentFailed {
                reason: format!("status {}: {}", response.status, response.body_text()),
            }),
            Err(e) => Some(ProvisioningWarning::RoleAssignmentFailed {
                reason: e.to_string(),
            }),
        }
    }

    /// Delete an organization owned by `user`.
    pub async fn delete(&self, user: &UserIdentity, remote_id: &str) -> PortalResult<()> {
        let organization =
            ensure_owner(self.repo.get_by_remote_id(remote_id).await, user, remote_id)?;

        let token = self.platform.authenticate().await?;
        let response = self
            .platform
            .delete(&token, &self.config.organization_url(&organization.remote_id))
            .await?;

        if response.status != 202 {
            warn!(
                organization = %organization.name,
                status = response.status,
                body = %response.body_text(),
                "Platform rejected organization deletion"
            );
            return Err(PortalError::DeletionFailed {
                entity: "Organization".into(),
                id: remote_id.into(),
                status: response.status,
                body: response.body_text(),
            });
        }

        self.repo.delete(organization.id).await?;
        info!(organization = %organization.name, "Organization deleted");
        Ok(())
    }
}

/// Password for platform users that only ever log in through SSO.
fn placeholder_password() -> String {
    let bytes: [u8; 24] = rand::Rng::random(&mut rand::rng());
    URL_SAFE_NO_PAD.encode(bytes)
}
