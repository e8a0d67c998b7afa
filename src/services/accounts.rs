//! Account service
//!
//! Registration, login and token upkeep. Passwords are held in
//! `Zeroizing` buffers for as long as the service touches them.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::auth::{Claims, CredentialVerifier, IssuedToken, Role, TokenCodec};
use crate::db::repository::AccountRepository;
use crate::db::schemas::AccountDoc;
use crate::types::{NotewardenError, Result};

#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: Zeroizing<String>,
    #[serde(default)]
    pub role: Role,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .field("role", &self.role)
            .finish()
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: Zeroizing<String>,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// Admin account seeded at startup
pub struct BootstrapAdmin {
    pub email: String,
    pub username: String,
    pub password: Zeroizing<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub role: Role,
    pub user_id: String,
    pub expires_at: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: String,
    pub email: String,
    pub username: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl From<&AccountDoc> for AccountView {
    fn from(account: &AccountDoc) -> Self {
        Self {
            id: account.id.clone(),
            email: account.email.clone(),
            username: account.username.clone(),
            role: account.role,
            created_at: account.metadata.created_rfc3339(),
        }
    }
}

pub struct AccountService {
    accounts: Arc<dyn AccountRepository>,
    codec: TokenCodec,
    verifier: Arc<dyn CredentialVerifier>,
}

impl AccountService {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        codec: TokenCodec,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> Self {
        Self {
            accounts,
            codec,
            verifier,
        }
    }

    /// Create an account
    ///
    /// Only an admin caller may create another admin.
    pub async fn register(
        &self,
        caller: Option<&Claims>,
        request: RegisterRequest,
    ) -> Result<AccountView> {
        if request.role.is_admin() && !caller.is_some_and(Claims::is_admin) {
            warn!(
                "Rejected admin registration for {} without admin caller",
                request.username.trim()
            );
            return Err(NotewardenError::Forbidden(
                "Only an admin can register another admin".into(),
            ));
        }
        self.create_account(request).await
    }

    async fn create_account(&self, request: RegisterRequest) -> Result<AccountView> {
        let email = request.email.trim().to_string();
        let username = request.username.trim().to_string();

        if email.is_empty() || username.is_empty() || request.password.is_empty() {
            return Err(NotewardenError::ValidationFailed(
                "Missing required fields: email, username, password".into(),
            ));
        }
        if !email.contains('@') {
            return Err(NotewardenError::ValidationFailed(
                "Invalid email address".into(),
            ));
        }

        if self
            .accounts
            .find_by_email_or_username(&email, &username)
            .await?
            .is_some()
        {
            return Err(NotewardenError::ValidationFailed(
                "Email or username already exists".into(),
            ));
        }

        let password_hash = self.verifier.hash(&request.password)?;
        let account = self
            .accounts
            .insert(AccountDoc::new(email, username, password_hash, request.role))
            .await?;

        info!("Registered {} account {}", account.role, account.username);
        Ok(AccountView::from(&account))
    }

    /// Make sure the configured admin account exists
    ///
    /// Returns `Ok(None)` when the username is already taken; an existing
    /// account is never modified.
    pub async fn ensure_admin(&self, admin: BootstrapAdmin) -> Result<Option<AccountView>> {
        if let Some(existing) = self.accounts.find_by_username(admin.username.trim()).await? {
            if !existing.role.is_admin() {
                warn!(
                    "Bootstrap admin {} already exists as a {} account",
                    existing.username, existing.role
                );
            }
            return Ok(None);
        }

        let request = RegisterRequest {
            email: admin.email,
            username: admin.username,
            password: admin.password,
            role: Role::Admin,
        };
        let account = self.create_account(request).await?;
        info!("Seeded bootstrap admin {}", account.username);
        Ok(Some(account))
    }

    /// Exchange credentials for a token
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse> {
        if request.username.is_empty() || request.password.is_empty() {
            return Err(NotewardenError::ValidationFailed(
                "Missing required fields: username, password".into(),
            ));
        }

        // Same error for unknown user and bad password
        let invalid = || NotewardenError::Unauthenticated("Invalid credentials".into());

        let Some(account) = self.accounts.find_by_username(&request.username).await? else {
            warn!("Login failed - user not found: {}", request.username);
            return Err(invalid());
        };

        if !self
            .verifier
            .verify(&request.password, &account.password_hash)?
        {
            warn!("Login failed - invalid password: {}", request.username);
            return Err(invalid());
        }

        let issued = self.codec.issue(&account.id, account.role)?;
        info!("Login successful: {}", account.username);

        Ok(LoginResponse {
            token: issued.token,
            role: account.role,
            user_id: account.id,
            expires_at: issued.expires_at,
        })
    }

    /// Current role of the token's account
    ///
    /// The account is re-read, so a deleted account is `NotFound` even while
    /// its token is still valid.
    pub async fn verify(&self, identity: &Claims) -> Result<AccountView> {
        self.accounts
            .find_by_id(&identity.sub)
            .await?
            .map(|account| AccountView::from(&account))
            .ok_or_else(|| NotewardenError::NotFound("User not found".into()))
    }

    pub fn refresh(&self, token: &str) -> Result<IssuedToken> {
        self.codec.refresh(token)
    }
}
