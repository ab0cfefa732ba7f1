//! User account record and role model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::{Record, RecordMeta};

/// Access level attached to a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full administration, including user management and deletes.
    Admin,
    /// Staff operations: catalogue edits, checkouts, chapters.
    Librarian,
    /// Regular borrower.
    Member,
}

/// Identity provider an account was created through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthProvider {
    /// Local email/password account.
    #[default]
    Local,
    /// Google OAuth account.
    Google,
}

/// A user account.
///
/// ## Invariants
/// - `email` is unique across users (enforced by the directory service).
/// - `password_hash` is an opaque hash supplied by the auth collaborator;
///   empty for OAuth-only accounts. It never leaves the directory service
///   in any projection.
/// - A user may not change their own role or active status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Identity and lifecycle stamps.
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// Display name.
    pub name: String,
    /// Login email, unique.
    pub email: String,
    /// Opaque password hash; empty for OAuth-only accounts.
    #[serde(default)]
    pub password_hash: String,
    /// Access level.
    pub role: Role,
    /// Identity provider.
    #[serde(default)]
    pub provider: AuthProvider,
    /// Provider-side identifier for OAuth accounts.
    #[serde(default)]
    pub provider_id: Option<String>,
    /// Avatar URL.
    #[serde(default)]
    pub avatar: Option<String>,
    /// Whether the account may sign in.
    pub is_active: bool,
    /// UI theme preference.
    #[serde(default)]
    pub theme: String,
    /// Last successful sign-in, if any.
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
}

/// Caller-supplied fields for a new user account.
#[derive(Debug, Clone)]
pub struct UserDraft {
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Opaque password hash; empty for OAuth-only accounts.
    pub password_hash: String,
    /// Access level.
    pub role: Role,
    /// Identity provider.
    pub provider: AuthProvider,
    /// Provider-side identifier for OAuth accounts.
    pub provider_id: Option<String>,
    /// Avatar URL.
    pub avatar: Option<String>,
    /// UI theme preference.
    pub theme: String,
}

impl Record for User {
    type Draft = UserDraft;

    fn from_draft(meta: RecordMeta, draft: UserDraft) -> Self {
        Self {
            meta,
            name: draft.name,
            email: draft.email,
            password_hash: draft.password_hash,
            role: draft.role,
            provider: draft.provider,
            provider_id: draft.provider_id,
            avatar: draft.avatar,
            is_active: true,
            theme: draft.theme,
            last_login: None,
        }
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }
}

/// Caller identity and role, handed in by the (external) auth layer.
///
/// The core never issues or verifies credentials; it only consumes this
/// pair for gating and attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// Acting user's id.
    pub id: Uuid,
    /// Acting user's role.
    pub role: Role,
}

impl Actor {
    /// Whether the actor may perform staff operations.
    pub fn is_staff(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Librarian)
    }

    /// Whether the actor may perform admin-only operations.
    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}
