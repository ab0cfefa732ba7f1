//! User directory: account administration and lookups.
//!
//! Credential handling stays with the external auth collaborator; this
//! service stores whatever opaque hash it is handed and never returns it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::store::{Record, RecordMeta, Table};

use super::error::Error;
use super::page::{Page, PageRequest};
use super::transaction::{LoanStatus, Transaction};
use super::user::{Actor, AuthProvider, Role, User, UserDraft};

/// Caller input for a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Display name, required.
    pub name: String,
    /// Login email, required and unique.
    pub email: String,
    /// Opaque password hash from the auth collaborator, required.
    pub password_hash: String,
    /// Access level; defaults to member.
    pub role: Option<Role>,
}

/// User listing filter.
#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    /// Substring filter over name and email (case-insensitive).
    pub q: Option<String>,
    /// Restrict to one role.
    pub role: Option<Role>,
    /// Page selection.
    pub page: PageRequest,
}

/// A user with the password hash stripped; the only user shape that leaves
/// this service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    /// Identity and lifecycle stamps.
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Access level.
    pub role: Role,
    /// Identity provider.
    pub provider: AuthProvider,
    /// Avatar URL.
    pub avatar: Option<String>,
    /// Whether the account may sign in.
    pub is_active: bool,
    /// Last successful sign-in, if any.
    pub last_login: Option<DateTime<Utc>>,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            meta: user.meta,
            name: user.name,
            email: user.email,
            role: user.role,
            provider: user.provider,
            avatar: user.avatar,
            is_active: user.is_active,
            last_login: user.last_login,
        }
    }
}

/// Minimal projection for picker widgets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBrief {
    /// User id.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Access level.
    pub role: Role,
}

/// Borrowing counters shown on a user's admin page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowStats {
    /// Loans currently out.
    pub active_checkouts: usize,
    /// All loans ever, returned included.
    pub total_borrowed: usize,
}

/// A user's admin view: summary plus borrowing counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// The account, hash stripped.
    pub user: UserSummary,
    /// Borrowing counters.
    pub stats: BorrowStats,
}

/// Account administration over the users and transactions collections.
#[derive(Clone)]
pub struct DirectoryService {
    users: Arc<Table<User>>,
    transactions: Arc<Table<Transaction>>,
}

impl DirectoryService {
    /// Create the service over its collections.
    pub fn new(users: Arc<Table<User>>, transactions: Arc<Table<Transaction>>) -> Self {
        Self {
            users,
            transactions,
        }
    }

    /// Create an account. Admin only; email must be unique.
    pub async fn create_user(&self, actor: &Actor, new: NewUser) -> Result<UserSummary, Error> {
        if !actor.is_admin() {
            return Err(Error::forbidden("Only admins may create users"));
        }
        if new.name.trim().is_empty()
            || new.email.trim().is_empty()
            || new.password_hash.is_empty()
        {
            return Err(Error::validation("Name, email, and password are required"));
        }
        let email = new.email.clone();
        if self
            .users
            .find_one(move |u| u.email == email)
            .await?
            .is_some()
        {
            return Err(Error::duplicate("Email already registered"));
        }
        let user = self
            .users
            .create(UserDraft {
                name: new.name,
                email: new.email,
                password_hash: new.password_hash,
                role: new.role.unwrap_or(Role::Member),
                provider: AuthProvider::Local,
                provider_id: None,
                avatar: None,
                theme: "light".to_owned(),
            })
            .await?;
        debug!(user_id = %user.id(), "user account created");
        Ok(user.into())
    }

    /// Change an account's role. Admin only; never on your own account.
    pub async fn set_role(
        &self,
        actor: &Actor,
        user_id: Uuid,
        role: Role,
    ) -> Result<UserSummary, Error> {
        if !actor.is_admin() {
            return Err(Error::forbidden("Only admins may change roles"));
        }
        if user_id == actor.id {
            return Err(Error::validation("Cannot change your own role"));
        }
        self.users
            .update(user_id, |u| u.role = role)
            .await?
            .map(UserSummary::from)
            .ok_or_else(|| Error::not_found("User not found"))
    }

    /// Activate or deactivate an account. Admin only; never on your own
    /// account.
    pub async fn set_active(
        &self,
        actor: &Actor,
        user_id: Uuid,
        is_active: bool,
    ) -> Result<UserSummary, Error> {
        if !actor.is_admin() {
            return Err(Error::forbidden("Only admins may change account status"));
        }
        if user_id == actor.id {
            return Err(Error::validation("Cannot deactivate your own account"));
        }
        self.users
            .update(user_id, |u| u.is_active = is_active)
            .await?
            .map(UserSummary::from)
            .ok_or_else(|| Error::not_found("User not found"))
    }

    /// List accounts newest-first. Staff only.
    pub async fn list(&self, actor: &Actor, query: UserQuery) -> Result<Page<UserSummary>, Error> {
        if !actor.is_staff() {
            return Err(Error::forbidden("Only staff may list users"));
        }
        let mut users = self.users.read_all().await?;
        if let Some(q) = query.q.as_deref().map(str::to_lowercase) {
            users.retain(|u| {
                u.name.to_lowercase().contains(&q) || u.email.to_lowercase().contains(&q)
            });
        }
        if let Some(role) = query.role {
            users.retain(|u| u.role == role);
        }
        users.sort_by(|a, b| b.meta.created_at.cmp(&a.meta.created_at));
        Ok(Page::slice(users, query.page).map(UserSummary::from))
    }

    /// One account with its borrowing counters. Staff only.
    pub async fn get(&self, actor: &Actor, user_id: Uuid) -> Result<UserProfile, Error> {
        if !actor.is_staff() {
            return Err(Error::forbidden("Only staff may view users"));
        }
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| Error::not_found("User not found"))?;
        let loans = self.transactions.find(|t| t.user_id == user_id).await?;
        let active_checkouts = loans
            .iter()
            .filter(|t| t.status == LoanStatus::Active)
            .count();
        Ok(UserProfile {
            user: user.into(),
            stats: BorrowStats {
                active_checkouts,
                total_borrowed: loans.len(),
            },
        })
    }

    /// Every account as a minimal projection for pickers. Staff only.
    pub async fn list_brief(&self, actor: &Actor) -> Result<Vec<UserBrief>, Error> {
        if !actor.is_staff() {
            return Err(Error::forbidden("Only staff may list users"));
        }
        Ok(self
            .users
            .read_all()
            .await?
            .into_iter()
            .map(|u| UserBrief {
                id: u.id(),
                name: u.name,
                email: u.email,
                role: u.role,
            })
            .collect())
    }
}

#[cfg(test)]
#[path = "directory_tests.rs"]
mod tests;
