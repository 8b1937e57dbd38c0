//! Account workflows shared by customers and administrators
//!
//! Registration, credential checks, profile changes and admin bootstrap.
//! Both account kinds are reached through a [`Principal`], so handlers never
//! branch on which collection an account lives in.

use crate::config::BootstrapAdmin;
use crate::core::auth::{Principal, Role};
use crate::core::credentials::{TokenService, hash_password, verify_password};
use crate::core::entity::Record;
use crate::core::error::{ShopError, ShopResult};
use crate::entities::{AccountView, Admin, AdminRole, User, normalize_email};
use crate::storage::Repositories;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

/// Token plus the principal it was issued for
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub principal: Principal,
}

/// Which collection a login targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountKind {
    Customer,
    Admin,
}

/// Changes a principal may make to their own profile
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

fn invalid_credentials() -> ShopError {
    ShopError::Unauthorized("Invalid email or password".to_string())
}

pub async fn find_user_by_email(repos: &Repositories, email: &str) -> ShopResult<Option<User>> {
    let users = repos.users.search("email", &normalize_email(email)).await?;
    Ok(users.into_iter().next())
}

pub async fn find_admin_by_email(repos: &Repositories, email: &str) -> ShopResult<Option<Admin>> {
    let admins = repos.admins.search("email", &normalize_email(email)).await?;
    Ok(admins.into_iter().next())
}

/// Create a customer account and sign it in
pub async fn register_customer(
    repos: &Repositories,
    tokens: &TokenService,
    name: String,
    email: &str,
    password: &str,
    phone: Option<String>,
) -> ShopResult<Session> {
    if find_user_by_email(repos, email).await?.is_some() {
        return Err(ShopError::Conflict(
            "An account with this email already exists".to_string(),
        ));
    }

    let user = User::new(name, email, hash_password(password)?, phone);
    let user = repos.users.create(user).await?;
    tracing::info!(user_id = %user.id, "customer registered");

    let principal = user.principal();
    Ok(Session {
        token: tokens.issue(&principal)?,
        principal,
    })
}

/// Check credentials, stamp `lastLogin` and issue a token
pub async fn login(
    repos: &Repositories,
    tokens: &TokenService,
    kind: AccountKind,
    email: &str,
    password: &str,
) -> ShopResult<Session> {
    let principal = match kind {
        AccountKind::Customer => {
            let mut user = find_user_by_email(repos, email)
                .await?
                .ok_or_else(invalid_credentials)?;
            if !verify_password(password, &user.password_hash)? {
                return Err(invalid_credentials());
            }
            if !user.is_active {
                return Err(ShopError::Forbidden("Account is deactivated".to_string()));
            }
            user.last_login = Some(Utc::now());
            let user = repos.users.update(&user.id.clone(), user).await?;
            user.principal()
        }
        AccountKind::Admin => {
            let mut admin = find_admin_by_email(repos, email)
                .await?
                .ok_or_else(invalid_credentials)?;
            if !verify_password(password, &admin.password_hash)? {
                return Err(invalid_credentials());
            }
            if !admin.is_active {
                return Err(ShopError::Forbidden("Account is deactivated".to_string()));
            }
            admin.last_login = Some(Utc::now());
            let admin = repos.admins.update(&admin.id.clone(), admin).await?;
            admin.principal()
        }
    };

    tracing::info!(principal_id = %principal.id, role = principal.role.as_str(), "signed in");
    Ok(Session {
        token: tokens.issue(&principal)?,
        principal,
    })
}

async fn load_user(repos: &Repositories, id: &Uuid) -> ShopResult<User> {
    repos
        .users
        .get(id)
        .await?
        .ok_or_else(|| ShopError::not_found("user", id))
}

pub async fn load_admin(repos: &Repositories, id: &Uuid) -> ShopResult<Admin> {
    repos
        .admins
        .get(id)
        .await?
        .ok_or_else(|| ShopError::not_found("admin", id))
}

/// The stored account behind a principal
pub async fn profile(repos: &Repositories, principal: &Principal) -> ShopResult<AccountView> {
    match principal.role {
        Role::Customer => Ok(AccountView::from(&load_user(repos, &principal.id).await?)),
        Role::Admin | Role::SuperAdmin => {
            Ok(AccountView::from(&load_admin(repos, &principal.id).await?))
        }
    }
}

pub async fn update_profile(
    repos: &Repositories,
    principal: &Principal,
    changes: ProfileChanges,
) -> ShopResult<AccountView> {
    let email = changes.email.as_deref().map(normalize_email);

    match principal.role {
        Role::Customer => {
            let mut user = load_user(repos, &principal.id).await?;
            if let Some(email) = email.filter(|e| *e != user.email) {
                if find_user_by_email(repos, &email).await?.is_some() {
                    return Err(ShopError::Conflict("Email is already in use".to_string()));
                }
                user.email = email;
            }
            if let Some(name) = changes.name {
                user.name = name.trim().to_string();
            }
            if changes.phone.is_some() {
                user.phone = changes.phone;
            }
            user.touch();
            let user = repos.users.update(&principal.id, user).await?;
            Ok(AccountView::from(&user))
        }
        Role::Admin | Role::SuperAdmin => {
            let mut admin = load_admin(repos, &principal.id).await?;
            if let Some(email) = email.filter(|e| *e != admin.email) {
                if find_admin_by_email(repos, &email).await?.is_some() {
                    return Err(ShopError::Conflict("Email is already in use".to_string()));
                }
                admin.email = email;
            }
            if let Some(name) = changes.name {
                admin.name = name.trim().to_string();
            }
            admin.touch();
            let admin = repos.admins.update(&principal.id, admin).await?;
            Ok(AccountView::from(&admin))
        }
    }
}

/// Replace the password after checking the current one
pub async fn change_password(
    repos: &Repositories,
    principal: &Principal,
    current: &str,
    new: &str,
) -> ShopResult<()> {
    let wrong = || ShopError::Unauthorized("Current password is incorrect".to_string());
    let hash = hash_password(new)?;

    match principal.role {
        Role::Customer => {
            let mut user = load_user(repos, &principal.id).await?;
            if !verify_password(current, &user.password_hash)? {
                return Err(wrong());
            }
            user.password_hash = hash;
            user.touch();
            repos.users.update(&principal.id, user).await?;
        }
        Role::Admin | Role::SuperAdmin => {
            let mut admin = load_admin(repos, &principal.id).await?;
            if !verify_password(current, &admin.password_hash)? {
                return Err(wrong());
            }
            admin.password_hash = hash;
            admin.touch();
            repos.admins.update(&principal.id, admin).await?;
        }
    }

    tracing::info!(principal_id = %principal.id, "password changed");
    Ok(())
}

/// Create an admin account; the email must be unused
pub async fn create_admin(
    repos: &Repositories,
    name: String,
    email: &str,
    password: &str,
    role: AdminRole,
) -> ShopResult<Admin> {
    if find_admin_by_email(repos, email).await?.is_some() {
        return Err(ShopError::Conflict(
            "An admin with this email already exists".to_string(),
        ));
    }
    let admin = Admin::new(name, email, hash_password(password)?, role);
    let admin = repos.admins.create(admin).await?;
    tracing::info!(admin_id = %admin.id, role = ?admin.role, "admin created");
    Ok(admin)
}

/// Create the configured super admin when there is no admin at all
pub async fn bootstrap_super_admin(
    repos: &Repositories,
    bootstrap: &BootstrapAdmin,
) -> ShopResult<Option<Admin>> {
    if !repos.admins.list().await?.is_empty() {
        return Ok(None);
    }
    let admin = create_admin(
        repos,
        bootstrap.name.clone(),
        &bootstrap.email,
        &bootstrap.password,
        AdminRole::SuperAdmin,
    )
    .await?;
    Ok(Some(admin))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[tokio::test]
    async fn test_register_then_login() {
        let repos = Repositories::in_memory();
        let tokens = TokenService::new(SECRET, 1);

        let session = register_customer(&repos, &tokens, "Ann".into(), "Ann@Example.com", "password1", None)
            .await
            .unwrap();
        assert_eq!(session.principal.email, "ann@example.com");

        let session = login(&repos, &tokens, AccountKind::Customer, "ann@example.com", "password1")
            .await
            .unwrap();
        assert_eq!(tokens.verify(&session.token).unwrap().role, Role::Customer);

        let user = repos.users.get(&session.principal.id).await.unwrap().unwrap();
        assert!(user.last_login.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_registration_conflicts() {
        let repos = Repositories::in_memory();
        let tokens = TokenService::new(SECRET, 1);
        register_customer(&repos, &tokens, "Ann".into(), "ann@example.com", "password1", None)
            .await
            .unwrap();

        let err = register_customer(&repos, &tokens, "Ann".into(), "ANN@example.com", "password2", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_wrong_password_and_wrong_kind_are_unauthorized() {
        let repos = Repositories::in_memory();
        let tokens = TokenService::new(SECRET, 1);
        register_customer(&repos, &tokens, "Ann".into(), "ann@example.com", "password1", None)
            .await
            .unwrap();

        let err = login(&repos, &tokens, AccountKind::Customer, "ann@example.com", "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Unauthorized(_)));

        let err = login(&repos, &tokens, AccountKind::Admin, "ann@example.com", "password1")
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_bootstrap_runs_once() {
        let repos = Repositories::in_memory();
        let bootstrap = BootstrapAdmin {
            name: "Root".into(),
            email: "root@example.com".into(),
            password: "rootpassword".into(),
        };

        let created = bootstrap_super_admin(&repos, &bootstrap).await.unwrap();
        assert_eq!(created.unwrap().role, AdminRole::SuperAdmin);
        assert!(bootstrap_super_admin(&repos, &bootstrap).await.unwrap().is_none());
        assert_eq!(repos.admins.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_change_password_checks_current() {
        let repos = Repositories::in_memory();
        let tokens = TokenService::new(SECRET, 1);
        let session = register_customer(&repos, &tokens, "Ann".into(), "ann@example.com", "password1", None)
            .await
            .unwrap();

        let err = change_password(&repos, &session.principal, "wrong", "password2")
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Unauthorized(_)));

        change_password(&repos, &session.principal, "password1", "password2")
            .await
            .unwrap();
        assert!(
            login(&repos, &tokens, AccountKind::Customer, "ann@example.com", "password2")
                .await
                .is_ok()
        );
    }
}
