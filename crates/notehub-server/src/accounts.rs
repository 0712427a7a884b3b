//! Account workflow: signup, login, profile lookups and password reset.
//!
//! Passwords and security passwords are stored and compared as plain text;
//! comparison is exact and case-sensitive.

use serde::Serialize;
use subtle::ConstantTimeEq;
use tracing::{debug, info};

use notehub_shared::types::UserId;
use notehub_store::{Database, NewUser, StoreError, User};

use crate::error::ServerError;

/// Returned by signup.
#[derive(Debug, Serialize)]
pub struct NewAccount {
    pub id: UserId,
    pub username: String,
    pub email: String,
}

/// Returned by login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub credits: i64,
    pub upload_count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub username: String,
    pub email: String,
    pub credits: i64,
    pub upload_count: i64,
}

/// Look a user up by email, turning a missing row into `UserNotFound`.
pub fn find_user(db: &Database, email: &str) -> Result<User, ServerError> {
    match db.user_by_email(email) {
        Ok(user) => Ok(user),
        Err(StoreError::NotFound) => Err(ServerError::UserNotFound),
        Err(e) => Err(e.into()),
    }
}

fn secrets_match(given: &str, stored: &str) -> bool {
    let given = given.as_bytes();
    let stored = stored.as_bytes();
    given.len() == stored.len() && given.ct_eq(stored).unwrap_u8() == 1
}

pub fn check_email_exists(db: &Database, email: &str) -> Result<bool, ServerError> {
    Ok(db.email_exists(email)?)
}

pub fn signup(db: &Database, new_user: &NewUser) -> Result<NewAccount, ServerError> {
    let user = match db.create_user(new_user) {
        Ok(user) => user,
        Err(StoreError::Conflict { .. }) => return Err(ServerError::DuplicateEmail),
        Err(e) => return Err(e.into()),
    };

    info!(user_id = %user.id, email = %user.email, "Account created");

    Ok(NewAccount {
        id: user.id,
        username: user.username,
        email: user.email,
    })
}

pub fn verify_security_pass(
    db: &Database,
    email: &str,
    security_pass: &str,
) -> Result<(), ServerError> {
    let user = find_user(db, email)?;
    if !secrets_match(security_pass, &user.security_pass) {
        debug!(email, "Security password mismatch");
        return Err(ServerError::InvalidSecurityPass);
    }
    Ok(())
}

pub fn login(db: &Database, email: &str, password: &str) -> Result<UserSummary, ServerError> {
    let user = find_user(db, email)?;
    if !secrets_match(password, &user.password) {
        debug!(email, "Login rejected");
        return Err(ServerError::InvalidCredentials);
    }

    Ok(UserSummary {
        id: user.id,
        username: user.username,
        email: user.email,
        credits: user.credits,
        upload_count: user.upload_count,
    })
}

pub fn user_profile(db: &Database, email: &str) -> Result<UserProfile, ServerError> {
    let user = find_user(db, email)?;
    Ok(UserProfile {
        username: user.username,
        email: user.email,
        credits: user.credits,
        upload_count: user.upload_count,
    })
}

pub fn update_password(db: &Database, email: &str, new_password: &str) -> Result<(), ServerError> {
    let user = find_user(db, email)?;
    if !db.update_password(user.id, new_password)? {
        return Err(ServerError::UserNotFound);
    }
    info!(user_id = %user.id, "Password updated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> NewUser {
        NewUser {
            username: "alice".into(),
            email: "a@x.org".into(),
            password: "Pw1!aaaa".into(),
            security_pass: "SEC123".into(),
        }
    }

    #[test]
    fn test_signup_then_exists() {
        let db = Database::open_in_memory().unwrap();
        assert!(!check_email_exists(&db, "a@x.org").unwrap());

        let account = signup(&db, &alice()).unwrap();
        assert_eq!(account.username, "alice");
        assert!(check_email_exists(&db, "a@x.org").unwrap());
    }

    #[test]
    fn test_signup_twice_is_duplicate() {
        let db = Database::open_in_memory().unwrap();
        signup(&db, &alice()).unwrap();
        assert!(matches!(
            signup(&db, &alice()),
            Err(ServerError::DuplicateEmail)
        ));
    }

    #[test]
    fn test_login() {
        let db = Database::open_in_memory().unwrap();
        signup(&db, &alice()).unwrap();

        let summary = login(&db, "a@x.org", "Pw1!aaaa").unwrap();
        assert_eq!(summary.credits, 0);
        assert_eq!(summary.upload_count, 0);

        assert!(matches!(
            login(&db, "a@x.org", "pw1!aaaa"),
            Err(ServerError::InvalidCredentials)
        ));
        assert!(matches!(
            login(&db, "b@x.org", "Pw1!aaaa"),
            Err(ServerError::UserNotFound)
        ));
    }

    #[test]
    fn test_login_summary_never_leaks_secrets() {
        let db = Database::open_in_memory().unwrap();
        signup(&db, &alice()).unwrap();
        let json = serde_json::to_value(login(&db, "a@x.org", "Pw1!aaaa").unwrap()).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("securityPass").is_none());
        assert_eq!(json["uploadCount"], 0);
    }

    #[test]
    fn test_security_pass() {
        let db = Database::open_in_memory().unwrap();
        signup(&db, &alice()).unwrap();

        verify_security_pass(&db, "a@x.org", "SEC123").unwrap();
        assert!(matches!(
            verify_security_pass(&db, "a@x.org", "SEC12"),
            Err(ServerError::InvalidSecurityPass)
        ));
        assert!(matches!(
            verify_security_pass(&db, "nobody@x.org", "SEC123"),
            Err(ServerError::UserNotFound)
        ));
    }

    #[test]
    fn test_password_reset_changes_login() {
        let db = Database::open_in_memory().unwrap();
        signup(&db, &alice()).unwrap();

        update_password(&db, "a@x.org", "NewPass9").unwrap();
        assert!(login(&db, "a@x.org", "Pw1!aaaa").is_err());
        assert!(login(&db, "a@x.org", "NewPass9").is_ok());

        assert!(matches!(
            update_password(&db, "nobody@x.org", "x"),
            Err(ServerError::UserNotFound)
        ));
    }

    #[test]
    fn test_profile() {
        let db = Database::open_in_memory().unwrap();
        signup(&db, &alice()).unwrap();
        let profile = user_profile(&db, "a@x.org").unwrap();
        assert_eq!(profile.username, "alice");
        assert_eq!(profile.credits, 0);
    }
}
