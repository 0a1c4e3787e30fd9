use crate::external_connections::ExternalConnectivity;
use crate::security;
use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::info;

/// An account as exposed to the rest of the application. The password hash
/// stays behind the driven ports.
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(Clone))]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Registration data as submitted by a new user, password still in the clear
#[cfg_attr(test, derive(Clone))]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Login data
#[cfg_attr(test, derive(Clone))]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// A user record paired with its stored password hash, for login verification
pub struct UserWithPassword {
    pub user: User,
    pub password_hash: String,
}

/// The persisted form of a new account, password already hashed
pub struct UserPersist {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

pub mod driven_ports {
    use super::*;

    pub trait UserReader {
        async fn credentials_by_email(
            &self,
            email: &str,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<UserWithPassword>, anyhow::Error>;
    }

    pub trait UserWriter {
        async fn create_user(
            &self,
            user: &UserPersist,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<User, anyhow::Error>;
    }

    pub trait DetectUser {
        async fn email_in_use(
            &self,
            email: &str,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<bool, anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum RegisterError {
        #[error("a user with that email is already registered")]
        EmailInUse,
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }

    #[derive(Debug, Error)]
    pub enum LoginError {
        #[error("the email or password did not match")]
        BadCredentials,
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }

    #[cfg(test)]
    mod auth_error_clones {
        use super::*;
        use anyhow::anyhow;

        impl Clone for RegisterError {
            fn clone(&self) -> Self {
                match self {
                    Self::EmailInUse => Self::EmailInUse,
                    Self::PortError(err) => Self::PortError(anyhow!(format!("{}", err))),
                }
            }
        }

        impl Clone for LoginError {
            fn clone(&self) -> Self {
                match self {
                    Self::BadCredentials => Self::BadCredentials,
                    Self::PortError(err) => Self::PortError(anyhow!(format!("{}", err))),
                }
            }
        }
    }

    pub trait AuthPort {
        async fn register(
            &self,
            new_user: &NewUser,
            ext_cxn: &mut impl ExternalConnectivity,
            u_detect: &impl driven_ports::DetectUser,
            u_write: &impl driven_ports::UserWriter,
        ) -> Result<User, RegisterError>;

        async fn login(
            &self,
            credentials: &Credentials,
            ext_cxn: &mut impl ExternalConnectivity,
            u_read: &impl driven_ports::UserReader,
        ) -> Result<User, LoginError>;
    }
}

pub struct UserService {}

impl driving_ports::AuthPort for UserService {
    async fn register(
        &self,
        new_user: &NewUser,
        ext_cxn: &mut impl ExternalConnectivity,
        u_detect: &impl driven_ports::DetectUser,
        u_write: &impl driven_ports::UserWriter,
    ) -> Result<User, driving_ports::RegisterError> {
        let email_taken = u_detect
            .email_in_use(&new_user.email, &mut *ext_cxn)
            .await
            .context("checking whether a registration email is taken")?;
        if email_taken {
            return Err(driving_ports::RegisterError::EmailInUse);
        }

        let password_hash = security::hash_password(&new_user.password)?;
        let created_user = u_write
            .create_user(
                &UserPersist {
                    name: new_user.name.clone(),
                    email: new_user.email.clone(),
                    password_hash,
                },
                &mut *ext_cxn,
            )
            .await
            .context("persisting a new account")?;

        info!("Registered new user {}", created_user.id);
        Ok(created_user)
    }

    async fn login(
        &self,
        credentials: &Credentials,
        ext_cxn: &mut impl ExternalConnectivity,
        u_read: &impl driven_ports::UserReader,
    ) -> Result<User, driving_ports::LoginError> {
        let stored = u_read
            .credentials_by_email(&credentials.email, &mut *ext_cxn)
            .await
            .context("looking up an account at login")?;

        // An unknown email takes the same path as a bad password so the response
        // doesn't reveal which one was wrong
        let Some(stored) = stored else {
            return Err(driving_ports::LoginError::BadCredentials);
        };

        let password_matches =
            security::verify_password(&credentials.password, &stored.password_hash)?;
        if !password_matches {
            return Err(driving_ports::LoginError::BadCredentials);
        }

        Ok(stored.user)
    }
}
