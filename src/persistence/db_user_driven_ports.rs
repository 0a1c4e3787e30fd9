use crate::domain;
use crate::domain::user::{User, UserPersist, UserWithPassword};
use crate::external_connections::{ConnectionHandle, ExternalConnectivity};
use anyhow::{Context, Error};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(FromRow)]
struct UserRow {
    id: i32,
    name: String,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for UserWithPassword {
    fn from(value: UserRow) -> Self {
        UserWithPassword {
            user: User {
                id: value.id,
                name: value.name,
                email: value.email,
                created_at: value.created_at,
            },
            password_hash: value.password_hash,
        }
    }
}

pub struct DbUserReader;

impl domain::user::driven_ports::UserReader for DbUserReader {
    async fn credentials_by_email(
        &self,
        email: &str,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<UserWithPassword>, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let user = sqlx::query_as::<_, UserRow>(
            "SELECT u.id, u.name, u.email, u.password_hash, u.created_at \
             FROM users u WHERE u.email = $1",
        )
        .bind(email)
        .fetch_optional(cxn.borrow_connection())
        .await
        .context("trying to fetch a user by email")?
        .map(UserWithPassword::from);

        Ok(user)
    }
}

pub struct DbUserWriter;

impl domain::user::driven_ports::UserWriter for DbUserWriter {
    async fn create_user(
        &self,
        user: &UserPersist,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<User, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let created_row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (name, email, password_hash) VALUES ($1, $2, $3) \
             RETURNING id, name, email, password_hash, created_at",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(cxn.borrow_connection())
        .await
        .context("trying to insert a new user into the database")?;

        Ok(UserWithPassword::from(created_row).user)
    }
}

pub struct DbUserDetector;

impl domain::user::driven_ports::DetectUser for DbUserDetector {
    async fn email_in_use(
        &self,
        email: &str,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<bool, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let in_use: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users u WHERE u.email = $1)")
                .bind(email)
                .fetch_one(cxn.borrow_connection())
                .await
                .context("checking whether an email is registered")?;

        Ok(in_use)
    }
}
