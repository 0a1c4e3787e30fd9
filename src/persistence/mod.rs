use crate::external_connections::{self, ConnectionHandle};
use anyhow::Context;
use sqlx::pool::PoolConnection;
use sqlx::{PgConnection, PgPool, Postgres};

pub mod db_category_driven_ports;
pub mod db_stats_driven_ports;
pub mod db_task_driven_ports;
pub mod db_user_driven_ports;

/// The real [ExternalConnectivity][external_connections::ExternalConnectivity],
/// backed by a PostgreSQL connection pool. Clones share the pool, so handing a
/// clone to a concurrent query costs nothing beyond the checkout.
#[derive(Clone)]
pub struct ExternalConnectivity {
    db: PgPool,
}

impl ExternalConnectivity {
    pub fn new(db: PgPool) -> ExternalConnectivity {
        ExternalConnectivity { db }
    }
}

pub struct PoolConnectionHandle {
    active_connection: PoolConnection<Postgres>,
}

impl ConnectionHandle for PoolConnectionHandle {
    fn borrow_connection(&mut self) -> &mut PgConnection {
        &mut self.active_connection
    }
}

impl external_connections::ExternalConnectivity for ExternalConnectivity {
    type Handle<'cxn>
        = PoolConnectionHandle
    where
        Self: 'cxn;

    async fn database_cxn(&mut self) -> Result<PoolConnectionHandle, anyhow::Error> {
        let handle = PoolConnectionHandle {
            active_connection: self
                .db
                .acquire()
                .await
                .context("checking a connection out of the database pool")?,
        };

        Ok(handle)
    }
}
