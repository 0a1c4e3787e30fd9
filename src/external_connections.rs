use sqlx::PgConnection;

/// A handle to an active database connection. Holding one keeps the underlying
/// connection checked out until the handle is dropped.
pub trait ConnectionHandle {
    fn borrow_connection(&mut self) -> &mut PgConnection;
}

/// Provides access to services external to the application, currently just the
/// database. Domain services and persistence adapters accept an
/// `&mut impl ExternalConnectivity` rather than a pool so tests can substitute
/// a fake. Cloning is cheap (the real implementation wraps a connection pool),
/// and each clone can check out its own connection, which is how independent
/// read-only queries within a single request run concurrently.
pub trait ExternalConnectivity: Clone + Send + Sync {
    type Handle<'cxn>: ConnectionHandle + Send
    where
        Self: 'cxn;

    async fn database_cxn(&mut self) -> Result<Self::Handle<'_>, anyhow::Error>;
}
