use std::ops::{Deref, DerefMut};

pub enum DatabaseClient {
    Pooled(deadpool_postgres::Client),
    Direct(tokio_postgres::Client),
}

impl Deref for DatabaseClient {
    type Target = tokio_postgres::Client;

    fn deref(&self) -> &Self::Target {
        match self {
            DatabaseClient::Pooled(client) => client,
            DatabaseClient::Direct(client) => client,
        }
    }
}

impl DerefMut for DatabaseClient {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            DatabaseClient::Pooled(client) => client,
            DatabaseClient::Direct(client) => client,
        }
    }
}

/// Abstracts over the transaction types the two client flavors return.
pub enum TransactionWrapper<'a> {
    Pooled(deadpool_postgres::Transaction<'a>),
    Direct(tokio_postgres::Transaction<'a>),
}

impl std::fmt::Debug for TransactionWrapper<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionWrapper::Pooled(_) => f.write_str("TransactionWrapper::Pooled"),
            TransactionWrapper::Direct(_) => f.write_str("TransactionWrapper::Direct"),
        }
    }
}

impl TransactionWrapper<'_> {
    pub async fn commit(self) -> Result<(), tokio_postgres::Error> {
        match self {
            TransactionWrapper::Pooled(tx) => tx.commit().await,
            TransactionWrapper::Direct(tx) => tx.commit().await,
        }
    }

    pub async fn rollback(self) -> Result<(), tokio_postgres::Error> {
        match self {
            TransactionWrapper::Pooled(tx) => tx.rollback().await,
            TransactionWrapper::Direct(tx) => tx.rollback().await,
        }
    }
}

impl<'a> Deref for TransactionWrapper<'a> {
    type Target = tokio_postgres::Transaction<'a>;

    fn deref(&self) -> &Self::Target {
        match self {
            TransactionWrapper::Pooled(tx) => tx,
            TransactionWrapper::Direct(tx) => tx,
        }
    }
}

impl DerefMut for TransactionWrapper<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            TransactionWrapper::Pooled(tx) => tx,
            TransactionWrapper::Direct(tx) => tx,
        }
    }
}

impl DatabaseClient {
    pub async fn transaction(
        &mut self,
    ) -> Result<TransactionWrapper<'_>, tokio_postgres::error::Error> {
        match self {
            DatabaseClient::Pooled(client) => {
                client.transaction().await.map(TransactionWrapper::Pooled)
            }
            DatabaseClient::Direct(client) => {
                client.transaction().await.map(TransactionWrapper::Direct)
            }
        }
    }
}
