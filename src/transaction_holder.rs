use std::ops::DerefMut;

use tokio::sync::Mutex;

use crate::{
    database_error::DatabaseError,
    sql::{
        connect::{DatabaseClient, DatabasePool, TransactionWrapper},
        sql_builder::SqlStyle,
        transaction::{TransactionScript, TransactionStepResult},
    },
};

/// Manages the state of one caller-visible transaction.
///
/// The implementation complexity comes from the requirement that the
/// transaction must be created lazily, on the first database operation that
/// runs under the handle, and finalized (committed or rolled back) explicitly
/// by the caller. A caller may register a transaction and then perform any
/// number of operations, or none at all, before finalizing.
#[derive(Default)]
pub struct TransactionHolder {
    state: Mutex<TransactionState>,
}

#[derive(Default)]
struct TransactionState {
    client: Option<DatabaseClient>,
    transaction: Option<TransactionWrapper<'static>>,
    finalized: bool,
}

impl TransactionHolder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute a script within this transaction, starting the transaction on
    /// first use.
    pub(crate) async fn with_tx(
        &self,
        pool: &DatabasePool,
        style: SqlStyle,
        work: TransactionScript,
    ) -> Result<TransactionStepResult, DatabaseError> {
        let mut state = self.state.lock().await;

        if state.finalized {
            return Err(DatabaseError::Transaction(
                "Transaction already finalized".to_string(),
            ));
        }

        state.ensure_client(pool).await?;

        let tx = state.ensure_transaction().await?;
        work.execute(style, tx.deref_mut()).await
    }

    /// Finalize the transaction (commit or rollback based on the parameter).
    /// A holder that never executed anything finalizes as a no-op.
    pub async fn finalize(&self, commit: bool) -> Result<(), DatabaseError> {
        let mut state = self.state.lock().await;
        if commit {
            state.commit().await
        } else {
            state.rollback().await
        }
    }
}

impl TransactionState {
    async fn ensure_client(&mut self, pool: &DatabasePool) -> Result<(), DatabaseError> {
        if self.client.is_none() && !self.finalized {
            self.client = Some(pool.get_client().await?);
        }
        Ok(())
    }

    async fn ensure_transaction(
        &mut self,
    ) -> Result<&mut TransactionWrapper<'static>, DatabaseError> {
        if self.finalized {
            return Err(DatabaseError::Transaction(
                "Transaction already finalized".to_string(),
            ));
        }

        match self.transaction {
            Some(ref mut tx) => Ok(tx),
            None => match self.client {
                Some(ref mut client) => {
                    let tx = client.transaction().await?;

                    // SAFETY: This lifetime extension is safe because:
                    // 1. The TransactionWrapper<'_> borrows from the DatabaseClient (see DatabaseClient::transaction)
                    // 2. Both the client and transaction are stored in the same struct (TransactionState)
                    // 3. All fields of TransactionState and TransactionHolder are private, thus their access is only in this module
                    // 4. The transaction is only accessed through methods that ensure the client is still alive
                    // 5. Both are protected by the same Mutex<TransactionState> ensuring exclusive access
                    // 6. The transaction is always dropped before or with the client in commit/rollback
                    // 7. The 'static lifetime here is for the type system, but the actual lifetime
                    //    is managed by the containing struct which ensures memory safety
                    let tx_static: TransactionWrapper<'static> = unsafe { std::mem::transmute(tx) };

                    self.transaction = Some(tx_static);
                    Ok(self.transaction.as_mut().unwrap())
                }
                None => Err(DatabaseError::Transaction(
                    "No database client available".to_string(),
                )),
            },
        }
    }

    async fn commit(&mut self) -> Result<(), DatabaseError> {
        if let Some(tx) = self.transaction.take() {
            tx.commit().await?;
        }
        self.finalized = true;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DatabaseError> {
        if let Some(tx) = self.transaction.take() {
            tx.rollback().await?;
        }
        self.finalized = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn finalized_state_consistency() {
        let holder = TransactionHolder::new();

        assert!(!holder.state.lock().await.finalized);

        // Finalizing without any database work succeeds and marks the holder
        holder.finalize(true).await.unwrap();
        assert!(holder.state.lock().await.finalized);
    }

    #[tokio::test]
    async fn rejects_work_after_finalize() {
        let holder = TransactionHolder::new();
        holder.finalize(false).await.unwrap();

        let mut state = holder.state.lock().await;
        let err = state.ensure_transaction().await.unwrap_err();
        assert!(matches!(err, DatabaseError::Transaction(_)));
    }
}
