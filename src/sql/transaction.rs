use tokio_postgres::{GenericClient, Row};
use tracing::{debug, error, instrument};

use crate::database_error::DatabaseError;

use super::{sql_builder::SqlStyle, sql_operation::SQLOperation, ExpressionBuilder, SQLBuilder, SQLValue};

/// Rows obtained from a SQL operation
pub type TransactionStepResult = Vec<Row>;

/// Sequence of SQL operations executed on one client, in order. A script with
/// more than one step must run inside a transaction so every step observes the
/// same snapshot.
#[derive(Default, Debug)]
pub struct TransactionScript {
    steps: Vec<TransactionStep>,
    returning: Option<TransactionStepId>,
}

/// Collection of results from steps in a transaction
pub struct TransactionContext {
    results: Vec<TransactionStepResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionStepId(pub usize);

impl TransactionContext {
    /// Returns the value of a column in a row from the given step id
    pub fn resolve_value(&self, step_id: TransactionStepId, row: usize, col: usize) -> SQLValue {
        self.results[step_id.0][row].get::<usize, SQLValue>(col)
    }

    /// Returns the number of rows in the result of the given step id
    pub fn row_count(&self, step_id: TransactionStepId) -> usize {
        self.results[step_id.0].len()
    }
}

impl TransactionScript {
    /// Adds a step to the transaction script and return the step id (which is
    /// just the index of the step in the script)
    pub fn add_step(&mut self, step: TransactionStep) -> TransactionStepId {
        let id = self.steps.len();
        self.steps.push(step);
        TransactionStepId(id)
    }

    /// Designate which step's rows the script yields. Without a designation
    /// the last step's rows are returned.
    pub fn set_returning(&mut self, step_id: TransactionStepId) {
        self.returning = Some(step_id);
    }

    pub fn needs_transaction(&self) -> bool {
        self.steps.len() > 1
    }

    #[instrument(name = "TransactionScript::execute", skip_all)]
    pub async fn execute(
        self,
        style: SqlStyle,
        client: &mut impl GenericClient,
    ) -> Result<TransactionStepResult, DatabaseError> {
        let mut transaction_context = TransactionContext { results: vec![] };

        for step in self.steps.into_iter() {
            let result = step.execute(style, client, &transaction_context).await?;
            transaction_context.results.push(result)
        }

        match self.returning {
            Some(step_id) => Ok(transaction_context.results.swap_remove(step_id.0)),
            None => transaction_context
                .results
                .into_iter()
                .last()
                .ok_or_else(|| DatabaseError::Transaction("empty transaction script".into())),
        }
    }
}

#[derive(Debug)]
pub enum TransactionStep {
    Concrete(ConcreteTransactionStep),
    Dynamic(DynamicTransactionStep),
}

impl TransactionStep {
    pub async fn execute(
        self,
        style: SqlStyle,
        client: &mut impl GenericClient,
        transaction_context: &TransactionContext,
    ) -> Result<TransactionStepResult, DatabaseError> {
        match self {
            Self::Concrete(step) => step.execute(style, client).await,
            Self::Dynamic(step) => {
                step.resolve(transaction_context)
                    .execute(style, client)
                    .await
            }
        }
    }
}

#[derive(Debug)]
pub struct ConcreteTransactionStep {
    pub operation: SQLOperation,
}

impl ConcreteTransactionStep {
    pub fn new(operation: SQLOperation) -> Self {
        Self { operation }
    }

    #[instrument(
        name = "ConcreteTransactionStep::execute",
        level = "trace",
        skip_all,
        fields(operation = ?self.operation)
    )]
    pub async fn execute(
        self,
        style: SqlStyle,
        client: &mut impl GenericClient,
    ) -> Result<TransactionStepResult, DatabaseError> {
        let mut sql_builder = SQLBuilder::new(style);
        self.operation.build(&mut sql_builder);
        let (stmt, params) = sql_builder.into_sql();

        let params: Vec<_> = params.iter().map(|p| p.as_pg()).collect();

        debug!("Executing SQL operation: {}", stmt);

        client.query(&stmt, &params[..]).await.map_err(|e| {
            error!("Failed to execute query: {e:?}");
            DatabaseError::Delegate(e).with_context("Database operation failed".into())
        })
    }
}

/// A step resolved at runtime from the results of the previous steps (e.g. an
/// update whose predicate is the set of ids a previous select produced).
pub struct DynamicTransactionStep {
    pub function: Box<dyn FnOnce(&TransactionContext) -> ConcreteTransactionStep + Send>,
}

impl DynamicTransactionStep {
    pub fn resolve(self, transaction_context: &TransactionContext) -> ConcreteTransactionStep {
        (self.function)(transaction_context)
    }
}

impl std::fmt::Debug for DynamicTransactionStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicTransactionStep").finish()
    }
}
