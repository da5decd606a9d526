//! Transactional boundary for multi-statement mutations.

use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::debug;

use crate::types::ChatResult;

/// A single store transaction.
///
/// Statements issued through [`UnitOfWork::conn`] become visible together on
/// [`UnitOfWork::commit`]. Dropping the unit without committing rolls every
/// statement back, so an early `?` return never leaves a partial mutation.
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
    label: &'static str,
}

impl UnitOfWork {
    pub async fn begin(pool: &SqlitePool, label: &'static str) -> ChatResult<Self> {
        let tx = pool.begin().await?;
        debug!(unit = label, "unit of work started");
        Ok(Self { tx, label })
    }

    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    pub async fn commit(self) -> ChatResult<()> {
        self.tx.commit().await?;
        debug!(unit = self.label, "unit of work committed");
        Ok(())
    }

    pub async fn rollback(self) -> ChatResult<()> {
        self.tx.rollback().await?;
        debug!(unit = self.label, "unit of work rolled back");
        Ok(())
    }
}
