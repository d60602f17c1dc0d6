use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};

use crate::database::repository::RepositoryError;

/// One atomic transaction scope over a pooled connection.
///
/// Writes issued through [`UnitOfWork::conn`] become visible to other
/// connections only on [`UnitOfWork::commit`]. Dropping the value without
/// committing rolls everything back, including flushed writes.
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
    label: &'static str,
    flushes: u32,
}

impl UnitOfWork {
    pub async fn begin(pool: &SqlitePool, label: &'static str) -> Result<Self, RepositoryError> {
        let mut tx = pool.begin().await?;
        // Foreign keys are checked at flush and commit, not per statement.
        sqlx::query("PRAGMA defer_foreign_keys = ON")
            .execute(&mut *tx)
            .await?;
        tracing::debug!(scope = label, "unit of work started");
        Ok(Self { tx, label, flushes: 0 })
    }

    /// The scope's connection. Every read or write that belongs to the
    /// scope must go through it.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut *self.tx
    }

    /// Verifies pending writes against foreign keys without committing.
    ///
    /// Generated identities are already materialized by the insert itself,
    /// so after a flush they can be referenced by later writes in the scope.
    pub async fn flush(&mut self) -> Result<(), RepositoryError> {
        let violations: Vec<(String, Option<i64>, String, i64)> =
            sqlx::query_as("PRAGMA foreign_key_check")
                .fetch_all(&mut *self.tx)
                .await?;
        self.flushes += 1;

        if let Some((table, rowid, parent, _)) = violations.into_iter().next() {
            tracing::warn!(scope = self.label, %table, %parent, "flush found a dangling reference");
            return Err(RepositoryError::ForeignKeyViolation(format!(
                "{} row {} references a missing {} row",
                table,
                rowid.map(|id| id.to_string()).unwrap_or_else(|| "?".to_string()),
                parent
            )));
        }
        tracing::debug!(scope = self.label, flushes = self.flushes, "unit of work flushed");
        Ok(())
    }

    pub async fn commit(self) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        tracing::debug!(scope = self.label, "unit of work committed");
        Ok(())
    }

    pub async fn rollback(self) -> Result<(), RepositoryError> {
        self.tx.rollback().await?;
        tracing::debug!(scope = self.label, "unit of work rolled back");
        Ok(())
    }
}
