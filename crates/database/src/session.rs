//! Transactional sessions and the scoped unit-of-work contract.

use async_trait::async_trait;
use futures::future::BoxFuture;
use sqlx::postgres::{PgConnection, Postgres};
use sqlx::Transaction;
use std::ops::{Deref, DerefMut};
use uuid::Uuid;

use crate::error::DbError;

/// Something that can be finished exactly once, either by committing or by
/// rolling back. Dropping it unfinished must discard its changes and release
/// whatever it holds.
#[async_trait]
pub trait UnitOfWork: Send + Sized {
    async fn commit(self) -> Result<(), DbError>;
    async fn rollback(self) -> Result<(), DbError>;
}

/// One open transaction on one pooled connection.
///
/// Derefs to [`PgConnection`], so a `&mut Session` can be handed to any
/// repository method. If the session is dropped without [`Session::commit`]
/// or [`Session::rollback`] (early return, panic, cancelled future) the
/// transaction is rolled back and the connection goes back to the pool.
pub struct Session {
    id: Uuid,
    tx: Transaction<'static, Postgres>,
}

impl Session {
    pub(crate) fn new(tx: Transaction<'static, Postgres>) -> Self {
        let id = Uuid::new_v4();
        tracing::trace!(session = %id, "Session opened.");
        Self { id, tx }
    }

    /// Identifier used to correlate log lines for this session.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn commit(self) -> Result<(), DbError> {
        let id = self.id;
        self.tx.commit().await?;
        tracing::debug!(session = %id, "Session committed.");
        Ok(())
    }

    pub async fn rollback(self) -> Result<(), DbError> {
        let id = self.id;
        self.tx.rollback().await?;
        tracing::debug!(session = %id, "Session rolled back.");
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("id", &self.id).finish_non_exhaustive()
    }
}

impl Deref for Session {
    type Target = PgConnection;

    fn deref(&self) -> &PgConnection {
        &self.tx
    }
}

impl DerefMut for Session {
    fn deref_mut(&mut self) -> &mut PgConnection {
        &mut self.tx
    }
}

#[async_trait]
impl UnitOfWork for Session {
    async fn commit(self) -> Result<(), DbError> {
        Session::commit(self).await
    }

    async fn rollback(self) -> Result<(), DbError> {
        Session::rollback(self).await
    }
}

/// Runs `f` inside `uow`, committing if it returns `Ok` and rolling back if it
/// returns `Err`.
///
/// The caller's error is returned untouched. A failed commit is reported as
/// `E::from(DbError)`. A failed rollback is only logged, because the original
/// error is the one the caller needs; the connection is discarded either way.
///
/// `f` receives the unit of work by mutable reference and must return a boxed
/// future borrowing it, which means values it captures must be owned:
///
/// ```ignore
/// let booking = new_booking.clone();
/// manager
///     .with_session(move |session| {
///         Box::pin(async move { BookingRepository::create(session, &booking).await })
///     })
///     .await?;
/// ```
pub async fn scoped<U, T, E, F>(mut uow: U, f: F) -> Result<T, E>
where
    U: UnitOfWork,
    E: From<DbError>,
    F: for<'s> FnOnce(&'s mut U) -> BoxFuture<'s, Result<T, E>>,
{
    match f(&mut uow).await {
        Ok(value) => {
            uow.commit().await.map_err(E::from)?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = uow.rollback().await {
                tracing::warn!(error = %rollback_err, "Rollback failed after an error inside a session.");
            }
            Err(err)
        }
    }
}
