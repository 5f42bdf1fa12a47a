use std::collections::HashSet;
use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;
use vizport_db::entities::{port_assignments, port_reservations, running_containers};

use crate::error::SessionError;

/// A user's position in the lifecycle, materialized from whichever record
/// set currently holds them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Reserved(u16),
    Assigned(u16),
    Running(u16),
}

impl SessionState {
    pub fn port(&self) -> u16 {
        match *self {
            SessionState::Reserved(p) | SessionState::Assigned(p) | SessionState::Running(p) => p,
        }
    }
}

/// Transactional operations over the three record sets.
///
/// Every mutation runs inside a transaction so a crash mid-sequence
/// cannot leave a port claimed without a user record or vice versa. The
/// unique index on the port column of each table is the only
/// serialization mechanism between concurrent requests.
#[derive(Clone)]
pub struct SessionStore {
    db: Arc<DatabaseConnection>,
}

impl SessionStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn is_unique_violation(err: &DbErr) -> bool {
        matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
    }

    /// Atomically claims `port` for `user_id`. A lost race against a
    /// concurrent claimant surfaces as [`SessionError::Conflict`].
    pub async fn insert_reservation(&self, user_id: &str, port: u16) -> Result<(), SessionError> {
        let row = port_reservations::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id.to_string()),
            requested_port: Set(i32::from(port)),
            created_at: Set(chrono::Utc::now().into()),
        };
        match row.insert(&*self.db).await {
            Ok(_) => Ok(()),
            Err(e) if Self::is_unique_violation(&e) => Err(SessionError::Conflict),
            Err(e) => Err(e.into()),
        }
    }

    /// Consumes the user's reservation and replaces it with an
    /// assignment for the same port, in one transaction.
    pub async fn promote_to_assignment(&self, user_id: &str) -> Result<u16, SessionError> {
        let txn = self.db.begin().await?;

        let Some(reservation) = port_reservations::Entity::find()
            .filter(port_reservations::Column::UserId.eq(user_id))
            .one(&txn)
            .await?
        else {
            txn.rollback().await?;
            return Err(SessionError::NoPortReserved);
        };
        let port = reservation.requested_port;

        let assignment = port_assignments::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id.to_string()),
            port: Set(port),
            created_at: Set(chrono::Utc::now().into()),
        };
        match assignment.insert(&txn).await {
            Ok(_) => {}
            Err(e) if Self::is_unique_violation(&e) => {
                txn.rollback().await?;
                return Err(SessionError::Conflict);
            }
            Err(e) => return Err(e.into()),
        }

        port_reservations::Entity::delete_by_id(reservation.id)
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(port as u16)
    }

    /// Records a health-checked container, consuming any assignment or
    /// reservation the user still holds.
    pub async fn record_running(&self, user_id: &str, port: u16) -> Result<(), SessionError> {
        let txn = self.db.begin().await?;

        port_assignments::Entity::delete_many()
            .filter(port_assignments::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;
        port_reservations::Entity::delete_many()
            .filter(port_reservations::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;

        let row = running_containers::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id.to_string()),
            port: Set(i32::from(port)),
            created_at: Set(chrono::Utc::now().into()),
        };
        match row.insert(&txn).await {
            Ok(_) => {}
            Err(e) if Self::is_unique_violation(&e) => {
                txn.rollback().await?;
                return Err(SessionError::Conflict);
            }
            Err(e) => return Err(e.into()),
        }

        txn.commit().await?;
        Ok(())
    }

    /// Deletes the user's rows from all three sets. The only destructor;
    /// removing from every set at once guarantees no orphaned state.
    pub async fn clear_user(&self, user_id: &str) -> Result<(), SessionError> {
        let txn = self.db.begin().await?;

        port_assignments::Entity::delete_many()
            .filter(port_assignments::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;
        port_reservations::Entity::delete_many()
            .filter(port_reservations::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;
        running_containers::Entity::delete_many()
            .filter(running_containers::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(())
    }

    /// Assignment, then reservation, then running container; first match
    /// wins. A port may legitimately sit in any of the three depending on
    /// call ordering.
    pub async fn current_state(&self, user_id: &str) -> Result<Option<SessionState>, SessionError> {
        if let Some(row) = port_assignments::Entity::find()
            .filter(port_assignments::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
        {
            return Ok(Some(SessionState::Assigned(row.port as u16)));
        }

        if let Some(row) = port_reservations::Entity::find()
            .filter(port_reservations::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
        {
            return Ok(Some(SessionState::Reserved(row.requested_port as u16)));
        }

        if let Some(row) = running_containers::Entity::find()
            .filter(running_containers::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
        {
            return Ok(Some(SessionState::Running(row.port as u16)));
        }

        Ok(None)
    }

    /// Ports claimed anywhere: reservations, assignments, and running
    /// containers all count, so a port backing a live container is never
    /// re-issued.
    pub async fn busy_ports(&self) -> Result<HashSet<u16>, SessionError> {
        let mut busy = HashSet::new();

        for row in port_reservations::Entity::find().all(&*self.db).await? {
            busy.insert(row.requested_port as u16);
        }
        for row in port_assignments::Entity::find().all(&*self.db).await? {
            busy.insert(row.port as u16);
        }
        for row in running_containers::Entity::find().all(&*self.db).await? {
            busy.insert(row.port as u16);
        }

        Ok(busy)
    }

    /// Total records across the three sets. Bounded by the pool size as
    /// long as every mutation goes through this store.
    pub async fn count_held(&self) -> Result<u64, SessionError> {
        let reservations = port_reservations::Entity::find().count(&*self.db).await?;
        let assignments = port_assignments::Entity::find().count(&*self.db).await?;
        let running = running_containers::Entity::find().count(&*self.db).await?;
        Ok(reservations + assignments + running)
    }
}
