//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresSampleRepository` - Samples with version-guarded commits
//! - `PostgresResultReader` - Existence of analysis results
//! - `PostgresDeviceTokenRepository` - Push addresses
//! - `PostgresNotificationRepository` - Notification records
//! - `PostgresAuditLogger` - Append-only audit table
//!
//! Schema lives in `migrations/`; see [`run_migrations`].

mod audit_logger;
mod device_token_repository;
mod notification_repository;
mod result_reader;
mod sample_repository;

pub use audit_logger::PostgresAuditLogger;
pub use device_token_repository::PostgresDeviceTokenRepository;
pub use notification_repository::PostgresNotificationRepository;
pub use result_reader::PostgresResultReader;
pub use sample_repository::PostgresSampleRepository;

use sqlx::PgPool;

use crate::domain::foundation::{ClientRef, DomainError, ErrorCode};

/// Applies the embedded migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DomainError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DomainError::database(format!("Migration failed: {}", e)))
}

/// Wraps a sqlx error with what was being attempted.
pub(crate) fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> DomainError {
    move |e| DomainError::database(format!("{}: {}", context, e))
}

/// A stored value that no longer decodes into the domain.
pub(crate) fn corrupt(what: impl Into<String>) -> DomainError {
    DomainError::new(ErrorCode::InternalError, format!("Corrupt row: {}", what.into()))
}

/// Splits references into (client ids, documents) for `= ANY($n)` filters.
pub(crate) fn split_refs(clients: &[ClientRef]) -> (Vec<String>, Vec<String>) {
    let mut ids = Vec::new();
    let mut documents = Vec::new();
    for client in clients {
        match client {
            ClientRef::ById(id) => ids.push(id.as_str().to_string()),
            ClientRef::ByDocument(doc) => documents.push(doc.clone()),
        }
    }
    (ids, documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ClientId;

    #[test]
    fn refs_are_split_by_kind() {
        let (ids, docs) = split_refs(&[
            ClientRef::ById(ClientId::new("c-1").unwrap()),
            ClientRef::ByDocument("900".into()),
        ]);
        assert_eq!(ids, vec!["c-1"]);
        assert_eq!(docs, vec!["900"]);
    }
}
