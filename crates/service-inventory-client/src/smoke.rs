//! End-to-end exercise of every operation against an inventory.
//!
//! Records one throwaway service, activates it, and removes it again,
//! checking each step through list and get. Used by the CLI's `lifecycle`
//! command and by the integration tests.

use crate::client::{ClientError, ServiceInventoryClient};
use crate::model::{ServiceQuery, ServiceRecord, ServiceSpec, ServiceState};

/// Outcome of a successful lifecycle run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleReport {
    /// Record as returned by create (inactive)
    pub created: ServiceRecord,
    /// Record as returned by update (active)
    pub updated: ServiceRecord,
    /// Record fetched by id before deletion
    pub fetched: ServiceRecord,
}

/// Run create, list, update, list, get, delete and a final get that must fail.
///
/// `spec.state` is ignored: the service is created inactive and then
/// activated.
///
/// # Errors
///
/// Returns error if any operation fails or a step does not observe the
/// previous one.
pub async fn run_lifecycle(
    client: &ServiceInventoryClient,
    spec: &ServiceSpec,
) -> Result<LifecycleReport, LifecycleError> {
    let initial = spec.clone().with_state(ServiceState::Inactive);

    let created = client.create_service(&initial).await?;
    let id = created.id.clone().ok_or(LifecycleError::MissingId)?;
    tracing::info!(%id, "Created inactive service");

    let pair = ServiceQuery::default()
        .component(initial.component_name.as_str())
        .dependency(initial.dependency_name.as_str());

    ensure_listed(client, &pair, &id, ServiceState::Inactive).await?;

    let resend = created
        .to_spec()
        .unwrap_or(initial)
        .with_state(ServiceState::Active);
    let updated = client.update_service(&id, &resend).await?;
    tracing::info!(%id, state = ?updated.state, "Updated service state");

    ensure_listed(client, &pair, &id, ServiceState::Active).await?;

    let fetched = client.get_service(&id).await?;

    client.delete_service(&id, false).await?;
    tracing::info!(%id, "Deleted service");

    match client.get_service(&id).await {
        Ok(_) => return Err(LifecycleError::StillPresent { id }),
        Err(e @ ClientError::RequestFailure { .. }) => {
            tracing::info!(error = %e, "Get after delete failed as expected");
        }
        Err(e) => return Err(e.into()),
    }

    Ok(LifecycleReport {
        created,
        updated,
        fetched,
    })
}

async fn ensure_listed(
    client: &ServiceInventoryClient,
    pair: &ServiceQuery,
    id: &str,
    state: ServiceState,
) -> Result<(), LifecycleError> {
    let records = client.list_services(&pair.clone().state(Some(state))).await?;
    tracing::info!(count = records.len(), %state, "Services listed for pair");

    if records.iter().any(|r| r.id.as_deref() == Some(id)) {
        Ok(())
    } else {
        Err(LifecycleError::NotListed {
            id: id.to_string(),
            state,
        })
    }
}

/// Errors from a lifecycle run.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LifecycleError {
    /// An operation failed
    #[error(transparent)]
    Client(#[from] ClientError),
    /// Create returned a record without id
    #[error("server returned a service without id")]
    MissingId,
    /// A service was not found in the list for its state
    #[error("service {id} missing from {state} list")]
    NotListed {
        /// Service id
        id: String,
        /// State filter used
        state: ServiceState,
    },
    /// Get still found the service after deletion
    #[error("get after delete succeeded for {id}")]
    StillPresent {
        /// Service id
        id: String,
    },
}
