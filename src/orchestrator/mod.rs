//! Concurrent multi-client installation: for one (bundle, scope) batch,
//! every compatible client installs in parallel and one client's failure
//! never blocks another's.

use crate::asset::Asset;
use crate::bundle::Bundle;
use crate::client::{ClientRegistry, InstallContext, InstallItem, InstallStatus};
use crate::core::ClientId;
use crate::scope::Scope;
use std::collections::HashMap;

/// One asset, its opened bundle, and the scope it's being installed at.
pub struct PlannedInstall<'a> {
    /// The lock file declaration.
    pub asset: &'a Asset,
    /// The opened bundle.
    pub bundle: &'a Bundle,
    /// The concrete scope to install at.
    pub scope: Scope,
}

/// Per-client outcome of one orchestration pass.
pub struct ClientOutcome {
    /// Which client this is.
    pub client_id: ClientId,
    /// Per-asset results from that client's `install`.
    pub results: Vec<(String, InstallStatus)>,
}

/// Install every planned asset at its scope, on every client in
/// `client_ids` that both exists in `registry` and supports the asset's
/// kind. Clients run concurrently; assets for one client install as one
/// batch per scope, in the order planned.
pub async fn install_all(
    registry: &ClientRegistry,
    ctx: &InstallContext,
    client_ids: &[ClientId],
    planned: &[PlannedInstall<'_>],
) -> Vec<ClientOutcome> {
    // Group by (client, scope) so each client receives one batched `install`
    // call per scope rather than one call per asset.
    let mut by_client: HashMap<&ClientId, Vec<&PlannedInstall<'_>>> = HashMap::new();
    for id in client_ids {
        by_client.entry(id).or_default();
    }
    for plan in planned {
        for id in client_ids {
            let Some(client) = registry.get(id) else { continue };
            if client.supports_kind(plan.asset.kind) && plan.asset.matches_client(id) {
                by_client.get_mut(id).unwrap().push(plan);
            }
        }
    }

    let futures = by_client.into_iter().map(|(id, plans)| async move {
        let Some(client) = registry.get(id) else {
            return ClientOutcome { client_id: id.clone(), results: vec![] };
        };
        let mut by_scope: HashMap<Scope, Vec<InstallItem<'_>>> = HashMap::new();
        for plan in &plans {
            by_scope
                .entry(plan.scope.clone())
                .or_default()
                .push(InstallItem { asset: plan.asset, bundle: plan.bundle });
        }
        let mut results = Vec::new();
        for (scope, items) in by_scope {
            let response = client.install(ctx, &items, &scope).await;
            for r in response.results {
                results.push((r.asset_name, r.status));
            }
        }
        ClientOutcome { client_id: id.clone(), results }
    });

    futures::future::join_all(futures).await
}
