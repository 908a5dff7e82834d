//! DNSRecord controller
//!
//! Watches DNSRecord resources (and, when operation annotations are ignored,
//! Cluster resources) and hands each request to the reconciler.

use std::sync::Arc;

use futures::StreamExt;
use kube::{
    api::ListParams,
    runtime::{
        controller::{Action, Controller},
        reflector::ObjectRef,
        watcher::Config as WatcherConfig,
    },
    Api, ResourceExt,
};
use tracing::{error, info, instrument};

use crate::controllers::Context;
use crate::crd::{Cluster, DNSRecord};
use crate::error::{Error, Result};

/// Run the DNSRecord controller
pub async fn run(context: Arc<Context>) {
    let client = context.client.clone();
    let api: Api<DNSRecord> = Api::all(client.clone());

    // Verify CRD is installed
    if let Err(e) = api.list(&ListParams::default().limit(1)).await {
        error!(error = %e, "DNSRecord CRD not installed");
        return;
    }

    info!("Starting DNSRecord controller");

    let mut controller = Controller::new(api, WatcherConfig::default());

    if context.reconciler.policy().ignore_operation_annotation {
        // Shoot state changes (failed, migrating) must reach every record of the shoot.
        let store = controller.store();
        let clusters: Api<Cluster> = Api::all(client.clone());
        controller = controller.watches(clusters, WatcherConfig::default(), move |cluster| {
            let namespace = cluster.name_any();
            store
                .state()
                .into_iter()
                .filter(|record| record.namespace().as_deref() == Some(namespace.as_str()))
                .map(|record| ObjectRef::from_obj(record.as_ref()))
                .collect::<Vec<_>>()
        });
    }

    controller
        .shutdown_on_signal()
        .run(reconcile, error_policy, context)
        .for_each(|result| async move {
            match result {
                Ok((obj, _action)) => {
                    info!(
                        name = %obj.name,
                        namespace = obj.namespace.as_deref().unwrap_or_default(),
                        "Reconciled DNSRecord"
                    );
                }
                Err(e) => {
                    error!(error = %e, "Reconciliation error");
                }
            }
        })
        .await;
}

/// Main reconciliation function
#[instrument(skip(obj, ctx), fields(name = %obj.name_any(), namespace = obj.namespace()))]
async fn reconcile(obj: Arc<DNSRecord>, ctx: Arc<Context>) -> Result<Action> {
    let namespace = obj.namespace().unwrap_or_default();
    ctx.reconciler.reconcile(&namespace, &obj.name_any()).await
}

/// Error policy for the controller
fn error_policy(obj: Arc<DNSRecord>, error: &Error, _ctx: Arc<Context>) -> Action {
    let requeue_after = error.requeue_after();
    error!(
        name = %obj.name_any(),
        error = %error,
        retryable = error.is_retryable(),
        requeue_after = ?requeue_after,
        "Reconciliation failed, scheduling retry"
    );

    Action::requeue(requeue_after)
}
