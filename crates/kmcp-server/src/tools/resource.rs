//! Generic resource deletion

use super::{call, client_failure, workload_client};
use kmcp_client::{ClientProviders, ResourceKind, WorkloadClient};
use kmcp_toolset::{Operation, ParamSpec, ToolError, ToolSchema, Toolset};
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const WAIT_STEPS: u32 = 5;
const WAIT_INITIAL: Duration = Duration::from_millis(200);

pub fn toolset(providers: &ClientProviders) -> Toolset {
    Toolset::new("resource", "Generic resource tools")
        .add_write_tools([delete_unstructured_resource(providers.clone())])
}

pub fn delete_unstructured_resource(providers: ClientProviders) -> Operation {
    Operation::from_fn(
        "delete_unstructured_resource",
        "Delete unstructured resources in the Karmada control-plane",
        ToolSchema::new()
            .param(
                ParamSpec::string("namespace")
                    .describe("namespace for scoped resources, only required for namespace-scoped resources"),
            )
            .param(
                ParamSpec::string("kind")
                    .required()
                    .describe("resource kind in lower case"),
            )
            .param(ParamSpec::string("name").required().describe("resources name"))
            .param(
                ParamSpec::boolean("deleteNow")
                    .default_value(true)
                    .describe("delete immediately without a grace period"),
            ),
        move |ctx, args| {
            let providers = providers.clone();
            async move {
                let kind: ResourceKind = args
                    .require_string("kind")?
                    .parse()
                    .map_err(client_failure)?;
                let name = args.require_string("name")?;
                let namespace = args.string("namespace").filter(|ns| !ns.is_empty());
                let delete_now = args.boolean("deleteNow").unwrap_or(true);

                let client = workload_client(&providers, &ctx).await?;
                call(&ctx, client.delete_resource(kind, namespace, name, delete_now)).await?;
                wait_until_gone(&ctx, client.as_ref(), kind, namespace, name).await?;
                Ok(Value::from("delete resource success"))
            }
        },
    )
}

/// Poll with exponential backoff until the API server reports NotFound
async fn wait_until_gone(
    ctx: &CancellationToken,
    client: &dyn WorkloadClient,
    kind: ResourceKind,
    namespace: Option<&str>,
    name: &str,
) -> Result<(), ToolError> {
    let mut delay = WAIT_INITIAL;
    for attempt in 0..WAIT_STEPS {
        let lookup = tokio::select! {
            _ = ctx.cancelled() => return Err(ToolError::Cancelled),
            res = client.get_resource(kind, namespace, name) => res,
        };
        match lookup {
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(client_failure(e)),
            Ok(_) => debug!(%kind, %name, attempt, "Resource still present"),
        }
        tokio::select! {
            _ = ctx.cancelled() => return Err(ToolError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
        delay *= 2;
    }
    Err(ToolError::failed(format!(
        "{kind} still exists after {WAIT_STEPS} checks"
    )))
}
