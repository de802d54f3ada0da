//! Deployment tools

use super::{call, manifest, names, workload_client};
use kmcp_client::ClientProviders;
use kmcp_toolset::{Operation, ParamSpec, ToolSchema, Toolset};

pub fn toolset(providers: &ClientProviders) -> Toolset {
    Toolset::new("deployment", "Deployment related tools")
        .add_read_tools([list_deployment(providers.clone())])
        .add_write_tools([create_deployment(providers.clone())])
}

pub fn list_deployment(providers: ClientProviders) -> Operation {
    Operation::from_fn(
        "list_deployment",
        "List deployments under the specific namespace in the Karmada control-plane",
        ToolSchema::new().param(
            ParamSpec::string("namespace")
                .required()
                .describe("name of namespace"),
        ),
        move |ctx, args| {
            let providers = providers.clone();
            async move {
                let namespace = args.require_string("namespace")?;
                let client = workload_client(&providers, &ctx).await?;
                let deployments = call(&ctx, client.list_deployments(namespace)).await?;
                Ok(names("deployments", &deployments))
            }
        },
    )
}

pub fn create_deployment(providers: ClientProviders) -> Operation {
    Operation::from_fn(
        "create_deployment",
        "Create a deployment resources in the Karmada control-plane",
        ToolSchema::new()
            .param(
                ParamSpec::string("name")
                    .required()
                    .describe("name for deployment"),
            )
            .param(
                ParamSpec::string("namespace")
                    .required()
                    .describe("namespace for deployment"),
            )
            .param(
                ParamSpec::string("content")
                    .required()
                    .describe("deployment content which in form of yaml"),
            ),
        move |ctx, args| {
            let providers = providers.clone();
            async move {
                let name = args.require_string("name")?;
                let namespace = args.require_string("namespace")?;
                let body = manifest(
                    args.require_string("content")?,
                    name,
                    namespace,
                    "apps/v1",
                    "Deployment",
                )?;
                let client = workload_client(&providers, &ctx).await?;
                call(&ctx, client.create_deployment(namespace, body)).await
            }
        },
    )
}
