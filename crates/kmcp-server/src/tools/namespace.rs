//! Namespace tools

use super::{call, names, workload_client};
use kmcp_client::ClientProviders;
use kmcp_toolset::{Operation, ParamSpec, ToolSchema, Toolset};
use serde_json::Value;

pub fn toolset(providers: &ClientProviders) -> Toolset {
    Toolset::new("namespace", "Namespace related tools")
        .add_read_tools([list_namespace(providers.clone())])
        .add_write_tools([create_namespace(providers.clone())])
}

pub fn list_namespace(providers: ClientProviders) -> Operation {
    Operation::from_fn(
        "list_namespace",
        "Return all namespace resources in the Karmada control-plane",
        ToolSchema::new(),
        move |ctx, _args| {
            let providers = providers.clone();
            async move {
                let client = workload_client(&providers, &ctx).await?;
                let namespaces = call(&ctx, client.list_namespaces()).await?;
                Ok(names("namespaces", &namespaces))
            }
        },
    )
}

pub fn create_namespace(providers: ClientProviders) -> Operation {
    Operation::from_fn(
        "create_namespace",
        "Create a namespace resources in the Karmada control-plane",
        ToolSchema::new()
            .param(
                ParamSpec::string("name")
                    .required()
                    .describe("name for the namespace"),
            )
            .param(
                ParamSpec::boolean("skipAutoPropagation")
                    .required()
                    .describe("whether to skip propagating the namespace to member clusters automatically"),
            ),
        move |ctx, args| {
            let providers = providers.clone();
            async move {
                let name = args.require_string("name")?;
                let skip = args.require_boolean("skipAutoPropagation")?;
                let client = workload_client(&providers, &ctx).await?;
                call(&ctx, client.create_namespace(name, skip)).await?;
                Ok(Value::from("create namespace success"))
            }
        },
    )
}
