//! Member cluster tools

use super::{call, cluster_client, names};
use kmcp_client::ClientProviders;
use kmcp_toolset::{Operation, ToolSchema, Toolset};

pub fn toolset(providers: &ClientProviders) -> Toolset {
    Toolset::new("cluster", "Karmada member cluster related tools")
        .add_read_tools([list_clusters(providers.clone())])
}

pub fn list_clusters(providers: ClientProviders) -> Operation {
    Operation::from_fn(
        "list_clusters",
        "List all clusters in the Karmada control plane.",
        ToolSchema::new(),
        move |ctx, _args| {
            let providers = providers.clone();
            async move {
                let client = cluster_client(&providers, &ctx).await?;
                let clusters = call(&ctx, client.list_clusters()).await?;
                Ok(names("clusters", &clusters))
            }
        },
    )
}
