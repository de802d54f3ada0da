//! PropagationPolicy tools

use super::{call, cluster_client, manifest, names};
use kmcp_client::ClientProviders;
use kmcp_toolset::{Operation, ParamSpec, ToolSchema, Toolset};
use serde_json::Value;

const POLICY_API_VERSION: &str = "policy.karmada.io/v1alpha1";

const POLICY_EXAMPLE: &str = r#"propagationpolicy content which in form of yaml, one propagationpolicy yaml file likes:
apiVersion: policy.karmada.io/v1alpha1
kind: PropagationPolicy
metadata:
  name: nginx-propagation
spec:
  resourceSelectors:
    - apiVersion: apps/v1
      kind: Deployment
      name: nginx
  placement:
    clusterAffinity:
      clusterNames:
        - member1
        - member2
    replicaScheduling:
      replicaDivisionPreference: Weighted
      replicaSchedulingType: Divided
      weightPreference:
        staticWeightList:
          - targetCluster:
              clusterNames:
                - member1
            weight: 1
          - targetCluster:
              clusterNames:
                - member2
            weight: 1
"#;

pub fn toolset(providers: &ClientProviders) -> Toolset {
    Toolset::new("policy", "PropagationPolicy related tools")
        .add_read_tools([
            list_propagationpolicy(providers.clone()),
            get_propagationpolicy(providers.clone()),
        ])
        .add_write_tools([
            create_propagationpolicy(providers.clone()),
            delete_propagationpolicy(providers.clone()),
        ])
}

fn name_param() -> ParamSpec {
    ParamSpec::string("name")
        .required()
        .describe("name for propagationpolicy")
}

fn namespace_param() -> ParamSpec {
    ParamSpec::string("namespace")
        .required()
        .describe("name of namespace")
}

pub fn list_propagationpolicy(providers: ClientProviders) -> Operation {
    Operation::from_fn(
        "list_propagationpolicy",
        "List propagationpolicies under the specific namespace in the Karmada control-plane",
        ToolSchema::new().param(namespace_param()),
        move |ctx, args| {
            let providers = providers.clone();
            async move {
                let namespace = args.require_string("namespace")?;
                let client = cluster_client(&providers, &ctx).await?;
                let policies = call(&ctx, client.list_propagation_policies(namespace)).await?;
                Ok(names("propagationPolicies", &policies))
            }
        },
    )
}

pub fn get_propagationpolicy(providers: ClientProviders) -> Operation {
    Operation::from_fn(
        "get_propagationpolicy",
        "Get propagationpolicy detail under the specific namespace in the Karmada control-plane",
        ToolSchema::new().param(name_param()).param(namespace_param()),
        move |ctx, args| {
            let providers = providers.clone();
            async move {
                let name = args.require_string("name")?;
                let namespace = args.require_string("namespace")?;
                let client = cluster_client(&providers, &ctx).await?;
                call(&ctx, client.get_propagation_policy(namespace, name)).await
            }
        },
    )
}

pub fn create_propagationpolicy(providers: ClientProviders) -> Operation {
    Operation::from_fn(
        "create_propagationpolicy",
        "Create a propagationpolicy resources in the Karmada control-plane",
        ToolSchema::new()
            .param(name_param())
            .param(
                ParamSpec::string("namespace")
                    .required()
                    .describe("namespace for propagationpolicy"),
            )
            .param(ParamSpec::string("content").required().describe(POLICY_EXAMPLE)),
        move |ctx, args| {
            let providers = providers.clone();
            async move {
                let name = args.require_string("name")?;
                let namespace = args.require_string("namespace")?;
                let body = manifest(
                    args.require_string("content")?,
                    name,
                    namespace,
                    POLICY_API_VERSION,
                    "PropagationPolicy",
                )?;
                let client = cluster_client(&providers, &ctx).await?;
                call(&ctx, client.create_propagation_policy(namespace, body)).await
            }
        },
    )
}

pub fn delete_propagationpolicy(providers: ClientProviders) -> Operation {
    Operation::from_fn(
        "delete_propagationpolicy",
        "Delete propagationpolicy under the specific namespace in the Karmada control-plane",
        ToolSchema::new().param(name_param()).param(namespace_param()),
        move |ctx, args| {
            let providers = providers.clone();
            async move {
                let name = args.require_string("name")?;
                let namespace = args.require_string("namespace")?;
                let client = cluster_client(&providers, &ctx).await?;
                call(&ctx, client.delete_propagation_policy(namespace, name)).await?;
                Ok(Value::from("delete propagationpolicy success"))
            }
        },
    )
}
