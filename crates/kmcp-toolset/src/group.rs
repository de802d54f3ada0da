//! Toolset registry
//!
//! Owns every toolset, resolves which of them are enabled for this process
//! and builds the routing table from the result.
//!
//! Typical startup:
//!
//! ```ignore
//! let mut group = ToolsetGroup::new();
//! group.add_toolset(cluster_toolset)?;
//! group.resolve_enablement(&["all".to_string()], false)?;
//! let dispatcher = group.register_all()?;
//! ```

use crate::dispatch::{Dispatcher, RouterBuilder};
use crate::error::ConstructionError;
use crate::tool::Operation;
use crate::toolset::Toolset;
use std::sync::Arc;
use tracing::{debug, info};

/// Sentinel that enables every registered toolset
pub const ALL_TOOLSETS: &str = "all";

#[derive(Debug, Default)]
pub struct ToolsetGroup {
    toolsets: Vec<Toolset>,
    read_only: bool,
}

impl ToolsetGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_toolset(&mut self, toolset: Toolset) -> Result<(), ConstructionError> {
        if self.toolset(toolset.name()).is_some() {
            return Err(ConstructionError::DuplicateToolset(toolset.name().to_string()));
        }
        debug!(toolset = %toolset.name(), "Added toolset");
        self.toolsets.push(toolset);
        Ok(())
    }

    pub fn toolset(&self, name: &str) -> Option<&Toolset> {
        self.toolsets.iter().find(|t| t.name() == name)
    }

    pub fn toolsets(&self) -> impl Iterator<Item = &Toolset> {
        self.toolsets.iter()
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Decide which toolsets are live.
    ///
    /// Starts from a clean slate on every call. Unknown names fail the whole
    /// call and leave every toolset disabled.
    pub fn resolve_enablement<S: AsRef<str>>(
        &mut self,
        requested: &[S],
        read_only: bool,
    ) -> Result<(), ConstructionError> {
        for toolset in &mut self.toolsets {
            toolset.set_enabled(false);
        }
        self.read_only = read_only;

        let requested: Vec<&str> = requested
            .iter()
            .map(|s| s.as_ref().trim())
            .filter(|s| !s.is_empty())
            .collect();

        if requested.contains(&ALL_TOOLSETS) {
            for toolset in &mut self.toolsets {
                toolset.set_enabled(true);
            }
            info!(count = self.toolsets.len(), read_only, "Enabled all toolsets");
            return Ok(());
        }

        if let Some(unknown) = requested.iter().find(|name| self.toolset(name).is_none()) {
            return Err(ConstructionError::UnknownToolset(unknown.to_string()));
        }

        for toolset in &mut self.toolsets {
            if requested.contains(&toolset.name()) {
                toolset.set_enabled(true);
            }
        }
        info!(toolsets = ?requested, read_only, "Enabled toolsets");
        Ok(())
    }

    /// Live operations across every enabled toolset, in registration order
    pub fn active_operations(&self) -> Vec<Arc<Operation>> {
        self.toolsets
            .iter()
            .flat_map(|t| t.get_active_operations(self.read_only))
            .collect()
    }

    /// Build the routing table. Fails on the first name collision.
    pub fn register_all(&self) -> Result<Dispatcher, ConstructionError> {
        let mut router = RouterBuilder::new();
        for toolset in &self.toolsets {
            toolset.register(&mut router, self.read_only)?;
        }
        info!(operations = router.len(), "Routing table ready");
        Ok(router.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ToolSchema;
    use serde_json::json;

    fn op(name: &str) -> Operation {
        Operation::from_fn(name, "test op", ToolSchema::new(), |_ctx, _args| async {
            Ok(json!({}))
        })
    }

    fn sample_group() -> ToolsetGroup {
        let mut group = ToolsetGroup::new();
        group
            .add_toolset(Toolset::new("cluster", "Clusters").add_read_tools([op("list_clusters")]))
            .unwrap();
        group
            .add_toolset(
                Toolset::new("policy", "Propagation policies")
                    .add_read_tools([op("list_propagationpolicy"), op("get_propagationpolicy")])
                    .add_write_tools([
                        op("create_propagationpolicy"),
                        op("delete_propagationpolicy"),
                    ]),
            )
            .unwrap();
        group
    }

    fn active_names(group: &ToolsetGroup) -> Vec<String> {
        group
            .active_operations()
            .iter()
            .map(|o| o.name().to_string())
            .collect()
    }

    #[test]
    fn test_duplicate_toolset() {
        let mut group = sample_group();
        let err = group.add_toolset(Toolset::new("cluster", "again")).unwrap_err();
        assert_eq!(err, ConstructionError::DuplicateToolset("cluster".into()));
    }

    #[test]
    fn test_all_enables_everything() {
        let mut group = sample_group();
        group.resolve_enablement(&["all"], false).unwrap();
        assert!(group.toolsets().all(|t| t.is_enabled()));
        assert_eq!(group.active_operations().len(), 5);
    }

    #[test]
    fn test_unknown_toolset_enables_nothing() {
        let mut group = sample_group();
        let err = group
            .resolve_enablement(&["cluster", "unknown-name"], false)
            .unwrap_err();
        assert_eq!(err, ConstructionError::UnknownToolset("unknown-name".into()));
        assert!(group.toolsets().all(|t| !t.is_enabled()));
        assert!(group.active_operations().is_empty());
    }

    #[test]
    fn test_policy_read_only_scenario() {
        let mut group = sample_group();
        group.resolve_enablement(&["policy"], true).unwrap();
        assert_eq!(
            active_names(&group),
            vec!["list_propagationpolicy", "get_propagationpolicy"]
        );

        let dispatcher = group.register_all().unwrap();
        assert!(!dispatcher.contains("create_propagationpolicy"));
        assert_eq!(dispatcher.toolset_of("get_propagationpolicy"), Some("policy"));
    }

    #[test]
    fn test_resolution_starts_from_scratch() {
        let mut group = sample_group();
        group.resolve_enablement(&["all"], false).unwrap();
        group.resolve_enablement(&["cluster"], false).unwrap();
        assert_eq!(active_names(&group), vec!["list_clusters"]);
        assert!(!group.is_read_only());
    }

    #[test]
    fn test_enabling_more_never_shrinks_discovery() {
        let mut group = sample_group();
        group.resolve_enablement(&["policy"], false).unwrap();
        let before = active_names(&group);

        group.resolve_enablement(&["policy", "cluster"], false).unwrap();
        let after = active_names(&group);

        assert!(after.len() >= before.len());
        assert!(before.iter().all(|name| after.contains(name)));
    }

    #[test]
    fn test_register_all_rejects_collisions() {
        let mut group = sample_group();
        group
            .add_toolset(Toolset::new("legacy", "Old names").add_read_tools([op("list_clusters")]))
            .unwrap();
        group.resolve_enablement(&["all"], false).unwrap();

        let err = group.register_all().err().unwrap();
        assert_eq!(err.kind(), "duplicate_operation");
    }

    #[test]
    fn test_empty_request_enables_nothing() {
        let mut group = sample_group();
        group.resolve_enablement(&[" ", ""], false).unwrap();
        assert!(group.active_operations().is_empty());
    }
}
