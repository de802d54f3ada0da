//! Toolset: a named group of operations split into read and write subsets

use crate::dispatch::RouterBuilder;
use crate::error::ConstructionError;
use crate::tool::Operation;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Toolset {
    name: String,
    description: String,
    enabled: bool,
    read_only: bool,
    read_tools: Vec<Arc<Operation>>,
    write_tools: Vec<Arc<Operation>>,
}

impl Toolset {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            enabled: false,
            read_only: false,
            read_tools: Vec::new(),
            write_tools: Vec::new(),
        }
    }

    pub fn add_read_tools<I>(mut self, ops: I) -> Self
    where
        I: IntoIterator<Item = Operation>,
    {
        self.read_tools.extend(ops.into_iter().map(Arc::new));
        self
    }

    pub fn add_write_tools<I>(mut self, ops: I) -> Self
    where
        I: IntoIterator<Item = Operation>,
    {
        self.write_tools.extend(ops.into_iter().map(Arc::new));
        self
    }

    /// Never expose write tools from this toolset. Cannot be undone.
    pub fn set_read_only(&mut self) {
        self.read_only = true;
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn read_tools(&self) -> &[Arc<Operation>] {
        &self.read_tools
    }

    pub fn write_tools(&self) -> &[Arc<Operation>] {
        &self.write_tools
    }

    /// Operations this toolset would expose if enabled
    pub fn get_available_operations(&self, global_read_only: bool) -> Vec<Arc<Operation>> {
        let mut ops = self.read_tools.clone();
        if !(self.read_only || global_read_only) {
            ops.extend(self.write_tools.iter().cloned());
        }
        ops
    }

    /// Live operations; empty while the toolset is disabled
    pub fn get_active_operations(&self, global_read_only: bool) -> Vec<Arc<Operation>> {
        if !self.enabled {
            return Vec::new();
        }
        self.get_available_operations(global_read_only)
    }

    /// Bind every live operation into the routing table
    pub fn register(
        &self,
        router: &mut RouterBuilder,
        global_read_only: bool,
    ) -> Result<usize, ConstructionError> {
        let ops = self.get_active_operations(global_read_only);
        let count = ops.len();
        for op in ops {
            router.insert(&self.name, op)?;
        }
        if count > 0 {
            debug!(toolset = %self.name, count, "Registered toolset operations");
        }
        Ok(count)
    }
}
