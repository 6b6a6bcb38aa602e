use super::{out_of_range, EntityStore};
use crate::config::LoadMode;
use crate::entities::{EntityIndex, Node, Profile, Signature, Value};
use crate::error::Result;
use std::sync::Arc;

/// Every entity decoded at load time. No I/O after construction.
#[derive(Debug, Default)]
pub struct ResidentStore {
    values: Vec<Arc<Value>>,
    profiles: Vec<Arc<Profile>>,
    signatures: Vec<Arc<Signature>>,
    nodes: Vec<Arc<Node>>,
}

impl ResidentStore {
    pub fn new(
        values: Vec<Value>,
        profiles: Vec<Profile>,
        signatures: Vec<Signature>,
        nodes: Vec<Node>,
    ) -> Self {
        Self {
            values: values.into_iter().map(Arc::new).collect(),
            profiles: profiles.into_iter().map(Arc::new).collect(),
            signatures: signatures.into_iter().map(Arc::new).collect(),
            nodes: nodes.into_iter().map(Arc::new).collect(),
        }
    }
}

fn lookup<T>(items: &[Arc<T>], kind: &str, index: EntityIndex) -> Result<Arc<T>> {
    items
        .get(index as usize)
        .cloned()
        .ok_or_else(|| out_of_range(kind, index, items.len()))
}

impl EntityStore for ResidentStore {
    fn mode(&self) -> LoadMode {
        LoadMode::Resident
    }

    fn value(&self, index: EntityIndex) -> Result<Arc<Value>> {
        lookup(&self.values, "values", index)
    }

    fn profile(&self, index: EntityIndex) -> Result<Arc<Profile>> {
        lookup(&self.profiles, "profiles", index)
    }

    fn signature(&self, index: EntityIndex) -> Result<Arc<Signature>> {
        lookup(&self.signatures, "signatures", index)
    }

    fn node(&self, index: EntityIndex) -> Result<Arc<Node>> {
        lookup(&self.nodes, "nodes", index)
    }
}
