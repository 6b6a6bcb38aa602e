use super::EntityIndex;

/// A reusable fragment of input text.
///
/// Nodes are the unit of pattern decomposition. A node with a position only
/// matches when its fragment starts at exactly that byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub index: EntityIndex,
    pub fragment: String,
    pub position: Option<u32>,
    /// Best (lowest) rank of any signature containing this node
    pub rank: u32,
    /// Signatures containing this node, ascending
    pub signatures: Vec<EntityIndex>,
}

impl Node {
    /// Length of the fragment in bytes.
    pub fn len(&self) -> usize {
        self.fragment.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragment.is_empty()
    }

    /// Whether the fragment may start at byte offset `start`.
    pub fn allows_start(&self, start: usize) -> bool {
        self.position.map_or(true, |position| position as usize == start)
    }
}
