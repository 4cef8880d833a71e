//! Node identity and the symbolic node-name map.

use indexmap::IndexMap;

/// A circuit node, identified by a dense nonnegative index.
///
/// Index 0 is reserved for ground and is never assigned a row/column in
/// the MNA matrix. All other indices are 1-based; `NodeId::new(n).mna_index()`
/// gives the zero-based row/column of that node in the assembled system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// The implicit ground node.
    pub const GROUND: NodeId = NodeId(0);

    /// Construct a node id from its 1-based index. `0` denotes ground.
    pub fn new(index: u32) -> Self {
        NodeId(index)
    }

    pub fn is_ground(&self) -> bool {
        self.0 == 0
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// The zero-based row/column this node occupies in the MNA matrix,
    /// or `None` if this is the ground node (elided from the system).
    pub fn mna_index(&self) -> Option<usize> {
        if self.is_ground() {
            None
        } else {
            Some((self.0 - 1) as usize)
        }
    }
}

/// Maps symbolic node names to dense `NodeId`s, frozen once assembly begins.
///
/// Registration order determines the node index: the first non-"0"/"gnd"
/// name registered becomes node 1, and so on. Ground spellings ("0",
/// "gnd", "GND") all resolve to [`NodeId::GROUND`] without consuming an
/// index.
#[derive(Debug, Clone, Default)]
pub struct NodeMap {
    names: IndexMap<String, NodeId>,
    frozen: bool,
}

impl NodeMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_ground_name(name: &str) -> bool {
        matches!(name, "0" | "gnd" | "GND" | "ground")
    }

    /// Resolve a node name to a `NodeId`, registering it if unseen.
    ///
    /// Panics if called after [`NodeMap::freeze`]; the netlist loader is
    /// expected to resolve every node reference before assembly starts.
    pub fn resolve(&mut self, name: &str) -> NodeId {
        if Self::is_ground_name(name) {
            return NodeId::GROUND;
        }
        if let Some(&id) = self.names.get(name) {
            return id;
        }
        assert!(
            !self.frozen,
            "cannot register new node '{name}' after the node map is frozen"
        );
        let id = NodeId::new(self.names.len() as u32 + 1);
        self.names.insert(name.to_string(), id);
        id
    }

    /// Look up an already-registered node without creating it.
    pub fn get(&self, name: &str) -> Option<NodeId> {
        if Self::is_ground_name(name) {
            return Some(NodeId::GROUND);
        }
        self.names.get(name).copied()
    }

    /// Freeze the map so no further nodes may be registered.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Number of non-ground nodes registered.
    pub fn num_nodes(&self) -> usize {
        self.names.len()
    }

    /// Iterate over `(name, NodeId)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.names.iter().map(|(n, &id)| (n.as_str(), id))
    }

    /// Name for a node id, if it was registered through this map (ground
    /// always resolves to `"0"`).
    pub fn name_of(&self, id: NodeId) -> Option<&str> {
        if id.is_ground() {
            return Some("0");
        }
        self.names
            .iter()
            .find(|&(_, &v)| v == id)
            .map(|(k, _)| k.as_str())
    }
}
