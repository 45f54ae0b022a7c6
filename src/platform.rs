//! Platform description
//!
//! The firmware agent, its channels and the conduit node are described by
//! the boot firmware as a tree of device nodes. Parsing that description is
//! the platform's job; this module only holds the parsed nodes and answers
//! the handful of lookups the transport needs during channel setup.

use heapless::{FnvIndexMap, String, Vec};

/// Reference from a channel or agent node to its mailbox node
pub const PROP_SHMEM: &str = "shmem";
/// Function id of the firmware entry point (u32)
pub const PROP_SMC_ID: &str = "smc-id";
/// Calling convention token on the conduit node
pub const PROP_METHOD: &str = "method";
/// Path of the node carrying the platform calling convention
pub const CONDUIT_NODE_PATH: &str = "/psci";

pub type NodePath = String<64>;
pub type PropName = String<16>;
pub type PropString = String<32>;

/// Stable handle of a node, used for cross references
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

/// Physical address range described by a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysRegion {
    pub base: u64,
    pub size: u64,
}

impl PhysRegion {
    pub const fn new(base: u64, size: u64) -> Self {
        Self { base, size }
    }

    /// One past the last byte, `None` on overflow
    pub fn end(&self) -> Option<u64> {
        self.base.checked_add(self.size)
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

/// Property value attached to a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropValue {
    U32(u32),
    Str(PropString),
    Ref(NodeId),
}

impl PropValue {
    /// String property, `None` if the text does not fit
    pub fn string(s: &str) -> Option<Self> {
        let mut value = PropString::new();
        value.push_str(s).ok()?;
        Some(Self::Str(value))
    }
}

fn prop_key(name: &str) -> Option<PropName> {
    let mut key = PropName::new();
    key.push_str(name).ok()?;
    Some(key)
}

/// One described device or firmware node
#[derive(Debug, Clone)]
pub struct DeviceNode {
    pub id: NodeId,
    pub path: NodePath,
    pub regions: Vec<PhysRegion, 4>,
    pub properties: FnvIndexMap<PropName, PropValue, 16>,
}

impl DeviceNode {
    /// Create a node, `None` if the path is too long
    pub fn new(id: NodeId, path: &str) -> Option<Self> {
        let mut node_path = NodePath::new();
        node_path.push_str(path).ok()?;
        Some(Self {
            id,
            path: node_path,
            regions: Vec::new(),
            properties: FnvIndexMap::new(),
        })
    }

    /// Append an address range; false when the node is full
    pub fn add_region(&mut self, region: PhysRegion) -> bool {
        self.regions.push(region).is_ok()
    }

    /// Set a property; false when the name is too long or the table is full
    pub fn set_property(&mut self, name: &str, value: PropValue) -> bool {
        match prop_key(name) {
            Some(key) => self.properties.insert(key, value).is_ok(),
            None => false,
        }
    }

    pub fn property(&self, name: &str) -> Option<&PropValue> {
        self.properties.get(&prop_key(name)?)
    }

    pub fn read_u32(&self, name: &str) -> Option<u32> {
        match self.property(name)? {
            PropValue::U32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn read_string(&self, name: &str) -> Option<&str> {
        match self.property(name)? {
            PropValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn read_ref(&self, name: &str) -> Option<NodeId> {
        match self.property(name)? {
            PropValue::Ref(id) => Some(*id),
            _ => None,
        }
    }

    /// Address range at `index`, `None` if absent or empty
    pub fn address(&self, index: usize) -> Option<PhysRegion> {
        self.regions.get(index).copied().filter(|r| !r.is_empty())
    }
}

/// Maximum number of nodes in a platform description
pub const MAX_NODES: usize = 32;

/// The parsed platform description
#[derive(Debug, Clone, Default)]
pub struct PlatformTree {
    nodes: Vec<DeviceNode, MAX_NODES>,
}

impl PlatformTree {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Add a node; false when the tree is full or the id is taken
    pub fn add(&mut self, node: DeviceNode) -> bool {
        if self.find_by_id(node.id).is_some() {
            return false;
        }
        self.nodes.push(node).is_ok()
    }

    pub fn find_by_id(&self, id: NodeId) -> Option<&DeviceNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn find_by_path(&self, path: &str) -> Option<&DeviceNode> {
        self.nodes.iter().find(|n| n.path.as_str() == path)
    }

    /// Follow a reference property of `node` to the node it names
    pub fn parse_ref(&self, node: &DeviceNode, name: &str) -> Option<&DeviceNode> {
        self.find_by_id(node.read_ref(name)?)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
