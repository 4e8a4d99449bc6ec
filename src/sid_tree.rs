//! Scoped identifier tree
//!
//! Mirrors the nesting of every element carrying an `id` or `sid`
//! attribute. Elements with `id` are also reachable directly by
//! `(document, id)`. A sid is only meaningful below its nearest ancestor,
//! so lookups search the descendants of a start node breadth-first and
//! never look at siblings or ancestors of it.
//!
//! Nodes are owned by the tree's arena; a node's children live exactly as
//! long as the tree itself.

use crate::error::{Error, Result};
use crate::model::{FileId, UniqueId};
use std::collections::{HashMap, HashSet, VecDeque};

/// Index of a node in a [`SidTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SidNodeId(usize);

/// What a sid tree node stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SidTarget {
    /// Scope only
    #[default]
    None,
    /// A whole object (node, joint, camera, ...)
    Object(UniqueId),
    /// A transformation of a node
    Transformation {
        /// Owning node
        node: UniqueId,
        /// Position in the node's transformation list
        index: usize,
    },
    /// One axis of a kinematics joint
    JointAxis {
        /// Owning joint
        joint: UniqueId,
        /// Position in the joint's primitive list
        index: usize,
    },
}

#[derive(Debug)]
struct SidNode {
    sid: Option<String>,
    children: Vec<SidNodeId>,
    target: SidTarget,
    instance: Option<(FileId, String)>,
}

/// Parsed sid address such as `node/rotateX.ANGLE` or `node/matrix(1)(2)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidAddress {
    /// Element id the address starts from, or `.` for the current scope
    pub id: String,
    /// Sids to descend through
    pub sids: Vec<String>,
    /// Member selection after `.`
    pub member: Option<String>,
    /// Array selections `(n)`
    pub indices: Vec<usize>,
}

impl SidAddress {
    /// Parse a target address
    pub fn parse(address: &str) -> Result<Self> {
        let address = address.trim();
        if address.is_empty() {
            return Err(Error::InvalidModel("empty sid address".to_string()));
        }

        let mut segments: Vec<&str> = address.split('/').collect();
        let last = segments.pop().unwrap_or_default();

        // Selection applies to the last segment only
        let (last_name, selection) = match last.find(['.', '(']) {
            Some(pos) => (&last[..pos], &last[pos..]),
            None => (last, ""),
        };

        let mut member = None;
        let mut indices = Vec::new();
        if let Some(rest) = selection.strip_prefix('.') {
            member = Some(rest.to_string());
        } else {
            let mut rest = selection;
            while let Some(open) = rest.strip_prefix('(') {
                let close = open.find(')').ok_or_else(|| {
                    Error::InvalidModel(format!("unbalanced '(' in sid address '{}'", address))
                })?;
                let index = open[..close].trim().parse::<usize>().map_err(|_| {
                    Error::parse_error_with_context("sid address index", &open[..close], "index")
                })?;
                indices.push(index);
                rest = &open[close + 1..];
            }
            if !rest.is_empty() {
                return Err(Error::InvalidModel(format!(
                    "trailing characters in sid address '{}'",
                    address
                )));
            }
        }

        segments.push(last_name);
        let id = segments[0].to_string();
        let sids = segments[1..].iter().map(|s| s.to_string()).collect();
        if id.is_empty() {
            return Err(Error::InvalidModel(format!(
                "sid address '{}' has no start element",
                address
            )));
        }

        Ok(Self {
            id,
            sids,
            member,
            indices,
        })
    }
}

/// Arena of sid scopes for one session
#[derive(Debug, Default)]
pub struct SidTree {
    nodes: Vec<SidNode>,
    ids: HashMap<(FileId, String), SidNodeId>,
}

impl SidTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node below `parent` (or as a root)
    pub fn create_node(
        &mut self,
        parent: Option<SidNodeId>,
        file_id: FileId,
        id: Option<&str>,
        sid: Option<&str>,
    ) -> SidNodeId {
        let index = SidNodeId(self.nodes.len());
        self.nodes.push(SidNode {
            sid: sid.map(str::to_string),
            children: Vec::new(),
            target: SidTarget::None,
            instance: None,
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(index);
        }
        if let Some(id) = id {
            self.ids.entry((file_id, id.to_string())).or_insert(index);
        }
        index
    }

    /// Set what a node stands for
    pub fn set_target(&mut self, node: SidNodeId, target: SidTarget) {
        self.nodes[node.0].target = target;
    }

    /// What a node stands for
    pub fn target(&self, node: SidNodeId) -> SidTarget {
        self.nodes[node.0].target
    }

    /// Let lookups below `node` continue into the element `(file, id)`
    ///
    /// Used for instances whose sids address into the instantiated element.
    pub fn link_instance(&mut self, node: SidNodeId, file_id: FileId, id: &str) {
        self.nodes[node.0].instance = Some((file_id, id.to_string()));
    }

    /// Node of the element with `id` in document `file_id`
    pub fn find_by_id(&self, file_id: FileId, id: &str) -> Option<SidNodeId> {
        self.ids.get(&(file_id, id.to_string())).copied()
    }

    /// Breadth-first search for `sid` in `start` and its descendants
    pub fn find_sid_from(&self, start: SidNodeId, sid: &str) -> Option<SidNodeId> {
        if self.nodes[start.0].sid.as_deref() == Some(sid) {
            return Some(start);
        }
        self.find_descendant(start, sid)
    }

    /// Breadth-first search for `sid` strictly below `start`
    fn find_descendant(&self, start: SidNodeId, sid: &str) -> Option<SidNodeId> {
        let mut queue = VecDeque::new();
        let mut visited = HashSet::new();
        visited.insert(start);
        self.enqueue_children(start, &mut queue);

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            if self.nodes[current.0].sid.as_deref() == Some(sid) {
                return Some(current);
            }
            self.enqueue_children(current, &mut queue);
        }
        None
    }

    fn enqueue_children(&self, node: SidNodeId, queue: &mut VecDeque<SidNodeId>) {
        let entry = &self.nodes[node.0];
        queue.extend(entry.children.iter().copied());
        if let Some((file_id, id)) = &entry.instance
            && let Some(linked) = self.find_by_id(*file_id, id)
        {
            queue.extend(self.nodes[linked.0].children.iter().copied());
        }
    }

    /// Resolve an address in document `file_id`
    ///
    /// `scope` is the node `.` refers to; addresses starting with `.`
    /// fail without one.
    pub fn resolve(
        &self,
        file_id: FileId,
        scope: Option<SidNodeId>,
        address: &SidAddress,
    ) -> Option<SidNodeId> {
        let mut current = if address.id == "." {
            scope?
        } else {
            self.find_by_id(file_id, &address.id)?
        };
        for sid in &address.sids {
            current = self.find_descendant(current, sid)?;
        }
        tracing::trace!(address = %address.id, sids = ?address.sids, "resolved sid address");
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ClassId;

    const FILE: FileId = FileId(0);

    fn uid(n: u64) -> UniqueId {
        UniqueId::new(ClassId::Node, n, FILE)
    }

    #[test]
    fn test_parse_member_address() {
        let addr = SidAddress::parse("Box/rotateX.ANGLE").unwrap();
        assert_eq!(addr.id, "Box");
        assert_eq!(addr.sids, vec!["rotateX".to_string()]);
        assert_eq!(addr.member.as_deref(), Some("ANGLE"));
        assert!(addr.indices.is_empty());
    }

    #[test]
    fn test_parse_index_address() {
        let addr = SidAddress::parse("Box/transform(1)(2)").unwrap();
        assert_eq!(addr.sids, vec!["transform".to_string()]);
        assert_eq!(addr.indices, vec![1, 2]);
        assert_eq!(addr.member, None);
    }

    #[test]
    fn test_parse_plain_and_invalid() {
        let addr = SidAddress::parse("Box").unwrap();
        assert!(addr.sids.is_empty());
        assert!(SidAddress::parse("").is_err());
        assert!(SidAddress::parse("Box/m(1").is_err());
        assert!(SidAddress::parse("Box/m(x)").is_err());
        assert!(SidAddress::parse("/a").is_err());
    }

    #[test]
    fn test_resolve_nested_sid() {
        let mut tree = SidTree::new();
        let scene = tree.create_node(None, FILE, Some("scene"), None);
        let node = tree.create_node(Some(scene), FILE, Some("arm"), Some("arm"));
        tree.set_target(node, SidTarget::Object(uid(1)));
        let rot = tree.create_node(Some(node), FILE, None, Some("rotZ"));
        tree.set_target(
            rot,
            SidTarget::Transformation {
                node: uid(1),
                index: 0,
            },
        );

        let addr = SidAddress::parse("arm/rotZ.ANGLE").unwrap();
        let found = tree.resolve(FILE, None, &addr).unwrap();
        assert_eq!(
            tree.target(found),
            SidTarget::Transformation {
                node: uid(1),
                index: 0
            }
        );
    }

    #[test]
    fn test_sid_not_visible_to_siblings() {
        let mut tree = SidTree::new();
        let root = tree.create_node(None, FILE, Some("root"), None);
        let a = tree.create_node(Some(root), FILE, Some("a"), None);
        let b = tree.create_node(Some(root), FILE, Some("b"), None);
        tree.create_node(Some(b), FILE, None, Some("t"));

        assert!(tree.find_sid_from(a, "t").is_none());
        assert!(tree.find_sid_from(b, "t").is_some());
        assert!(tree.find_sid_from(root, "t").is_some());
    }

    #[test]
    fn test_breadth_first_prefers_nearest() {
        let mut tree = SidTree::new();
        let root = tree.create_node(None, FILE, Some("root"), None);
        let deep_parent = tree.create_node(Some(root), FILE, None, Some("x"));
        let deep = tree.create_node(Some(deep_parent), FILE, None, Some("j"));
        let shallow = tree.create_node(Some(root), FILE, None, Some("j"));

        assert_eq!(tree.find_sid_from(root, "j"), Some(shallow));
        assert_ne!(tree.find_sid_from(root, "j"), Some(deep));
    }

    #[test]
    fn test_find_sid_includes_start() {
        let mut tree = SidTree::new();
        let joint = tree.create_node(None, FILE, Some("hip"), Some("hip"));
        assert_eq!(tree.find_sid_from(joint, "hip"), Some(joint));
    }

    #[test]
    fn test_instance_link_is_followed() {
        let mut tree = SidTree::new();
        let model = tree.create_node(None, FILE, Some("kmodel"), None);
        let joint = tree.create_node(Some(model), FILE, None, Some("joint0"));
        let kscene = tree.create_node(None, FILE, Some("kscene"), None);
        let inst = tree.create_node(Some(kscene), FILE, None, Some("inst"));
        tree.link_instance(inst, FILE, "kmodel");

        let addr = SidAddress::parse("kscene/inst/joint0").unwrap();
        assert_eq!(tree.resolve(FILE, None, &addr), Some(joint));
    }

    #[test]
    fn test_ids_are_per_file() {
        let mut tree = SidTree::new();
        tree.create_node(None, FileId(0), Some("n"), None);
        assert!(tree.find_by_id(FileId(0), "n").is_some());
        assert!(tree.find_by_id(FileId(1), "n").is_none());
    }

    #[test]
    fn test_dot_requires_scope() {
        let mut tree = SidTree::new();
        let scope = tree.create_node(None, FILE, None, None);
        let child = tree.create_node(Some(scope), FILE, None, Some("c"));
        let addr = SidAddress::parse("./c").unwrap();
        assert_eq!(tree.resolve(FILE, None, &addr), None);
        assert_eq!(tree.resolve(FILE, Some(scope), &addr), Some(child));
    }
}
