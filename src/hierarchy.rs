//! Parent/root/level forest over core uprns.
//!
//! The walk is iterative: each start node follows parent pointers until it
//! reaches a node that is already resolved, a root, a dangling pointer, or a
//! node already on the current path (a cycle). The path is then unwound in
//! reverse so every node on it is resolved exactly once.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::Uprn;

/// Resolved position of one uprn in the forest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub uprn: Uprn,
    /// Parent used for `root`/`level`; `None` for roots, including roots
    /// introduced by a dangling pointer or a broken cycle.
    pub parent: Option<Uprn>,
    /// Parent pointer as recorded by the winning core row.
    pub declared_parent: Option<Uprn>,
    pub root: Uprn,
    /// Distance from the root, 1-indexed.
    pub level: u32,
}

impl HierarchyNode {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Recoverable data-quality issue found while resolving the forest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HierarchyAnomaly {
    /// `uprn` points at a parent with no core record; `uprn` became a root.
    DanglingParent { uprn: Uprn, parent: Uprn },
    /// A parent cycle passed through `uprn`; it was made a root.
    HierarchyCycle { uprn: Uprn },
}

impl fmt::Display for HierarchyAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DanglingParent { uprn, parent } => {
                write!(f, "uprn {uprn} has dangling parent {parent}")
            }
            Self::HierarchyCycle { uprn } => write!(f, "parent cycle broken at uprn {uprn}"),
        }
    }
}

/// How a single walk stopped.
enum WalkEnd {
    /// Last node on the path has no parent.
    Root,
    /// Last node on the path points outside the mapping.
    Dangling(Uprn),
    /// Last node on the path points at an already-resolved node.
    Resolved(Uprn),
    /// Last node on the path points back at `path[index]`.
    Cycle(usize),
}

/// Immutable parent/root/level lookup for one run.
#[derive(Clone, Debug, Default)]
pub struct HierarchyForest {
    nodes: HashMap<Uprn, HierarchyNode>,
    anomalies: Vec<HierarchyAnomaly>,
}

impl HierarchyForest {
    /// Resolve every uprn in `pointers` (uprn -> declared parent).
    ///
    /// Walks start in ascending uprn order so anomalies are reported
    /// deterministically.
    pub fn build(pointers: &BTreeMap<Uprn, Option<Uprn>>) -> Self {
        let mut forest = Self {
            nodes: HashMap::with_capacity(pointers.len()),
            anomalies: Vec::new(),
        };
        let mut path: Vec<Uprn> = Vec::new();
        let mut on_path: HashMap<Uprn, usize> = HashMap::new();

        for &start in pointers.keys() {
            if forest.nodes.contains_key(&start) {
                continue;
            }
            path.clear();
            on_path.clear();

            let mut current = start;
            let end = loop {
                if forest.nodes.contains_key(&current) {
                    break WalkEnd::Resolved(current);
                }
                if let Some(&index) = on_path.get(&current) {
                    break WalkEnd::Cycle(index);
                }
                on_path.insert(current, path.len());
                path.push(current);
                match pointers.get(&current).copied().flatten() {
                    None => break WalkEnd::Root,
                    Some(parent) if !pointers.contains_key(&parent) => {
                        break WalkEnd::Dangling(parent);
                    }
                    Some(parent) => current = parent,
                }
            };
            forest.resolve_path(&path, end, pointers);
        }
        forest
    }

    fn resolve_path(
        &mut self,
        path: &[Uprn],
        end: WalkEnd,
        pointers: &BTreeMap<Uprn, Option<Uprn>>,
    ) {
        match end {
            WalkEnd::Resolved(anchor) => {
                if let Some(node) = self.nodes.get(&anchor).copied() {
                    self.attach(path.iter().rev(), node, pointers);
                }
            }
            WalkEnd::Root | WalkEnd::Dangling(_) => {
                let Some((&last, rest)) = path.split_last() else {
                    return;
                };
                if let WalkEnd::Dangling(parent) = end {
                    self.report(HierarchyAnomaly::DanglingParent { uprn: last, parent });
                }
                let root = self.insert_root(last, pointers);
                self.attach(rest.iter().rev(), root, pointers);
            }
            WalkEnd::Cycle(index) => {
                let repeated = path[index];
                self.report(HierarchyAnomaly::HierarchyCycle { uprn: repeated });
                let root = self.insert_root(repeated, pointers);
                // Cycle members hang off the repeated node in pointer order.
                self.attach(path[index + 1..].iter().rev(), root, pointers);
                // Nodes that led into the cycle point at `repeated` last.
                self.attach(path[..index].iter().rev(), root, pointers);
            }
        }
    }

    fn insert_root(&mut self, uprn: Uprn, pointers: &BTreeMap<Uprn, Option<Uprn>>) -> HierarchyNode {
        let node = HierarchyNode {
            uprn,
            parent: None,
            declared_parent: pointers.get(&uprn).copied().flatten(),
            root: uprn,
            level: 1,
        };
        self.nodes.insert(uprn, node);
        node
    }

    /// Resolve `chain` (ordered nearest-to-anchor first) beneath `anchor`.
    fn attach<'a>(
        &mut self,
        chain: impl Iterator<Item = &'a Uprn>,
        anchor: HierarchyNode,
        pointers: &BTreeMap<Uprn, Option<Uprn>>,
    ) {
        let mut parent = anchor;
        for &uprn in chain {
            let node = HierarchyNode {
                uprn,
                parent: Some(parent.uprn),
                declared_parent: pointers.get(&uprn).copied().flatten(),
                root: parent.root,
                level: parent.level + 1,
            };
            self.nodes.insert(uprn, node);
            parent = node;
        }
    }

    fn report(&mut self, anomaly: HierarchyAnomaly) {
        warn!("[ngd:hierarchy] {anomaly}; treating it as a root");
        self.anomalies.push(anomaly);
    }

    pub fn get(&self, uprn: Uprn) -> Option<&HierarchyNode> {
        self.nodes.get(&uprn)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn anomalies(&self) -> &[HierarchyAnomaly] {
        &self.anomalies
    }

    pub fn nodes(&self) -> impl Iterator<Item = &HierarchyNode> {
        self.nodes.values()
    }

    /// Deepest level in the forest (0 when empty).
    pub fn max_level(&self) -> u32 {
        self.nodes.values().map(|node| node.level).max().unwrap_or(0)
    }
}
