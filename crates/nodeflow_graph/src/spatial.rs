// SPDX-License-Identifier: MIT OR Apache-2.0
//! Uniform-grid spatial hash for hit testing.
//!
//! Entries are bucketed into square cells of `cell_size` world units. An entry
//! covering more than [`MAX_CELLS_PER_ENTRY`] cells is kept in a separate list
//! that every query scans, which bounds insertion cost for huge rectangles.

use crate::connection::Endpoint;
use crate::geometry::{Point, Rect};
use crate::graph::{Graph, ZOrder};
use crate::id::{ConnectionId, NodeId};
use std::collections::{HashMap, HashSet};

/// Default cell edge length in world units
pub const DEFAULT_CELL_SIZE: f32 = 128.0;

/// Entries spanning more cells than this are stored unbucketed
pub const MAX_CELLS_PER_ENTRY: usize = 1024;

type Cell = (i32, i32);

/// Indexed entity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKey {
    /// Node body
    Node(NodeId),
    /// Port anchor
    Port(Endpoint),
    /// Connection path bounds
    Connection(ConnectionId),
}

impl EntityKey {
    /// Node id, if this is a node
    pub fn as_node(&self) -> Option<&NodeId> {
        match self {
            Self::Node(id) => Some(id),
            _ => None,
        }
    }

    /// Endpoint, if this is a port
    pub fn as_port(&self) -> Option<&Endpoint> {
        match self {
            Self::Port(endpoint) => Some(endpoint),
            _ => None,
        }
    }

    /// Connection id, if this is a connection
    pub fn as_connection(&self) -> Option<&ConnectionId> {
        match self {
            Self::Connection(id) => Some(id),
            _ => None,
        }
    }
}

/// One result of [`SpatialIndex::query_point`]
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialHit {
    /// Entity hit
    pub key: EntityKey,
    /// Distance from the query point to the entry bounds (0 inside)
    pub distance: f32,
    /// Paint order of the entry
    pub z: ZOrder,
}

#[derive(Debug, Clone)]
struct Entry {
    bounds: Rect,
    z: ZOrder,
    cells: Option<Vec<Cell>>,
}

/// Occupied cell, for debug overlays
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellInfo {
    /// Cell rectangle in world units
    pub rect: Rect,
    /// Number of entries bucketed in the cell
    pub entries: usize,
}

/// Grid-bucketed index over nodes, ports and connections
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    cell_size: f32,
    cells: HashMap<Cell, Vec<EntityKey>>,
    oversized: HashSet<EntityKey>,
    entries: HashMap<EntityKey, Entry>,
    ports_by_node: HashMap<NodeId, Vec<Endpoint>>,
}

impl SpatialIndex {
    /// Create an empty index; non-positive cell sizes fall back to the default
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            DEFAULT_CELL_SIZE
        };
        Self {
            cell_size,
            cells: HashMap::new(),
            oversized: HashSet::new(),
            entries: HashMap::new(),
            ports_by_node: HashMap::new(),
        }
    }

    /// Cell edge length
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of indexed entities
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is indexed
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether an entity is indexed
    pub fn contains(&self, key: &EntityKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Indexed bounds of an entity
    pub fn bounds(&self, key: &EntityKey) -> Option<Rect> {
        self.entries.get(key).map(|e| e.bounds)
    }

    /// Insert an entity, replacing any previous entry under the same key.
    ///
    /// Bounds with non-finite coordinates are not indexed.
    pub fn insert(&mut self, key: EntityKey, bounds: Rect, z: ZOrder) {
        self.remove(&key);
        if !bounds.min.is_finite() || !bounds.max.is_finite() {
            tracing::warn!(?key, "refusing to index non-finite bounds");
            return;
        }
        let cells = self.cells_for(&bounds);
        match &cells {
            Some(cells) => {
                for cell in cells {
                    self.cells.entry(*cell).or_default().push(key.clone());
                }
            }
            None => {
                self.oversized.insert(key.clone());
            }
        }
        self.entries.insert(key, Entry { bounds, z, cells });
    }

    /// Move an entity (remove, then reinsert)
    pub fn update(&mut self, key: EntityKey, bounds: Rect, z: ZOrder) {
        self.insert(key, bounds, z);
    }

    /// Remove an entity; `false` when it was not indexed
    pub fn remove(&mut self, key: &EntityKey) -> bool {
        let Some(entry) = self.entries.remove(key) else {
            return false;
        };
        match entry.cells {
            Some(cells) => {
                for cell in cells {
                    if let Some(bucket) = self.cells.get_mut(&cell) {
                        bucket.retain(|k| k != key);
                        if bucket.is_empty() {
                            self.cells.remove(&cell);
                        }
                    }
                }
            }
            None => {
                self.oversized.remove(key);
            }
        }
        true
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.cells.clear();
        self.oversized.clear();
        self.entries.clear();
        self.ports_by_node.clear();
    }

    /// Entities within `tolerance` of `p`, nearest first; ties go to the higher z
    pub fn query_point(&self, p: Point, tolerance: f32) -> Vec<SpatialHit> {
        if !p.is_finite() {
            return Vec::new();
        }
        let tolerance = tolerance.max(0.0);
        let area = Rect::from_point(p).inflate(tolerance);
        let mut hits: Vec<SpatialHit> = self
            .candidates(&area)
            .into_iter()
            .filter_map(|key| {
                let entry = self.entries.get(key)?;
                let distance = entry.bounds.distance_to(p);
                (distance <= tolerance).then(|| SpatialHit {
                    key: key.clone(),
                    distance,
                    z: entry.z,
                })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then_with(|| b.z.cmp(&a.z)));
        hits
    }

    /// Entities whose bounds intersect `rect`
    pub fn query_rect(&self, rect: &Rect) -> HashSet<EntityKey> {
        self.candidates(rect)
            .into_iter()
            .filter(|key| self.entries.get(*key).is_some_and(|e| e.bounds.intersects(rect)))
            .cloned()
            .collect()
    }

    /// Occupied cells with their entry counts
    pub fn occupied_cells(&self) -> Vec<CellInfo> {
        let mut cells: Vec<CellInfo> = self
            .cells
            .iter()
            .map(|(&(cx, cy), bucket)| {
                let (x, y) = (cx as f32, cy as f32);
                CellInfo {
                    rect: Rect::from_points(
                        Point::new(x * self.cell_size, y * self.cell_size),
                        Point::new((x + 1.0) * self.cell_size, (y + 1.0) * self.cell_size),
                    ),
                    entries: bucket.len(),
                }
            })
            .collect();
        cells.sort_by(|a, b| {
            a.rect
                .min
                .y
                .total_cmp(&b.rect.min.y)
                .then_with(|| a.rect.min.x.total_cmp(&b.rect.min.x))
        });
        cells
    }

    /// Re-index a node body and its port anchors from the graph, or drop them
    /// if the node no longer exists
    pub fn sync_node(&mut self, graph: &Graph, node_id: &NodeId, port_outset: f32, port_radius: f32) {
        if let Some(old_ports) = self.ports_by_node.remove(node_id) {
            for endpoint in old_ports {
                self.remove(&EntityKey::Port(endpoint));
            }
        }
        let (Some(node), Some(z)) = (graph.node(node_id), graph.z_order(node_id)) else {
            self.remove(&EntityKey::Node(node_id.clone()));
            return;
        };

        self.insert(EntityKey::Node(node_id.clone()), node.bounds(), z);
        let mut endpoints = Vec::with_capacity(node.inputs.len() + node.outputs.len());
        for port in node.ports() {
            let Some(anchor) = node.anchor(&port.id, port_outset) else {
                continue;
            };
            let endpoint = Endpoint::new(node_id.clone(), port.id.clone());
            let bounds = Rect::from_point(anchor.point).inflate(port_radius);
            self.insert(EntityKey::Port(endpoint.clone()), bounds, z);
            endpoints.push(endpoint);
        }
        self.ports_by_node.insert(node_id.clone(), endpoints);
    }

    fn cell_of(&self, p: Point) -> Cell {
        (
            (p.x / self.cell_size).floor() as i32,
            (p.y / self.cell_size).floor() as i32,
        )
    }

    fn cells_for(&self, bounds: &Rect) -> Option<Vec<Cell>> {
        let (x0, y0) = self.cell_of(bounds.min);
        let (x1, y1) = self.cell_of(bounds.max);
        let columns = (i64::from(x1) - i64::from(x0) + 1) as usize;
        let rows = (i64::from(y1) - i64::from(y0) + 1) as usize;
        if columns.saturating_mul(rows) > MAX_CELLS_PER_ENTRY {
            return None;
        }
        let mut cells = Vec::with_capacity(columns * rows);
        for cy in y0..=y1 {
            for cx in x0..=x1 {
                cells.push((cx, cy));
            }
        }
        Some(cells)
    }

    fn candidates(&self, area: &Rect) -> HashSet<&EntityKey> {
        let mut found: HashSet<&EntityKey> = self.oversized.iter().collect();
        match self.cells_for(area) {
            Some(cells) => {
                for cell in cells {
                    if let Some(bucket) = self.cells.get(&cell) {
                        found.extend(bucket.iter());
                    }
                }
            }
            None => found.extend(self.entries.keys()),
        }
        found
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SIZE)
    }
}
