//! Parametric skeleton meshes.
//!
//! A [`Skeleton`] is a coarse quad mesh generated from a line network: one
//! *skeleton vertex* per network node plus generated *boundary vertices*
//! that give every branch its visual width. Topology is built once from the
//! network ([`Skeleton::from_network`]); geometry is recomputed in place
//! whenever a width parameter changes or a vertex is moved.
//!
//! The mesh itself is a plain [`HalfEdgeMesh`]; skeleton-specific state
//! (vertex roles, accumulated edit offsets, branch tags, widths) lives in
//! side tables on the `Skeleton` struct rather than in a mesh subclass.

mod geometry;
mod topology;

use std::collections::HashMap;

use nalgebra::{Point3, Vector3};

use crate::mesh::{HalfEdgeMesh, VertexId};

/// The role of a skeleton mesh vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexRole {
    /// A skeleton vertex copied from a joint node (network degree ≥ 2).
    Node,
    /// A skeleton vertex copied from a leaf node (network degree 1).
    Leaf,
    /// A generated boundary vertex.
    Boundary,
}

/// A coarse quad mesh over a line network, editable through width parameters
/// and per-vertex offsets.
#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    pub(crate) mesh: HalfEdgeMesh,
    pub(crate) roles: Vec<VertexRole>,
    pub(crate) transforms: Vec<Vector3<f64>>,
    /// Branch edges in creation order, one entry per undirected branch.
    pub(crate) branches: Vec<(VertexId, VertexId)>,
    /// Cyclic neighbor ring per skeleton vertex, copied from the network.
    pub(crate) rings: HashMap<VertexId, Vec<VertexId>>,
    node_width: f64,
    leaf_width: f64,
    leaf_extend: f64,
    sub_level: usize,
}

impl Skeleton {
    /// The underlying half-edge mesh.
    #[inline]
    pub fn mesh(&self) -> &HalfEdgeMesh {
        &self.mesh
    }

    /// The role of a mesh vertex.
    #[inline]
    pub fn role(&self, v: VertexId) -> VertexRole {
        self.roles[v.index()]
    }

    /// The accumulated edit offset of a mesh vertex.
    #[inline]
    pub fn transform(&self, v: VertexId) -> Vector3<f64> {
        self.transforms[v.index()]
    }

    /// Skeleton vertices split into `(joint nodes, leaves)`.
    pub fn skeleton_vertices(&self) -> (Vec<VertexId>, Vec<VertexId>) {
        let mut nodes = Vec::new();
        let mut leaves = Vec::new();
        for v in self.mesh.vertex_ids() {
            match self.role(v) {
                VertexRole::Node => nodes.push(v),
                VertexRole::Leaf => leaves.push(v),
                VertexRole::Boundary => {}
            }
        }
        (nodes, leaves)
    }

    /// Branch edges in creation order.
    #[inline]
    pub fn skeleton_branches(&self) -> &[(VertexId, VertexId)] {
        &self.branches
    }

    /// The branch width at joint nodes.
    #[inline]
    pub fn node_width(&self) -> f64 {
        self.node_width
    }

    /// Set the branch width at joint nodes.
    ///
    /// Call [`Skeleton::update_mesh_vertices`] afterwards to recompute
    /// positions.
    pub fn set_node_width(&mut self, width: f64) {
        self.node_width = width;
    }

    /// The branch width at leaves.
    #[inline]
    pub fn leaf_width(&self) -> f64 {
        self.leaf_width
    }

    /// Set the branch width at leaves.
    pub fn set_leaf_width(&mut self, width: f64) {
        self.leaf_width = width;
    }

    /// How far leaf end caps extend beyond their leaf, signed.
    #[inline]
    pub fn leaf_extend(&self) -> f64 {
        self.leaf_extend
    }

    /// Set the signed leaf end cap extension.
    pub fn set_leaf_extend(&mut self, extend: f64) {
        self.leaf_extend = extend;
    }

    pub(crate) fn set_widths(&mut self, node_width: f64, leaf_width: f64) {
        self.node_width = node_width;
        self.leaf_width = leaf_width;
    }

    /// The current subdivision depth.
    #[inline]
    pub fn sub_level(&self) -> usize {
        self.sub_level
    }

    /// Increase the subdivision depth by `k`.
    pub fn subdivide(&mut self, k: usize) {
        self.sub_level += k;
    }

    /// Decrease the subdivision depth by `k`, saturating at zero.
    pub fn merge(&mut self, k: usize) {
        self.sub_level = self.sub_level.saturating_sub(k);
    }

    /// Produce the dense mesh by applying a subdivision operator
    /// [`Skeleton::sub_level`] times.
    ///
    /// Subdivision itself is not part of this crate; the caller supplies the
    /// operator as `(mesh, iterations, fixed vertices) -> mesh`. Degree-2
    /// corner vertices are passed as fixed so end caps keep their corners.
    pub fn to_dense_mesh<F>(&self, subdivide: F) -> HalfEdgeMesh
    where
        F: Fn(&HalfEdgeMesh, usize, &[VertexId]) -> HalfEdgeMesh,
    {
        let corners: Vec<VertexId> = self
            .mesh
            .vertex_ids()
            .filter(|&v| self.mesh.vertex_degree(v) == 2)
            .collect();
        subdivide(&self.mesh, self.sub_level, &corners)
    }

    /// Add a vertex to the mesh, keeping the side tables in step.
    pub(crate) fn push_vertex(&mut self, position: Point3<f64>, role: VertexRole) -> VertexId {
        let id = self.mesh.add_vertex(position);
        self.roles.push(role);
        self.transforms.push(Vector3::zeros());
        id
    }
}
