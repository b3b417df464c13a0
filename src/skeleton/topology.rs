//! Skeleton topology construction.
//!
//! Builds the quad-mesh topology from a network: skeleton vertices and
//! branches are copied in, then each directed branch halfedge receives two
//! generated boundary-vertex keys, its *start point* (`sp`, flanking the
//! origin) and *end point* (`ep`, flanking the destination), and one quad
//! face `[u, v, ep, sp]`.
//!
//! Around a joint the keys are allocated by walking the externally sorted
//! cyclic neighbor ring: one new key serves as the `sp` of halfedge `(u, v)`
//! and as the `ep` of the adjacent halfedge `(v_prev, u)`, so consecutive
//! quads share a corner and close into a non-overlapping ring. A leaf has no
//! previous neighbor to pair with and gets two distinct keys, the corners of
//! its flat end cap.
//!
//! Coordinates are not assigned here; every build finishes with a geometry
//! pass (`update_mesh_vertices`).

use std::collections::HashMap;

use nalgebra::Point3;

use crate::error::{Result, SkeletonError};
use crate::mesh::VertexId;
use crate::network::Network;

use super::{Skeleton, VertexRole};

/// Boundary-vertex keys assigned to one directed branch halfedge.
#[derive(Debug, Clone, Copy, Default)]
struct BoundaryKeys {
    sp: Option<VertexId>,
    ep: Option<VertexId>,
}

impl Skeleton {
    /// Build a skeleton from line segments.
    ///
    /// Shared endpoints are welded into network nodes; see
    /// [`Network::from_lines`].
    pub fn from_lines(lines: &[[Point3<f64>; 2]]) -> Result<Self> {
        Self::from_network(&Network::from_lines(lines))
    }

    /// Build a skeleton from a network.
    ///
    /// The network is read-only input: each joint's neighbor ring is taken
    /// in the network's stored cyclic order. Fails with
    /// [`SkeletonError::EmptyNetwork`] when the network has no edges; a
    /// single isolated node is built with [`Skeleton::from_center_point`]
    /// instead.
    pub fn from_network(network: &Network) -> Result<Self> {
        let mut skeleton = Skeleton::default();
        skeleton.build_from_network(network)?;
        Ok(skeleton)
    }

    /// Build the dome skeleton around a single isolated node.
    ///
    /// There are no branches to pair boundary vertices with; instead four
    /// auxiliary vertices surround the node and a fan of four triangles
    /// closes the cap.
    pub fn from_center_point(point: Point3<f64>) -> Result<Self> {
        let mut skeleton = Skeleton::default();

        let center = skeleton.push_vertex(point, VertexRole::Node);
        let ring: Vec<VertexId> = (0..4)
            .map(|_| skeleton.push_vertex(Point3::origin(), VertexRole::Boundary))
            .collect();

        for i in 0..4 {
            skeleton
                .mesh
                .add_face(&[center, ring[i], ring[(i + 1) % 4]]);
        }

        skeleton.update_mesh_vertices()?;
        Ok(skeleton)
    }

    /// Replace the skeleton lines, rebuilding the topology.
    ///
    /// Width parameters and the subdivision depth survive the rebuild;
    /// per-vertex edit offsets do not, since the vertex set is regenerated.
    pub fn update_skeleton_lines(&mut self, lines: &[[Point3<f64>; 2]]) -> Result<()> {
        let network = Network::from_lines(lines);

        self.mesh = Default::default();
        self.roles.clear();
        self.transforms.clear();
        self.branches.clear();
        self.rings.clear();

        self.build_from_network(&network)
    }

    fn build_from_network(&mut self, network: &Network) -> Result<()> {
        if network.num_edges() == 0 {
            return Err(SkeletonError::EmptyNetwork);
        }

        self.add_skeleton_vertices(network);
        self.add_skeleton_branches(network);

        // With zero width the mesh cannot be visualised; derive defaults
        // from the average branch length.
        if self.node_width() == 0.0 && self.leaf_width() == 0.0 {
            let total: f64 = self
                .branches
                .iter()
                .map(|&(u, v)| self.mesh.edge_length(u, v))
                .sum();
            let average = total / self.branches.len() as f64;
            self.set_widths(average * 0.4, average * 0.2);
        }

        let boundary = self.add_boundary_vertices(network);
        self.add_mesh_faces(&boundary)?;

        self.update_mesh_vertices()
    }

    /// Copy each network node into the mesh with its degree-derived role.
    ///
    /// Nodes are copied in id order, so `NodeId(i)` maps to `VertexId(i)`.
    fn add_skeleton_vertices(&mut self, network: &Network) {
        for n in network.nodes() {
            let role = if network.is_leaf(n) {
                VertexRole::Leaf
            } else {
                VertexRole::Node
            };
            self.push_vertex(network.position(n), role);
        }

        for n in network.nodes() {
            let ring: Vec<VertexId> = network
                .neighbors(n)
                .iter()
                .map(|nbr| VertexId::new(nbr.index()))
                .collect();
            self.rings.insert(VertexId::new(n.index()), ring);
        }
    }

    /// Copy the network's adjacency as face-less mesh halfedges.
    fn add_skeleton_branches(&mut self, network: &Network) {
        for (a, b) in network.edges() {
            let u = VertexId::new(a.index());
            let v = VertexId::new(b.index());
            self.mesh.add_edge(u, v);
            self.branches.push((u, v));
        }
    }

    /// Assign two boundary-vertex keys to each directed branch halfedge.
    fn add_boundary_vertices(
        &mut self,
        network: &Network,
    ) -> HashMap<(VertexId, VertexId), BoundaryKeys> {
        let mut boundary: HashMap<(VertexId, VertexId), BoundaryKeys> = HashMap::new();
        let (nodes, leaves) = self.skeleton_vertices();

        for u in nodes {
            let ring = self.rings[&u].clone();
            for (i, &v) in ring.iter().enumerate() {
                let prev = ring[(i + 1) % ring.len()];
                let key = self.push_vertex(Point3::origin(), VertexRole::Boundary);

                boundary.entry((u, v)).or_default().sp = Some(key);
                boundary.entry((prev, u)).or_default().ep = Some(key);
            }
        }

        for u in leaves {
            let v = self.rings[&u][0];
            let sp = self.push_vertex(Point3::origin(), VertexRole::Boundary);
            let ep = self.push_vertex(Point3::origin(), VertexRole::Boundary);

            boundary.entry((u, v)).or_default().sp = Some(sp);
            boundary.entry((v, u)).or_default().ep = Some(ep);
        }

        boundary
    }

    /// Emit one quad face per directed branch halfedge.
    fn add_mesh_faces(
        &mut self,
        boundary: &HashMap<(VertexId, VertexId), BoundaryKeys>,
    ) -> Result<()> {
        for i in 0..self.branches.len() {
            let (u, v) = self.branches[i];
            for (a, b) in [(u, v), (v, u)] {
                let keys = boundary
                    .get(&(a, b))
                    .copied()
                    .unwrap_or_default();
                let (sp, ep) = match (keys.sp, keys.ep) {
                    (Some(sp), Some(ep)) => (sp, ep),
                    _ => return Err(SkeletonError::MissingBoundaryKey { from: a, to: b }),
                };
                self.mesh.add_face(&[a, b, ep, sp]);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn y_lines() -> Vec<[Point3<f64>; 2]> {
        let o = Point3::origin();
        vec![
            [o, Point3::new(1.0, 0.0, 0.0)],
            [o, Point3::new(-0.5, 0.866, 0.0)],
            [o, Point3::new(-0.5, -0.866, 0.0)],
        ]
    }

    fn star_lines(k: usize) -> Vec<[Point3<f64>; 2]> {
        let o = Point3::origin();
        (0..k)
            .map(|i| {
                let angle = std::f64::consts::TAU * i as f64 / k as f64;
                [o, Point3::new(angle.cos(), angle.sin(), 0.0)]
            })
            .collect()
    }

    #[test]
    fn test_star_topology() {
        let k = 5;
        let skeleton = Skeleton::from_lines(&star_lines(k)).unwrap();

        let (nodes, leaves) = skeleton.skeleton_vertices();
        assert_eq!(nodes.len(), 1);
        assert_eq!(leaves.len(), k);
        assert_eq!(skeleton.skeleton_branches().len(), k);

        // One quad per directed branch halfedge, k joint-side keys shared
        // between consecutive quads, two distinct keys per leaf cap
        assert_eq!(skeleton.mesh().num_faces(), 2 * k);
        assert_eq!(skeleton.mesh().num_vertices(), 1 + k + k + 2 * k);

        for (_, face) in skeleton.mesh().faces() {
            assert_eq!(face.len(), 4);
        }
    }

    #[test]
    fn test_boundary_key_sharing() {
        let skeleton = Skeleton::from_lines(&y_lines()).unwrap();
        let mesh = skeleton.mesh();
        let joint = VertexId::new(0);

        let ring = skeleton.rings[&joint].clone();
        for (i, &v) in ring.iter().enumerate() {
            let prev = ring[(i + 1) % ring.len()];

            // sp of (joint, v) is the ep of the adjacent halfedge (prev, joint)
            let face_uv = mesh.require_halfedge_face(joint, v).unwrap();
            let face_prev = mesh.require_halfedge_face(prev, joint).unwrap();
            let sp = mesh.face_vertices(face_uv)[3];
            let ep = mesh.face_vertices(face_prev)[2];
            assert_eq!(sp, ep);
            assert_eq!(skeleton.role(sp), VertexRole::Boundary);
        }
    }

    #[test]
    fn test_leaf_keys_are_distinct() {
        let skeleton = Skeleton::from_lines(&y_lines()).unwrap();
        let mesh = skeleton.mesh();
        let joint = VertexId::new(0);

        let mut leaf_keys = Vec::new();
        let (_, leaves) = skeleton.skeleton_vertices();
        for leaf in leaves {
            let face_out = mesh.require_halfedge_face(leaf, joint).unwrap();
            let face_in = mesh.require_halfedge_face(joint, leaf).unwrap();
            let sp = mesh.face_vertices(face_out)[3];
            let ep = mesh.face_vertices(face_in)[2];
            assert_ne!(sp, ep);
            leaf_keys.push(sp);
            leaf_keys.push(ep);
        }

        // No leaf-side key is shared across halfedges
        let mut deduped = leaf_keys.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), leaf_keys.len());
    }

    #[test]
    fn test_branch_edges_are_tagged() {
        let skeleton = Skeleton::from_lines(&y_lines()).unwrap();
        for &(u, v) in skeleton.skeleton_branches() {
            assert_ne!(skeleton.role(u), VertexRole::Boundary);
            assert_ne!(skeleton.role(v), VertexRole::Boundary);
            assert!(skeleton.mesh().halfedge_id(u, v).is_some());
        }
    }

    #[test]
    fn test_default_widths_from_average_edge_length() {
        let skeleton = Skeleton::from_lines(&y_lines()).unwrap();
        assert!((skeleton.leaf_width() - 0.2).abs() < 1e-3);
        assert!((skeleton.node_width() - 0.4).abs() < 1e-3);
    }

    #[test]
    fn test_preset_widths_are_kept() {
        let mut skeleton = Skeleton::default();
        skeleton.set_node_width(3.0);
        skeleton
            .update_skeleton_lines(&y_lines())
            .unwrap();
        assert_eq!(skeleton.node_width(), 3.0);
        assert_eq!(skeleton.leaf_width(), 0.0);
    }

    #[test]
    fn test_dome_topology() {
        let skeleton = Skeleton::from_center_point(Point3::new(1.0, 2.0, 3.0)).unwrap();
        assert_eq!(skeleton.mesh().num_vertices(), 5);
        assert_eq!(skeleton.mesh().num_faces(), 4);
        for (_, face) in skeleton.mesh().faces() {
            assert_eq!(face.len(), 3);
        }
        assert!(skeleton.skeleton_branches().is_empty());
    }

    #[test]
    fn test_empty_network_rejected() {
        let mut network = Network::new();
        network.add_node(Point3::origin());
        assert!(matches!(
            Skeleton::from_network(&network),
            Err(SkeletonError::EmptyNetwork)
        ));
    }

    #[test]
    fn test_two_leaf_segment() {
        let lines = vec![[Point3::origin(), Point3::new(2.0, 0.0, 0.0)]];
        let skeleton = Skeleton::from_lines(&lines).unwrap();

        let (nodes, leaves) = skeleton.skeleton_vertices();
        assert!(nodes.is_empty());
        assert_eq!(leaves.len(), 2);
        // Two quads (one per direction) over four leaf cap corners
        assert_eq!(skeleton.mesh().num_faces(), 2);
        assert_eq!(skeleton.mesh().num_vertices(), 2 + 4);
    }
}
