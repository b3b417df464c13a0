//! Branch pipe meshes.
//!
//! A [`PipeMesh`] wraps every branch of a network in a polygonal tube and
//! closes each joint with a convex-hull socket. Per directed halfbranch one
//! cross-section ring is generated perpendicular to the branch; opposite
//! rings of a branch are bridged with quads, and at every joint the rings of
//! the converging branches are hulled together, dropping the faces that lie
//! inside a single ring so the tubes stay open into the socket.
//!
//! Rings near a joint are pulled back along the branch by a buffer distance
//! derived from the tightest branch-pair angle, so neighboring tubes clear
//! each other before the socket takes over.

use std::collections::HashMap;
use std::f64::consts::{PI, TAU};

use nalgebra::{Point3, Rotation3, Vector3};

use crate::error::{Result, SkeletonError};
use crate::hull::convex_hull;
use crate::mesh::{HalfEdgeMesh, VertexId};
use crate::network::{Network, NodeId};

const AXIS_EPSILON: f64 = 1e-9;

/// Options for building a pipe mesh.
#[derive(Debug, Clone)]
pub struct PipeOptions {
    /// Radius of the branch tubes.
    pub branch_radius: f64,

    /// Scale applied to the computed joint buffer distance.
    pub node_radius_factor: f64,

    /// Number of vertices per cross-section ring.
    pub section_segments: usize,
}

impl PipeOptions {
    /// Set the branch tube radius.
    pub fn with_branch_radius(mut self, radius: f64) -> Self {
        self.branch_radius = radius;
        self
    }

    /// Set the joint buffer scale.
    pub fn with_node_radius_factor(mut self, factor: f64) -> Self {
        self.node_radius_factor = factor;
        self
    }

    /// Set the number of vertices per cross-section ring.
    pub fn with_section_segments(mut self, segments: usize) -> Self {
        self.section_segments = segments;
        self
    }
}

impl Default for PipeOptions {
    fn default() -> Self {
        Self {
            branch_radius: 1.0,
            node_radius_factor: 1.0,
            section_segments: 4,
        }
    }
}

/// A tube-and-socket mesh over a whole network.
#[derive(Debug, Clone)]
pub struct PipeMesh {
    mesh: HalfEdgeMesh,
    /// Ring keys per directed halfbranch, one ring at the origin end.
    sections: HashMap<(NodeId, NodeId), Vec<VertexId>>,
    buffer_radius: f64,
}

impl PipeMesh {
    /// Build the pipe mesh for a network.
    pub fn from_network(network: &Network, options: &PipeOptions) -> Result<Self> {
        if options.section_segments < 3 {
            return Err(SkeletonError::invalid_param(
                "section_segments",
                options.section_segments,
                "a cross-section ring needs at least 3 vertices",
            ));
        }

        let mut pipes = Self {
            mesh: HalfEdgeMesh::new(),
            sections: HashMap::new(),
            buffer_radius: node_buffer_radius(network, options.branch_radius),
        };

        let buffer = pipes.buffer_radius * options.node_radius_factor;
        for (u, v) in network.edges() {
            pipes.add_branch_rings(network, u, v, buffer, options)?;
        }
        for (u, v) in network.edges() {
            pipes.add_branch_quads(u, v)?;
        }
        for n in network.nodes() {
            if !network.is_leaf(n) {
                pipes.add_node_socket(network, n)?;
            }
        }

        Ok(pipes)
    }

    /// The assembled tube-and-socket mesh.
    #[inline]
    pub fn mesh(&self) -> &HalfEdgeMesh {
        &self.mesh
    }

    /// The ring keys of a directed halfbranch, at its origin end.
    pub fn section(&self, u: NodeId, v: NodeId) -> Option<&[VertexId]> {
        self.sections.get(&(u, v)).map(Vec::as_slice)
    }

    /// The unscaled joint buffer distance the mesh was built with.
    #[inline]
    pub fn buffer_radius(&self) -> f64 {
        self.buffer_radius
    }

    /// Generate the two cross-section rings of one branch.
    ///
    /// Both rings share the branch direction as their plane normal, so their
    /// vertices correspond index to index without twist.
    fn add_branch_rings(
        &mut self,
        network: &Network,
        u: NodeId,
        v: NodeId,
        buffer: f64,
        options: &PipeOptions,
    ) -> Result<()> {
        let pt_u = network.position(u);
        let pt_v = network.position(v);
        let axis = pt_v - pt_u;
        if axis.norm() < AXIS_EPSILON {
            return Err(SkeletonError::Degeneracy {
                details: format!("branch ({:?}, {:?}) has zero length", u, v),
            });
        }
        let dir = axis.normalize();

        let mut start = pt_u;
        if !network.is_leaf(u) {
            start += dir * buffer;
        }
        let mut end = pt_v;
        if !network.is_leaf(v) {
            end -= dir * buffer;
        }

        for (key, center) in [((u, v), start), ((v, u), end)] {
            let ring: Vec<VertexId> =
                section_points(center, dir, options.branch_radius, options.section_segments)
                    .into_iter()
                    .map(|p| self.mesh.add_vertex(p))
                    .collect();
            self.sections.insert(key, ring);
        }
        Ok(())
    }

    /// Bridge the two rings of a branch with quads.
    fn add_branch_quads(&mut self, u: NodeId, v: NodeId) -> Result<()> {
        let ring_u = self.require_section(u, v)?.to_vec();
        let ring_v = self.require_section(v, u)?.to_vec();

        let n = ring_u.len();
        for i in 0..n {
            let j = (i + 1) % n;
            self.mesh
                .add_face(&[ring_u[i], ring_u[j], ring_v[j], ring_v[i]]);
        }
        Ok(())
    }

    /// Hull the rings converging at a joint into a socket.
    ///
    /// Hull faces that lie entirely inside one ring would cap a tube off;
    /// they are dropped so the socket stays open into every branch.
    fn add_node_socket(&mut self, network: &Network, n: NodeId) -> Result<()> {
        let mut keys: Vec<VertexId> = Vec::new();
        for &v in network.neighbors(n) {
            keys.extend_from_slice(self.require_section(n, v)?);
        }

        let points: Vec<Point3<f64>> = keys.iter().map(|&k| *self.mesh.position(k)).collect();
        let faces = convex_hull(&points, &[])?;

        let ring_len = self
            .sections
            .get(&(n, network.neighbors(n)[0]))
            .map(|r| r.len())
            .unwrap_or_default();

        for face in faces {
            let within_one_ring = (0..network.neighbors(n).len()).any(|ring_index| {
                let lo = ring_index * ring_len;
                let hi = lo + ring_len;
                face.iter().all(|&i| i >= lo && i < hi)
            });
            if within_one_ring {
                continue;
            }
            self.mesh.add_face(&[keys[face[0]], keys[face[1]], keys[face[2]]]);
        }
        Ok(())
    }

    fn require_section(&self, u: NodeId, v: NodeId) -> Result<&[VertexId]> {
        self.section(u, v).ok_or(SkeletonError::Degeneracy {
            details: format!("halfbranch ({:?}, {:?}) has no section ring", u, v),
        })
    }
}

/// Buffer distance needed so ring circles clear the joints.
///
/// Per joint, the tightest angle between two branch directions determines
/// the inscribed offset `radius / tan(angle / 2)`; the widest requirement
/// across all joints is used globally, so every joint is cleared. (The
/// alternative policy, the smallest requirement, under-buffers tight
/// joints.) A network without joints needs no buffer.
fn node_buffer_radius(network: &Network, branch_radius: f64) -> f64 {
    let mut radius: f64 = 0.0;

    for n in network.nodes() {
        if network.is_leaf(n) {
            continue;
        }
        let center = network.position(n);
        let directions: Vec<Vector3<f64>> = network
            .neighbors(n)
            .iter()
            .map(|&v| (network.position(v) - center).normalize())
            .collect();

        let mut min_angle = TAU;
        for (i, a) in directions.iter().enumerate() {
            for b in directions.iter().skip(i + 1) {
                min_angle = min_angle.min(a.angle(b));
            }
        }

        radius = radius.max(branch_radius / (min_angle * 0.5).tan());
    }

    radius
}

/// Points of a regular ring around `center` in the plane with the given
/// normal.
fn section_points(
    center: Point3<f64>,
    normal: Vector3<f64>,
    radius: f64,
    segments: usize,
) -> Vec<Point3<f64>> {
    let rotation = Rotation3::rotation_between(&Vector3::z(), &normal)
        .unwrap_or_else(|| Rotation3::from_axis_angle(&Vector3::x_axis(), PI));

    (0..segments)
        .map(|i| {
            let theta = TAU * i as f64 / segments as f64;
            let local = Vector3::new(radius * theta.cos(), radius * theta.sin(), 0.0);
            center + rotation * local
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tetrapod() -> Network {
        let o = Point3::origin();
        Network::from_lines(&[
            [o, Point3::new(2.0, 2.0, 2.0)],
            [o, Point3::new(2.0, -2.0, -2.0)],
            [o, Point3::new(-2.0, 2.0, -2.0)],
            [o, Point3::new(-2.0, -2.0, 2.0)],
        ])
    }

    #[test]
    fn test_single_branch_tube() {
        let network = Network::from_lines(&[[Point3::origin(), Point3::new(0.0, 0.0, 4.0)]]);
        let options = PipeOptions::default()
            .with_branch_radius(0.5)
            .with_section_segments(6);
        let pipes = PipeMesh::from_network(&network, &options).unwrap();

        // Two rings of six vertices bridged by six quads, no sockets
        assert_eq!(pipes.mesh().num_vertices(), 12);
        assert_eq!(pipes.mesh().num_faces(), 6);
        assert!((pipes.buffer_radius() - 0.0).abs() < 1e-12);

        // Leaf rings sit exactly on the branch endpoints' planes
        let (u, v) = network.edges().next().unwrap();
        for &key in pipes.section(u, v).unwrap() {
            let p = pipes.mesh().position(key);
            assert!(p.z.abs() < 1e-9);
            assert!((p.coords.xy().norm() - 0.5).abs() < 1e-9);
        }
        for &key in pipes.section(v, u).unwrap() {
            assert!((pipes.mesh().position(key).z - 4.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_ring_lies_in_branch_plane() {
        let network = Network::from_lines(&[[Point3::origin(), Point3::new(3.0, 1.0, 2.0)]]);
        let pipes = PipeMesh::from_network(&network, &PipeOptions::default()).unwrap();

        let (u, v) = network.edges().next().unwrap();
        let dir = (network.position(v) - network.position(u)).normalize();
        for &key in pipes.section(u, v).unwrap() {
            let offset = pipes.mesh().position(key) - network.position(u);
            assert!(offset.dot(&dir).abs() < 1e-9);
            assert!((offset.norm() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_joint_socket_keeps_tubes_open() {
        let network = tetrapod();
        let pipes = PipeMesh::from_network(&network, &PipeOptions::default()).unwrap();

        // 4 branches, 2 rings of 4 each
        assert_eq!(pipes.mesh().num_vertices(), 4 * 2 * 4);

        // Branch quads plus a non-empty socket; no face closes off a ring
        let joint = network
            .nodes()
            .find(|&n| !network.is_leaf(n))
            .unwrap();
        let mut socket_faces = 0;
        for (_, face) in pipes.mesh().faces() {
            if face.len() == 3 {
                socket_faces += 1;
            }
        }
        assert!(socket_faces > 0);

        // Every joint-side ring was pulled back from the joint
        let buffer = pipes.buffer_radius();
        assert!(buffer > 0.0);
        for &v in network.neighbors(joint) {
            let ring = pipes.section(joint, v).unwrap();
            let dir = (network.position(v) - network.position(joint)).normalize();
            let center = network.position(joint) + dir * buffer;
            for &key in ring {
                let offset = pipes.mesh().position(key) - center;
                assert!(offset.dot(&dir).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_buffer_uses_tightest_joint() {
        // Two joints in one network: a right angle and a 60 degree pair.
        // The 60 degree joint needs the larger pull-back and wins.
        let network = Network::from_lines(&[
            [Point3::origin(), Point3::new(2.0, 0.0, 0.0)],
            [Point3::origin(), Point3::new(0.0, 2.0, 0.0)],
            [Point3::new(10.0, 0.0, 0.0), Point3::new(12.0, 0.0, 0.0)],
            [Point3::new(10.0, 0.0, 0.0), Point3::new(11.0, 1.7320508, 0.0)],
        ]);
        let pipes = PipeMesh::from_network(&network, &PipeOptions::default()).unwrap();

        let expected = 1.0 / (30.0_f64).to_radians().tan();
        assert!((pipes.buffer_radius() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_too_few_segments_rejected() {
        let network = Network::from_lines(&[[Point3::origin(), Point3::new(1.0, 0.0, 0.0)]]);
        let options = PipeOptions::default().with_section_segments(2);
        assert!(matches!(
            PipeMesh::from_network(&network, &options),
            Err(SkeletonError::InvalidParameter { .. })
        ));
    }
}
