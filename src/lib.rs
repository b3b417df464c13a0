//! # Armature
//!
//! Coarse, parametrically editable quad meshes from spatial line networks.
//!
//! Armature turns a network of straight segments (*branches* meeting at
//! *joints* and ending in *leaves*) into a low-poly quad mesh whose shape
//! is driven by a handful of width parameters, and builds convex-hull
//! "collar" sockets that join the pipes converging at a joint.
//!
//! ## Features
//!
//! - **Skeleton meshes**: one quad per directed branch halfedge, with
//!   generated boundary vertices placed from `node_width`, `leaf_width`,
//!   and `leaf_extend`
//! - **Editable geometry**: per-vertex offsets survive width changes, and
//!   skeleton-vertex moves carry them along through local-frame
//!   reprojection
//! - **Joint collars**: an incremental convex hull over the leaf directions
//!   drives a descendent tree of generated joint/leaf points and a quad
//!   socket
//! - **Branch pipes**: polygonal tubes over every branch, hulled together
//!   into open sockets at the joints
//!
//! ## Quick Start
//!
//! ```
//! use armature::prelude::*;
//! use nalgebra::Point3;
//!
//! // Three lines meeting at the origin
//! let o = Point3::origin();
//! let lines = [
//!     [o, Point3::new(1.0, 0.0, 0.0)],
//!     [o, Point3::new(-0.5, 0.866, 0.0)],
//!     [o, Point3::new(-0.5, -0.866, 0.0)],
//! ];
//!
//! let skeleton = Skeleton::from_lines(&lines).unwrap();
//! let (joints, leaves) = skeleton.skeleton_vertices();
//! assert_eq!(joints.len(), 1);
//! assert_eq!(leaves.len(), 3);
//!
//! // One quad per directed branch halfedge
//! assert_eq!(skeleton.mesh().num_faces(), 6);
//! ```
//!
//! ## Editing
//!
//! ```
//! use armature::prelude::*;
//! use nalgebra::Point3;
//!
//! # let o = Point3::origin();
//! # let lines = [
//! #     [o, Point3::new(1.0, 0.0, 0.0)],
//! #     [o, Point3::new(-0.5, 0.866, 0.0)],
//! #     [o, Point3::new(-0.5, -0.866, 0.0)],
//! # ];
//! let mut skeleton = Skeleton::from_lines(&lines).unwrap();
//!
//! // Widths update geometry in place; topology is untouched
//! skeleton.set_node_width(0.5);
//! skeleton.set_leaf_width(0.3);
//! skeleton.update_mesh_vertices().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collar;
pub mod error;
pub mod frame;
pub mod hull;
pub mod mesh;
pub mod network;
pub mod pipe;
pub mod progress;
pub mod skeleton;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use armature::prelude::*;
/// ```
pub mod prelude {
    pub use crate::collar::{CollarOptions, JointCollar};
    pub use crate::error::{Result, SkeletonError};
    pub use crate::frame::Frame;
    pub use crate::hull::{convex_hull, convex_hull_mesh};
    pub use crate::mesh::{FaceId, HalfEdgeId, HalfEdgeMesh, VertexId};
    pub use crate::network::{Network, NodeId};
    pub use crate::pipe::{PipeMesh, PipeOptions};
    pub use crate::skeleton::{Skeleton, VertexRole};
}

// Re-export nalgebra types for convenience
pub use nalgebra;

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use nalgebra::Point3;

    #[test]
    fn test_y_network_end_to_end() {
        let o = Point3::origin();
        let lines = [
            [o, Point3::new(1.0, 0.0, 0.0)],
            [o, Point3::new(-0.5, 0.866, 0.0)],
            [o, Point3::new(-0.5, -0.866, 0.0)],
        ];

        let skeleton = Skeleton::from_lines(&lines).unwrap();

        let (joints, leaves) = skeleton.skeleton_vertices();
        assert_eq!(joints.len(), 1);
        assert_eq!(leaves.len(), 3);
        assert_eq!(skeleton.skeleton_branches().len(), 3);
        assert_eq!(skeleton.mesh().num_faces(), 6);

        // Unset widths default to fractions of the average edge length
        let average = 0.99998; // edges are approximately unit length
        assert!((skeleton.leaf_width() - 0.2 * average).abs() < 1e-4);
        assert!((skeleton.node_width() - 0.4 * average).abs() < 1e-4);

        // Every face is a quad over finite coordinates
        for (f, face) in skeleton.mesh().faces() {
            assert_eq!(face.len(), 4);
            for &v in skeleton.mesh().face_vertices(f) {
                assert!(skeleton.mesh().position(v).coords.iter().all(|c| c.is_finite()));
            }
        }
    }

    #[test]
    fn test_collar_and_pipes_share_the_network() {
        let o = Point3::origin();
        let network = Network::from_lines(&[
            [o, Point3::new(2.0, 2.0, 2.0)],
            [o, Point3::new(2.0, -2.0, -2.0)],
            [o, Point3::new(-2.0, 2.0, -2.0)],
            [o, Point3::new(-2.0, -2.0, 2.0)],
        ]);

        let collar = JointCollar::build(&network, &CollarOptions::new(0.4, 0.2)).unwrap();
        assert_eq!(collar.mesh().num_faces(), 2 * collar.hull().num_edges());

        let pipes = PipeMesh::from_network(&network, &PipeOptions::default()).unwrap();
        assert!(pipes.mesh().num_faces() > 0);
    }
}
