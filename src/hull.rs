//! Incremental 3D convex hull.
//!
//! A beneath–beyond hull builder over an ordered point sequence. The hull is
//! seeded with two degenerate, opposite-oriented triangles over the first
//! three points so every later point has a well-defined visibility test even
//! before the hull gains true 3D extent. Each remaining point removes the
//! faces that can see it and cones new faces over the silhouette of the
//! removed patch.
//!
//! Callers may *protect* faces: a protected face is never removed, which
//! allows carving a local patch while anchoring fixed boundary faces.
//! Protection compares faces as unordered vertex triples.
//!
//! The output face list is deterministic for a fixed input order; the
//! geometric shape (vertex membership, volume) is invariant to input order
//! for points in general position.

use std::collections::HashSet;

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;

use crate::error::{Result, SkeletonError};
use crate::mesh::{HalfEdgeMesh, VertexId};
use crate::progress::Progress;

const COLLINEAR_EPSILON: f64 = 1e-12;

/// Compute the convex hull of a point set.
///
/// Returns consistently outward-oriented triangles as index triples into
/// `points`. Faces listed in `protected` are never removed during
/// construction.
///
/// # Errors
///
/// Fails with [`SkeletonError::DegenerateHullInput`] for fewer than 3 points
/// and [`SkeletonError::CollinearSeedPoints`] when the first three points
/// cannot span a triangle.
pub fn convex_hull(points: &[Point3<f64>], protected: &[[usize; 3]]) -> Result<Vec<[usize; 3]>> {
    convex_hull_with_progress(points, protected, &Progress::none())
}

/// Compute the convex hull of a point set, reporting one step per inserted
/// point.
pub fn convex_hull_with_progress(
    points: &[Point3<f64>],
    protected: &[[usize; 3]],
    progress: &Progress,
) -> Result<Vec<[usize; 3]>> {
    if points.len() < 3 {
        return Err(SkeletonError::DegenerateHullInput {
            count: points.len(),
        });
    }

    let e1 = points[1] - points[0];
    let e2 = points[2] - points[0];
    if e1.cross(&e2).norm() <= COLLINEAR_EPSILON * e1.norm() * e2.norm() {
        return Err(SkeletonError::CollinearSeedPoints);
    }

    let protected_set: HashSet<[usize; 3]> = protected.iter().map(|&f| sorted_face(f)).collect();

    let mut hull: Vec<[usize; 3]> = vec![[0, 1, 2], [0, 2, 1]];
    let total = points.len() - 3;
    for (step, p) in (3..points.len()).enumerate() {
        progress.report(step, total, "convex hull insertion");
        insert_point(points, &mut hull, p, &protected_set);
    }
    progress.report(total, total, "convex hull insertion");

    Ok(hull)
}

/// Compute the convex hull and assemble it into a half-edge mesh.
///
/// The mesh contains only the points that ended up on the hull; the returned
/// index list maps each mesh vertex back to its position in `points`.
pub fn convex_hull_mesh(
    points: &[Point3<f64>],
    protected: &[[usize; 3]],
) -> Result<(HalfEdgeMesh, Vec<usize>)> {
    let faces = convex_hull(points, protected)?;

    let mut used: Vec<usize> = faces.iter().flat_map(|f| f.iter().copied()).collect();
    used.sort_unstable();
    used.dedup();

    let mut remap = vec![usize::MAX; points.len()];
    let mut mesh = HalfEdgeMesh::new();
    for (i, &pi) in used.iter().enumerate() {
        remap[pi] = i;
        mesh.add_vertex(points[pi]);
    }

    for face in &faces {
        let loop_vertices: Vec<VertexId> =
            face.iter().map(|&pi| VertexId::new(remap[pi])).collect();
        mesh.add_face(&loop_vertices);
    }

    Ok((mesh, used))
}

fn sorted_face(mut face: [usize; 3]) -> [usize; 3] {
    face.sort_unstable();
    face
}

fn face_normal(points: &[Point3<f64>], face: &[usize; 3]) -> Vector3<f64> {
    let u = points[face[1]] - points[face[0]];
    let v = points[face[2]] - points[face[0]];
    u.cross(&v)
}

fn face_sees(points: &[Point3<f64>], face: &[usize; 3], p: usize) -> bool {
    let normal = face_normal(points, face);
    normal.dot(&(points[p] - points[face[0]])) >= 0.0
}

fn insert_point(
    points: &[Point3<f64>],
    hull: &mut Vec<[usize; 3]>,
    p: usize,
    protected: &HashSet<[usize; 3]>,
) {
    let visible: Vec<bool> = hull
        .par_iter()
        .map(|face| face_sees(points, face, p))
        .collect();

    let mut seen: Vec<[usize; 3]> = hull
        .iter()
        .zip(&visible)
        .filter_map(|(face, &v)| (v && !protected.contains(&sorted_face(*face))).then_some(*face))
        .collect();

    // While the seed triangles are still coplanar a new point can see the
    // whole hull; keep only the side agreeing with the first seen normal so
    // the degenerate hull does not collapse onto itself.
    if seen.len() == hull.len() {
        let reference = face_normal(points, &seen[0]);
        seen.retain(|face| face_normal(points, face).dot(&reference) > 0.0);
    }

    let removed: HashSet<[usize; 3]> = seen.iter().copied().collect();
    hull.retain(|face| !removed.contains(face));

    // Silhouette: directed edges of the removed patch with no reverse
    // occurrence inside the patch, kept in first-occurrence order so the
    // output face list stays deterministic.
    let mut forward: Vec<(usize, usize)> = Vec::new();
    let mut reverse: HashSet<(usize, usize)> = HashSet::new();
    for face in &seen {
        for i in 0..3 {
            forward.push((face[i], face[(i + 1) % 3]));
            reverse.insert((face[(i + 1) % 3], face[i]));
        }
    }

    for (a, b) in forward {
        if !reverse.contains(&(a, b)) {
            hull.push([a, b, p]);
        }
    }
}
