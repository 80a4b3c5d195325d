extern crate nalgebra as na;

use super::quad::{QUAD, VERTICES_PER_FACE};

pub const CUBE_VERTICES: usize = 6 * VERTICES_PER_FACE;
pub const CUBE_FLOATS: usize = CUBE_VERTICES * 3;

/// Faces of the unit cube, in the order their blocks appear in the buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Front,
    Back,
    Left,
    Right,
    Top,
    Bottom,
}

impl Face {
    pub const ALL: [Face; 6] = [
        Face::Front,
        Face::Back,
        Face::Left,
        Face::Right,
        Face::Top,
        Face::Bottom,
    ];

    /// Outward unit normal.
    pub fn normal(self) -> na::Vector3<f32> {
        match self {
            Face::Front => na::Vector3::z(),
            Face::Back => -na::Vector3::z(),
            Face::Left => -na::Vector3::x(),
            Face::Right => na::Vector3::x(),
            Face::Top => na::Vector3::y(),
            Face::Bottom => -na::Vector3::y(),
        }
    }

    /// Maps a quad template corner onto this face.
    ///
    /// The sign flips keep every triangle counter-clockwise when the face is
    /// seen from outside the cube.
    pub fn place(self, [u, v]: [f32; 2]) -> na::Point3<f32> {
        match self {
            Face::Front => na::point![u, v, 0.5],
            Face::Back => na::point![-u, v, -0.5],
            Face::Left => na::point![-0.5, v, u],
            Face::Right => na::point![0.5, v, -u],
            Face::Top => na::point![u, 0.5, -v],
            Face::Bottom => na::point![u, -0.5, v],
        }
    }
}

/// Fills `points` and `normals` with the 36 vertices of an axis-aligned unit
/// cube centred on the origin, one block of [`VERTICES_PER_FACE`] per face in
/// [`Face::ALL`] order. `normals[i]` belongs to `points[i]`.
pub fn build_cube(points: &mut [f32; CUBE_FLOATS], normals: &mut [f32; CUBE_FLOATS]) {
    let slots = points.chunks_exact_mut(3).zip(normals.chunks_exact_mut(3));

    for (i, (point, normal)) in slots.enumerate() {
        let face = Face::ALL[i / VERTICES_PER_FACE];
        let p = face.place(QUAD[i % VERTICES_PER_FACE]);
        let n = face.normal();

        point.copy_from_slice(&[p.x, p.y, p.z]);
        normal.copy_from_slice(&[n.x, n.y, n.z]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube() -> ([f32; CUBE_FLOATS], [f32; CUBE_FLOATS]) {
        let mut points = [0.0; CUBE_FLOATS];
        let mut normals = [0.0; CUBE_FLOATS];
        build_cube(&mut points, &mut normals);
        (points, normals)
    }

    fn vec3(buffer: &[f32; CUBE_FLOATS], i: usize) -> na::Vector3<f32> {
        na::Vector3::new(buffer[i * 3], buffer[i * 3 + 1], buffer[i * 3 + 2])
    }

    #[test]
    fn test_points_lie_on_their_face() {
        let (points, normals) = cube();

        assert!(points.iter().all(|c| (-0.5..=0.5).contains(c)));
        for i in 0..CUBE_VERTICES {
            // the coordinate on the normal axis is pinned to the outward side
            assert_eq!(vec3(&points, i).dot(&vec3(&normals, i)), 0.5);
        }
    }

    #[test]
    fn test_normals_constant_per_face_and_distinct() {
        let (_, normals) = cube();
        let axes = [
            na::Vector3::x(),
            -na::Vector3::x(),
            na::Vector3::y(),
            -na::Vector3::y(),
            na::Vector3::z(),
            -na::Vector3::z(),
        ];

        let mut seen = Vec::new();
        for (block, face) in Face::ALL.iter().enumerate() {
            let first = vec3(&normals, block * VERTICES_PER_FACE);
            assert_eq!(first, face.normal());
            assert!(axes.contains(&first));
            assert!(!seen.contains(&first), "{:?} reuses a normal", face);
            seen.push(first);

            for i in 1..VERTICES_PER_FACE {
                assert_eq!(vec3(&normals, block * VERTICES_PER_FACE + i), first);
            }
        }
    }

    #[test]
    fn test_first_vertex_of_faces() {
        let (points, _) = cube();

        assert_eq!(vec3(&points, 0), na::Vector3::new(-0.5, -0.5, 0.5));
        assert_eq!(vec3(&points, 6), na::Vector3::new(0.5, -0.5, -0.5));
        assert_eq!(vec3(&points, 12), na::Vector3::new(-0.5, -0.5, -0.5));
        assert_eq!(vec3(&points, 18), na::Vector3::new(0.5, -0.5, 0.5));
        assert_eq!(vec3(&points, 24), na::Vector3::new(-0.5, 0.5, 0.5));
        assert_eq!(vec3(&points, 30), na::Vector3::new(-0.5, -0.5, -0.5));
    }

    #[test]
    fn test_normals_sum_to_zero() {
        let (_, normals) = cube();
        let sum = (0..CUBE_VERTICES)
            .map(|i| vec3(&normals, i))
            .fold(na::Vector3::zeros(), |acc, n| acc + n);

        assert_eq!(sum, na::Vector3::zeros());
    }

    #[test]
    fn test_build_is_deterministic() {
        let first = cube();
        let second = cube();

        assert_eq!(first.0, second.0);
        assert_eq!(first.1, second.1);
    }

    #[test]
    fn test_overwrites_previous_contents() {
        let mut points = [7.0; CUBE_FLOATS];
        let mut normals = [-3.0; CUBE_FLOATS];
        build_cube(&mut points, &mut normals);

        let (fresh_points, fresh_normals) = cube();
        assert_eq!(points, fresh_points);
        assert_eq!(normals, fresh_normals);
    }

    #[test]
    fn test_face_triangles_share_a_diagonal() {
        let (points, _) = cube();

        for block in 0..6 {
            let base = block * VERTICES_PER_FACE;
            let lower: Vec<_> = (0..3).map(|i| vec3(&points, base + i)).collect();
            let upper: Vec<_> = (3..6).map(|i| vec3(&points, base + i)).collect();

            let shared = lower.iter().filter(|p| upper.contains(p)).count();
            assert_eq!(shared, 2, "face block {}", block);
        }
    }

    #[test]
    fn test_triangles_wind_outward() {
        let (points, normals) = cube();

        for t in 0..CUBE_VERTICES / 3 {
            let a = vec3(&points, t * 3);
            let b = vec3(&points, t * 3 + 1);
            let c = vec3(&points, t * 3 + 2);
            let winding = (b - a).cross(&(c - a));

            assert_eq!(winding, vec3(&normals, t * 3), "triangle {}", t);
        }
    }

    #[test]
    fn test_place_matches_generated_points() {
        let (points, _) = cube();

        for (block, face) in Face::ALL.iter().enumerate() {
            for (i, corner) in QUAD.iter().enumerate() {
                let placed = face.place(*corner);
                assert_eq!(vec3(&points, block * VERTICES_PER_FACE + i), placed.coords);
            }
        }
    }
}
