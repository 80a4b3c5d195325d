/// Vertices in one face of the quad template: two triangles.
pub const VERTICES_PER_FACE: usize = 6;

/// Unit square centred on the origin, as two counter-clockwise triangles.
///
/// This is the vertex data uploaded by the renderer and the template every
/// cube face is generated from.
#[cfg_attr(rustfmt, rustfmt_skip)]
pub const QUAD: [[f32; 2]; VERTICES_PER_FACE] = [
    // Lower triangle
    [-0.5, -0.5],
    [ 0.5, -0.5],
    [-0.5,  0.5],

    // Upper triangle
    [ 0.5,  0.5],
    [-0.5,  0.5],
    [ 0.5, -0.5],
];

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_area(a: [f32; 2], b: [f32; 2], c: [f32; 2]) -> f32 {
        0.5 * ((b[0] - a[0]) * (c[1] - a[1]) - (c[0] - a[0]) * (b[1] - a[1]))
    }

    #[test]
    fn test_quad_spans_unit_square() {
        for [x, y] in QUAD {
            assert!(x == 0.5 || x == -0.5);
            assert!(y == 0.5 || y == -0.5);
        }
    }

    #[test]
    fn test_quad_triangles_are_ccw_and_cover_unit_area() {
        let lower = signed_area(QUAD[0], QUAD[1], QUAD[2]);
        let upper = signed_area(QUAD[3], QUAD[4], QUAD[5]);

        assert!(lower > 0.0);
        assert!(upper > 0.0);
        assert_eq!(lower + upper, 1.0);
    }
}
