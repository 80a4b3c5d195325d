// The demo draws only the quad; the cube is generated on request.
#[allow(dead_code)]
mod cube;
#[allow(unused_imports)]
pub use cube::{build_cube, Face, CUBE_FLOATS, CUBE_VERTICES};

mod quad;
pub use quad::QUAD;

/// One quad template corner as uploaded to the vertex buffer.
pub type Vertex = [f32; 2];
