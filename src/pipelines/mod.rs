mod pipeline;
pub use pipeline::{create_render_pass, Pipeline};

pub mod shader;
