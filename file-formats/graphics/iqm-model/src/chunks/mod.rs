pub mod animation;
pub mod bounds;
pub mod joint;
pub mod mesh;
pub mod text;
pub mod vertex_array;

// Re-export common types
pub use animation::{AnimFlags, AnimationClip};
pub use bounds::FrameBounds;
pub use joint::JointRecord;
pub use mesh::Mesh;
pub use text::TextPool;
pub use vertex_array::{VertexArrayDescriptor, VertexArrayType, VertexData, VertexFormat};
