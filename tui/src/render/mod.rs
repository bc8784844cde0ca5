pub mod renderable;

pub use renderable::ColumnRenderable;
pub use renderable::Renderable;
