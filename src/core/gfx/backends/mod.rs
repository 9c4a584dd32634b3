// Concrete drawing surfaces. Each exposes the same five primitives as inherent
// methods; `crate::core::gfx::Backend` dispatches to them.
pub mod recorder;
pub mod software;
