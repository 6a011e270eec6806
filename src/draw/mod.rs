//! User-facing drawing: the render state stack and shape helpers.

pub use self::render_context::RenderContext;
pub use self::shapes::{
    capsule_parts, compound_flags, rounded_cube_parts, rounded_square_parts, stadium_parts,
    ShapePart,
};
pub use self::state::StateStack;

mod render_context;
mod shapes;
mod state;
