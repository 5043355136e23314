mod draw;
mod renderer;
mod text;

pub use renderer::{render_session, RenderError, RenderOptions};
