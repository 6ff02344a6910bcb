pub mod export;
pub mod orders;
pub mod texture;

use crate::layers::base::PixelFormat;
use crate::rendering::orders::DisplayOrder;
use crate::tiles::pixelbuf::PixelBuf;

/// Contract the rendering backend implements against the pipeline. The
/// backend consumes display orders and textures; everything behind this
/// trait (GL state, windowing) is outside the core.
pub trait Renderer {
    /// Draws a freshly generated order list and remembers it.
    fn render(&mut self, orders: &[DisplayOrder]);

    /// Repaints the last rendered order list without regeneration, e.g.
    /// because an async tile just became available.
    fn redraw(&mut self);

    /// Off-screen rendering for export; callers hand in orders from a
    /// fully synchronous generation pass so no half-resolved promise can
    /// end up in the output.
    fn render_to_buffer(
        &mut self,
        format: PixelFormat,
        width: u32,
        height: u32,
        orders: &[DisplayOrder],
    ) -> PixelBuf;

    /// Requests an OS-level repaint asynchronously; safe to call from any
    /// thread.
    fn force_repaint(&self);
}
