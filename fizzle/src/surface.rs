/// Window side of a render loop.
///
/// Implemented by whatever owns the native window and its GL context.
pub trait RenderSurface {
    /// Size of the drawable framebuffer in pixels, which may differ from the
    /// window size on high-DPI displays.
    fn framebuffer_size(&self) -> (u32, u32);

    fn should_close(&self) -> bool;

    fn swap_buffers(&mut self);

    fn poll_events(&mut self);
}
