use crate::sim::Aabb;

/// RGBA8 frame with its dimensions. All drawing clips to the frame bounds.
pub(crate) struct FrameTarget<'a> {
    frame: &'a mut [u8],
    width: i32,
    height: i32,
}

impl<'a> FrameTarget<'a> {
    pub(crate) fn new(frame: &'a mut [u8], width: u32, height: u32) -> Self {
        Self {
            frame,
            width: width as i32,
            height: height as i32,
        }
    }

    pub(crate) fn width(&self) -> i32 {
        self.width
    }

    pub(crate) fn height(&self) -> i32 {
        self.height
    }

    pub(crate) fn clear(&mut self, color: [u8; 4]) {
        for chunk in self.frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&color);
        }
    }

    fn write_pixel(&mut self, x: i32, y: i32, color: [u8; 4]) {
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        if let Some(pixel) = self.frame.get_mut(offset..offset + 4) {
            pixel.copy_from_slice(&color);
        }
    }
}

pub(crate) fn fill_rect(
    target: &mut FrameTarget<'_>,
    x: i32,
    y: i32,
    rect_width: i32,
    rect_height: i32,
    color: [u8; 4],
) {
    let start_x = x.max(0);
    let start_y = y.max(0);
    let end_x = x.saturating_add(rect_width).min(target.width);
    let end_y = y.saturating_add(rect_height).min(target.height);
    if end_x <= start_x || end_y <= start_y {
        return;
    }

    for py in start_y..end_y {
        for px in start_x..end_x {
            target.write_pixel(px, py, color);
        }
    }
}

/// Fills the pixels whose centers fall inside `bounds`.
pub(crate) fn fill_box(target: &mut FrameTarget<'_>, bounds: Aabb, color: [u8; 4]) {
    let left = bounds.x.round() as i32;
    let top = bounds.y.round() as i32;
    let right = bounds.right().round() as i32;
    let bottom = bounds.bottom().round() as i32;
    fill_rect(target, left, top, right - left, bottom - top, color);
}

pub(crate) fn outline_box(target: &mut FrameTarget<'_>, bounds: Aabb, thickness: i32, color: [u8; 4]) {
    let left = bounds.x.round() as i32;
    let top = bounds.y.round() as i32;
    let width = bounds.right().round() as i32 - left;
    let height = bounds.bottom().round() as i32 - top;
    if width <= thickness * 2 || height <= thickness * 2 {
        fill_rect(target, left, top, width, height, color);
        return;
    }
    fill_rect(target, left, top, width, thickness, color);
    fill_rect(target, left, top + height - thickness, width, thickness, color);
    fill_rect(target, left, top, thickness, height, color);
    fill_rect(target, left + width - thickness, top, thickness, height, color);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel(frame: &[u8], width: usize, x: usize, y: usize) -> [u8; 4] {
        let offset = (y * width + x) * 4;
        [
            frame[offset],
            frame[offset + 1],
            frame[offset + 2],
            frame[offset + 3],
        ]
    }

    #[test]
    fn fill_rect_clips_negative_origin() {
        let mut frame = vec![0u8; 4 * 4 * 4];
        let mut target = FrameTarget::new(&mut frame, 4, 4);
        fill_rect(&mut target, -2, -2, 3, 3, [1, 2, 3, 4]);

        assert_eq!(pixel(&frame, 4, 0, 0), [1, 2, 3, 4]);
        assert_eq!(pixel(&frame, 4, 1, 0), [0, 0, 0, 0]);
        assert_eq!(pixel(&frame, 4, 0, 1), [0, 0, 0, 0]);
    }

    #[test]
    fn fill_box_fully_offscreen_is_safe() {
        let mut frame = vec![0u8; 4 * 4 * 4];
        let mut target = FrameTarget::new(&mut frame, 4, 4);
        fill_box(&mut target, Aabb::new(10.0, -50.0, 100.0, 100.0), [9, 9, 9, 9]);
        fill_box(&mut target, Aabb::new(0.0, -200.0, 4.0, 100.0), [9, 9, 9, 9]);
        assert!(frame.iter().all(|byte| *byte == 0));
    }

    #[test]
    fn clear_fills_every_pixel() {
        let mut frame = vec![0u8; 3 * 2 * 4];
        let mut target = FrameTarget::new(&mut frame, 3, 2);
        target.clear([5, 6, 7, 255]);
        assert!(frame.chunks_exact(4).all(|chunk| chunk == [5, 6, 7, 255]));
    }

    #[test]
    fn outline_leaves_interior_untouched() {
        let mut frame = vec![0u8; 6 * 6 * 4];
        let mut target = FrameTarget::new(&mut frame, 6, 6);
        outline_box(&mut target, Aabb::new(0.0, 0.0, 6.0, 6.0), 1, [1, 1, 1, 1]);

        assert_eq!(pixel(&frame, 6, 0, 0), [1, 1, 1, 1]);
        assert_eq!(pixel(&frame, 6, 5, 5), [1, 1, 1, 1]);
        assert_eq!(pixel(&frame, 6, 3, 3), [0, 0, 0, 0]);
    }
}
