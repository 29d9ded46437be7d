use crate::frame::{BoundingBox, FrameViewMut};

/// Gray level used for box outlines unless configured otherwise.
pub const DEFAULT_BOX_COLOR: u8 = 255;

/// Draw a one-pixel outline for each box directly into `frame`.
///
/// Edges that fall outside the frame are clipped; a box lying entirely
/// outside draws nothing. Inverted boxes (min past max) are skipped.
pub fn annotate(frame: &mut FrameViewMut<'_>, boxes: &[BoundingBox], color: u8) {
    for bbox in boxes {
        draw_box(frame, bbox, color);
    }
}

fn draw_box(frame: &mut FrameViewMut<'_>, bbox: &BoundingBox, color: u8) {
    let (width, height) = (frame.width(), frame.height());
    if bbox.min_x > bbox.max_x || bbox.min_y > bbox.max_y {
        return;
    }
    if bbox.min_x >= width || bbox.min_y >= height {
        return;
    }
    let right = bbox.max_x.min(width - 1);
    let bottom = bbox.max_y.min(height - 1);
    let span = right - bbox.min_x + 1;

    frame.fill_row(bbox.min_x, bbox.min_y, span, color);
    if bbox.max_y < height {
        frame.fill_row(bbox.min_x, bbox.max_y, span, color);
    }
    for y in bbox.min_y..=bottom {
        frame.set(bbox.min_x, y, color);
        if bbox.max_x < width {
            frame.set(bbox.max_x, y, color);
        }
    }
}
