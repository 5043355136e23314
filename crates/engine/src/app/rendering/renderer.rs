use thiserror::Error;

use crate::config::Viewport;
use crate::sim::{Aabb, Session};

use super::draw::{fill_box, fill_rect, outline_box, FrameTarget};
use super::text::{draw_text, text_height, text_width};

const BACKGROUND_COLOR: [u8; 4] = [68, 68, 68, 255];
const SHOULDER_COLOR: [u8; 4] = [52, 52, 52, 255];
const ROAD_MARKING_COLOR: [u8; 4] = [232, 232, 220, 255];
const OBSTACLE_COLOR: [u8; 4] = [206, 62, 52, 255];
const OBSTACLE_TRIM_COLOR: [u8; 4] = [120, 28, 24, 255];
const VEHICLE_COLOR: [u8; 4] = [60, 140, 230, 255];
const VEHICLE_WINDOW_COLOR: [u8; 4] = [190, 225, 250, 255];
const HUD_TEXT_COLOR: [u8; 4] = [255, 255, 255, 255];
const GAME_OVER_PANEL_COLOR: [u8; 4] = [16, 16, 20, 255];
const GAME_OVER_TEXT_COLOR: [u8; 4] = [255, 210, 70, 255];
const SHOULDER_WIDTH_PX: i32 = 8;
const HUD_ORIGIN: (i32, i32) = (24, 24);
const HUD_TEXT_SCALE: i32 = 4;
const BANNER_TEXT_SCALE: i32 = 5;
const HINT_TEXT_SCALE: i32 = 2;
const HINT_LINES: [&str; 2] = ["CLICK OR PRESS SPACE", "TO PLAY AGAIN"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error(
        "frame buffer is {frame_len} bytes but the session viewport {width}x{height} needs {expected}"
    )]
    FrameSizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        frame_len: usize,
    },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    pub road_dash_length: f32,
    pub road_dash_gap: f32,
    pub road_dash_width: f32,
}

/// Paints `session` into an RGBA8 frame sized to the session viewport.
/// Never mutates gameplay state.
pub fn render_session(
    frame: &mut [u8],
    viewport: Viewport,
    session: &Session,
    options: &RenderOptions,
) -> Result<(), RenderError> {
    let expected = viewport.width as usize * viewport.height as usize * 4;
    if viewport != session.viewport() || frame.len() != expected {
        let session_viewport = session.viewport();
        return Err(RenderError::FrameSizeMismatch {
            width: session_viewport.width,
            height: session_viewport.height,
            expected: session_viewport.width as usize * session_viewport.height as usize * 4,
            frame_len: frame.len(),
        });
    }

    let mut target = FrameTarget::new(frame, viewport.width, viewport.height);
    target.clear(BACKGROUND_COLOR);
    draw_shoulders(&mut target);
    draw_road_markings(&mut target, session, options);

    for obstacle in session.obstacles() {
        let bounds = obstacle.bounds();
        fill_box(&mut target, bounds, OBSTACLE_COLOR);
        outline_box(&mut target, bounds, 4, OBSTACLE_TRIM_COLOR);
    }

    draw_vehicle(&mut target, session.vehicle().bounds());

    let score_text = format!("SCORE: {}", session.score());
    draw_text(
        &mut target,
        HUD_ORIGIN.0,
        HUD_ORIGIN.1,
        &score_text,
        HUD_TEXT_SCALE,
        HUD_TEXT_COLOR,
    );

    if session.has_ended() {
        draw_game_over(&mut target);
    }
    Ok(())
}

fn draw_shoulders(target: &mut FrameTarget<'_>) {
    let height = target.height();
    let right = target.width() - SHOULDER_WIDTH_PX;
    fill_rect(target, 0, 0, SHOULDER_WIDTH_PX, height, SHOULDER_COLOR);
    fill_rect(target, right, 0, SHOULDER_WIDTH_PX, height, SHOULDER_COLOR);
}

fn draw_road_markings(target: &mut FrameTarget<'_>, session: &Session, options: &RenderOptions) {
    let period = options.road_dash_length + options.road_dash_gap;
    if period <= 0.0 || options.road_dash_length <= 0.0 {
        return;
    }
    let height = target.height() as f32;
    for marking in session.road_markings() {
        let left = marking.x - options.road_dash_width * 0.5;
        let mut y = marking.offset - period;
        while y < height {
            fill_box(
                target,
                Aabb::new(left, y, options.road_dash_width, options.road_dash_length),
                ROAD_MARKING_COLOR,
            );
            y += period;
        }
    }
}

fn draw_vehicle(target: &mut FrameTarget<'_>, bounds: Aabb) {
    fill_box(target, bounds, VEHICLE_COLOR);
    let window = Aabb::new(
        bounds.x + bounds.width * 0.15,
        bounds.y + bounds.height * 0.2,
        bounds.width * 0.7,
        bounds.height * 0.2,
    );
    fill_box(target, window, VEHICLE_WINDOW_COLOR);
}

fn draw_game_over(target: &mut FrameTarget<'_>) {
    let banner = "GAME OVER!";
    let banner_width = text_width(banner, BANNER_TEXT_SCALE);
    let hint_line_height = text_height(HINT_TEXT_SCALE) + HINT_TEXT_SCALE * 2;
    let panel_height =
        text_height(BANNER_TEXT_SCALE) + hint_line_height * HINT_LINES.len() as i32 + 48;
    let panel_width = HINT_LINES
        .iter()
        .map(|line| text_width(line, HINT_TEXT_SCALE))
        .chain(std::iter::once(banner_width))
        .max()
        .unwrap_or(0)
        + 48;
    let panel_left = (target.width() - panel_width) / 2;
    let panel_top = (target.height() - panel_height) / 2;
    fill_rect(
        target,
        panel_left,
        panel_top,
        panel_width,
        panel_height,
        GAME_OVER_PANEL_COLOR,
    );

    let mut y = panel_top + 24;
    draw_text(
        target,
        (target.width() - banner_width) / 2,
        y,
        banner,
        BANNER_TEXT_SCALE,
        GAME_OVER_TEXT_COLOR,
    );
    y += text_height(BANNER_TEXT_SCALE) + HINT_TEXT_SCALE * 4;
    for line in HINT_LINES {
        let line_width = text_width(line, HINT_TEXT_SCALE);
        draw_text(
            target,
            (target.width() - line_width) / 2,
            y,
            line,
            HINT_TEXT_SCALE,
            HUD_TEXT_COLOR,
        );
        y += hint_line_height;
    }
}
