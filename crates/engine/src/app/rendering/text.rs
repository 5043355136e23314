use super::draw::{fill_rect, FrameTarget};

const GLYPH_WIDTH: i32 = 3;
const GLYPH_HEIGHT: i32 = 5;

type Glyph = [u8; GLYPH_HEIGHT as usize];

const BLANK: Glyph = [0, 0, 0, 0, 0];

/// Width in pixels of `text` drawn at `scale`.
pub(crate) fn text_width(text: &str, scale: i32) -> i32 {
    let chars = text.chars().count() as i32;
    if chars == 0 {
        return 0;
    }
    chars * (GLYPH_WIDTH + 1) * scale - scale
}

pub(crate) fn text_height(scale: i32) -> i32 {
    GLYPH_HEIGHT * scale
}

/// Draws `text` with its top-left corner at (`x`, `y`). Lowercase letters are
/// drawn as uppercase; characters outside the font draw as blanks.
pub(crate) fn draw_text(
    target: &mut FrameTarget<'_>,
    x: i32,
    y: i32,
    text: &str,
    scale: i32,
    color: [u8; 4],
) {
    let scale = scale.max(1);
    let mut cursor_x = x;
    for ch in text.chars() {
        let glyph = glyph_for(ch.to_ascii_uppercase()).unwrap_or(BLANK);
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                fill_rect(
                    target,
                    cursor_x + col * scale,
                    y + row as i32 * scale,
                    scale,
                    scale,
                    color,
                );
            }
        }
        cursor_x += (GLYPH_WIDTH + 1) * scale;
    }
}

fn glyph_for(ch: char) -> Option<Glyph> {
    let glyph = match ch {
        ' ' => BLANK,
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b010, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '!' => [0b010, 0b010, 0b010, 0b000, 0b010],
        'A' => [0b010, 0b101, 0b111, 0b101, 0b101],
        'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'E' => [0b111, 0b100, 0b110, 0b100, 0b111],
        'F' => [0b111, 0b100, 0b110, 0b100, 0b100],
        'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'M' => [0b101, 0b111, 0b111, 0b101, 0b101],
        'N' => [0b101, 0b111, 0b111, 0b111, 0b101],
        'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'P' => [0b110, 0b101, 0b110, 0b100, 0b100],
        'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'V' => [0b101, 0b101, 0b101, 0b101, 0b010],
        'W' => [0b101, 0b101, 0b111, 0b111, 0b101],
        'Y' => [0b101, 0b101, 0b010, 0b010, 0b010],
        _ => return None,
    };
    Some(glyph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hud_strings_are_fully_covered_by_font() {
        for text in ["SCORE: 0123456789", "GAME OVER!", "CLICK OR PRESS SPACE TO PLAY AGAIN"] {
            for ch in text.chars() {
                assert!(glyph_for(ch).is_some(), "missing glyph {ch:?}");
            }
        }
    }

    #[test]
    fn text_width_accounts_for_spacing() {
        assert_eq!(text_width("", 3), 0);
        assert_eq!(text_width("A", 3), 9);
        assert_eq!(text_width("AB", 2), 14);
        assert_eq!(text_height(4), 20);
    }

    #[test]
    fn drawing_clips_at_frame_edges() {
        let mut frame = vec![0u8; 8 * 8 * 4];
        let mut target = FrameTarget::new(&mut frame, 8, 8);
        draw_text(&mut target, -5, 6, "8", 2, [255, 255, 255, 255]);
        draw_text(&mut target, 6, -3, "SCORE", 2, [255, 255, 255, 255]);
        assert!(frame.iter().any(|byte| *byte == 255));
    }
}
