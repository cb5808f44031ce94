use lcd_pixel::{FRAME_HEIGHT, FRAME_WIDTH};

/// Deterministic diagonal hue ramp used when neither an image nor a video
/// source is configured, or when every decode attempt fails. Pure
/// arithmetic, no file I/O -- calling it twice for the same dimensions
/// always produces byte-identical output.
pub fn synthetic_gradient_rgb(width: usize, height: usize) -> Vec<u8> {
    let mut buf = vec![0u8; width * height * 3];
    let denom = (width + height).max(1) as f32;
    for row in 0..height {
        for col in 0..width {
            let t = (row + col) as f32 / denom;
            let (r, g, b) = hue_ramp(t);
            let dst = (row * width + col) * 3;
            buf[dst] = r;
            buf[dst + 1] = g;
            buf[dst + 2] = b;
        }
    }
    buf
}

/// Convenience wrapper at the panel's fixed frame size.
pub fn default_gradient() -> Vec<u8> {
    synthetic_gradient_rgb(FRAME_WIDTH, FRAME_HEIGHT)
}

/// Map `t` in `[0, 1]` to an 8-bit RGB triple tracing a smooth hue ramp
/// (red -> green -> blue -> red).
fn hue_ramp(t: f32) -> (u8, u8, u8) {
    let t = t.rem_euclid(1.0);
    let h = t * 3.0;
    let sector = h.floor() as u32 % 3;
    let frac = h.fract();
    let rising = (frac * 255.0) as u8;
    let falling = 255 - rising;
    match sector {
        0 => (falling, rising, 0),
        1 => (0, falling, rising),
        _ => (rising, 0, falling),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_is_deterministic() {
        let a = default_gradient();
        let b = default_gradient();
        assert_eq!(a, b);
    }

    #[test]
    fn gradient_has_expected_size_and_is_not_blank() {
        let g = default_gradient();
        assert_eq!(g.len(), FRAME_WIDTH * FRAME_HEIGHT * 3);
        assert!(g.iter().any(|&b| b != 0));
    }

    #[test]
    fn hue_ramp_wraps_at_one() {
        assert_eq!(hue_ramp(0.0), hue_ramp(1.0));
    }
}
