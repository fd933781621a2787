/// Stable fallback color for a word whose layout entry carries no usable color.
/// Hue comes from the CRC32 of the word; saturation and lightness are fixed so
/// the glyph stays legible on a light fill.
pub fn word_color(word: &str) -> (u8, u8, u8) {
    let hash = crc32fast::hash(word.as_bytes());
    let hue = (hash % 360) as f64;
    hsl_to_rgb(hue, 0.65, 0.38)
}

pub fn to_hex((r, g, b): (u8, u8, u8)) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}

/// Parse `#rgb` or `#rrggbb`.
pub fn parse_hex(s: &str) -> Option<(u8, u8, u8)> {
    let hex = s.trim().strip_prefix('#')?;
    let channel = |i: usize, len: usize| u8::from_str_radix(hex.get(i..i + len)?, 16).ok();
    match hex.len() {
        3 => {
            let (r, g, b) = (channel(0, 1)?, channel(1, 1)?, channel(2, 1)?);
            Some((r * 17, g * 17, b * 17))
        }
        6 => Some((channel(0, 2)?, channel(2, 2)?, channel(4, 2)?)),
        _ => None,
    }
}

/// The entry's own color when it parses, otherwise the hashed fallback.
pub fn glyph_color(word: &str, color: &str) -> String {
    match parse_hex(color) {
        Some(rgb) => to_hex(rgb),
        None => to_hex(word_color(word)),
    }
}

/// Convert RGB to HSL. Returns (h: 0..360, s: 0..1, l: 0..1).
pub fn rgb_to_hsl(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    let r = r as f64 / 255.0;
    let g = g as f64 / 255.0;
    let b = b as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if (max - min).abs() < f64::EPSILON {
        return (0.0, 0.0, l);
    }

    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };

    let h = if (max - r).abs() < f64::EPSILON {
        let mut h = (g - b) / d;
        if g < b {
            h += 6.0;
        }
        h
    } else if (max - g).abs() < f64::EPSILON {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };

    (h * 60.0, s, l)
}

/// Convert HSL to RGB.
pub fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    if s.abs() < f64::EPSILON {
        let v = (l * 255.0).round() as u8;
        return (v, v, v);
    }

    let q = if l < 0.5 {
        l * (1.0 + s)
    } else {
        l + s - l * s
    };
    let p = 2.0 * l - q;
    let h = h / 360.0;

    let r = hue_to_rgb(p, q, h + 1.0 / 3.0);
    let g = hue_to_rgb(p, q, h);
    let b = hue_to_rgb(p, q, h - 1.0 / 3.0);

    (
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
    )
}

fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 1.0 / 2.0 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

/// Interpolate between two HSL colors using shortest hue path.
pub fn interpolate_hsl(from: (f64, f64, f64), to: (f64, f64, f64), t: f64) -> (f64, f64, f64) {
    let mut dh = to.0 - from.0;
    if dh > 180.0 {
        dh -= 360.0;
    } else if dh < -180.0 {
        dh += 360.0;
    }

    let h = (from.0 + dh * t).rem_euclid(360.0);
    let s = from.1 + (to.1 - from.1) * t;
    let l = from.2 + (to.2 - from.2) * t;

    (h, s, l)
}

#[cfg(test)]
mod tests {
    use super::{glyph_color, hsl_to_rgb, interpolate_hsl, parse_hex, rgb_to_hsl, to_hex, word_color};

    fn assert_close(actual: f64, expected: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff < 1e-9,
            "expected {expected}, got {actual} (diff: {diff})"
        );
    }

    #[test]
    fn temperature_endpoints_survive_hsl_roundtrip() {
        for rgb in [(49, 130, 189), (222, 45, 38), (255, 255, 255), (37, 91, 201)] {
            let (h, s, l) = rgb_to_hsl(rgb.0, rgb.1, rgb.2);
            assert_eq!(hsl_to_rgb(h, s, l), rgb);
        }
    }

    #[test]
    fn hue_interpolation_takes_the_short_way_round() {
        let mid = interpolate_hsl((350.0, 0.6, 0.4), (10.0, 0.8, 0.5), 0.5);
        assert_close(mid.0, 0.0);
        assert_close(mid.1, 0.7);
        assert_close(mid.2, 0.45);
    }

    #[test]
    fn word_color_is_deterministic() {
        assert_eq!(word_color("ラーメン"), word_color("ラーメン"));
        assert_ne!(word_color("ラーメン"), word_color("寿司"));
    }

    #[test]
    fn parse_hex_accepts_short_and_long_forms() {
        assert_eq!(parse_hex("#fff"), Some((255, 255, 255)));
        assert_eq!(parse_hex("#e41a1c"), Some((0xe4, 0x1a, 0x1c)));
        assert_eq!(parse_hex("e41a1c"), None);
        assert_eq!(parse_hex("#12345"), None);
        assert_eq!(parse_hex("#zzzzzz"), None);
    }

    #[test]
    fn glyph_color_falls_back_to_hash_for_unparseable_colors() {
        assert_eq!(glyph_color("w", "#ABCDEF"), "#abcdef");
        assert_eq!(glyph_color("w", "steelblue"), to_hex(word_color("w")));
    }
}
