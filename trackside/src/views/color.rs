//! Deterministic driver colors.

use std::fmt;

/// Saturation used for every driver color, in percent.
pub const DRIVER_SATURATION: u8 = 70;

/// Lightness used for every driver color, in percent.
pub const DRIVER_LIGHTNESS: u8 = 50;

/// An HSL color rendered as CSS Color Level 4 `hsl(H S% L%)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HslColor {
    /// Hue in degrees, `0..360`.
    pub hue: u16,
    /// Saturation in percent.
    pub saturation: u8,
    /// Lightness in percent.
    pub lightness: u8,
}

impl HslColor {
    /// Pure white, used for highlighted markers.
    pub const WHITE: HslColor = HslColor {
        hue: 0,
        saturation: 0,
        lightness: 100,
    };
}

impl fmt::Display for HslColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hsl({} {}% {}%)",
            self.hue, self.saturation, self.lightness
        )
    }
}

/// Derive a stable color from a driver code.
///
/// Hashes the UTF-16 code units with `hash = hash * 31 + unit` in wrapping
/// 32-bit arithmetic and uses `|hash| mod 360` as the hue, so the same code
/// maps to the same color in every session.
pub fn color_for_code(code: &str) -> HslColor {
    let hash = code
        .encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as i32));

    HslColor {
        hue: ((hash as i64).abs() % 360) as u16,
        saturation: DRIVER_SATURATION,
        lightness: DRIVER_LIGHTNESS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_hues() {
        // "VER": ((86 * 31) + 69) * 31 + 82 = 84867
        assert_eq!(color_for_code("VER").hue, (84867 % 360) as u16);
        assert_eq!(color_for_code("").hue, 0);
        assert_eq!(color_for_code("A").hue, 65);
    }

    #[test]
    fn test_display_format() {
        assert_eq!(color_for_code("A").to_string(), "hsl(65 70% 50%)");
        assert_eq!(HslColor::WHITE.to_string(), "hsl(0 0% 100%)");
    }

    #[test]
    fn test_long_codes_wrap_without_overflow() {
        let code = "HAMILTON-VERSTAPPEN-LECLERC-NORRIS";
        let color = color_for_code(code);
        assert!(color.hue < 360);
        assert_eq!(color, color_for_code(code));
    }

    #[test]
    fn test_negative_hash_uses_absolute_value() {
        // "LECLERCQ" hashes to -1886678915.
        assert_eq!(color_for_code("LECLERCQ").hue, 275);
        assert_eq!(color_for_code("zzzzzzzz").hue, 72);
    }
}
