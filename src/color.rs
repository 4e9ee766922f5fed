use crate::{
    Scalar,
    utils::{mix_u8, unit_to_u8},
};
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// Common interface to all color representations
pub trait Color: Copy {
    /// Blend other color on top of this color
    fn blend_over(self, other: Self) -> Self;

    /// Override alpha component of the color
    fn with_alpha(self, alpha: Scalar) -> Self;

    /// Convert color to sRGBA list
    fn to_rgba(self) -> [u8; 4];

    /// Linear interpolation between self and other colors.
    fn lerp(self, other: Self, t: Scalar) -> Self;
}

/// Straight (not premultiplied) sRGBA color with 8-bit channels
///
/// Layout is identical to four consecutive bytes `[r, g, b, a]`, so pixel buffers
/// of this type can be reinterpreted as RGBA8 byte buffers without copying.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Pod, Zeroable)]
pub struct RGBA([u8; 4]);

impl RGBA {
    pub const BLACK: RGBA = RGBA::new(0, 0, 0, 255);
    pub const WHITE: RGBA = RGBA::new(255, 255, 255, 255);
    pub const TRANSPARENT: RGBA = RGBA::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }

    pub const fn red(self) -> u8 {
        self.0[0]
    }

    pub const fn green(self) -> u8 {
        self.0[1]
    }

    pub const fn blue(self) -> u8 {
        self.0[2]
    }

    pub const fn alpha(self) -> u8 {
        self.0[3]
    }

    /// Alpha channel as opacity in `[0, 1]`
    pub fn opacity(self) -> Scalar {
        self.alpha() as Scalar / 255.0
    }

    /// Same color with fully opaque alpha
    pub const fn opaque(self) -> Self {
        let [r, g, b, _] = self.0;
        Self([r, g, b, 255])
    }

    /// Sum of squared differences of `r`, `g` and `b` channels (alpha is ignored)
    #[inline]
    pub fn distance_sq(self, other: Self) -> u32 {
        let [r0, g0, b0, _] = self.0;
        let [r1, g1, b1, _] = other.0;
        let dr = r0 as i32 - r1 as i32;
        let dg = g0 as i32 - g1 as i32;
        let db = b0 as i32 - b1 as i32;
        (dr * dr + dg * dg + db * db) as u32
    }
}

impl Color for RGBA {
    fn to_rgba(self) -> [u8; 4] {
        self.0
    }

    fn blend_over(self, other: Self) -> Self {
        let [r, g, b, _] = self.lerp(other.opaque(), other.opacity()).0;
        let alpha = unit_to_u8(self.opacity() + other.opacity() * (1.0 - self.opacity()));
        RGBA::new(r, g, b, alpha)
    }

    fn with_alpha(self, alpha: Scalar) -> Self {
        let [r, g, b, _] = self.0;
        RGBA::new(r, g, b, unit_to_u8(alpha))
    }

    fn lerp(self, other: Self, t: Scalar) -> Self {
        let [r0, g0, b0, a0] = self.0;
        let [r1, g1, b1, a1] = other.0;
        RGBA::new(
            mix_u8(r0, r1, t),
            mix_u8(g0, g1, t),
            mix_u8(b0, b1, t),
            mix_u8(a0, a1, t),
        )
    }
}

impl fmt::Debug for RGBA {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "RGBA({})", self)
    }
}

impl fmt::Display for RGBA {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.to_rgba();
        write!(f, "#{:02x}{:02x}{:02x}", r, g, b)?;
        if a != 255 {
            write!(f, "{:02x}", a)?;
        }
        Ok(())
    }
}

impl FromStr for RGBA {
    type Err = ColorError;

    fn from_str(color: &str) -> Result<Self, Self::Err> {
        let hex = color.strip_prefix('#').ok_or(ColorError::HexExpected)?;
        if !hex.bytes().all(|byte| byte.is_ascii_hexdigit()) || (hex.len() != 6 && hex.len() != 8)
        {
            return Err(ColorError::HexExpected);
        }
        let mut channels = [255u8; 4];
        for (channel, pair) in channels.iter_mut().zip(hex.as_bytes().chunks(2)) {
            let pair = std::str::from_utf8(pair).map_err(|_| ColorError::HexExpected)?;
            *channel = u8::from_str_radix(pair, 16).map_err(|_| ColorError::HexExpected)?;
        }
        Ok(RGBA(channels))
    }
}

impl Serialize for RGBA {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RGBA {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let color = String::deserialize(deserializer)?;
        color.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorError {
    HexExpected,
}

impl fmt::Display for ColorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorError::HexExpected => {
                write!(f, "Color expected to be #RRGGBB(AA) in hexidemical format")
            }
        }
    }
}

impl std::error::Error for ColorError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_u8() {
        let c = RGBA::new(1, 2, 3, 4);
        assert_eq!([1, 2, 3, 4], c.to_rgba());
        assert_eq!(1, c.red());
        assert_eq!(2, c.green());
        assert_eq!(3, c.blue());
        assert_eq!(4, c.alpha());
        assert_eq!(bytemuck::cast_slice::<RGBA, u8>(&[c, c.opaque()]), &[1, 2, 3, 4, 1, 2, 3, 255]);
    }

    #[test]
    fn test_display_parse() -> Result<(), ColorError> {
        let c: RGBA = "#01020304".parse()?;
        assert_eq!(c, RGBA::new(1, 2, 3, 4));
        assert_eq!(c.to_string(), "#01020304");

        let c: RGBA = "#AaBbCc".parse()?;
        assert_eq!(c, RGBA::new(170, 187, 204, 255));
        assert_eq!(c.to_string(), "#aabbcc");

        assert_eq!("aabbcc".parse::<RGBA>(), Err(ColorError::HexExpected));
        assert_eq!("#aabbc".parse::<RGBA>(), Err(ColorError::HexExpected));
        assert_eq!("#gg0000".parse::<RGBA>(), Err(ColorError::HexExpected));
        assert_eq!("#+10000".parse::<RGBA>(), Err(ColorError::HexExpected));
        Ok(())
    }

    #[test]
    fn test_blend() {
        let bg = RGBA::new(0, 0, 0, 255);
        let fg = RGBA::new(255, 255, 255, 128);
        assert_eq!(bg.blend_over(fg), RGBA::new(128, 128, 128, 255));
        assert_eq!(bg.blend_over(RGBA::TRANSPARENT), bg);
        assert_eq!(bg.lerp(RGBA::new(200, 100, 50, 255), 1.0), RGBA::new(200, 100, 50, 255));
        assert_eq!(RGBA::new(10, 0, 0, 255).distance_sq(RGBA::new(0, 3, 4, 0)), 125);
    }

    #[test]
    fn test_serde() -> Result<(), serde_json::Error> {
        let c = RGBA::new(255, 128, 0, 255);
        let json = serde_json::to_string(&c)?;
        assert_eq!(json, "\"#ff8000\"");
        assert_eq!(serde_json::from_str::<RGBA>(&json)?, c);
        Ok(())
    }
}
