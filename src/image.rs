//! Pixel grids used for the target image, the canvas and coverage masks
use crate::{BBox, Color, Error, RGBA, Scalar};
use serde::{Deserialize, Serialize};

/// Size of an image in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: usize,
    pub height: usize,
}

impl Size {
    /// Offset of the pixel in the row major data array
    #[inline]
    pub fn offset(&self, row: usize, col: usize) -> usize {
        row * self.width + col
    }

    /// Total number of pixels
    #[inline]
    pub fn area(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Half-open rectangular region of pixels `[x0, x1) x [y0, y1)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PixelRect {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

impl PixelRect {
    pub fn new(x0: usize, y0: usize, x1: usize, y1: usize) -> Self {
        Self {
            x0,
            y0,
            x1: x1.max(x0),
            y1: y1.max(y0),
        }
    }

    /// Region covering the whole image of the given size
    pub fn full(size: Size) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    /// Smallest pixel region containing the bounding box, clipped to `size`.
    ///
    /// Non-finite bounding boxes produce an empty region.
    pub fn from_bbox(bbox: BBox, size: Size) -> Self {
        let (min, max) = (bbox.min(), bbox.max());
        if !min.is_finite() || !max.is_finite() {
            return Self::default();
        }
        let clip = |value: Scalar, limit: usize| value.max(0.0).min(limit as Scalar) as usize;
        Self::new(
            clip(min.x().floor(), size.width),
            clip(min.y().floor(), size.height),
            clip(max.x().ceil(), size.width),
            clip(max.y().ceil(), size.height),
        )
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.x1 - self.x0
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.y1 - self.y0
    }

    pub fn size(&self) -> Size {
        Size {
            width: self.width(),
            height: self.height(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }

    /// Intersection of two regions, empty regions are normalized to default
    pub fn intersect(&self, other: PixelRect) -> PixelRect {
        let rect = PixelRect::new(
            self.x0.max(other.x0),
            self.y0.max(other.y0),
            self.x1.min(other.x1),
            self.y1.min(other.y1),
        );
        if rect.is_empty() {
            PixelRect::default()
        } else {
            rect
        }
    }
}

pub trait Image {
    type Pixel;

    fn data(&self) -> &[Self::Pixel];

    fn size(&self) -> Size;

    fn width(&self) -> usize {
        self.size().width
    }

    fn height(&self) -> usize {
        self.size().height
    }

    fn get(&self, row: usize, col: usize) -> Option<&Self::Pixel> {
        let size = self.size();
        if row >= size.height || col >= size.width {
            return None;
        }
        self.data().get(size.offset(row, col))
    }

    /// Pixels of a single row restricted to columns `[x0, x1)`
    fn row(&self, row: usize, x0: usize, x1: usize) -> &[Self::Pixel] {
        let offset = self.size().offset(row, 0);
        &self.data()[offset + x0..offset + x1]
    }
}

pub trait ImageMut: Image {
    fn data_mut(&mut self) -> &mut [Self::Pixel];

    fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut Self::Pixel> {
        let size = self.size();
        if row >= size.height || col >= size.width {
            return None;
        }
        self.data_mut().get_mut(size.offset(row, col))
    }

    fn row_mut(&mut self, row: usize, x0: usize, x1: usize) -> &mut [Self::Pixel] {
        let offset = self.size().offset(row, 0);
        &mut self.data_mut()[offset + x0..offset + x1]
    }

    fn fill(&mut self, value: Self::Pixel)
    where
        Self::Pixel: Clone,
    {
        self.data_mut().fill(value)
    }
}

/// Row major image that owns its pixels
#[derive(Debug, Clone, PartialEq)]
pub struct ImageOwned<P> {
    size: Size,
    data: Vec<P>,
}

impl<P> ImageOwned<P> {
    pub fn new_with<F>(height: usize, width: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> P,
    {
        let mut data = Vec::with_capacity(height * width);
        for row in 0..height {
            for col in 0..width {
                data.push(f(row, col))
            }
        }
        Self {
            size: Size { width, height },
            data,
        }
    }

    pub fn new_filled(height: usize, width: usize, value: P) -> Self
    where
        P: Clone,
    {
        Self {
            size: Size { width, height },
            data: vec![value; height * width],
        }
    }

    pub fn new_default(height: usize, width: usize) -> Self
    where
        P: Default + Clone,
    {
        Self::new_filled(height, width, P::default())
    }

    pub fn to_vec(self) -> Vec<P> {
        self.data
    }
}

impl<P> Image for ImageOwned<P> {
    type Pixel = P;

    fn size(&self) -> Size {
        self.size
    }

    fn data(&self) -> &[Self::Pixel] {
        &self.data
    }
}

impl<P> ImageMut for ImageOwned<P> {
    fn data_mut(&mut self) -> &mut [Self::Pixel] {
        &mut self.data
    }
}

impl<I> Image for &I
where
    I: Image + ?Sized,
{
    type Pixel = I::Pixel;

    fn size(&self) -> Size {
        (*self).size()
    }

    fn data(&self) -> &[Self::Pixel] {
        (*self).data()
    }
}

impl<I> Image for &mut I
where
    I: Image + ?Sized,
{
    type Pixel = I::Pixel;

    fn size(&self) -> Size {
        (**self).size()
    }

    fn data(&self) -> &[Self::Pixel] {
        (**self).data()
    }
}

impl<I> ImageMut for &mut I
where
    I: ImageMut + ?Sized,
{
    fn data_mut(&mut self) -> &mut [Self::Pixel] {
        (**self).data_mut()
    }
}

/// Color image with opaque pixels, used both for the target and the canvas
pub type Raster = ImageOwned<RGBA>;

impl Raster {
    /// Pixels as a tightly packed RGBA8 byte buffer
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.data())
    }

    /// Mean color of all pixels (rounded per channel)
    pub fn average_color(&self) -> RGBA {
        let count = self.data.len() as u64;
        if count == 0 {
            return RGBA::WHITE;
        }
        let mut sums = [0u64; 3];
        for pixel in self.data.iter() {
            sums[0] += pixel.red() as u64;
            sums[1] += pixel.green() as u64;
            sums[2] += pixel.blue() as u64;
        }
        let [r, g, b] = sums.map(|sum| ((sum + count / 2) / count) as u8);
        RGBA::new(r, g, b, 255)
    }
}

/// Channel layout of a decoded pixel payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Gray8,
    GrayAlpha8,
    Rgb8,
    Rgba8,
}

impl PixelFormat {
    /// Number of bytes per pixel
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::GrayAlpha8 => 2,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }

    fn pixel(self, bytes: &[u8]) -> RGBA {
        match *bytes {
            [l] => RGBA::new(l, l, l, 255),
            [l, a] => RGBA::new(l, l, l, a),
            [r, g, b] => RGBA::new(r, g, b, 255),
            [r, g, b, a] => RGBA::new(r, g, b, a),
            _ => RGBA::TRANSPARENT,
        }
    }
}

/// Decoded pixel payload produced by an external image decoder
///
/// Rows are tightly packed, top to bottom, without padding.
#[derive(Debug, Clone, Copy)]
pub struct RawImage<'a> {
    pub width: usize,
    pub height: usize,
    pub format: PixelFormat,
    pub data: &'a [u8],
}

impl<'a> RawImage<'a> {
    pub fn new(width: usize, height: usize, format: PixelFormat, data: &'a [u8]) -> Self {
        Self {
            width,
            height,
            format,
            data,
        }
    }

    /// RGBA8 payload, the format produced by browser and most image decoders
    pub fn rgba8(width: usize, height: usize, data: &'a [u8]) -> Self {
        Self::new(width, height, PixelFormat::Rgba8, data)
    }

    /// Convert payload into an opaque raster, translucent pixels are flattened over white.
    pub fn decode(&self) -> Result<Raster, Error> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::decode(format!(
                "image has zero dimension {}x{}",
                self.width, self.height
            )));
        }
        let expected = self
            .width
            .checked_mul(self.height)
            .and_then(|area| area.checked_mul(self.format.channels()))
            .ok_or_else(|| Error::decode("image dimensions overflow"))?;
        if self.data.len() != expected {
            return Err(Error::decode(format!(
                "expected {} bytes for {}x{} {:?} image, got {}",
                expected,
                self.width,
                self.height,
                self.format,
                self.data.len()
            )));
        }
        let data = self
            .data
            .chunks_exact(self.format.channels())
            .map(|bytes| RGBA::WHITE.blend_over(self.format.pixel(bytes)))
            .collect();
        Ok(ImageOwned {
            size: Size {
                width: self.width,
                height: self.height,
            },
            data,
        })
    }
}
