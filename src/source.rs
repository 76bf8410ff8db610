use std::ops::Deref;

use image::{ImageBuffer, Luma, Primitive};

use crate::buffer::{PixelBuffer, Row};
use crate::pixel::Pixel;

/// An image that can hand out its rows top to bottom.
pub trait RowImage {
    type Pixel: Pixel;

    fn width(&self) -> usize;

    fn height(&self) -> usize;

    /// Row `r`, for `r < self.height()`.
    fn row(&self, r: usize) -> Row<'_, Self::Pixel>;
}

impl<P: Pixel> RowImage for PixelBuffer<'_, P> {
    type Pixel = P;

    fn width(&self) -> usize {
        self.cols()
    }

    fn height(&self) -> usize {
        self.rows()
    }

    fn row(&self, r: usize) -> Row<'_, P> {
        PixelBuffer::row(self, r)
    }
}

/// Single-channel images from the `image` crate, e.g. [`image::GrayImage`].
impl<T, C> RowImage for ImageBuffer<Luma<T>, C>
where
    T: Primitive + Pixel<Word = T>,
    C: Deref<Target = [T]>,
{
    type Pixel = T;

    fn width(&self) -> usize {
        ImageBuffer::width(self) as usize
    }

    fn height(&self) -> usize {
        ImageBuffer::height(self) as usize
    }

    fn row(&self, r: usize) -> Row<'_, T> {
        let width = RowImage::width(self);
        Row::from(&self.as_raw()[r * width..(r + 1) * width])
    }
}

impl<I: RowImage + ?Sized> RowImage for &I {
    type Pixel = I::Pixel;

    fn width(&self) -> usize {
        (**self).width()
    }

    fn height(&self) -> usize {
        (**self).height()
    }

    fn row(&self, r: usize) -> Row<'_, I::Pixel> {
        (**self).row(r)
    }
}
