use std::ops::Not;

use ndarray::{Array2, ArrayView2};

use crate::error::{TraceError, TraceResult};
use crate::pixel::Pixel;
use crate::rle::RunArray;

#[derive(Debug)]
enum Storage<'a, W> {
    Owned(Vec<W>),
    Borrowed(&'a mut [W]),
}

impl<W> Storage<'_, W> {
    fn as_slice(&self) -> &[W] {
        match self {
            Storage::Owned(words) => words,
            Storage::Borrowed(words) => words,
        }
    }

    fn as_mut_slice(&mut self) -> &mut [W] {
        match self {
            Storage::Owned(words) => words,
            Storage::Borrowed(words) => words,
        }
    }
}

/// Row-major 2D pixel store over owned or caller-supplied storage.
///
/// Rows start on a word boundary, so a row of `cols` pixels spans
/// `P::words_for(cols)` storage words. Borrowed storage is never reallocated in
/// place; [`PixelBuffer::resize`] to new dimensions switches to owned storage.
#[derive(Debug)]
pub struct PixelBuffer<'a, P: Pixel> {
    rows: usize,
    cols: usize,
    stride: usize,
    storage: Storage<'a, P::Word>,
}

impl<P: Pixel> PixelBuffer<'static, P> {
    /// Create an owned buffer with every pixel set to `P::default()`.
    pub fn new(rows: usize, cols: usize) -> Self {
        let (rows, cols) = normalized(rows, cols);
        let stride = P::words_for(cols);
        Self {
            rows,
            cols,
            stride,
            storage: Storage::Owned(vec![P::Word::default(); rows * stride]),
        }
    }

    /// Create an owned buffer by evaluating `f(row, col)` for every pixel.
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> P) -> Self {
        let mut buffer = Self::new(rows, cols);
        for r in 0..buffer.rows {
            let mut row = buffer.row_mut(r);
            for c in 0..row.len() {
                row.set(c, f(r, c));
            }
        }
        buffer
    }

    /// Copy an array of any memory layout into a new buffer.
    pub fn from_ndarray(view: ArrayView2<'_, P>) -> Self {
        let (rows, cols) = view.dim();
        Self::from_fn(rows, cols, |r, c| view[[r, c]])
    }
}

impl PixelBuffer<'static, bool> {
    /// Decode one run array per row into a packed boolean buffer.
    pub fn from_runs(rows: &[RunArray]) -> TraceResult<Self> {
        let cols = rows.first().map_or(0, RunArray::width);
        let mut buffer = Self::new(rows.len(), cols);
        for (r, runs) in rows.iter().enumerate() {
            if runs.width() != cols {
                return Err(TraceError::RowWidthMismatch {
                    expected: cols,
                    found: runs.width(),
                });
            }
            if !buffer.is_empty() {
                buffer.row_mut(r).decode_runs(runs);
            }
        }
        Ok(buffer)
    }
}

impl<'a, P: Pixel> PixelBuffer<'a, P> {
    /// Wrap caller-owned storage holding `rows` rows of `P::words_for(cols)` words each.
    pub fn from_storage(rows: usize, cols: usize, storage: &'a mut [P::Word]) -> TraceResult<Self> {
        let (rows, cols) = normalized(rows, cols);
        let stride = P::words_for(cols);
        let expected = rows * stride;
        if storage.len() < expected {
            return Err(TraceError::StorageTooSmall {
                expected,
                found: storage.len(),
            });
        }
        Ok(Self {
            rows,
            cols,
            stride,
            storage: Storage::Borrowed(&mut storage[..expected]),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Storage words per row.
    pub fn words_per_row(&self) -> usize {
        self.stride
    }

    /// Whether the buffer allocated its own storage.
    pub fn owns_storage(&self) -> bool {
        matches!(self.storage, Storage::Owned(_))
    }

    /// Change the dimensions, discarding the contents.
    ///
    /// A no-op when the dimensions are unchanged. Otherwise the buffer switches to
    /// freshly allocated, default-filled owned storage.
    pub fn resize(&mut self, rows: usize, cols: usize) {
        let (rows, cols) = normalized(rows, cols);
        if (rows, cols) == (self.rows, self.cols) {
            return;
        }
        self.rows = rows;
        self.cols = cols;
        self.stride = P::words_for(cols);
        self.storage = Storage::Owned(vec![P::Word::default(); rows * self.stride]);
    }

    /// Read-only cursor over row `r`.
    ///
    /// # Panics
    ///
    /// Panics if `r >= self.rows()`.
    pub fn row(&self, r: usize) -> Row<'_, P> {
        assert!(r < self.rows, "row index out of bounds");
        let words = &self.storage.as_slice()[r * self.stride..(r + 1) * self.stride];
        Row {
            words,
            len: self.cols,
        }
    }

    /// Mutable cursor over row `r`.
    ///
    /// # Panics
    ///
    /// Panics if `r >= self.rows()`.
    pub fn row_mut(&mut self, r: usize) -> RowMut<'_, P> {
        assert!(r < self.rows, "row index out of bounds");
        let stride = self.stride;
        let words = &mut self.storage.as_mut_slice()[r * stride..(r + 1) * stride];
        RowMut {
            words,
            len: self.cols,
        }
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = Row<'_, P>> {
        (0..self.rows).map(move |r| self.row(r))
    }

    pub fn get(&self, r: usize, c: usize) -> P {
        self.row(r).get(c)
    }

    pub fn set(&mut self, r: usize, c: usize, value: P) {
        self.row_mut(r).set(c, value);
    }

    /// Set every pixel to `value`.
    pub fn fill(&mut self, value: P) {
        self.storage.as_mut_slice().fill(P::splat(value));
    }

    /// True when every pixel equals `value`.
    pub fn is_uniform(&self, value: P) -> bool {
        self.iter_rows().all(|row| row.is_uniform(value))
    }

    /// Deep copy into owned storage.
    pub fn to_owned_buffer(&self) -> PixelBuffer<'static, P> {
        PixelBuffer {
            rows: self.rows,
            cols: self.cols,
            stride: self.stride,
            storage: Storage::Owned(self.storage.as_slice().to_vec()),
        }
    }

    /// Run-length encoding of row `r`.
    pub fn row_runs(&self, r: usize) -> RunArray {
        RunArray::encode(self.row(r))
    }

    pub fn to_ndarray(&self) -> TraceResult<Array2<P>> {
        let pixels: Vec<P> = self.iter_rows().flat_map(|row| row.iter()).collect();
        Ok(Array2::from_shape_vec((self.rows, self.cols), pixels)?)
    }
}

impl<P> PixelBuffer<'_, P>
where
    P: Pixel,
    P::Word: Not<Output = P::Word>,
{
    /// Bitwise NOT of every storage word.
    pub fn complement(&mut self) {
        for word in self.storage.as_mut_slice() {
            *word = !*word;
        }
    }
}

impl<P: Pixel> PartialEq for PixelBuffer<'_, P> {
    fn eq(&self, other: &Self) -> bool {
        self.dimensions() == other.dimensions()
            && self.iter_rows().zip(other.iter_rows()).all(|(a, b)| a == b)
    }
}

/// A buffer with no pixels keeps no storage and reports `0 x 0`.
fn normalized(rows: usize, cols: usize) -> (usize, usize) {
    if rows == 0 || cols == 0 {
        (0, 0)
    } else {
        (rows, cols)
    }
}

/// Read-only view of one row of pixels.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a, P: Pixel> {
    words: &'a [P::Word],
    len: usize,
}

impl<'a, P: Pixel> Row<'a, P> {
    /// View `len` pixels stored in `words`.
    ///
    /// # Panics
    ///
    /// Panics if `words` holds fewer than `P::words_for(len)` words.
    pub fn from_words(words: &'a [P::Word], len: usize) -> Self {
        assert!(words.len() >= P::words_for(len), "row storage too short");
        Self { words, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Backing storage words, including any padding in the last word.
    pub fn words(&self) -> &'a [P::Word] {
        self.words
    }

    pub fn get(&self, index: usize) -> P {
        assert!(index < self.len, "column index out of bounds");
        P::read(self.words, index)
    }

    pub fn iter(self) -> impl Iterator<Item = P> + 'a {
        let words = self.words;
        (0..self.len).map(move |index| P::read(words, index))
    }

    pub fn is_uniform(&self, value: P) -> bool {
        let full = self.len / P::PER_WORD;
        let splat = P::splat(value);
        self.words[..full].iter().all(|word| *word == splat)
            && (full * P::PER_WORD..self.len).all(|index| P::read(self.words, index) == value)
    }

    pub fn runs(&self) -> RunArray {
        RunArray::encode(*self)
    }
}

impl<'a, P: Pixel<Word = P>> From<&'a [P]> for Row<'a, P> {
    fn from(pixels: &'a [P]) -> Self {
        Self {
            words: pixels,
            len: pixels.len(),
        }
    }
}

impl<'a, P: Pixel<Word = P>> From<&'a Vec<P>> for Row<'a, P> {
    fn from(pixels: &'a Vec<P>) -> Self {
        Self::from(pixels.as_slice())
    }
}

impl<'a, P: Pixel<Word = P>, const N: usize> From<&'a [P; N]> for Row<'a, P> {
    fn from(pixels: &'a [P; N]) -> Self {
        Self::from(pixels.as_slice())
    }
}

impl<P: Pixel> PartialEq<Row<'_, P>> for Row<'_, P> {
    fn eq(&self, other: &Row<'_, P>) -> bool {
        if self.len != other.len {
            return false;
        }
        let full = self.len / P::PER_WORD;
        self.words[..full] == other.words[..full]
            && (full * P::PER_WORD..self.len)
                .all(|index| P::read(self.words, index) == P::read(other.words, index))
    }
}

/// Mutable view of one row of pixels.
#[derive(Debug)]
pub struct RowMut<'a, P: Pixel> {
    words: &'a mut [P::Word],
    len: usize,
}

impl<'a, P: Pixel> RowMut<'a, P> {
    /// Mutable view of `len` pixels stored in `words`.
    ///
    /// # Panics
    ///
    /// Panics if `words` holds fewer than `P::words_for(len)` words.
    pub fn from_words(words: &'a mut [P::Word], len: usize) -> Self {
        assert!(words.len() >= P::words_for(len), "row storage too short");
        Self { words, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_row(&self) -> Row<'_, P> {
        Row {
            words: self.words,
            len: self.len,
        }
    }

    pub(crate) fn words_mut(&mut self) -> &mut [P::Word] {
        self.words
    }

    pub fn get(&self, index: usize) -> P {
        self.as_row().get(index)
    }

    pub fn set(&mut self, index: usize, value: P) {
        assert!(index < self.len, "column index out of bounds");
        P::write(self.words, index, value);
    }

    pub fn fill(&mut self, value: P) {
        self.words.fill(P::splat(value));
    }

    /// Copy `source` into this row, mirrored left to right when `flip` is set.
    ///
    /// # Panics
    ///
    /// Panics if the rows differ in length.
    pub fn copy_from(&mut self, source: Row<'_, P>, flip: bool) {
        assert_eq!(source.len(), self.len, "row lengths differ");
        if flip {
            for index in 0..self.len {
                P::write(self.words, index, source.get(self.len - 1 - index));
            }
        } else {
            let count = P::words_for(self.len);
            self.words[..count].copy_from_slice(&source.words()[..count]);
        }
    }
}

impl<P> RowMut<'_, P>
where
    P: Pixel,
    P::Word: Not<Output = P::Word>,
{
    /// Bitwise NOT of every storage word of the row.
    pub fn complement(&mut self) {
        for word in self.words.iter_mut() {
            *word = !*word;
        }
    }
}

impl RowMut<'_, bool> {
    /// Overwrite the row with the pixels described by `runs`.
    pub fn decode_runs(&mut self, runs: &RunArray) {
        runs.decode_into(self);
    }
}

impl<'a, P: Pixel<Word = P>> From<&'a mut [P]> for RowMut<'a, P> {
    fn from(pixels: &'a mut [P]) -> Self {
        let len = pixels.len();
        Self { words: pixels, len }
    }
}
