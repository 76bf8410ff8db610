//! Run-length rows.
//!
//! A run array alternates background and foreground run lengths, always starting
//! with a background run. Only that first run may be empty. Encoded arrays carry one
//! trailing zero terminator, which is not counted as a run.

use crate::buffer::{PixelBuffer, Row, RowMut};
use crate::error::{TraceError, TraceResult};
use crate::pixel::{Pixel, fill_bit_range};

/// Integer types accepted as pre-encoded run lengths.
pub trait RunLength: Copy {
    /// The length as an unsigned count, `None` when negative.
    fn to_count(self) -> Option<u64>;
}

macro_rules! impl_unsigned_run_length {
    ($($ty:ty),*) => {$(
        impl RunLength for $ty {
            fn to_count(self) -> Option<u64> {
                Some(self as u64)
            }
        }
    )*};
}

macro_rules! impl_signed_run_length {
    ($($ty:ty),*) => {$(
        impl RunLength for $ty {
            fn to_count(self) -> Option<u64> {
                u64::try_from(self).ok()
            }
        }
    )*};
}

impl_unsigned_run_length!(u8, u16, u32, u64, usize);
impl_signed_run_length!(i16, i32, i64);

/// One maximal span of equal pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub foreground: bool,
    pub start: usize,
    pub len: usize,
}

/// A canonical run-length row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunArray {
    runs: Vec<u32>,
}

impl RunArray {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode a row of pixels; a pixel is foreground when [`Pixel::is_foreground`].
    pub fn encode<P: Pixel>(row: Row<'_, P>) -> Self {
        let mut runs = Self::new();
        runs.encode_into(row);
        runs
    }

    /// Encode `row` in place, reusing the allocation. Returns the number of runs.
    pub fn encode_into<P: Pixel>(&mut self, row: Row<'_, P>) -> usize {
        self.runs.clear();
        P::push_runs(row.words(), row.len(), &mut self.runs);
        let count = self.runs.len();
        self.runs.push(0);
        count
    }

    /// Validate and copy runs that were encoded elsewhere.
    pub fn reencode<R: RunLength>(runs: &[R], width: usize) -> TraceResult<Self> {
        let mut array = Self::new();
        array.reencode_into(runs, width)?;
        Ok(array)
    }

    /// Copy runs until they cover `width` columns. Returns the number of runs.
    ///
    /// Empty runs after the first are folded into their neighbours. When the runs
    /// overshoot the width, the last run is cut back so the array still covers exactly
    /// `width` columns, and [`TraceError::MalformedRun`] is returned. Running out of
    /// runs before the width is covered is a [`TraceError::RowWidthMismatch`].
    /// On every error the array is still terminated.
    pub fn reencode_into<R: RunLength>(&mut self, runs: &[R], width: usize) -> TraceResult<usize> {
        self.runs.clear();
        let copied = self.copy_runs(runs, width);
        self.runs.push(0);
        copied
    }

    fn copy_runs<R: RunLength>(&mut self, runs: &[R], width: usize) -> TraceResult<usize> {
        let target = width as u64;
        let mut covered = 0u64;
        let mut merge_next = false;
        let mut source = runs.iter();
        while covered < target || self.runs.is_empty() {
            let Some(&run) = source.next() else {
                return Err(TraceError::RowWidthMismatch {
                    expected: width,
                    found: covered as usize,
                });
            };
            let Some(run) = run.to_count() else {
                return Err(TraceError::MalformedRun {
                    width,
                    sum: covered,
                });
            };
            let kept = run.min(target - covered);
            covered = covered.saturating_add(run);
            if self.push_run(kept, &mut merge_next).is_none() || covered > target {
                return Err(TraceError::MalformedRun {
                    width,
                    sum: covered,
                });
            }
        }
        Ok(self.runs.len())
    }

    /// Append one run, folding it into the previous run after an empty one.
    /// `None` when the run does not fit the storage word.
    fn push_run(&mut self, run: u64, merge_next: &mut bool) -> Option<()> {
        let run = u32::try_from(run).ok()?;
        if self.runs.is_empty() {
            self.runs.push(run);
        } else if run == 0 {
            *merge_next = !*merge_next;
        } else if *merge_next {
            let last = self.runs.last_mut()?;
            *last = last.checked_add(run)?;
            *merge_next = false;
        } else {
            self.runs.push(run);
        }
        Some(())
    }

    /// The runs, without the terminator.
    pub fn runs(&self) -> &[u32] {
        match self.runs.split_last() {
            Some((0, rest)) => rest,
            _ => &self.runs,
        }
    }

    /// Number of runs, excluding the terminator.
    pub fn count(&self) -> usize {
        self.runs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs().is_empty()
    }

    /// Number of columns covered.
    pub fn width(&self) -> usize {
        self.runs().iter().map(|&run| run as usize).sum()
    }

    /// Non-empty spans in left to right order.
    pub fn spans(&self) -> impl Iterator<Item = Span> + '_ {
        let mut start = 0;
        self.runs()
            .iter()
            .enumerate()
            .filter_map(move |(index, &run)| {
                let span = Span {
                    foreground: index % 2 == 1,
                    start,
                    len: run as usize,
                };
                start += run as usize;
                (run > 0).then_some(span)
            })
    }

    /// Expand the runs into a packed boolean row.
    ///
    /// # Panics
    ///
    /// Panics if the runs do not cover exactly `row.len()` columns.
    pub fn decode_into(&self, row: &mut RowMut<'_, bool>) {
        assert_eq!(self.width(), row.len(), "run width differs from row length");
        let words = row.words_mut();
        for span in self.spans() {
            fill_bit_range(words, span.start, span.start + span.len, span.foreground);
        }
    }

    /// Expand into a fresh single-row boolean buffer.
    pub fn to_bits(&self) -> PixelBuffer<'static, bool> {
        let mut buffer = PixelBuffer::new(1, self.width());
        if !buffer.is_empty() {
            self.decode_into(&mut buffer.row_mut(0));
        }
        buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packed(bits: &[bool]) -> PixelBuffer<'static, bool> {
        PixelBuffer::from_fn(1, bits.len(), |_, c| bits[c])
    }

    mod encode {
        use super::*;

        mod unit {
            use super::*;

            #[test]
            fn appends_terminator() {
                let runs = RunArray::encode(Row::from(&[0u8, 1, 1, 0]));
                assert_eq!(runs.runs(), &[1, 2, 1]);
                assert_eq!(runs.count(), 3);
                assert_eq!(runs.width(), 4);
            }

            #[test]
            fn leading_foreground_gives_empty_first_run() {
                let runs = RunArray::encode(Row::from(&[5i16, 0]));
                assert_eq!(runs.runs(), &[0, 1, 1]);
            }

            #[test]
            fn encode_into_reuses_and_counts() {
                let mut runs = RunArray::new();
                assert_eq!(runs.encode_into(Row::from(&[1.0f32; 3])), 2);
                assert_eq!(runs.encode_into(Row::from(&[0.0f32; 3])), 1);
                assert_eq!(runs.runs(), &[3]);
            }

            #[test]
            fn spans_skip_empty_first_run() {
                let runs = RunArray::encode(Row::from(&[1u8, 0, 0, 1]));
                let spans: Vec<Span> = runs.spans().collect();
                assert_eq!(
                    spans,
                    vec![
                        Span { foreground: true, start: 0, len: 1 },
                        Span { foreground: false, start: 1, len: 2 },
                        Span { foreground: true, start: 3, len: 1 },
                    ]
                );
            }
        }

        mod prop {
            use super::*;
            use proptest::prelude::*;

            proptest! {
                /// runs always sum to the row width
                #[test]
                fn runs_cover_width(bits in proptest::collection::vec(proptest::bool::ANY, 0..150)) {
                    let buffer = packed(&bits);
                    let runs = if buffer.is_empty() {
                        RunArray::encode(Row::<bool>::from_words(&[], 0))
                    } else {
                        buffer.row_runs(0)
                    };
                    prop_assert_eq!(runs.width(), bits.len());
                }

                /// only the first run may be empty
                #[test]
                fn only_first_run_may_be_empty(bits in proptest::collection::vec(proptest::bool::ANY, 1..150)) {
                    let runs = packed(&bits).row_runs(0);
                    prop_assert!(runs.runs()[1..].iter().all(|&run| run > 0));
                    prop_assert_eq!(runs.runs()[0] == 0, bits[0]);
                }

                /// decoding an encoded row reproduces it
                #[test]
                fn decode_inverts_encode(bits in proptest::collection::vec(proptest::bool::ANY, 1..150)) {
                    let source = packed(&bits);
                    let runs = source.row_runs(0);
                    let mut target = PixelBuffer::<bool>::new(1, bits.len());
                    runs.decode_into(&mut target.row_mut(0));
                    prop_assert!(target == source);
                    prop_assert!(runs.to_bits() == source);
                }
            }
        }
    }

    mod reencode {
        use super::*;

        mod unit {
            use super::*;

            #[test]
            fn exact_cover_is_copied() {
                let runs = RunArray::reencode(&[0u16, 3, 2], 5).expect("valid runs");
                assert_eq!(runs.runs(), &[0, 3, 2]);
            }

            #[test]
            fn stops_at_width_ignoring_extra_runs() {
                let runs = RunArray::reencode(&[2usize, 3, 0, 9], 5).expect("valid runs");
                assert_eq!(runs.runs(), &[2, 3]);
            }

            #[test]
            fn overshoot_is_reported_and_clamped() {
                let mut runs = RunArray::new();
                let err = runs.reencode_into(&[2i32, 4], 5).unwrap_err();
                assert!(matches!(err, TraceError::MalformedRun { width: 5, sum: 6 }));
                assert_eq!(runs.runs(), &[2, 3]);
                assert_eq!(runs.width(), 5);
            }

            #[test]
            fn undershoot_is_a_width_mismatch() {
                let err = RunArray::reencode(&[1u8, 1], 5).unwrap_err();
                assert!(matches!(
                    err,
                    TraceError::RowWidthMismatch {
                        expected: 5,
                        found: 2
                    }
                ));
            }

            #[test]
            fn negative_run_is_malformed() {
                let err = RunArray::reencode(&[1i32, -1, 5], 5).unwrap_err();
                assert!(matches!(err, TraceError::MalformedRun { width: 5, sum: 1 }));
            }

            #[test]
            fn negative_run_leaves_a_terminated_array() {
                let mut runs = RunArray::new();
                runs.reencode_into(&[0i32, -1], 5).unwrap_err();
                assert_eq!(runs.runs(), &[0]);
                assert_eq!(runs.count(), 1);
            }

            #[test]
            fn huge_run_is_cut_back_to_the_width() {
                let mut runs = RunArray::new();
                let err = runs.reencode_into(&[1u32, 0, u32::MAX], 5).unwrap_err();
                assert!(matches!(err, TraceError::MalformedRun { width: 5, .. }));
                assert_eq!(runs.runs(), &[5]);

                let err = runs.reencode_into(&[(1u64 << 32) + 10], 5).unwrap_err();
                assert!(matches!(
                    err,
                    TraceError::MalformedRun { width: 5, sum } if sum == (1u64 << 32) + 10
                ));
                assert_eq!(runs.runs(), &[5]);
                assert_eq!(runs.width(), 5);
            }

            #[test]
            fn interior_empty_run_is_folded() {
                let runs = RunArray::reencode(&[2u32, 0, 3], 5).expect("valid runs");
                assert_eq!(runs.runs(), &[5]);
                let runs = RunArray::reencode(&[0u32, 1, 0, 2, 2], 5).expect("valid runs");
                assert_eq!(runs.runs(), &[0, 3, 2]);
            }
        }

        mod prop {
            use super::*;
            use proptest::prelude::*;

            proptest! {
                /// re-encoding an encoded row is the identity
                #[test]
                fn reencode_of_encoded_is_identity(bits in proptest::collection::vec(proptest::bool::ANY, 1..150)) {
                    let runs = packed(&bits).row_runs(0);
                    let again = RunArray::reencode(runs.runs(), bits.len()).expect("valid runs");
                    prop_assert_eq!(again, runs);
                }

                /// whenever the runs reach the width, the copy covers it exactly
                #[test]
                fn covered_rows_sum_to_the_width(
                    runs in proptest::collection::vec(proptest::num::u32::ANY, 1..8),
                    width in 0usize..64,
                ) {
                    let mut array = RunArray::new();
                    match array.reencode_into(&runs, width) {
                        Ok(_) | Err(TraceError::MalformedRun { .. }) => prop_assert_eq!(array.width(), width),
                        Err(TraceError::RowWidthMismatch { .. }) => prop_assert!(array.width() < width),
                        Err(other) => prop_assert!(false, "unexpected error {other}"),
                    }
                }
            }
        }
    }
}
