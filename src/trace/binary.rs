use std::collections::VecDeque;

use tracing::{debug, error, trace};

use crate::buffer::Row;
use crate::error::{TraceError, TraceResult};
use crate::geom::{Contour, Point};
use crate::pixel::Pixel;
use crate::rle::{RunArray, RunLength};
use crate::source::RowImage;

use super::fragment::{Fragment, Fragments, Sprout, export};
use super::{Lifecycle, OutputMode, Pass};

/// Traces the boundaries of the foreground of a binary image.
///
/// Rows are fed top to bottom with [`add_row`](Self::add_row) (or one of its
/// variants) and the pass is completed with [`flush`](Self::flush). Points are
/// pixel corners: pixel `(c, r)` covers `[c, c + 1] x [r, r + 1]`.
///
/// ```
/// use rowtrace::ContourTracker;
///
/// let mut tracker = ContourTracker::new();
/// let mut polygons = Vec::new();
/// tracker.add_row(&[0u8, 1, 0], &mut polygons)?;
/// tracker.flush(&mut polygons)?;
/// assert_eq!(polygons.len(), 1);
/// # Ok::<(), rowtrace::TraceError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ContourTracker {
    width: usize,
    first_row: i32,
    row: i32,
    pass: Pass,
    encoded: RunArray,
    /// Runs of the current row, widened by the border in polygon mode.
    runs: Vec<i32>,
    /// Color (0 background, 1 foreground) under a row made of a single run.
    color_under: usize,
    fragments: Fragments<i32>,
}

impl Default for ContourTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ContourTracker {
    pub fn new() -> Self {
        Self {
            width: 0,
            first_row: 0,
            row: -1,
            pass: Pass::default(),
            encoded: RunArray::new(),
            runs: Vec::new(),
            color_under: 0,
            fragments: Fragments::default(),
        }
    }

    /// Fix the row width up front. Needed before feeding run-length rows.
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    /// Y coordinate given to the top edge of the first row.
    pub fn with_first_row(mut self, first_row: i32) -> Self {
        self.first_row = first_row;
        self.row = first_row - 1;
        self
    }

    /// Row width, 0 while unknown.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Index of the last row added.
    pub fn row_index(&self) -> i32 {
        self.row
    }

    /// Output mode of the current pass, once the first row fixed it.
    pub fn mode(&self) -> Option<OutputMode> {
        self.pass.mode
    }

    pub fn open_fragments(&self) -> usize {
        self.fragments.open_count()
    }

    pub fn is_flushed(&self) -> bool {
        self.pass.state == Lifecycle::Flushed
    }

    /// Start a new pass, keeping the width and the first row number.
    pub fn reset(&mut self) {
        self.row = self.first_row - 1;
        self.pass = Pass::default();
        self.color_under = 0;
        self.fragments.clear();
    }

    /// Add a row in polygon mode; every contour closes into a polygon.
    pub fn add_row<'r, P: Pixel>(
        &mut self,
        row: impl Into<Row<'r, P>>,
        polygons: &mut Vec<Contour<i32>>,
    ) -> TraceResult<()> {
        self.add_pixel_row(row.into(), None, polygons)
    }

    /// Add a row in split mode; contours reaching the image border end up in
    /// `polylines`.
    pub fn add_row_split<'r, P: Pixel>(
        &mut self,
        row: impl Into<Row<'r, P>>,
        polylines: &mut Vec<Contour<i32>>,
        polygons: &mut Vec<Contour<i32>>,
    ) -> TraceResult<()> {
        self.add_pixel_row(row.into(), Some(polylines), polygons)
    }

    /// Add a pre-encoded row in polygon mode. The width must already be known.
    pub fn add_run_row<R: RunLength>(
        &mut self,
        runs: &[R],
        polygons: &mut Vec<Contour<i32>>,
    ) -> TraceResult<()> {
        self.add_encoded_row(runs, None, polygons)
    }

    /// Add a pre-encoded row in split mode. The width must already be known.
    pub fn add_run_row_split<R: RunLength>(
        &mut self,
        runs: &[R],
        polylines: &mut Vec<Contour<i32>>,
        polygons: &mut Vec<Contour<i32>>,
    ) -> TraceResult<()> {
        self.add_encoded_row(runs, Some(polylines), polygons)
    }

    /// Close the pass.
    ///
    /// In polygon mode the remaining fragments are closed against a virtual empty
    /// row and land in `out` as polygons; in split mode they are moved to `out`
    /// as they are. Flushing twice is a no-op.
    pub fn flush(&mut self, out: &mut Vec<Contour<i32>>) -> TraceResult<()> {
        match self.pass.state {
            Lifecycle::Flushed => return Ok(()),
            Lifecycle::Empty => {
                self.pass.state = Lifecycle::Flushed;
                return Ok(());
            }
            Lifecycle::Accumulating => {}
        }
        if self.pass.mode == Some(OutputMode::Polygons) {
            let columns = self.columns();
            self.runs.clear();
            self.runs.push(columns);
            self.row += 1;
            self.add_runs(None, out)?;
        }
        let shift = -self.pass.border();
        out.extend(self.fragments.drain().map(|f| export(f, shift)));
        self.pass.state = Lifecycle::Flushed;
        debug!(rows = self.row - self.first_row, contours = out.len(), "binary pass flushed");
        Ok(())
    }

    /// Trace a whole image into closed polygons.
    pub fn vectorize<I: RowImage>(
        &mut self,
        image: &I,
        polygons: &mut Vec<Contour<i32>>,
    ) -> TraceResult<()> {
        self.restart(image.width());
        if image.width() > 0 {
            for r in 0..image.height() {
                self.add_pixel_row(image.row(r), None, polygons)?;
            }
        }
        self.flush(polygons)
    }

    /// Trace a whole image, splitting border-touching contours into polylines.
    pub fn vectorize_split<I: RowImage>(
        &mut self,
        image: &I,
        polylines: &mut Vec<Contour<i32>>,
        polygons: &mut Vec<Contour<i32>>,
    ) -> TraceResult<()> {
        self.restart(image.width());
        if image.width() > 0 {
            for r in 0..image.height() {
                self.add_pixel_row(image.row(r), Some(&mut *polylines), polygons)?;
            }
        }
        self.flush(polylines)
    }

    /// Trace an image given as one run-length row per image row.
    pub fn vectorize_runs<R, A>(
        &mut self,
        rows: &[A],
        width: usize,
        polygons: &mut Vec<Contour<i32>>,
    ) -> TraceResult<()>
    where
        R: RunLength,
        A: AsRef<[R]>,
    {
        self.restart(width);
        if width == 0 {
            return self.flush(polygons);
        }
        for runs in rows {
            self.add_encoded_row(runs.as_ref(), None, polygons)?;
        }
        self.flush(polygons)
    }

    fn restart(&mut self, width: usize) {
        self.width = width;
        self.reset();
    }

    fn columns(&self) -> i32 {
        self.width as i32 + 2 * self.pass.border()
    }

    fn add_pixel_row<P: Pixel>(
        &mut self,
        row: Row<'_, P>,
        polylines: Option<&mut Vec<Contour<i32>>>,
        polygons: &mut Vec<Contour<i32>>,
    ) -> TraceResult<()> {
        if self.width == 0 {
            self.width = row.len();
        } else if row.len() != self.width {
            return Err(TraceError::RowWidthMismatch {
                expected: self.width,
                found: row.len(),
            });
        }
        self.begin_row(polylines.is_some())?;
        self.encoded.encode_into(row);
        self.add_current_row(polylines, polygons)
    }

    fn add_encoded_row<R: RunLength>(
        &mut self,
        runs: &[R],
        polylines: Option<&mut Vec<Contour<i32>>>,
        polygons: &mut Vec<Contour<i32>>,
    ) -> TraceResult<()> {
        self.begin_row(polylines.is_some())?;
        self.encoded.reencode_into(runs, self.width)?;
        self.add_current_row(polylines, polygons)
    }

    fn begin_row(&mut self, split: bool) -> TraceResult<()> {
        if self.width == 0 {
            return Err(TraceError::UninitializedWidth);
        }
        let mode = if split {
            OutputMode::Split
        } else {
            OutputMode::Polygons
        };
        self.pass.begin_row(mode)
    }

    fn add_current_row(
        &mut self,
        polylines: Option<&mut Vec<Contour<i32>>>,
        polygons: &mut Vec<Contour<i32>>,
    ) -> TraceResult<()> {
        let first = self.pass.is_first_row();
        self.pass.state = Lifecycle::Accumulating;
        self.row += 1;
        self.load_runs();
        if first && self.pass.mode == Some(OutputMode::Split) {
            self.add_first_split_row();
        } else {
            self.add_runs(polylines, polygons)?;
        }
        trace!(
            row = self.row,
            runs = self.runs.len(),
            open = self.fragments.open_count(),
            "binary row"
        );
        Ok(())
    }

    /// Copy the encoded row into `runs`, widening the outer background runs in
    /// polygon mode.
    fn load_runs(&mut self) {
        self.runs.clear();
        self.runs
            .extend(self.encoded.runs().iter().map(|&run| run as i32));
        let border = self.pass.border();
        if border == 0 {
            return;
        }
        self.runs[0] += border;
        if self.runs.len() % 2 == 1 {
            if let Some(last) = self.runs.last_mut() {
                *last += border;
            }
        } else {
            self.runs.push(border);
        }
    }

    /// First row in split mode: a vertical stick at every run boundary.
    fn add_first_split_row(&mut self) {
        let columns = self.columns();
        let row = self.row;
        let mut index = usize::from(self.runs[0] == 0);
        self.color_under = index % 2;
        let mut column = self.runs[index];
        while column != columns {
            let mut stick = VecDeque::from([Point::new(column, row), Point::new(column, row)]);
            if index % 2 == 0 {
                stick[1].y += 1;
            } else {
                stick[0].y += 1;
            }
            self.fragments.push(stick);
            index += 1;
            column += self.runs[index];
        }
    }

    /// Sweep the current row's runs against the sprouts left by the previous row.
    fn add_runs(
        &mut self,
        polylines: Option<&mut Vec<Contour<i32>>>,
        polygons: &mut Vec<Contour<i32>>,
    ) -> TraceResult<()> {
        let row = self.row;
        let columns = self.columns();
        let shift = -self.pass.border();

        let finished = match polylines {
            Some(polylines) => polylines,
            None => &mut *polygons,
        };
        let mut sprouts = self
            .fragments
            .collect_sprouts(row, |f| finished.push(export(f, shift)));

        if sprouts.is_empty() {
            self.open_fragments_over_runs();
            self.update_color_under();
            return Ok(());
        }
        self.check_sprouts(&sprouts)?;

        let mut fresh = Vec::new();
        let mut column = 0;
        let mut x_prev = 0;
        let mut prev: Option<usize> = None;
        let mut next_sprout = 0;
        let mut x_sprout = self.sprout_x(&sprouts, next_sprout);
        let mut left_color = sprouts[0].left_color();

        let start = usize::from(self.runs[0] == 0);
        for index in start..self.runs.len() {
            let color = index % 2;
            let next = column + self.runs[index];
            loop {
                if left_color == color {
                    // same color on both rows: the sprout edge just gets longer
                    if x_sprout == next && next != columns {
                        if let Some(point) = self.fragments.endpoint_mut(sprouts[next_sprout]) {
                            point.y = row + 1;
                        }
                    }
                } else {
                    let left_offset =
                        column < x_prev || (column == x_prev && color == 1 && column != 0);
                    let right_offset =
                        next > x_sprout || (next == x_sprout && color == 1 && next != columns);
                    match (left_offset, right_offset) {
                        (false, false) => fresh.push(open_fragment(column, next, color, row, columns)),
                        (false, true) => self.extend_sprout(sprouts[next_sprout], column),
                        (true, false) => {
                            let left = self.previous(&sprouts, prev)?;
                            self.extend_sprout(left, next);
                        }
                        (true, true) => {
                            let left = self.previous(&sprouts, prev)?;
                            self.connect(left, sprouts[next_sprout], &mut sprouts, polygons, shift);
                        }
                    }
                }
                if x_sprout > next || x_sprout == columns {
                    break;
                }
                x_prev = x_sprout;
                left_color ^= 1;
                prev = Some(next_sprout);
                next_sprout += 1;
                x_sprout = self.sprout_x(&sprouts, next_sprout);
                if x_prev >= next {
                    break;
                }
            }
            column = next;
        }
        debug_assert_eq!(column, columns);

        self.fragments.prune();
        self.fragments.extend(fresh);
        self.update_color_under();
        Ok(())
    }

    /// Remember the color of a row made of a single run.
    fn update_color_under(&mut self) {
        if self.runs.last() == Some(&self.columns()) {
            self.color_under = (self.runs.len() - 1) % 2;
        }
    }

    /// No fragment reaches this row: open one over every run of the color
    /// opposite to the one underneath.
    fn open_fragments_over_runs(&mut self) {
        let columns = self.columns();
        let row = self.row;
        let mut index = usize::from(self.runs[0] == 0);
        let mut column = 0;
        while column != columns {
            let next = column + self.runs[index];
            if index % 2 != self.color_under {
                let fragment = open_fragment(column, next, index % 2, row, columns);
                self.fragments.push(fragment);
            }
            column = next;
            index += 1;
        }
    }

    fn sprout_x(&self, sprouts: &[Sprout], index: usize) -> i32 {
        sprouts
            .get(index)
            .and_then(|&sprout| self.fragments.endpoint(sprout))
            .map_or(self.columns(), |p| p.x)
    }

    fn previous(&self, sprouts: &[Sprout], prev: Option<usize>) -> TraceResult<Sprout> {
        prev.map(|index| sprouts[index]).ok_or_else(|| {
            error!(row = self.row, "boundary offset with no sprout on its left");
            TraceError::SproutInvariantViolated {
                row: i64::from(self.row),
                detail: "left boundary has no sprout",
            }
        })
    }

    /// Sprouts must alternate between front and back with strictly increasing x.
    fn check_sprouts(&self, sprouts: &[Sprout]) -> TraceResult<()> {
        let ordered = sprouts.windows(2).all(|pair| {
            pair[0].end != pair[1].end && self.sprout_x(pair, 0) < self.sprout_x(pair, 1)
        });
        debug_assert!(ordered, "sprouts out of order at row {}", self.row);
        if ordered {
            Ok(())
        } else {
            error!(row = self.row, count = sprouts.len(), "sprouts out of order");
            Err(TraceError::SproutInvariantViolated {
                row: i64::from(self.row),
                detail: "sprouts do not alternate with increasing x",
            })
        }
    }

    /// Extend a sprout horizontally to `x` and, away from the border, one row down.
    fn extend_sprout(&mut self, sprout: Sprout, x: i32) {
        self.fragments.push_at(sprout, Point::new(x, self.row));
        if x != 0 && x != self.columns() {
            self.fragments.push_at(sprout, Point::new(x, self.row + 1));
        }
    }

    /// Join two sprouts across a horizontal edge. Two ends of one fragment close it.
    fn connect(
        &mut self,
        left: Sprout,
        right: Sprout,
        sprouts: &mut [Sprout],
        polygons: &mut Vec<Contour<i32>>,
        shift: i32,
    ) {
        if left.frag == right.frag {
            polygons.push(export(self.fragments.take(left.frag), shift));
        } else {
            self.fragments.splice(left, right, sprouts);
        }
    }
}

/// U-shaped fragment over the run `[begin, end)` of the given color, hanging down
/// into the next row except at the outer border.
fn open_fragment(begin: i32, end: i32, color: usize, row: i32, columns: i32) -> Fragment<i32> {
    let mut fragment = VecDeque::with_capacity(4);
    if begin != 0 {
        fragment.push_back(Point::new(begin, row + 1));
    }
    fragment.push_back(Point::new(begin, row));
    fragment.push_back(Point::new(end, row));
    if end != columns {
        fragment.push_back(Point::new(end, row + 1));
    }
    if color != 0 {
        fragment.make_contiguous().reverse();
    }
    fragment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::PixelBuffer;
    use crate::geom::{perimeter, signed_area};

    fn mask(rows: &[&str]) -> PixelBuffer<'static, bool> {
        let cols = rows.first().map_or(0, |r| r.len());
        PixelBuffer::from_fn(rows.len(), cols, |r, c| rows[r].as_bytes()[c] == b'#')
    }

    fn points(coords: &[(i32, i32)]) -> Contour<i32> {
        coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    fn trace_polygons(image: &PixelBuffer<'_, bool>) -> Vec<Contour<i32>> {
        let mut polygons = Vec::new();
        ContourTracker::new()
            .vectorize(image, &mut polygons)
            .expect("trace succeeds");
        polygons
    }

    fn foreground_count(image: &PixelBuffer<'_, bool>) -> usize {
        image
            .iter_rows()
            .map(|row| row.iter().filter(|&p| p).count())
            .sum()
    }

    fn masks() -> impl proptest::strategy::Strategy<Value = PixelBuffer<'static, bool>> {
        use proptest::prelude::*;
        (1usize..9, 1usize..9).prop_flat_map(|(rows, cols)| {
            proptest::collection::vec(proptest::bool::ANY, rows * cols)
                .prop_map(move |bits| PixelBuffer::from_fn(rows, cols, |r, c| bits[r * cols + c]))
        })
    }

    /// Unit pixel edges separating foreground from background, the image border excluded.
    fn interior_boundary_edges(image: &PixelBuffer<'_, bool>) -> usize {
        let (rows, cols) = (image.rows(), image.cols());
        let across = (0..rows)
            .flat_map(|r| (1..cols).map(move |c| (r, c)))
            .filter(|&(r, c)| image.get(r, c - 1) != image.get(r, c))
            .count();
        let down = (1..rows)
            .flat_map(|r| (0..cols).map(move |c| (r, c)))
            .filter(|&(r, c)| image.get(r - 1, c) != image.get(r, c))
            .count();
        across + down
    }

    fn boundary_length(polylines: &[Contour<i32>], polygons: &[Contour<i32>]) -> f64 {
        let open: f64 = polylines.iter().map(|line| perimeter(line, false)).sum();
        let closed: f64 = polygons.iter().map(|polygon| perimeter(polygon, true)).sum();
        open + closed
    }

    /// Every unit step of every contour must have background on its left (y up).
    fn background_on_left(contour: &[Point<i32>], image: &PixelBuffer<'_, bool>, closed: bool) -> bool {
        let pixel = |x: i32, y: i32| {
            x >= 0
                && y >= 0
                && (y as usize) < image.rows()
                && (x as usize) < image.cols()
                && image.get(y as usize, x as usize)
        };
        let count = if closed { contour.len() } else { contour.len() - 1 };
        (0..count).all(|i| {
            let a = contour[i];
            let b = contour[(i + 1) % contour.len()];
            let (dx, dy) = ((b.x - a.x).signum(), (b.y - a.y).signum());
            let steps = (b.x - a.x).abs().max((b.y - a.y).abs());
            (0..steps).all(|s| {
                let (x0, y0) = (a.x + dx * s, a.y + dy * s);
                // pixel whose corner is (x0, y0), on the left of the step with y up
                // is at the right of the step with y down
                let (px, py) = match (dx, dy) {
                    (1, 0) => (x0, y0),
                    (-1, 0) => (x0 - 1, y0 - 1),
                    (0, 1) => (x0 - 1, y0),
                    _ => (x0, y0 - 1),
                };
                !pixel(px, py)
            })
        })
    }

    mod polygons {
        use super::*;

        mod unit {
            use super::*;

            #[test]
            fn single_pixel() {
                let image = mask(&["...", ".#.", "..."]);
                let polygons = trace_polygons(&image);
                assert_eq!(polygons, vec![points(&[(2, 2), (2, 1), (1, 1), (1, 2)])]);
            }

            #[test]
            fn rectangle() {
                let image = mask(&[".....", ".###.", ".###.", "....."]);
                let polygons = trace_polygons(&image);
                assert_eq!(polygons, vec![points(&[(4, 3), (4, 1), (1, 1), (1, 3)])]);
            }

            #[test]
            fn full_image_is_framed() {
                let image = mask(&["##", "##"]);
                let polygons = trace_polygons(&image);
                assert_eq!(polygons.len(), 1);
                assert_eq!(signed_area(&polygons[0]), -4.0);
            }

            #[test]
            fn empty_image_has_no_contours() {
                let image = mask(&["....", "...."]);
                assert!(trace_polygons(&image).is_empty());
            }

            #[test]
            fn ring_has_outer_and_hole() {
                let image = mask(&["###", "#.#", "###"]);
                let polygons = trace_polygons(&image);
                assert_eq!(polygons.len(), 2);
                let mut areas: Vec<f64> = polygons.iter().map(|p| signed_area(p)).collect();
                areas.sort_by(|a, b| a.partial_cmp(b).expect("finite"));
                assert_eq!(areas, vec![-9.0, 1.0]);
            }

            #[test]
            fn diagonal_pixels_join_at_the_corner() {
                let image = mask(&["#.", ".#"]);
                let polygons = trace_polygons(&image);
                assert_eq!(
                    polygons,
                    vec![points(&[
                        (2, 2),
                        (2, 1),
                        (1, 1),
                        (1, 0),
                        (0, 0),
                        (0, 1),
                        (1, 1),
                        (1, 2),
                    ])]
                );
                assert_eq!(signed_area(&polygons[0]), -2.0);
            }

            #[test]
            fn first_row_offsets_y() {
                let image = mask(&["#"]);
                let mut polygons = Vec::new();
                ContourTracker::new()
                    .with_first_row(10)
                    .vectorize(&image, &mut polygons)
                    .expect("trace succeeds");
                assert_eq!(polygons, vec![points(&[(1, 11), (1, 10), (0, 10), (0, 11)])]);
            }
        }

        mod prop {
            use super::*;
            use proptest::prelude::*;

            proptest! {
                /// the enclosed signed area equals the number of foreground pixels
                #[test]
                fn area_matches_pixel_count(image in masks()) {
                    let polygons = trace_polygons(&image);
                    let area: f64 = polygons.iter().map(|p| -signed_area(p)).sum();
                    prop_assert_eq!(area, foreground_count(&image) as f64);
                }

                /// every edge keeps the background on its left
                #[test]
                fn background_lies_left_of_every_edge(image in masks()) {
                    for polygon in trace_polygons(&image) {
                        prop_assert!(background_on_left(&polygon, &image, true));
                    }
                }

                /// pixel rows and pre-encoded rows trace identically
                #[test]
                fn run_rows_match_pixel_rows(image in masks()) {
                    let rows: Vec<Vec<u32>> = (0..image.rows())
                        .map(|r| image.row_runs(r).runs().to_vec())
                        .collect();
                    let mut from_runs = Vec::new();
                    ContourTracker::new()
                        .vectorize_runs(&rows, image.cols(), &mut from_runs)
                        .expect("trace succeeds");
                    prop_assert_eq!(from_runs, trace_polygons(&image));
                }
            }
        }
    }

    mod split {
        use super::*;

        fn trace_split(image: &PixelBuffer<'_, bool>) -> (Vec<Contour<i32>>, Vec<Contour<i32>>) {
            let mut polylines = Vec::new();
            let mut polygons = Vec::new();
            ContourTracker::new()
                .vectorize_split(image, &mut polylines, &mut polygons)
                .expect("trace succeeds");
            (polylines, polygons)
        }

        mod unit {
            use super::*;

            #[test]
            fn corner_pixel_is_a_polyline() {
                let image = mask(&["#.", ".."]);
                let (polylines, polygons) = trace_split(&image);
                assert!(polygons.is_empty());
                assert_eq!(polylines, vec![points(&[(0, 1), (1, 1), (1, 0)])]);
            }

            #[test]
            fn interior_pixel_is_a_polygon() {
                let image = mask(&["...", ".#.", "..."]);
                let (polylines, polygons) = trace_split(&image);
                assert!(polylines.is_empty());
                assert_eq!(polygons, vec![points(&[(2, 2), (2, 1), (1, 1), (1, 2)])]);
            }

            #[test]
            fn vertical_band_gives_two_border_to_border_lines() {
                let image = mask(&[".#.", ".#.", ".#."]);
                let (polylines, polygons) = trace_split(&image);
                assert!(polygons.is_empty());
                assert_eq!(polylines.len(), 2);
                for line in &polylines {
                    assert!(background_on_left(line, &image, false));
                    let ys: Vec<i32> = line.iter().map(|p| p.y).collect();
                    assert!(ys.contains(&0) && ys.contains(&3));
                }
            }

            #[test]
            fn full_row_band_keeps_both_edges() {
                let image = mask(&[".", "#", "."]);
                let (polylines, polygons) = trace_split(&image);
                assert!(polygons.is_empty());
                assert_eq!(polylines, vec![points(&[(1, 1), (0, 1)]), points(&[(0, 2), (1, 2)])]);
            }

            #[test]
            fn alternating_full_rows_emit_every_edge() {
                let image = mask(&[".", ".", ".", "#", ".", "#"]);
                let (polylines, polygons) = trace_split(&image);
                assert!(polygons.is_empty());
                let ys: Vec<i32> = polylines.iter().map(|line| line[0].y).collect();
                assert_eq!(ys, vec![3, 4, 5]);
                assert_eq!(boundary_length(&polylines, &polygons), 3.0);
            }

            #[test]
            fn empty_image_has_no_contours() {
                let image = mask(&["...", "...", "..."]);
                let (polylines, polygons) = trace_split(&image);
                assert!(polylines.is_empty());
                assert!(polygons.is_empty());
            }
        }

        mod prop {
            use super::*;
            use proptest::prelude::*;

            proptest! {
                /// split mode contours keep the background on their left too
                #[test]
                fn split_edges_keep_background_left(
                    bits in proptest::collection::vec(proptest::bool::ANY, 36)
                ) {
                    let image = PixelBuffer::from_fn(6, 6, |r, c| bits[r * 6 + c]);
                    let (polylines, polygons) = trace_split(&image);
                    for line in &polylines {
                        prop_assert!(background_on_left(line, &image, false));
                    }
                    for polygon in &polygons {
                        prop_assert!(background_on_left(polygon, &image, true));
                    }
                }

                /// every pixel edge between foreground and background is emitted once
                #[test]
                fn split_contours_cover_every_boundary_edge(image in masks()) {
                    let (polylines, polygons) = trace_split(&image);
                    prop_assert_eq!(
                        boundary_length(&polylines, &polygons),
                        interior_boundary_edges(&image) as f64
                    );
                }
            }
        }
    }

    mod lifecycle {
        use super::*;

        mod unit {
            use super::*;

            #[test]
            fn row_after_flush_fails() {
                let mut tracker = ContourTracker::new();
                let mut polygons = Vec::new();
                tracker.add_row(&[1u8, 0], &mut polygons).expect("row");
                tracker.flush(&mut polygons).expect("flush");
                tracker.flush(&mut polygons).expect("second flush is a no-op");
                assert_eq!(polygons.len(), 1);
                let err = tracker.add_row(&[1u8, 0], &mut polygons).unwrap_err();
                assert!(matches!(err, TraceError::Flushed));
                tracker.reset();
                tracker.add_row(&[1u8, 0], &mut polygons).expect("row after reset");
            }

            #[test]
            fn mixed_modes_are_rejected() {
                let mut tracker = ContourTracker::new();
                let (mut lines, mut polygons) = (Vec::new(), Vec::new());
                tracker.add_row(&[1u8, 0], &mut polygons).expect("row");
                let err = tracker
                    .add_row_split(&[1u8, 0], &mut lines, &mut polygons)
                    .unwrap_err();
                assert!(matches!(err, TraceError::InconsistentOutputMode));
            }

            #[test]
            fn width_mismatch_is_rejected() {
                let mut tracker = ContourTracker::new();
                let mut polygons = Vec::new();
                tracker.add_row(&[0u8, 1, 0], &mut polygons).expect("row");
                let err = tracker.add_row(&[0u8, 1], &mut polygons).unwrap_err();
                assert!(matches!(
                    err,
                    TraceError::RowWidthMismatch {
                        expected: 3,
                        found: 2
                    }
                ));
            }

            #[test]
            fn run_rows_need_a_width() {
                let mut tracker = ContourTracker::new();
                let mut polygons = Vec::new();
                let err = tracker.add_run_row(&[1u32, 2], &mut polygons).unwrap_err();
                assert!(matches!(err, TraceError::UninitializedWidth));
                let mut tracker = ContourTracker::new().with_width(3);
                tracker.add_run_row(&[1u32, 2], &mut polygons).expect("row");
                tracker.flush(&mut polygons).expect("flush");
                assert_eq!(polygons, vec![points(&[(3, 1), (3, 0), (1, 0), (1, 1)])]);
            }

            #[test]
            fn vectorize_resets_mode_and_rows() {
                let image = mask(&[".#"]);
                let mut tracker = ContourTracker::new();
                let (mut lines, mut polygons) = (Vec::new(), Vec::new());
                tracker
                    .vectorize_split(&image, &mut lines, &mut polygons)
                    .expect("split pass");
                polygons.clear();
                tracker.vectorize(&image, &mut polygons).expect("polygon pass");
                assert_eq!(polygons, vec![points(&[(2, 1), (2, 0), (1, 0), (1, 1)])]);
                assert_eq!(tracker.row_index(), 1);
            }

            #[test]
            fn flush_without_rows_is_empty() {
                let mut tracker = ContourTracker::new();
                let mut polygons = Vec::new();
                tracker.flush(&mut polygons).expect("flush");
                assert!(polygons.is_empty());
                assert!(tracker.is_flushed());
            }
        }
    }
}
