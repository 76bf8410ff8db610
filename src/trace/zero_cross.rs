use std::collections::VecDeque;

use tracing::{debug, error, trace};

use crate::buffer::Row;
use crate::error::{TraceError, TraceResult};
use crate::fixed::{Coord, Level};
use crate::geom::{Contour, Point};
use crate::pixel::Pixel;
use crate::source::RowImage;

use super::fragment::{End, Fragment, FragmentId, Fragments, Sprout, export};
use super::{Lifecycle, OutputMode, Pass};

/// Traces the zero level set of a signed image with sub-pixel precision.
///
/// Each pixel is read as a signed [`Level`] relative to a zero threshold: 128 for
/// `u8` pixels, 0 for every other type, unless set with
/// [`with_zero_level`](Self::with_zero_level). Sample `(c, r)` sits at
/// `(c + 0.5, r + 0.5)`, and contour points are interpolated linearly between
/// neighbouring samples of opposite sign. Non-negative samples count as
/// foreground. Where four samples alternate in sign around a cell, non-negative
/// samples on the diagonal are kept connected.
#[derive(Debug, Clone)]
pub struct ZeroCrossTracker {
    width: usize,
    first_row: i32,
    row: i32,
    zero: Option<Level>,
    pass: Pass,
    /// Levels of the previous row with one extra border sample on each side.
    prev: Vec<Level>,
    /// Levels of the row being added.
    levels: Vec<Level>,
    /// End the bottom boundary on the image edge instead of half a pixel below it.
    clip_last_row: bool,
    fragments: Fragments<Coord>,
}

impl Default for ZeroCrossTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Crossing position between two samples one unit apart, as a fraction of the way
/// from `a` to `b`. Never lands exactly on a sample.
fn crossing(a: Level, b: Level) -> Option<Coord> {
    if a.same_sign(b) {
        return None;
    }
    let t = Coord::from_ratio(a.to_bits(), (a - b).to_bits());
    Some(if !t.is_int() {
        t
    } else if t == Coord::ZERO {
        Coord::EPSILON
    } else {
        Coord::ONE - Coord::EPSILON
    })
}

/// Level of the virtual background border next to a sample.
fn outside(level: Level) -> Level {
    if level == Level::ZERO {
        -Level::EPSILON
    } else {
        -level.abs()
    }
}

fn coord(value: usize) -> Coord {
    Coord::from_int(value as i32)
}

impl ZeroCrossTracker {
    pub fn new() -> Self {
        Self {
            width: 0,
            first_row: 0,
            row: -1,
            zero: None,
            pass: Pass::default(),
            prev: Vec::new(),
            levels: Vec::new(),
            clip_last_row: false,
            fragments: Fragments::default(),
        }
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    pub fn with_first_row(mut self, first_row: i32) -> Self {
        self.first_row = first_row;
        self.row = first_row - 1;
        self
    }

    /// Threshold subtracted from every pixel before tracing.
    pub fn with_zero_level(mut self, zero: Level) -> Self {
        self.zero = Some(zero);
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn row_index(&self) -> i32 {
        self.row
    }

    pub fn mode(&self) -> Option<OutputMode> {
        self.pass.mode
    }

    pub fn open_fragments(&self) -> usize {
        self.fragments.open_count()
    }

    pub fn is_flushed(&self) -> bool {
        self.pass.state == Lifecycle::Flushed
    }

    /// Start a new pass, keeping the width, zero level and first row number.
    pub fn reset(&mut self) {
        self.row = self.first_row - 1;
        self.pass = Pass::default();
        self.prev.clear();
        self.clip_last_row = false;
        self.fragments.clear();
    }

    pub fn add_row<'r, P: Pixel>(
        &mut self,
        row: impl Into<Row<'r, P>>,
        polygons: &mut Vec<Contour<Coord>>,
    ) -> TraceResult<()> {
        self.add_pixel_row(row.into(), None, polygons)
    }

    pub fn add_row_split<'r, P: Pixel>(
        &mut self,
        row: impl Into<Row<'r, P>>,
        polylines: &mut Vec<Contour<Coord>>,
        polygons: &mut Vec<Contour<Coord>>,
    ) -> TraceResult<()> {
        self.add_pixel_row(row.into(), Some(polylines), polygons)
    }

    /// Close the pass, sending every remaining contour to `out`.
    ///
    /// The last row is replayed once more so that boundaries close along the
    /// bottom of the image: in polygon mode against a negated copy, in split
    /// mode clipped to the bottom edge. Flushing twice is a no-op.
    pub fn flush(&mut self, out: &mut Vec<Contour<Coord>>) -> TraceResult<()> {
        if self.begin_flush() {
            self.replay_last_row(None, out)?;
            out.extend(self.fragments.drain().map(|f| export(f, Coord::ZERO)));
            self.finish_flush(out.len());
        }
        Ok(())
    }

    /// Like [`flush`](Self::flush), but keeps polygons closed by the final row
    /// apart from the open polylines.
    pub fn flush_split(
        &mut self,
        polylines: &mut Vec<Contour<Coord>>,
        polygons: &mut Vec<Contour<Coord>>,
    ) -> TraceResult<()> {
        if self.begin_flush() {
            self.replay_last_row(Some(&mut *polylines), polygons)?;
            polylines.extend(self.fragments.drain().map(|f| export(f, Coord::ZERO)));
            self.finish_flush(polylines.len() + polygons.len());
        }
        Ok(())
    }

    pub fn vectorize<I: RowImage>(
        &mut self,
        image: &I,
        polygons: &mut Vec<Contour<Coord>>,
    ) -> TraceResult<()> {
        self.restart(image.width());
        if image.width() > 0 {
            for r in 0..image.height() {
                self.add_pixel_row(image.row(r), None, polygons)?;
            }
        }
        self.flush(polygons)
    }

    pub fn vectorize_split<I: RowImage>(
        &mut self,
        image: &I,
        polylines: &mut Vec<Contour<Coord>>,
        polygons: &mut Vec<Contour<Coord>>,
    ) -> TraceResult<()> {
        self.restart(image.width());
        if image.width() > 0 {
            for r in 0..image.height() {
                self.add_pixel_row(image.row(r), Some(&mut *polylines), polygons)?;
            }
        }
        self.flush_split(polylines, polygons)
    }

    fn restart(&mut self, width: usize) {
        self.width = width;
        self.reset();
    }

    fn begin_flush(&mut self) -> bool {
        match self.pass.state {
            Lifecycle::Flushed => false,
            Lifecycle::Empty => {
                self.pass.state = Lifecycle::Flushed;
                false
            }
            Lifecycle::Accumulating => true,
        }
    }

    fn finish_flush(&mut self, contours: usize) {
        self.pass.state = Lifecycle::Flushed;
        debug!(rows = self.row - self.first_row, contours, "zero-crossing pass flushed");
    }

    fn add_pixel_row<P: Pixel>(
        &mut self,
        row: Row<'_, P>,
        polylines: Option<&mut Vec<Contour<Coord>>>,
        polygons: &mut Vec<Contour<Coord>>,
    ) -> TraceResult<()> {
        if self.width == 0 {
            self.width = row.len();
        } else if row.len() != self.width {
            return Err(TraceError::RowWidthMismatch {
                expected: self.width,
                found: row.len(),
            });
        }
        if self.width == 0 {
            return Err(TraceError::UninitializedWidth);
        }
        let mode = if polylines.is_some() {
            OutputMode::Split
        } else {
            OutputMode::Polygons
        };
        self.pass.begin_row(mode)?;

        let zero = self.zero.unwrap_or_else(P::default_zero);
        self.levels.clear();
        self.levels.extend(row.iter().map(|pixel| pixel.level(zero)));

        let first = self.pass.is_first_row();
        self.pass.state = Lifecycle::Accumulating;
        self.row += 1;
        if first {
            self.fill_previous_row();
            if mode == OutputMode::Split {
                self.add_first_split_row();
                return Ok(());
            }
        }
        self.add_current_row(polylines, polygons)
    }

    fn polygon_mode(&self) -> bool {
        self.pass.mode == Some(OutputMode::Polygons)
    }

    /// Seed the previous row before the first row: an all-background row in
    /// polygon mode, a copy of the first row in split mode.
    fn fill_previous_row(&mut self) {
        let width = self.width;
        let polygons = self.polygon_mode();
        self.prev.clear();
        self.prev.push(Level::ZERO);
        if polygons {
            self.prev.extend(self.levels.iter().map(|&v| outside(v)));
            self.prev[0] = outside(self.prev[1]);
            self.prev.push(outside(self.prev[width]));
        } else {
            self.prev.extend_from_slice(&self.levels);
            self.prev[0] = self.prev[1];
            self.prev.push(self.prev[width]);
        }
    }

    /// First row in split mode: a vertical stick at every horizontal crossing,
    /// from the top edge down to the sample line.
    fn add_first_split_row(&mut self) {
        let row = Coord::from_int(self.row);
        let top = (row - Coord::HALF).max(Coord::ZERO);
        let bottom = row + Coord::HALF;
        let mut x0 = -Coord::HALF;
        for column in 0..self.width {
            let (c0, c1) = (self.prev[column], self.prev[column + 1]);
            if let Some(t) = crossing(c0, c1) {
                let x = x0 + t;
                let (mut begin, mut end) = (Point::new(x, top), Point::new(x, bottom));
                if c1.is_negative() {
                    std::mem::swap(&mut begin, &mut end);
                }
                self.fragments.push(VecDeque::from([begin, end]));
            }
            x0 += Coord::ONE;
        }
        trace!(row = self.row, open = self.fragments.open_count(), "zero-crossing first row");
    }

    /// Feed the previous row again to close the boundaries along the bottom.
    fn replay_last_row(
        &mut self,
        polylines: Option<&mut Vec<Contour<Coord>>>,
        polygons: &mut Vec<Contour<Coord>>,
    ) -> TraceResult<()> {
        let width = self.width;
        self.levels.clear();
        self.levels.extend_from_slice(&self.prev[1..=width]);
        if self.polygon_mode() {
            for level in self.levels.iter_mut().filter(|v| !v.is_negative()) {
                *level = !*level;
            }
        } else {
            self.clip_last_row = true;
        }
        self.row += 1;
        let result = self.add_current_row(polylines, polygons);
        self.clip_last_row = false;
        result
    }

    /// Sweep the cells between the previous and the current sample rows, then
    /// attach the new ropes to the sprouts of the previous row.
    fn add_current_row(
        &mut self,
        polylines: Option<&mut Vec<Contour<Coord>>>,
        polygons: &mut Vec<Contour<Coord>>,
    ) -> TraceResult<()> {
        let ropes = self.sweep_cells()?;
        let y0 = Coord::from_int(self.row) - Coord::HALF;

        let finished = match polylines {
            Some(polylines) => polylines,
            None => &mut *polygons,
        };
        let mut sprouts = self
            .fragments
            .collect_sprouts(y0, |f| finished.push(export(f, Coord::ZERO)));

        let mut down2 = Vec::new();
        let mut down1 = Vec::new();
        for rope in ropes {
            let (Some(front), Some(back)) = (rope.front(), rope.back()) else {
                continue;
            };
            let (front_down, back_down) = (front.y == y0, back.y == y0);
            let id = self.fragments.push(rope);
            if sprouts.is_empty() || !(front_down || back_down) {
                continue;
            }
            if front_down && back_down {
                down2.push(id);
            } else {
                down1.push(id);
            }
        }
        for rope in down2 {
            self.merge(rope, &mut sprouts, y0, polygons)?;
        }
        for rope in down1 {
            self.grow(rope, &mut sprouts)?;
        }
        self.fragments.prune();

        trace!(
            row = self.row,
            sprouts = sprouts.len(),
            open = self.fragments.open_count(),
            "zero-crossing row"
        );
        Ok(())
    }

    /// Walk the cells of the strip between the previous and the current sample
    /// rows and build the ropes crossing it, left to right. Updates `prev` to the
    /// current row on the way.
    fn sweep_cells(&mut self) -> TraceResult<Vec<Fragment<Coord>>> {
        let width = self.width;
        let polygons = self.polygon_mode();
        let row = Coord::from_int(self.row);
        let y0 = row - Coord::HALF;
        let y1 = row + Coord::HALF;
        let y_end = if self.clip_last_row { row } else { y1 };

        let mut ropes: Vec<Fragment<Coord>> = Vec::new();

        let mut p_prv = self.prev[0];
        let mut c_prv = if polygons {
            outside(self.levels[0])
        } else {
            self.levels[0]
        };
        let mut left = crossing(p_prv, c_prv);
        if let Some(t) = left {
            ropes.push(VecDeque::from([Point::new(Coord::ZERO, y0 + t)]));
        }

        for cell in 0..=width {
            let p_cur = self.prev[cell + 1];
            let c_cur = if cell == width {
                let border = if polygons { outside(c_prv) } else { c_prv };
                self.prev[width + 1] = border;
                border
            } else {
                self.levels[cell]
            };
            self.prev[cell] = c_prv;

            let right = crossing(p_cur, c_cur);
            let mut lower = crossing(p_prv, p_cur);
            let mut upper = crossing(c_prv, c_cur);
            let x_base = coord(cell) - Coord::HALF;

            let count = [left, right, lower, upper]
                .iter()
                .filter(|c| c.is_some())
                .count();
            if count == 0 {
                left = right;
                p_prv = p_cur;
                c_prv = c_cur;
                continue;
            }

            let mut open_rope = true;
            if count == 4 {
                // saddle: join the left crossing with the vertical one that keeps
                // non-negative samples connected
                let point = if p_prv.is_negative() {
                    lower.take().map(|t| Point::new(x_base + t, y0))
                } else {
                    upper.take().map(|t| Point::new(x_base + t, y1))
                };
                let (Some(point), Some(rope)) = (point, ropes.last_mut()) else {
                    return Err(self.invariant("saddle without an open rope"));
                };
                insert_at(rope, point, c_prv.is_negative());
            } else if left.is_some() {
                open_rope = false;
                let point = if let Some(t) = lower {
                    Point::new(x_base + t, y0)
                } else if let Some(t) = upper {
                    Point::new(x_base + t, y1)
                } else {
                    let x_end = if cell == width {
                        coord(width)
                    } else {
                        coord(cell) + Coord::HALF
                    };
                    let t = right.ok_or_else(|| self.invariant("crossing without an exit"))?;
                    Point::new(x_end, y0 + t)
                };
                let Some(rope) = ropes.last_mut() else {
                    return Err(self.invariant("left crossing without an open rope"));
                };
                insert_at(rope, point, c_prv.is_negative());
            }

            if open_rope {
                let (mut begin, mut end, swap) = match (lower, upper, right) {
                    (Some(lo), Some(up), _) => (
                        Point::new(x_base + lo, y0),
                        Point::new(x_base + up, y_end),
                        p_cur.is_negative(),
                    ),
                    (lo, up, Some(t)) => {
                        let begin = Point::new(coord(cell) + Coord::HALF, y0 + t);
                        match (up, lo) {
                            (Some(up), _) => {
                                (begin, Point::new(x_base + up, y1), c_cur.is_negative())
                            }
                            (None, Some(lo)) => {
                                (begin, Point::new(x_base + lo, y0), p_prv.is_negative())
                            }
                            (None, None) => {
                                return Err(self.invariant("lone crossing in a cell"));
                            }
                        }
                    }
                    _ => return Err(self.invariant("lone crossing in a cell")),
                };
                if swap {
                    std::mem::swap(&mut begin, &mut end);
                }
                ropes.push(VecDeque::from([begin, end]));
            }

            left = right;
            p_prv = p_cur;
            c_prv = c_cur;
        }
        Ok(ropes)
    }

    /// Attach a rope whose two ends lie on the previous sample line, joining the
    /// two sprouts it lands on, or closing a polygon when both are one fragment.
    fn merge(
        &mut self,
        rope: FragmentId,
        sprouts: &mut [Sprout],
        y0: Coord,
        polygons: &mut Vec<Contour<Coord>>,
    ) -> TraceResult<()> {
        let rope_front = Sprout::new(rope, End::Front);
        let rope_back = Sprout::new(rope, End::Back);
        let (Some(front), Some(back)) = (
            self.fragments.endpoint(rope_front),
            self.fragments.endpoint(rope_back),
        ) else {
            return Ok(());
        };
        let forward = front.x < back.x;
        let (left, right, rope_end) = if forward {
            (front, back, rope_front)
        } else {
            (back, front, rope_back)
        };

        let it = self.find_sprout(sprouts, Point::new(left.x, y0))?;
        self.fragments.pop_at(rope_front);
        self.fragments.pop_at(rope_back);

        let target = Point::new(right.x, y0);
        if self.fragments.far_endpoint(sprouts[it]) == Some(target) {
            self.fragments.splice(rope_end, sprouts[it], sprouts);
            polygons.push(export(self.fragments.take(rope), Coord::ZERO));
            return Ok(());
        }
        let jt = self.find_sprout(sprouts, target)?;
        self.fragments.splice(sprouts[it], rope_end, sprouts);
        if sprouts[jt].frag == sprouts[it].frag {
            let closed = self.fragments.take(sprouts[it].frag);
            polygons.push(export(closed, Coord::ZERO));
        } else {
            self.fragments.splice(sprouts[jt], sprouts[it], sprouts);
        }
        Ok(())
    }

    /// Attach a rope with one end on the previous sample line to the sprout there.
    fn grow(&mut self, rope: FragmentId, sprouts: &mut [Sprout]) -> TraceResult<()> {
        let rope_front = Sprout::new(rope, End::Front);
        let rope_back = Sprout::new(rope, End::Back);
        let (Some(front), Some(back)) = (
            self.fragments.endpoint(rope_front),
            self.fragments.endpoint(rope_back),
        ) else {
            return Ok(());
        };
        let (lower, rope_end) = if front.y < back.y {
            (front, rope_front)
        } else {
            (back, rope_back)
        };
        let it = self.find_sprout(sprouts, lower)?;
        self.fragments.pop_at(rope_end);
        self.fragments.splice(sprouts[it], rope_end, sprouts);
        Ok(())
    }

    fn find_sprout(&self, sprouts: &[Sprout], at: Point<Coord>) -> TraceResult<usize> {
        sprouts
            .iter()
            .position(|&s| self.fragments.endpoint(s) == Some(at))
            .ok_or_else(|| self.invariant("rope end has no matching sprout"))
    }

    fn invariant(&self, detail: &'static str) -> TraceError {
        error!(row = self.row, detail, "zero-crossing bookkeeping failed");
        TraceError::SproutInvariantViolated {
            row: i64::from(self.row),
            detail,
        }
    }
}

/// Add `point` at the back of the rope when the sample left of it is negative,
/// at the front otherwise.
fn insert_at(rope: &mut Fragment<Coord>, point: Point<Coord>, at_back: bool) {
    if at_back {
        rope.push_back(point);
    } else {
        rope.push_front(point);
    }
}
