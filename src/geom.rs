use crate::fixed::Coord;

/// A point in image space, y pointing down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Point<T> {
    pub x: T,
    pub y: T,
}

impl<T> Point<T> {
    pub const fn new(x: T, y: T) -> Self {
        Self { x, y }
    }
}

impl<T: Copy> From<(T, T)> for Point<T> {
    fn from((x, y): (T, T)) -> Self {
        Self { x, y }
    }
}

/// A traced boundary. Polygons are implicitly closed from the last point back to
/// the first.
pub type Contour<T> = Vec<Point<T>>;

/// Coordinate types that traced contours are expressed in.
pub trait Scalar: Copy + PartialOrd + std::fmt::Debug {
    fn to_f64(self) -> f64;
}

impl Scalar for i32 {
    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl Scalar for Coord {
    fn to_f64(self) -> f64 {
        Coord::to_f64(self)
    }
}

/// Closed polygons and open polylines produced by one trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Curves<T> {
    pub polygons: Vec<Contour<T>>,
    pub polylines: Vec<Contour<T>>,
}

impl<T> Default for Curves<T> {
    fn default() -> Self {
        Self {
            polygons: Vec::new(),
            polylines: Vec::new(),
        }
    }
}

impl<T: Scalar> Curves<T> {
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty() && self.polylines.is_empty()
    }

    /// Total number of points over every contour.
    pub fn point_count(&self) -> usize {
        self.polygons
            .iter()
            .chain(&self.polylines)
            .map(Vec::len)
            .sum()
    }

    /// Bounding box over every contour, `None` when there are no points.
    pub fn bounds(&self) -> Option<Bounds> {
        self.polygons
            .iter()
            .chain(&self.polylines)
            .filter_map(|contour| bounds(contour))
            .reduce(Bounds::union)
    }
}

/// Axis-aligned bounding box in floating point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

/// Shoelace area of a closed contour.
///
/// With y pointing down, contours around foreground come out negative and holes
/// positive.
pub fn signed_area<T: Scalar>(contour: &[Point<T>]) -> f64 {
    if contour.len() < 3 {
        return 0.0;
    }
    let twice: f64 = contour
        .iter()
        .zip(contour.iter().cycle().skip(1))
        .map(|(a, b)| a.x.to_f64() * b.y.to_f64() - b.x.to_f64() * a.y.to_f64())
        .sum();
    twice / 2.0
}

/// Length of the contour, closing it when `closed` is set.
pub fn perimeter<T: Scalar>(contour: &[Point<T>], closed: bool) -> f64 {
    let segment = |a: &Point<T>, b: &Point<T>| {
        (b.x.to_f64() - a.x.to_f64()).hypot(b.y.to_f64() - a.y.to_f64())
    };
    let open: f64 = contour.windows(2).map(|pair| segment(&pair[0], &pair[1])).sum();
    match (closed, contour.first(), contour.last()) {
        (true, Some(first), Some(last)) if contour.len() > 2 => open + segment(last, first),
        _ => open,
    }
}

pub fn bounds<T: Scalar>(contour: &[Point<T>]) -> Option<Bounds> {
    let (first, rest) = contour.split_first()?;
    let start = Bounds {
        min_x: first.x.to_f64(),
        min_y: first.y.to_f64(),
        max_x: first.x.to_f64(),
        max_y: first.y.to_f64(),
    };
    Some(rest.iter().fold(start, |acc, p| {
        let (x, y) = (p.x.to_f64(), p.y.to_f64());
        Bounds {
            min_x: acc.min_x.min(x),
            min_y: acc.min_y.min(y),
            max_x: acc.max_x.max(x),
            max_y: acc.max_y.max(y),
        }
    }))
}
