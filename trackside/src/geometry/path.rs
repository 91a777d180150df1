//! Projected path descriptors and arc-length measurement.

use std::fmt::Write as _;

use super::projection::Point;

/// One continuous run of points.
///
/// A closed subpath stores each vertex once; the closing segment back to the
/// first point is implied.
#[derive(Debug, Clone, PartialEq)]
pub struct SubPath {
    pub points: Vec<Point>,
    pub closed: bool,
}

impl SubPath {
    /// An open polyline.
    pub fn open(points: Vec<Point>) -> Self {
        Self {
            points,
            closed: false,
        }
    }

    /// A ring. A repeated first point at the end is dropped.
    pub fn ring(mut points: Vec<Point>) -> Self {
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        Self {
            points,
            closed: true,
        }
    }

    /// Segments in drawing order, including the closing segment of a ring.
    pub fn segments(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let closing = match (self.closed, self.points.first(), self.points.last()) {
            (true, Some(first), Some(last)) if self.points.len() > 1 => Some((*last, *first)),
            _ => None,
        };
        self.points
            .windows(2)
            .map(|w| (w[0], w[1]))
            .chain(closing)
    }

    pub fn length(&self) -> f64 {
        self.segments().map(|(a, b)| a.distance(&b)).sum()
    }
}

/// A drawable path made of one or more subpaths (a polygon with holes has
/// several rings).
#[derive(Debug, Clone, PartialEq)]
pub struct PathDescriptor {
    pub subpaths: Vec<SubPath>,
}

impl PathDescriptor {
    pub fn new(subpaths: Vec<SubPath>) -> Self {
        Self { subpaths }
    }

    /// Whether at least one subpath has a segment to draw.
    pub fn is_drawable(&self) -> bool {
        self.subpaths.iter().any(|s| s.points.len() > 1)
    }

    /// Total arc length over all subpaths. Jumps between subpaths do not count.
    pub fn length(&self) -> f64 {
        self.subpaths.iter().map(SubPath::length).sum()
    }

    pub fn start(&self) -> Option<Point> {
        self.subpaths.iter().find_map(|s| s.points.first().copied())
    }

    /// The point at arc length `distance` from the start.
    ///
    /// Distances are clamped to `[0, length]`. Returns `None` for a path with
    /// no points.
    pub fn point_at_length(&self, distance: f64) -> Option<Point> {
        let start = self.start()?;
        if distance.is_nan() || distance <= 0.0 {
            return Some(start);
        }

        let mut remaining = distance;
        let mut last = start;
        for (a, b) in self.subpaths.iter().flat_map(SubPath::segments) {
            let len = a.distance(&b);
            if remaining <= len && len > 0.0 {
                return Some(a.lerp(&b, remaining / len));
            }
            remaining -= len;
            last = b;
        }
        Some(last)
    }

    /// SVG path data: `M x,y L x,y ... Z` per subpath.
    pub fn to_svg_path(&self) -> String {
        let mut d = String::new();
        for sub in &self.subpaths {
            for (i, p) in sub.points.iter().enumerate() {
                let cmd = if i == 0 { 'M' } else { 'L' };
                let _ = write!(d, "{cmd}{},{}", fmt_coord(p.x), fmt_coord(p.y));
            }
            if sub.closed && !sub.points.is_empty() {
                d.push('Z');
            }
        }
        d
    }
}

fn fmt_coord(v: f64) -> f64 {
    let rounded = (v * 1000.0).round() / 1000.0;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(coords: &[(f64, f64)]) -> Vec<Point> {
        coords.iter().map(|(x, y)| Point::new(*x, *y)).collect()
    }

    #[test]
    fn test_open_length_and_endpoints() {
        let path = PathDescriptor::new(vec![SubPath::open(pts(&[(0.0, 0.0), (3.0, 0.0), (3.0, 4.0)]))]);
        assert_eq!(path.length(), 7.0);
        assert_eq!(path.point_at_length(0.0), Some(Point::new(0.0, 0.0)));
        assert_eq!(path.point_at_length(7.0), Some(Point::new(3.0, 4.0)));
        assert_eq!(path.point_at_length(5.0), Some(Point::new(3.0, 2.0)));
        assert_eq!(path.point_at_length(100.0), Some(Point::new(3.0, 4.0)));
        assert_eq!(path.point_at_length(-1.0), Some(Point::new(0.0, 0.0)));
    }

    #[test]
    fn test_ring_drops_duplicate_and_closes() {
        let ring = SubPath::ring(pts(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]));
        assert_eq!(ring.points.len(), 4);
        assert_eq!(ring.length(), 4.0);

        let path = PathDescriptor::new(vec![ring]);
        // Three quarters round is the top-left corner.
        assert_eq!(path.point_at_length(3.0), Some(Point::new(0.0, 1.0)));
        // The end of a closed ring is back at the start.
        assert_eq!(path.point_at_length(4.0), Some(Point::new(0.0, 0.0)));
    }

    #[test]
    fn test_multiple_subpaths_skip_jump() {
        let path = PathDescriptor::new(vec![
            SubPath::open(pts(&[(0.0, 0.0), (1.0, 0.0)])),
            SubPath::open(pts(&[(10.0, 0.0), (12.0, 0.0)])),
        ]);
        assert_eq!(path.length(), 3.0);
        assert_eq!(path.point_at_length(2.0), Some(Point::new(11.0, 0.0)));
    }

    #[test]
    fn test_empty_and_single_point() {
        let empty = PathDescriptor::new(vec![]);
        assert_eq!(empty.point_at_length(1.0), None);
        assert!(!empty.is_drawable());

        let single = PathDescriptor::new(vec![SubPath::open(pts(&[(2.0, 2.0)]))]);
        assert!(!single.is_drawable());
        assert_eq!(single.length(), 0.0);
        assert_eq!(single.point_at_length(5.0), Some(Point::new(2.0, 2.0)));
    }

    #[test]
    fn test_svg_path_data() {
        let path = PathDescriptor::new(vec![
            SubPath::open(pts(&[(0.0, 0.0), (1.23456, 2.0)])),
            SubPath::ring(pts(&[(5.0, 5.0), (6.0, 5.0), (6.0, 6.0), (5.0, 5.0)])),
        ]);
        assert_eq!(path.to_svg_path(), "M0,0L1.235,2M5,5L6,5L6,6Z");
    }
}
