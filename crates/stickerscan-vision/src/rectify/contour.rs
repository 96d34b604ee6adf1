// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Contour geometry and quadrilateral candidate selection.

use imageproc::point::Point;
use stickerscan_core::config::DetectionConfig;
use tracing::trace;

use super::corners::{OrderedCorners, landscape_corners};

/// Relative margin an area must clear to replace the current best.
///
/// Shoelace sums of the same shape at different offsets differ in the last
/// bits; those count as equal.
const AREA_TIE_MARGIN: f64 = 1e-9;

/// A 4-vertex polygon approximation of a contour that passed the filters.
#[derive(Debug, Clone, PartialEq)]
pub struct Quad {
    /// Vertices in contour order.
    pub points: [Point<f64>; 4],
    /// Area enclosed by the originating contour.
    pub area: f64,
}

impl Quad {
    /// Corners labelled TL/TR/BR/BL, long side on top when the quad is near 45°.
    pub fn corners(&self) -> OrderedCorners {
        landscape_corners(&self.points)
    }

    /// Width over height of the labelled corners.
    ///
    /// Width averages the top and bottom edges, height the left and right
    /// ones. A tilted marker keeps its ratio up to about 45°; a marker on its
    /// side measures below one. Returns `None` for a degenerate quad.
    pub fn aspect_ratio(&self) -> Option<f64> {
        self.corners().aspect_ratio()
    }
}

/// Thresholds a contour has to pass to become the marker.
#[derive(Debug, Clone, Copy)]
pub struct CandidateFilter {
    pub min_area: f64,
    pub target_aspect: f64,
    pub aspect_tolerance: f64,
    pub epsilon_fraction: f64,
}

impl From<&DetectionConfig> for CandidateFilter {
    fn from(config: &DetectionConfig) -> Self {
        Self {
            min_area: config.min_contour_area,
            target_aspect: config.marker_aspect,
            aspect_tolerance: config.aspect_tolerance,
            epsilon_fraction: config.polygon_epsilon_fraction,
        }
    }
}

/// Pick the marker among `contours`.
///
/// A contour qualifies when it encloses at least `min_area`, approximates to
/// exactly four vertices, and its aspect ratio is within `aspect_tolerance` of
/// `target_aspect`. The largest qualifying contour wins; on equal areas the
/// first one encountered is kept.
pub fn select_marker<I>(contours: I, filter: &CandidateFilter) -> Option<Quad>
where
    I: IntoIterator<Item = Vec<Point<f64>>>,
{
    let mut best: Option<Quad> = None;

    for contour in contours {
        let area = polygon_area(&contour);
        if area < filter.min_area {
            continue;
        }

        let epsilon = filter.epsilon_fraction * perimeter(&contour);
        let approx = approximate_polygon(&contour, epsilon);
        if approx.len() != 4 {
            trace!(area, vertices = approx.len(), "Contour is not a quadrilateral");
            continue;
        }

        let quad = Quad {
            points: [approx[0], approx[1], approx[2], approx[3]],
            area,
        };
        let Some(ratio) = quad.aspect_ratio() else {
            continue;
        };
        if (ratio - filter.target_aspect).abs() > filter.aspect_tolerance {
            trace!(area, ratio, "Quadrilateral has the wrong aspect ratio");
            continue;
        }

        trace!(area, ratio, "Quadrilateral candidate accepted");
        let larger = match &best {
            Some(current) => area > current.area * (1.0 + AREA_TIE_MARGIN),
            None => true,
        };
        if larger {
            best = Some(quad);
        }
    }

    best
}

/// Area enclosed by a closed polygon (shoelace formula).
pub fn polygon_area(points: &[Point<f64>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        twice_area += points[i].x * points[j].y - points[j].x * points[i].y;
    }
    twice_area.abs() / 2.0
}

/// Length of a closed polygon's boundary.
pub fn perimeter(points: &[Point<f64>]) -> f64 {
    let n = points.len();
    if n < 2 {
        return 0.0;
    }
    (0..n).map(|i| distance(points[i], points[(i + 1) % n])).sum()
}

/// Douglas–Peucker simplification of a closed contour.
///
/// The contour is split at two mutually distant points (the point farthest
/// from the first one, and the point farthest from that), which always lie on
/// the convex hull, and each half is simplified as an open chain.
pub fn approximate_polygon(points: &[Point<f64>], epsilon: f64) -> Vec<Point<f64>> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let a = farthest_from(points, points[0]);
    let b = farthest_from(points, points[a]);
    if a == b {
        return vec![points[a]];
    }
    let (start, end) = if a < b { (a, b) } else { (b, a) };

    // First half: start..=end. Second half: end..n, wrapping to 0..=start.
    let first: Vec<Point<f64>> = points[start..=end].to_vec();
    let second: Vec<Point<f64>> = points[end..]
        .iter()
        .chain(points[..=start].iter())
        .copied()
        .collect();

    let mut out = Vec::new();
    simplify_chain(&first, epsilon, &mut out);
    simplify_chain(&second, epsilon, &mut out);
    out
}

/// Push the simplified vertices of an open chain onto `out`, excluding its
/// final point (the next chain starts there).
fn simplify_chain(chain: &[Point<f64>], epsilon: f64, out: &mut Vec<Point<f64>>) {
    let first = chain[0];
    if chain.len() <= 2 {
        out.push(first);
        return;
    }
    let last = chain[chain.len() - 1];

    let mut max_distance = 0.0;
    let mut index = 0;
    for (i, p) in chain.iter().enumerate().take(chain.len() - 1).skip(1) {
        let d = distance_to_line(*p, first, last);
        if d > max_distance {
            max_distance = d;
            index = i;
        }
    }

    if max_distance > epsilon {
        simplify_chain(&chain[..=index], epsilon, out);
        simplify_chain(&chain[index..], epsilon, out);
    } else {
        out.push(first);
    }
}

fn farthest_from(points: &[Point<f64>], origin: Point<f64>) -> usize {
    let mut best = 0;
    let mut best_distance = -1.0;
    for (i, p) in points.iter().enumerate() {
        let d = distance(*p, origin);
        if d > best_distance {
            best_distance = d;
            best = i;
        }
    }
    best
}

fn distance(a: Point<f64>, b: Point<f64>) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

/// Perpendicular distance from `p` to the line through `a` and `b`, or the
/// plain distance to `a` when the two coincide.
fn distance_to_line(p: Point<f64>, a: Point<f64>, b: Point<f64>) -> f64 {
    let length = distance(a, b);
    if length <= f64::EPSILON {
        return distance(p, a);
    }
    ((b.x - a.x) * (a.y - p.y) - (a.x - p.x) * (b.y - a.y)).abs() / length
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: f64, y: f64) -> Point<f64> {
        Point::new(x, y)
    }

    /// Axis-aligned rectangle with the given area and aspect, as a 4-point contour.
    fn rect_with_area(area: f64, aspect: f64) -> Vec<Point<f64>> {
        let h = (area / aspect).sqrt();
        let w = area / h;
        vec![pt(10.0, 10.0), pt(10.0 + w, 10.0), pt(10.0 + w, 10.0 + h), pt(10.0, 10.0 + h)]
    }

    /// Densely sampled rectangle outline, like a traced pixel border.
    fn traced_rect(x0: f64, y0: f64, w: f64, h: f64) -> Vec<Point<f64>> {
        let mut pts = Vec::new();
        let (wi, hi) = (w as i32, h as i32);
        for i in 0..wi {
            pts.push(pt(x0 + i as f64, y0));
        }
        for i in 0..hi {
            pts.push(pt(x0 + w, y0 + i as f64));
        }
        for i in 0..wi {
            pts.push(pt(x0 + w - i as f64, y0 + h));
        }
        for i in 0..hi {
            pts.push(pt(x0, y0 + h - i as f64));
        }
        pts
    }

    fn default_filter() -> CandidateFilter {
        CandidateFilter::from(&DetectionConfig::default())
    }

    #[test]
    fn shoelace_area_of_rectangle() {
        let area = polygon_area(&[pt(0.0, 0.0), pt(10.0, 0.0), pt(10.0, 5.0), pt(0.0, 5.0)]);
        assert!((area - 50.0).abs() < 1e-9);
    }

    #[test]
    fn perimeter_of_rectangle() {
        let p = perimeter(&[pt(0.0, 0.0), pt(10.0, 0.0), pt(10.0, 5.0), pt(0.0, 5.0)]);
        assert!((p - 30.0).abs() < 1e-9);
    }

    #[test]
    fn traced_outline_simplifies_to_four_corners() {
        let contour = traced_rect(20.0, 30.0, 190.0, 104.0);
        let eps = 0.02 * perimeter(&contour);
        let approx = approximate_polygon(&contour, eps);
        assert_eq!(approx.len(), 4, "got {approx:?}");
        for corner in [pt(20.0, 30.0), pt(210.0, 30.0), pt(210.0, 134.0), pt(20.0, 134.0)] {
            assert!(approx.iter().any(|p| distance(*p, corner) < 1.5), "missing {corner:?}");
        }
    }

    #[test]
    fn triangle_does_not_become_a_quad() {
        let contour = vec![pt(0.0, 0.0), pt(200.0, 0.0), pt(100.0, 150.0)];
        let eps = 0.02 * perimeter(&contour);
        assert_eq!(approximate_polygon(&contour, eps).len(), 3);
    }

    #[test]
    fn aspect_ratio_is_stable_under_tilt() {
        let upright = Quad {
            points: [pt(0.0, 0.0), pt(182.6, 0.0), pt(182.6, 100.0), pt(0.0, 100.0)],
            area: 18260.0,
        };
        let (s, c) = 30f64.to_radians().sin_cos();
        let rotate = |p: Point<f64>| pt(p.x * c - p.y * s, p.x * s + p.y * c);
        let tilted = Quad {
            points: upright.points.map(rotate),
            area: upright.area,
        };
        let a = upright.aspect_ratio().expect("non-degenerate");
        let b = tilted.aspect_ratio().expect("non-degenerate");
        assert!((a - 1.826).abs() < 1e-9);
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn degenerate_quad_has_no_aspect() {
        let flat = Quad {
            points: [pt(0.0, 0.0), pt(10.0, 0.0), pt(10.0, 0.0), pt(0.0, 0.0)],
            area: 0.0,
        };
        assert!(flat.aspect_ratio().is_none());
    }

    #[test]
    fn area_filter_boundary() {
        let filter = default_filter();
        assert!(select_marker(vec![rect_with_area(4999.0, 1.826)], &filter).is_none());

        let accepted = select_marker(vec![rect_with_area(5001.0, 1.826)], &filter)
            .expect("5001 px² qualifies");
        assert!((accepted.area - 5001.0).abs() < 1e-6);
    }

    #[test]
    fn wrong_aspect_loses_even_when_largest() {
        let filter = default_filter();
        let wide = rect_with_area(60000.0, 3.0);
        let marker = rect_with_area(20000.0, 1.826);

        let winner = select_marker(vec![wide.clone(), marker], &filter).expect("marker qualifies");
        assert!((winner.area - 20000.0).abs() < 1e-6);

        assert!(select_marker(vec![wide], &filter).is_none());
    }

    #[test]
    fn largest_qualifying_candidate_wins() {
        let filter = default_filter();
        let small = rect_with_area(8000.0, 1.9);
        let large = rect_with_area(30000.0, 1.7);
        let winner = select_marker(vec![small, large], &filter).expect("both qualify");
        assert!((winner.area - 30000.0).abs() < 1e-6);
    }

    #[test]
    fn equal_areas_keep_first_encountered() {
        let filter = default_filter();
        let first = rect_with_area(10000.0, 1.826);
        let second: Vec<_> = first.iter().map(|p| pt(p.x + 300.0, p.y)).collect();
        let winner = select_marker(vec![first.clone(), second], &filter).expect("qualifies");
        assert!(winner.points.iter().all(|p| p.x < 200.0));
    }

    #[test]
    fn equal_integer_areas_keep_first_encountered() {
        let filter = default_filter();
        let first = traced_rect(10.0, 10.0, 190.0, 104.0);
        let second = traced_rect(250.0, 60.0, 190.0, 104.0);
        let winner = select_marker(vec![first, second], &filter).expect("qualifies");
        assert!(winner.points.iter().all(|p| p.x < 220.0), "got {:?}", winner.points);
    }

    #[test]
    fn portrait_quad_is_not_a_marker() {
        let portrait = vec![pt(0.0, 0.0), pt(100.0, 0.0), pt(100.0, 182.6), pt(0.0, 182.6)];
        let quad = Quad {
            points: [portrait[0], portrait[1], portrait[2], portrait[3]],
            area: 18260.0,
        };
        let ratio = quad.aspect_ratio().expect("non-degenerate");
        assert!((ratio - 100.0 / 182.6).abs() < 1e-9);
        assert!(select_marker(vec![portrait], &default_filter()).is_none());
    }

    #[test]
    fn non_quadrilateral_is_skipped() {
        let filter = default_filter();
        let triangle = vec![pt(0.0, 0.0), pt(400.0, 0.0), pt(200.0, 300.0)];
        assert!(select_marker(vec![triangle], &filter).is_none());
    }
}
