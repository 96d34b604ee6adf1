// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Corner labelling for a detected quadrilateral.
//
// Sum/difference heuristic: top-left minimises x+y, bottom-right maximises
// x+y, top-right minimises y−x, bottom-left maximises y−x. This is only
// correct while the marker is within about ±45° of upright; past that the
// labels rotate with it. There is no fiducial to disambiguate orientation.
//
// `landscape_corners` settles the one ambiguous band, a marker close to 45°,
// by putting the long side on top. Steeper quads keep their labels, so a
// marker turned on its side measures taller than wide and is rejected.

use std::cmp::Ordering;

use imageproc::point::Point;
use tracing::debug;

/// Sides this close to 45° can be labelled as either pair by the heuristic.
const DIAGONAL_SLACK_DEGREES: f64 = 5.0;

/// The four corners of a quadrilateral, labelled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderedCorners {
    pub top_left: Point<f64>,
    pub top_right: Point<f64>,
    pub bottom_right: Point<f64>,
    pub bottom_left: Point<f64>,
}

impl OrderedCorners {
    /// Corners as perspective-transform control points, in TL, TR, BR, BL order.
    pub fn to_control_points(&self) -> [(f32, f32); 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
        .map(|p| (p.x as f32, p.y as f32))
    }

    /// Mean length of the top and bottom edges.
    pub fn width(&self) -> f64 {
        (edge(self.top_left, self.top_right) + edge(self.bottom_left, self.bottom_right)) / 2.0
    }

    /// Mean length of the left and right edges.
    pub fn height(&self) -> f64 {
        (edge(self.top_left, self.bottom_left) + edge(self.top_right, self.bottom_right)) / 2.0
    }

    /// Width over height as labelled. `None` for a degenerate quad.
    pub fn aspect_ratio(&self) -> Option<f64> {
        let (width, height) = (self.width(), self.height());
        if width <= f64::EPSILON || height <= f64::EPSILON {
            return None;
        }
        Some(width / height)
    }
}

/// Label the vertices of a quadrilateral.
///
/// Exact ties are broken by the other key (e.g. two vertices with equal x+y:
/// the one with smaller y−x is top-left), which makes the result independent
/// of the order the vertices are given in. If the heuristic still assigns one
/// vertex two labels (a quad far outside its working range), the labels are
/// instead assigned by walking clockwise from the top-left vertex.
pub fn order_corners(points: &[Point<f64>; 4]) -> OrderedCorners {
    let sum = |p: &Point<f64>| p.x + p.y;
    let diff = |p: &Point<f64>| p.y - p.x;

    let tl = extreme(points, |a, b| {
        sum(a).total_cmp(&sum(b)).then(diff(a).total_cmp(&diff(b)))
    });
    let br = extreme(points, |a, b| {
        sum(b).total_cmp(&sum(a)).then(diff(b).total_cmp(&diff(a)))
    });
    let tr = extreme(points, |a, b| {
        diff(a).total_cmp(&diff(b)).then(sum(b).total_cmp(&sum(a)))
    });
    let bl = extreme(points, |a, b| {
        diff(b).total_cmp(&diff(a)).then(sum(a).total_cmp(&sum(b)))
    });

    let mut seen = [false; 4];
    for i in [tl, tr, br, bl] {
        seen[i] = true;
    }
    if seen.iter().all(|s| *s) {
        return OrderedCorners {
            top_left: points[tl],
            top_right: points[tr],
            bottom_right: points[br],
            bottom_left: points[bl],
        };
    }

    debug!(tl, tr, br, bl, "Corner heuristic collided; ordering clockwise");
    clockwise_from(points, tl)
}

/// Label a marker candidate, preferring the long side on top near 45°.
///
/// Uses `order_corners`. When that puts a short side on top and the top edge
/// sits within a few degrees of the diagonal, the labels move one step around
/// the quad, to whichever neighbour has the higher top edge.
pub fn landscape_corners(points: &[Point<f64>; 4]) -> OrderedCorners {
    let c = order_corners(points);
    if c.width() >= c.height() || !near_diagonal(c.top_left, c.top_right) {
        return c;
    }

    let back = OrderedCorners {
        top_left: c.top_right,
        top_right: c.bottom_right,
        bottom_right: c.bottom_left,
        bottom_left: c.top_left,
    };
    let forward = OrderedCorners {
        top_left: c.bottom_left,
        top_right: c.top_left,
        bottom_right: c.top_right,
        bottom_left: c.bottom_right,
    };
    let top = |k: &OrderedCorners| k.top_left.y + k.top_right.y;
    debug!("Diagonal quad relabelled with its long side on top");
    if top(&back) <= top(&forward) { back } else { forward }
}

fn near_diagonal(a: Point<f64>, b: Point<f64>) -> bool {
    let inclination = (b.y - a.y).abs().atan2((b.x - a.x).abs()).to_degrees();
    (inclination - 45.0).abs() <= DIAGONAL_SLACK_DEGREES
}

fn edge(a: Point<f64>, b: Point<f64>) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Index of the first point that is minimal under `cmp`.
fn extreme<F>(points: &[Point<f64>; 4], cmp: F) -> usize
where
    F: Fn(&Point<f64>, &Point<f64>) -> Ordering,
{
    let mut best = 0;
    for i in 1..points.len() {
        if cmp(&points[i], &points[best]) == Ordering::Less {
            best = i;
        }
    }
    best
}

/// Label corners clockwise (in image coordinates, y down) starting at `start`.
fn clockwise_from(points: &[Point<f64>; 4], start: usize) -> OrderedCorners {
    let cx = points.iter().map(|p| p.x).sum::<f64>() / 4.0;
    let cy = points.iter().map(|p| p.y).sum::<f64>() / 4.0;
    let angle = |p: &Point<f64>| (p.y - cy).atan2(p.x - cx);

    let mut order = [0usize, 1, 2, 3];
    order.sort_by(|&a, &b| angle(&points[a]).total_cmp(&angle(&points[b])));
    let offset = order.iter().position(|&i| i == start).unwrap_or(0);
    order.rotate_left(offset);

    OrderedCorners {
        top_left: points[order[0]],
        top_right: points[order[1]],
        bottom_right: points[order[2]],
        bottom_left: points[order[3]],
    }
}
