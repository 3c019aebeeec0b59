//! Path generators. Position shapes are built around azimuth zero and then
//! rotated onto the anchor, so every closed shape starts on the anchor.
//! Samples are open: the closing point is not repeated.

use std::f32::consts::TAU;

use crate::{
    geometry::{clip_cube_position, clip_dome_position, Point, Radians},
    source::SpatMode,
};

pub const CIRCLE_POINTS: usize = 200;
pub const SPIRAL_POINTS: usize = 300;
pub const POLYGON_POINTS: usize = 240;
pub const ELEVATION_POINTS: usize = 200;

const SPIRAL_TURNS: f32 = 3.0;
const ELLIPSE_WIDTH: f32 = 0.5;

fn direction(clockwise: bool) -> f32 {
    if clockwise {
        1.0
    } else {
        -1.0
    }
}

fn onto_anchor(local: impl Iterator<Item = Point>, anchor: Point) -> Vec<Point> {
    let angle = anchor.angle();
    local.map(|point| point.rotated(angle)).collect()
}

pub fn circle(anchor: Point, clockwise: bool) -> Vec<Point> {
    let radius = anchor.distance_from_origin();
    let sign = direction(clockwise);
    let local = (0..CIRCLE_POINTS).map(|i| {
        let sweep = TAU * i as f32 / CIRCLE_POINTS as f32;
        Point::from_angle(Radians::new(sweep * sign), radius)
    });
    onto_anchor(local, anchor)
}

/// Ellipse whose long axis goes through the anchor.
pub fn ellipse(anchor: Point, clockwise: bool) -> Vec<Point> {
    let radius = anchor.distance_from_origin();
    let sign = direction(clockwise);
    let local = (0..CIRCLE_POINTS).map(|i| {
        let sweep = TAU * i as f32 / CIRCLE_POINTS as f32;
        Point::new(sweep.sin() * radius * ELLIPSE_WIDTH * sign, -sweep.cos() * radius)
    });
    onto_anchor(local, anchor)
}

/// Spiral of a few turns. `inward` starts on the anchor and ends at the
/// centre, otherwise the spiral grows from the centre to the anchor radius.
pub fn spiral(anchor: Point, clockwise: bool, inward: bool) -> Vec<Point> {
    let radius = anchor.distance_from_origin();
    let sign = direction(clockwise);
    let local = (0..SPIRAL_POINTS).map(|i| {
        let progress = i as f32 / SPIRAL_POINTS as f32;
        let sweep = TAU * SPIRAL_TURNS * progress;
        let magnitude = if inward { 1.0 - progress } else { progress };
        Point::from_angle(Radians::new(sweep * sign), radius * magnitude)
    });
    onto_anchor(local, anchor)
}

/// Square whose top edge is centred on the anchor.
pub fn square(anchor: Point, clockwise: bool) -> Vec<Point> {
    let radius = anchor.distance_from_origin();
    let side = radius * direction(clockwise);
    let vertices = [
        Point::new(0.0, -radius),
        Point::new(side, -radius),
        Point::new(side, radius),
        Point::new(-side, radius),
        Point::new(-side, -radius),
    ];
    onto_anchor(polygon(&vertices, POLYGON_POINTS).into_iter(), anchor)
}

/// Equilateral triangle with a vertex on the anchor.
pub fn triangle(anchor: Point, clockwise: bool) -> Vec<Point> {
    let radius = anchor.distance_from_origin();
    let third = Radians::TWO_PI / 3.0 * direction(clockwise);
    let vertices = [
        Point::from_angle(Radians::ZERO, radius),
        Point::from_angle(third, radius),
        Point::from_angle(third * 2.0, radius),
    ];
    onto_anchor(polygon(&vertices, POLYGON_POINTS).into_iter(), anchor)
}

/// Samples `count` points evenly spaced along the closed outline.
fn polygon(vertices: &[Point], count: usize) -> Vec<Point> {
    let Some(&first) = vertices.first() else {
        return Vec::new();
    };
    let edges: Vec<(Point, Point)> = vertices
        .iter()
        .copied()
        .zip(vertices.iter().copied().cycle().skip(1))
        .collect();
    let perimeter: f32 = edges.iter().map(|(start, end)| start.distance_to(*end)).sum();
    if perimeter <= f32::EPSILON {
        return vec![first; count];
    }

    (0..count)
        .map(|i| {
            let mut remaining = perimeter * i as f32 / count as f32;
            for (start, end) in &edges {
                let length = start.distance_to(*end);
                if length > 0.0 && remaining <= length {
                    return start.lerp(*end, remaining / length);
                }
                remaining -= length;
            }
            first
        })
        .collect()
}

/// Elevation ramp. Points hold `(progress, elevation / MAX_ELEVATION)`.
pub fn ramp(rising: bool) -> Vec<Point> {
    (0..ELEVATION_POINTS)
        .map(|i| {
            let progress = i as f32 / (ELEVATION_POINTS - 1) as f32;
            let level = if rising { progress } else { 1.0 - progress };
            Point::new(progress, level)
        })
        .collect()
}

/// Elevation triangle wave that goes up then down, or down then up.
pub fn back_and_forth(up_first: bool) -> Vec<Point> {
    (0..ELEVATION_POINTS)
        .map(|i| {
            let progress = i as f32 / (ELEVATION_POINTS - 1) as f32;
            let wave = 1.0 - (2.0 * progress - 1.0).abs();
            let level = if up_first { wave } else { 1.0 - wave };
            Point::new(progress, level)
        })
        .collect()
}

/// Repeats the path over `cycles` cycles while its amplitude decays towards
/// the first point. The last sample sits on the first point.
pub fn dampen(points: Vec<Point>, cycles: u32) -> Vec<Point> {
    let Some(&first) = points.first() else {
        return points;
    };
    if cycles == 0 {
        return points;
    }
    let total = points.len() * cycles as usize;
    let last = (total - 1).max(1) as f32;
    (0..total)
        .map(|k| {
            let amount = 1.0 - k as f32 / last;
            first + (points[k % points.len()] - first) * amount
        })
        .collect()
}

/// Keeps every point inside the field of `spat_mode`.
pub fn clip(points: &mut [Point], spat_mode: SpatMode) {
    for point in points {
        *point = match spat_mode {
            SpatMode::Dome => clip_dome_position(*point),
            SpatMode::Cube => clip_cube_position(*point),
        };
    }
}
