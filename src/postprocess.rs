//! Fusion of near-colinear segments separated by small gaps.
//!
//! Detection frequently splits one physical edge into several colinear
//! pieces: crossings erase pixels, and votes can trigger on either side of
//! the erasure. The postprocessor stitches such pieces back together: it
//! looks for a segment whose tail sits close to another's head, checks that
//! the two runs point the same way, and replaces the pair with their hull.

use crate::types::{Point, Segment};
use log::debug;
use nalgebra::Vector2;

/// A directed view of an undirected segment in the working pool.
///
/// Each undirected segment appears twice, once per orientation, so that
/// "extend the head of s" is a uniform search for tails near s's head.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Directed {
    tail: Point,
    head: Point,
    index: usize,
}

/// Near-colinear segment fuser.
#[derive(Debug, Clone)]
pub struct Postprocessor {
    /// Maximum pixel distance between a head and a tail that may extend it.
    pub gap_limit: i64,
    /// Angular slack for the fusion test, in parts per semiturn.
    pub angle_tolerance: usize,
    /// Parts per semiturn in which `angle_tolerance` is expressed.
    pub max_theta: usize,
}

impl Default for Postprocessor {
    fn default() -> Self {
        Self {
            gap_limit: 3,
            angle_tolerance: 80,
            max_theta: 3600,
        }
    }
}

impl Postprocessor {
    /// The fusion test compares the cosine of the angle between the two
    /// half-runs against this bound; vectors pointing in near-opposite
    /// directions have cosines at or below it.
    fn cos_threshold(&self) -> f64 {
        let slack = self.angle_tolerance as f64 * std::f64::consts::PI / self.max_theta as f64;
        -slack.cos()
    }

    /// Fuse pairs until no head can be extended any further.
    ///
    /// Each fusion strictly reduces the segment count, so the pass
    /// terminates; the result is independent of the RNG and of prior runs.
    pub fn run(&self, segments: &mut Vec<Segment>) {
        let cos_threshold = self.cos_threshold();
        let before = segments.len();

        let mut i = 0;
        while i < segments.len() {
            let mut pool: Vec<Directed> = Vec::with_capacity(2 * (segments.len() - i - 1));
            for (offset, s) in segments[i + 1..].iter().enumerate() {
                let index = i + 1 + offset;
                pool.push(Directed {
                    tail: s.a,
                    head: s.b,
                    index,
                });
                pool.push(Directed {
                    tail: s.b,
                    head: s.a,
                    index,
                });
            }

            let Segment { mut a, mut b } = segments[i];

            // Head first, then tail, by swapping the endpoints and
            // extending again.
            for _ in 0..2 {
                self.extend_head(a, &mut b, &mut pool, segments, cos_threshold);
                std::mem::swap(&mut a, &mut b);
            }

            segments[i] = Segment::new(a, b);
            i += 1;
        }

        if segments.len() != before {
            debug!("postprocess fused {} → {} segments", before, segments.len());
        }
    }

    fn extend_head(
        &self,
        a: Point,
        b: &mut Point,
        pool: &mut Vec<Directed>,
        segments: &mut Vec<Segment>,
        cos_threshold: f64,
    ) {
        'restart: loop {
            let neighbors = nearest_tails(pool, *b, self.gap_limit);

            for n in neighbors {
                if !fusable(a, *b, n.tail, n.head, cos_threshold) {
                    continue;
                }

                // The points run a - b ~ c - d; the fused segment is {a, d}.
                *b = n.head;

                let last = segments.len() - 1;
                segments.swap_remove(n.index);
                pool.retain(|e| e.index != n.index);
                if n.index != last {
                    for e in pool.iter_mut() {
                        if e.index == last {
                            e.index = n.index;
                        }
                    }
                }

                continue 'restart;
            }

            return;
        }
    }
}

/// The fusion rule: with `m` the midpoint of the head/tail pair, the
/// outward half-runs `a − m` and `d − m` must point in near-opposite
/// directions.
fn fusable(a: Point, b: Point, c: Point, d: Point, cos_threshold: f64) -> bool {
    let m = Vector2::new((b.x + c.x) as f64 / 2.0, (b.y + c.y) as f64 / 2.0);
    let v1 = Vector2::new(a.x as f64, a.y as f64) - m;
    let v2 = Vector2::new(d.x as f64, d.y as f64) - m;

    let denom = v1.norm() * v2.norm();
    if denom < f64::EPSILON {
        return false;
    }

    v1.dot(&v2) / denom <= cos_threshold
}

fn nearest_tails(pool: &mut [Directed], query: Point, limit: i64) -> Vec<Directed> {
    let mut out = Vec::new();
    kd_search(pool, query, limit, 0, &mut out);
    out
}

/// Modified kd-partition search over tail points.
///
/// Partitions around the median along the current axis, reports the median
/// if it lies within the query disc, and descends into each half-plane the
/// disc intersects. The slice is reordered in place.
fn kd_search(items: &mut [Directed], query: Point, limit: i64, dim: usize, out: &mut Vec<Directed>) {
    if items.is_empty() {
        return;
    }

    let key = |p: Point| if dim == 0 { p.x } else { p.y };

    let mid = items.len() / 2;
    items.select_nth_unstable_by(mid, |a, b| key(a.tail).cmp(&key(b.tail)));

    let median = items[mid];
    if (query - median.tail).length_squared() <= limit * limit {
        out.push(median);
    }

    // The signed distance to the separating line decides which half-planes
    // the disc can reach.
    let d_plane = key(query) - key(median.tail);

    let (before, rest) = items.split_at_mut(mid);
    let after = &mut rest[1..];

    if d_plane <= limit {
        kd_search(before, query, limit, 1 - dim, out);
    }
    if d_plane >= -limit {
        kd_search(after, query, limit, 1 - dim, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(ax: i64, ay: i64, bx: i64, by: i64) -> Segment {
        Segment::new(Point::new(ax, ay), Point::new(bx, by))
    }

    fn postprocessor() -> Postprocessor {
        Postprocessor {
            gap_limit: 3,
            angle_tolerance: 80,
            max_theta: 3600,
        }
    }

    #[test]
    fn chained_colinear_segments_fuse_into_one() {
        let mut segments = vec![seg(0, 0, 50, 1), seg(51, 0, 100, 0), seg(101, 1, 150, 0)];
        postprocessor().run(&mut segments);

        assert_eq!(segments, vec![seg(0, 0, 150, 0)]);
    }

    #[test]
    fn fusion_is_insensitive_to_order_and_orientation() {
        let mut segments = vec![seg(101, 1, 150, 0), seg(100, 0, 51, 0), seg(0, 0, 50, 1)];
        postprocessor().run(&mut segments);

        assert_eq!(segments, vec![seg(0, 0, 150, 0)]);
    }

    #[test]
    fn oblique_segment_is_ignored() {
        let mut segments = vec![seg(0, 0, 50, 50), seg(100, 100, 50, 50), seg(50, 75, 50, 50)];
        let post = Postprocessor {
            gap_limit: 1,
            ..postprocessor()
        };
        post.run(&mut segments);

        segments.sort_by_key(|s| (s.a, s.b));
        let mut expected = vec![seg(0, 0, 100, 100), seg(50, 50, 50, 75)];
        expected.sort_by_key(|s| (s.a, s.b));
        assert_eq!(segments, expected);
    }

    #[test]
    fn distant_segments_stay_apart() {
        let mut segments = vec![seg(0, 0, 50, 0), seg(60, 0, 100, 0)];
        postprocessor().run(&mut segments);
        assert_eq!(segments.len(), 2);
    }

    #[test]
    fn sharp_turns_stay_apart() {
        let mut segments = vec![seg(0, 0, 50, 0), seg(52, 2, 100, 50)];
        postprocessor().run(&mut segments);
        assert_eq!(segments.len(), 2);
    }

    #[test]
    fn kd_search_agrees_with_brute_force() {
        let tails = [
            (0, 0),
            (3, 4),
            (10, 10),
            (9, 12),
            (11, 8),
            (14, 10),
            (10, 3),
            (-5, 9),
            (100, 100),
            (12, 12),
        ];
        let entries: Vec<Directed> = tails
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| Directed {
                tail: Point::new(x, y),
                head: Point::new(x + 1, y),
                index: i,
            })
            .collect();

        let query = Point::new(10, 10);
        let limit = 5i64;

        let mut expected: Vec<usize> = entries
            .iter()
            .filter(|e| (query - e.tail).length_squared() <= limit * limit)
            .map(|e| e.index)
            .collect();
        expected.sort_unstable();

        let mut pool = entries.clone();
        let mut found: Vec<usize> = nearest_tails(&mut pool, query, limit)
            .into_iter()
            .map(|e| e.index)
            .collect();
        found.sort_unstable();

        assert_eq!(found, expected);
    }

    #[test]
    fn kd_search_with_zero_limit_finds_exact_matches() {
        let mut pool: Vec<Directed> = (0..8)
            .map(|i| Directed {
                tail: Point::new(i, i),
                head: Point::new(i, i + 1),
                index: i as usize,
            })
            .collect();

        let found = nearest_tails(&mut pool, Point::new(4, 4), 0);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].tail, Point::new(4, 4));
    }
}
