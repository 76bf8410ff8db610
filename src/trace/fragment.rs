use std::collections::VecDeque;

use crate::geom::{Contour, Point};

/// An open chain of boundary points under construction.
pub(crate) type Fragment<T> = VecDeque<Point<T>>;

/// Identifies a fragment inside a [`Fragments`] arena for the duration of one row.
pub(crate) type FragmentId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum End {
    Front,
    Back,
}

/// One endpoint of an open fragment lying on the current row.
///
/// The pixel to the left of a front sprout is foreground, the pixel to the left of
/// a back sprout is background.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Sprout {
    pub frag: FragmentId,
    pub end: End,
}

impl Sprout {
    pub fn new(frag: FragmentId, end: End) -> Self {
        Self { frag, end }
    }

    /// 1 when the pixel left of the sprout is foreground.
    pub fn left_color(self) -> usize {
        match self.end {
            End::Front => 1,
            End::Back => 0,
        }
    }
}

/// Arena of open fragments.
///
/// Fragments are addressed by index. Splicing empties the absorbed fragment
/// instead of removing it, so indices stay valid until [`Fragments::prune`].
#[derive(Debug, Clone)]
pub(crate) struct Fragments<T> {
    slots: Vec<Fragment<T>>,
}

impl<T> Default for Fragments<T> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<T: Copy + Ord> Fragments<T> {
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Number of fragments still holding points.
    pub fn open_count(&self) -> usize {
        self.slots.iter().filter(|f| !f.is_empty()).count()
    }

    pub fn push(&mut self, fragment: Fragment<T>) -> FragmentId {
        self.slots.push(fragment);
        self.slots.len() - 1
    }

    pub fn extend(&mut self, fragments: impl IntoIterator<Item = Fragment<T>>) {
        self.slots.extend(fragments);
    }

    #[cfg(test)]
    pub fn is_dead(&self, id: FragmentId) -> bool {
        self.slots[id].is_empty()
    }

    pub fn endpoint(&self, sprout: Sprout) -> Option<Point<T>> {
        let fragment = &self.slots[sprout.frag];
        match sprout.end {
            End::Front => fragment.front().copied(),
            End::Back => fragment.back().copied(),
        }
    }

    /// The endpoint at the opposite end of the sprout's fragment.
    pub fn far_endpoint(&self, sprout: Sprout) -> Option<Point<T>> {
        let fragment = &self.slots[sprout.frag];
        match sprout.end {
            End::Front => fragment.back().copied(),
            End::Back => fragment.front().copied(),
        }
    }

    pub fn endpoint_mut(&mut self, sprout: Sprout) -> Option<&mut Point<T>> {
        let fragment = &mut self.slots[sprout.frag];
        match sprout.end {
            End::Front => fragment.front_mut(),
            End::Back => fragment.back_mut(),
        }
    }

    /// Add `point` beyond the sprout's endpoint.
    pub fn push_at(&mut self, sprout: Sprout, point: Point<T>) {
        let fragment = &mut self.slots[sprout.frag];
        match sprout.end {
            End::Front => fragment.push_front(point),
            End::Back => fragment.push_back(point),
        }
    }

    pub fn pop_at(&mut self, sprout: Sprout) -> Option<Point<T>> {
        let fragment = &mut self.slots[sprout.frag];
        match sprout.end {
            End::Front => fragment.pop_front(),
            End::Back => fragment.pop_back(),
        }
    }

    /// Join `source` onto `target` at their touching ends.
    ///
    /// The joined chain lives in the target's slot and the source slot is left
    /// empty. Every sprout in `sprouts` that referred to the source fragment is
    /// redirected to the target, keeping its end, so it keeps naming the same
    /// physical endpoint. The two sprouts must sit on different fragments and on
    /// opposite ends.
    pub fn splice(&mut self, target: Sprout, source: Sprout, sprouts: &mut [Sprout]) {
        debug_assert_ne!(target.frag, source.frag, "splicing a fragment onto itself");
        debug_assert_ne!(target.end, source.end, "splicing matching ends");
        let mut moved = std::mem::take(&mut self.slots[source.frag]);
        let kept = &mut self.slots[target.frag];
        match target.end {
            End::Front => {
                moved.append(kept);
                *kept = moved;
            }
            End::Back => kept.append(&mut moved),
        }
        for sprout in sprouts.iter_mut().filter(|s| s.frag == source.frag) {
            sprout.frag = target.frag;
        }
    }

    /// Remove a fragment's points, leaving its slot empty.
    pub fn take(&mut self, id: FragmentId) -> Fragment<T> {
        std::mem::take(&mut self.slots[id])
    }

    /// Drop empty slots. Invalidates every [`FragmentId`] and [`Sprout`].
    pub fn prune(&mut self) {
        self.slots.retain(|f| !f.is_empty());
    }

    /// Remove every non-empty fragment, in arena order.
    pub fn drain(&mut self) -> impl Iterator<Item = Fragment<T>> + '_ {
        self.slots.drain(..).filter(|f| !f.is_empty())
    }

    /// Collect the endpoints lying on row `y`, sorted by x.
    ///
    /// Fragments with no endpoint on `y` have stopped growing and are handed to
    /// `finish`. When no fragment reaches `y` at all, every fragment is finished
    /// and the arena is emptied.
    pub fn collect_sprouts(&mut self, y: T, mut finish: impl FnMut(Fragment<T>)) -> Vec<Sprout> {
        let mut sprouts = Vec::new();
        for id in 0..self.slots.len() {
            let fragment = &self.slots[id];
            let (Some(front), Some(back)) = (fragment.front(), fragment.back()) else {
                continue;
            };
            let before = sprouts.len();
            if front.y == y {
                sprouts.push((front.x, Sprout::new(id, End::Front)));
            }
            if back.y == y {
                sprouts.push((back.x, Sprout::new(id, End::Back)));
            }
            if sprouts.len() == before {
                finish(self.take(id));
            }
        }
        if sprouts.is_empty() {
            for fragment in self.drain() {
                finish(fragment);
            }
        }
        sprouts.sort_by_key(|&(x, _)| x);
        sprouts.into_iter().map(|(_, sprout)| sprout).collect()
    }
}

/// Convert a finished fragment into an output contour, shifting x by `dx`.
pub(crate) fn export<T>(fragment: Fragment<T>, dx: T) -> Contour<T>
where
    T: Copy + std::ops::Add<Output = T>,
{
    fragment
        .into_iter()
        .map(|p| Point::new(p.x + dx, p.y))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(points: &[(i32, i32)]) -> Fragment<i32> {
        points.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    fn xs(fragment: &Fragment<i32>) -> Vec<i32> {
        fragment.iter().map(|p| p.x).collect()
    }

    mod splice {
        use super::*;

        mod unit {
            use super::*;

            #[test]
            fn back_target_appends_source() {
                let mut arena = Fragments::default();
                let a = arena.push(chain(&[(0, 0), (1, 0)]));
                let b = arena.push(chain(&[(2, 0), (3, 0)]));
                let mut sprouts = [Sprout::new(b, End::Back)];
                arena.splice(Sprout::new(a, End::Back), Sprout::new(b, End::Front), &mut sprouts);
                assert_eq!(xs(&arena.slots[a]), vec![0, 1, 2, 3]);
                assert!(arena.is_dead(b));
                assert_eq!(sprouts[0], Sprout::new(a, End::Back));
                assert_eq!(arena.endpoint(sprouts[0]), Some(Point::new(3, 0)));
            }

            #[test]
            fn front_target_prepends_source() {
                let mut arena = Fragments::default();
                let a = arena.push(chain(&[(5, 0), (6, 0)]));
                let b = arena.push(chain(&[(3, 0), (4, 0)]));
                let mut sprouts = [Sprout::new(b, End::Front), Sprout::new(a, End::Back)];
                arena.splice(Sprout::new(a, End::Front), Sprout::new(b, End::Back), &mut sprouts);
                assert_eq!(xs(&arena.slots[a]), vec![3, 4, 5, 6]);
                assert_eq!(arena.endpoint(sprouts[0]), Some(Point::new(3, 0)));
                assert_eq!(arena.endpoint(sprouts[1]), Some(Point::new(6, 0)));
                assert_eq!(arena.open_count(), 1);
            }
        }
    }

    mod collect_sprouts {
        use super::*;

        mod unit {
            use super::*;

            #[test]
            fn finished_fragments_are_handed_out() {
                let mut arena = Fragments::default();
                arena.push(chain(&[(4, 2), (4, 1), (1, 1), (1, 2)]));
                arena.push(chain(&[(7, 0), (7, 1)]));
                let mut finished = Vec::new();
                let sprouts = arena.collect_sprouts(2, |f| finished.push(f));
                assert_eq!(finished.len(), 1);
                assert_eq!(
                    sprouts,
                    vec![Sprout::new(0, End::Back), Sprout::new(0, End::Front)]
                );
                assert_eq!(arena.open_count(), 1);
            }

            #[test]
            fn no_sprouts_drains_everything() {
                let mut arena = Fragments::default();
                arena.push(chain(&[(0, 0), (0, 1)]));
                arena.push(chain(&[(3, 1), (3, 0)]));
                let mut finished = Vec::new();
                let sprouts = arena.collect_sprouts(5, |f| finished.push(f));
                assert!(sprouts.is_empty());
                assert_eq!(finished.len(), 2);
                assert_eq!(arena.open_count(), 0);
            }

            #[test]
            fn export_shifts_x_only() {
                let contour = export(chain(&[(2, 3), (1, 3)]), -1);
                assert_eq!(contour, vec![Point::new(1, 3), Point::new(0, 3)]);
            }
        }
    }
}
