use std::cmp::Ordering;

use serde::Serialize;

use super::domain::{Applicant, ApplicantId};

/// Merit comparator shared by every ordering in the crate.
///
/// Lower `jee_rank` wins; equal ranks fall back to higher `marks`, then to the lower id.
/// Ids are unique, so no two distinct applicants ever compare equal.
pub fn merit_order(left: &Applicant, right: &Applicant) -> Ordering {
    left.jee_rank
        .cmp(&right.jee_rank)
        .then_with(|| right.marks.cmp(&left.marks))
        .then_with(|| left.id.cmp(&right.id))
}

/// Returns the population sorted best merit first.
pub fn rank(mut applicants: Vec<Applicant>) -> Vec<Applicant> {
    merge_sort_by(&mut applicants, merit_order);
    applicants
}

/// Stable top-down merge sort using a single scratch copy of the input.
pub fn merge_sort_by<T, F>(items: &mut [T], compare: F)
where
    T: Clone,
    F: Fn(&T, &T) -> Ordering,
{
    if items.len() < 2 {
        return;
    }

    let mut scratch = items.to_vec();
    split_merge(&mut scratch, items, &compare);
}

// `source` and `target` hold the same elements on entry; `target` is sorted on exit.
fn split_merge<T, F>(source: &mut [T], target: &mut [T], compare: &F)
where
    T: Clone,
    F: Fn(&T, &T) -> Ordering,
{
    let len = target.len();
    if len < 2 {
        return;
    }

    let mid = len / 2;
    {
        let (source_low, source_high) = source.split_at_mut(mid);
        let (target_low, target_high) = target.split_at_mut(mid);
        split_merge(target_low, source_low, compare);
        split_merge(target_high, source_high, compare);
    }

    let (low, high) = source.split_at(mid);
    merge(low, high, target, compare);
}

fn merge<T, F>(low: &[T], high: &[T], target: &mut [T], compare: &F)
where
    T: Clone,
    F: Fn(&T, &T) -> Ordering,
{
    let (mut i, mut j) = (0, 0);
    for slot in target.iter_mut() {
        let take_low = match (low.get(i), high.get(j)) {
            (Some(left), Some(right)) => compare(left, right) != Ordering::Greater,
            (Some(_), None) => true,
            (None, _) => false,
        };

        if take_low {
            *slot = low[i].clone();
            i += 1;
        } else {
            *slot = high[j].clone();
            j += 1;
        }
    }
}

/// An applicant's standing within the whole population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MeritPosition {
    pub id: ApplicantId,
    pub position: usize,
    pub total: usize,
}

/// 1-based merit position of `id`, consistent with [`rank`].
pub fn merit_position(population: &[Applicant], id: ApplicantId) -> Option<MeritPosition> {
    let applicant = population.iter().find(|candidate| candidate.id == id)?;
    let ahead = population
        .iter()
        .filter(|other| merit_order(other, applicant) == Ordering::Less)
        .count();

    Some(MeritPosition {
        id,
        position: ahead + 1,
        total: population.len(),
    })
}
