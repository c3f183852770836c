use crate::models::ScoredCandidate;

/// Min-max rescale each score dimension independently across `candidates`
///
/// A lone survivor keeps its absolute scores. A dimension where every
/// candidate scored the same is set to 1.0 for all of them.
pub fn normalize_scores(candidates: &mut [ScoredCandidate]) {
    if candidates.len() < 2 {
        return;
    }

    rescale(candidates, |c| &mut c.route_score);
    rescale(candidates, |c| &mut c.price_score);
    rescale(candidates, |c| &mut c.reputation_score);
}

fn rescale<F>(candidates: &mut [ScoredCandidate], field: F)
where
    F: Fn(&mut ScoredCandidate) -> &mut f64,
{
    let (min, max) = candidates
        .iter_mut()
        .map(|c| *field(c))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

    let range = max - min;
    for candidate in candidates.iter_mut() {
        let value = field(candidate);
        *value = if range > f64::EPSILON {
            ((*value - min) / range).clamp(0.0, 1.0)
        } else {
            1.0
        };
    }
}
