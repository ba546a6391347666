use smallvec::{SmallVec, smallvec};

/// Upper bound on the arity of a discrete variable.
///
/// Declaring more states than this is rejected at build time. Message
/// buffers are [SmallVec]s with inline storage for the common small
/// arities, so inference never allocates per-operation; arities between
/// the inline size and [MAX_STATES] spill to the heap once, when the
/// graph is built.
pub const MAX_STATES: usize = 32;

/// A discrete probability vector: one entry per state of a variable.
///
/// Used both for node beliefs and for edge messages. Inline capacity of 8
/// covers every benchmark network's typical arity without heap traffic.
pub type Belief = SmallVec<[f64; 8]>;

/// Returns the uniform distribution over `n` states.
pub fn uniform(n: usize) -> Belief {
    smallvec![1.0 / n as f64; n]
}

/// How [combine] treats a zero factor in an incoming message.
///
/// The compatibility default skips factors that are exactly zero so that a
/// stale, never-sent message (all zeros) cannot collapse a whole belief
/// vector. The strict mode multiplies zeros through, which lets hard
/// evidence genuinely rule states out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ZeroPolicy {
    #[default]
    SkipZeros,
    Strict,
}

/// Elementwise product of `dest` with an incoming message.
///
/// The identity message is the all-ones vector. Under
/// [ZeroPolicy::SkipZeros], factors `<= 0` leave the destination entry
/// untouched.
#[inline]
pub fn combine(dest: &mut [f64], message: &[f64], policy: ZeroPolicy) {
    debug_assert_eq!(dest.len(), message.len());
    for (d, &m) in dest.iter_mut().zip(message.iter()) {
        if m <= 0.0 && policy == ZeroPolicy::SkipZeros {
            continue;
        }
        *d *= m;
    }
}

/// Normalizes `states` to sum to 1 in place and returns the pre-normalization sum.
///
/// A sum `<= 0` is treated as 1, leaving the vector as-is: underflowed
/// beliefs freeze instead of dividing by zero.
pub fn normalize(states: &mut [f64]) -> f64 {
    let total: f64 = states.iter().sum();
    let divisor = if total <= 0.0 { 1.0 } else { total };
    for s in states.iter_mut() {
        *s /= divisor;
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine_has_identity() {
        let mut belief = [0.2, 0.5, 0.3];
        combine(&mut belief, &[1.0, 1.0, 1.0], ZeroPolicy::SkipZeros);
        assert_eq!(belief, [0.2, 0.5, 0.3]);
    }

    #[test]
    fn combine_skips_zero_factors_by_default() {
        let mut belief = [0.4, 0.6];
        combine(&mut belief, &[0.0, 0.5], ZeroPolicy::SkipZeros);
        assert_eq!(belief, [0.4, 0.3]);
    }

    #[test]
    fn strict_combine_multiplies_zeros_through() {
        let mut belief = [0.4, 0.6];
        combine(&mut belief, &[0.0, 0.5], ZeroPolicy::Strict);
        assert_eq!(belief, [0.0, 0.3]);
    }

    #[test]
    fn normalize_sums_to_one() {
        let mut states = [2.0, 6.0];
        let total = normalize(&mut states);
        assert_eq!(total, 8.0);
        assert_eq!(states, [0.25, 0.75]);
    }

    #[test]
    fn normalize_freezes_underflowed_vectors() {
        let mut states = [0.0, 0.0];
        let total = normalize(&mut states);
        assert_eq!(total, 0.0);
        assert_eq!(states, [0.0, 0.0]);
    }
}
