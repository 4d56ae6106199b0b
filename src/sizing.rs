//! Resolution of command line bounds into concrete sample sizes.

use thiserror::Error;

/// Absorbs binary representation error before flooring, so that for example
/// `10 × (1 − 0.9)` yields 1 rather than 0.
const FLOOR_EPSILON: f64 = 1e-9;

/// The size bound selected on the command line.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SizeBound {
    /// No bound: the union spans the whole catalog.
    Population,
    /// Bound on the size of the union (`-u`).
    Union(usize),
    /// Bound on the size of the symmetric difference (`-s`).
    SymmetricDifference(usize),
}

/// Concrete sizes handed to the sampler.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampleRequest {
    /// Number of distinct hashes across both samples.
    pub union_size: usize,
    /// Number of hashes present in exactly one sample.
    pub symdiff_size: usize,
    /// Fraction of the symmetric difference assigned to the first sample.
    pub diff_ratio: f64,
}

/// Invalid size bounds or ratios.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SizeError {
    /// The requested union exceeds the catalog.
    #[error("Size of sample union too big: requested {requested}, only {available} files available")]
    UnionTooLarge {
        /// Requested union size.
        requested: usize,
        /// Catalog size.
        available: usize,
    },
    /// The union implied by the symmetric difference bound exceeds the
    /// catalog.
    #[error(
        "Size of sample symmetric difference too big: implies a union of {union}, only {available} files available"
    )]
    SymdiffTooLarge {
        /// Union size implied by the bound and overlap.
        union: usize,
        /// Catalog size.
        available: usize,
    },
    /// The overlap ratio is outside the accepted range.
    #[error("overlap ratio {0} must lie in [0, 1]")]
    Overlap(f64),
    /// The overlap ratio makes the symmetric difference bound unsatisfiable.
    #[error("overlap ratio {0} must be below 1 when bounding the symmetric difference")]
    OverlapWithSymdiff(f64),
    /// The difference ratio is outside the accepted range.
    #[error("difference ratio {0} must lie in [0, 1]")]
    DiffRatio(f64),
}

/// Multiplies `count` by `ratio` and rounds down.
#[expect(
    clippy::float_arithmetic,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "sample sizes are defined as floored products of counts and ratios"
)]
#[must_use]
pub fn floor_product(count: usize, ratio: f64) -> usize {
    ((count as f64) * ratio + FLOOR_EPSILON).floor() as usize
}

#[expect(
    clippy::float_arithmetic,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "the union implied by a symmetric difference bound is a ratio formula"
)]
fn union_for_symdiff(symdiff: usize, overlap: f64) -> usize {
    let s = symdiff as f64;
    (s + overlap * s / (1.0 - overlap) + FLOOR_EPSILON).floor() as usize
}

fn check_unit_interval(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

/// Resolves `bound`, `overlap` and `diff_ratio` against a catalog of
/// `available` hashes.
///
/// With a union bound `u` the symmetric difference is
/// `floor(u × (1 − overlap))`. With a symmetric difference bound `s` the
/// union is `s + overlap × s / (1 − overlap)`, rounded down.
///
/// # Errors
///
/// Returns [`SizeError`] when a ratio is out of range or a resolved union
/// exceeds `available`.
pub fn resolve(
    bound: SizeBound,
    overlap: f64,
    diff_ratio: f64,
    available: usize,
) -> Result<SampleRequest, SizeError> {
    if !check_unit_interval(overlap) {
        return Err(SizeError::Overlap(overlap));
    }
    if !check_unit_interval(diff_ratio) {
        return Err(SizeError::DiffRatio(diff_ratio));
    }

    let (union_size, symdiff_size) = match bound {
        SizeBound::Population => (available, floor_product(available, 1.0 - overlap)),
        SizeBound::Union(requested) => {
            if requested > available {
                return Err(SizeError::UnionTooLarge {
                    requested,
                    available,
                });
            }
            (requested, floor_product(requested, 1.0 - overlap))
        }
        SizeBound::SymmetricDifference(symdiff) => {
            if overlap >= 1.0 {
                return Err(SizeError::OverlapWithSymdiff(overlap));
            }
            let union = union_for_symdiff(symdiff, overlap);
            if union > available {
                return Err(SizeError::SymdiffTooLarge { union, available });
            }
            (union, symdiff)
        }
    };

    Ok(SampleRequest {
        union_size,
        symdiff_size,
        diff_ratio,
    })
}
