/// Floating point type for flows and constituent magnitudes.
pub type Real = f64;

/// Absolute and relative slack for comparing computed magnitudes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

impl Tolerances {
    pub fn relative(rel: Real) -> Self {
        Self { abs: 0.0, rel }
    }
}

/// `a` and `b` agree within `tol.abs`, or within `tol.rel` of the larger one.
pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    diff <= tol.abs || diff <= tol.rel * a.abs().max(b.abs())
}

/// `v` in (0, 1): a split where both sides receive something.
pub fn is_open_fraction(v: Real) -> bool {
    v > 0.0 && v < 1.0
}

/// `v` in (0, 1]: a share that may take everything but not nothing.
pub fn is_share(v: Real) -> bool {
    v > 0.0 && v <= 1.0
}

/// Fractions that together account for exactly the whole.
pub fn sums_to_one(fractions: &[Real]) -> bool {
    nearly_equal(fractions.iter().sum(), 1.0, Tolerances::default())
}
