//! Constituent load values.
//!
//! A [`Load`] holds one magnitude per [`BaseParameter`]. Aggregate totals
//! (total BOD, TKN, total phosphorus, ...) are never stored: each is computed
//! from its base constituents on every call.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, Index, Mul, Sub};

use ww_core::{Real, Tolerances, nearly_equal};

use crate::error::{LoadError, LoadResult};
use crate::parameter::{BaseParameter, NUM_BASE_PARAMETERS, ProcessParameter};

/// Smallest possible constituent magnitude.
///
/// Rather than zero, a tiny positive value keeps ratios and fractional splits
/// between constituents well-defined before real data is set. This is the
/// smallest positive `f32`, so ratios survive a round trip through single
/// precision.
pub const MIN_VALUE: Real = 1.401_298_464_324_817e-45;

/// Largest possible constituent magnitude; caps arithmetic growth.
pub const MAX_VALUE: Real = f32::MAX as Real;

/// Magnitudes of every base constituent carried by one stream.
///
/// ```
/// use ww_loads::Load;
///
/// let load = Load::empty()
///     .with_vol_ss(10.0)
///     .with_inert_ss(20.0)
///     .with_amm_n(15.0)
///     .with_sol_org_n(10.0)
///     .with_part_org_n(10.0);
/// assert_eq!(load.tot_ss(), 30.0);
/// assert_eq!(load.tot_kn(), 35.0);
/// ```
#[derive(Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Load {
    values: [Real; NUM_BASE_PARAMETERS],
}

impl Load {
    /// A load with every constituent set to [`MIN_VALUE`].
    pub const fn empty() -> Self {
        Self {
            values: [MIN_VALUE; NUM_BASE_PARAMETERS],
        }
    }

    /// Build a load from every base constituent, in offset order.
    pub const fn from_array(values: [Real; NUM_BASE_PARAMETERS]) -> Self {
        Self { values }
    }

    /// Like [`Load::from_array`], rejecting NaN and infinite magnitudes.
    pub fn try_from_array(values: [Real; NUM_BASE_PARAMETERS]) -> LoadResult<Self> {
        for bp in BaseParameter::ALL {
            let value = values[bp.offset()];
            if !value.is_finite() {
                return Err(LoadError::NonFinite {
                    what: bp.key(),
                    value,
                });
            }
        }
        Ok(Self { values })
    }

    pub fn to_array(&self) -> [Real; NUM_BASE_PARAMETERS] {
        self.values
    }

    pub fn get(&self, bp: BaseParameter) -> Real {
        self.values[bp.offset()]
    }

    /// Copy of this load with one constituent replaced.
    #[must_use]
    pub fn with(mut self, bp: BaseParameter, value: Real) -> Self {
        self.values[bp.offset()] = value;
        self
    }

    /// Iterate `(constituent, magnitude)` pairs in offset order.
    pub fn iter(&self) -> impl Iterator<Item = (BaseParameter, Real)> + '_ {
        BaseParameter::ALL
            .into_iter()
            .map(move |bp| (bp, self.values[bp.offset()]))
    }

    /// Sum of the base constituents named by `param`.
    pub fn total(&self, param: ProcessParameter) -> Real {
        param.iter().map(|bp| self.get(bp)).sum()
    }

    /// Compare every constituent within tolerance.
    pub fn approx_eq(&self, other: &Load, tol: Tolerances) -> bool {
        self.values
            .iter()
            .zip(other.values.iter())
            .all(|(a, b)| nearly_equal(*a, *b, tol))
    }

    // Base constituents

    pub fn vol_ss(&self) -> Real {
        self.get(BaseParameter::VolSS)
    }

    pub fn inert_ss(&self) -> Real {
        self.get(BaseParameter::InertSS)
    }

    pub fn sol_bod(&self) -> Real {
        self.get(BaseParameter::SolBOD)
    }

    pub fn part_bod(&self) -> Real {
        self.get(BaseParameter::PartBOD)
    }

    pub fn amm_n(&self) -> Real {
        self.get(BaseParameter::AmmN)
    }

    pub fn sol_org_n(&self) -> Real {
        self.get(BaseParameter::SolOrgN)
    }

    pub fn part_org_n(&self) -> Real {
        self.get(BaseParameter::PartOrgN)
    }

    pub fn nox(&self) -> Real {
        self.get(BaseParameter::NOx)
    }

    pub fn sol_org_p(&self) -> Real {
        self.get(BaseParameter::SolOrgP)
    }

    pub fn part_org_p(&self) -> Real {
        self.get(BaseParameter::PartOrgP)
    }

    pub fn chem_p(&self) -> Real {
        self.get(BaseParameter::ChemP)
    }

    pub fn ort_p(&self) -> Real {
        self.get(BaseParameter::OrtP)
    }

    /// Sum of HCO3-, CO3(2-) and OH- less H+.
    pub fn alk(&self) -> Real {
        self.get(BaseParameter::Alk)
    }

    pub fn other(&self) -> Real {
        self.get(BaseParameter::Other)
    }

    // Aggregates

    /// Soluble + particulate BOD.
    pub fn tot_bod(&self) -> Real {
        self.sol_bod() + self.part_bod()
    }

    /// Volatile + inert suspended solids.
    pub fn tot_ss(&self) -> Real {
        self.vol_ss() + self.inert_ss()
    }

    /// Volatile fraction of the total suspended solids.
    pub fn vol_ss_frac(&self) -> Real {
        self.vol_ss() / self.tot_ss()
    }

    /// Soluble + particulate organic nitrogen.
    pub fn tot_org_n(&self) -> Real {
        self.sol_org_n() + self.part_org_n()
    }

    /// Total Kjeldahl nitrogen: ammonia + organic nitrogen.
    pub fn tot_kn(&self) -> Real {
        self.amm_n() + self.tot_org_n()
    }

    /// TKN + oxidized nitrogen.
    pub fn tot_n(&self) -> Real {
        self.tot_kn() + self.nox()
    }

    /// Soluble + particulate organic phosphorus.
    pub fn tot_org_p(&self) -> Real {
        self.sol_org_p() + self.part_org_p()
    }

    /// Organic + chemical phosphorus + orthophosphate.
    pub fn tot_p(&self) -> Real {
        self.tot_org_p() + self.chem_p() + self.ort_p()
    }

    // Builder-style setters

    #[must_use]
    pub fn with_vol_ss(self, v: Real) -> Self {
        self.with(BaseParameter::VolSS, v)
    }

    #[must_use]
    pub fn with_inert_ss(self, v: Real) -> Self {
        self.with(BaseParameter::InertSS, v)
    }

    #[must_use]
    pub fn with_sol_bod(self, v: Real) -> Self {
        self.with(BaseParameter::SolBOD, v)
    }

    #[must_use]
    pub fn with_part_bod(self, v: Real) -> Self {
        self.with(BaseParameter::PartBOD, v)
    }

    #[must_use]
    pub fn with_amm_n(self, v: Real) -> Self {
        self.with(BaseParameter::AmmN, v)
    }

    #[must_use]
    pub fn with_sol_org_n(self, v: Real) -> Self {
        self.with(BaseParameter::SolOrgN, v)
    }

    #[must_use]
    pub fn with_part_org_n(self, v: Real) -> Self {
        self.with(BaseParameter::PartOrgN, v)
    }

    #[must_use]
    pub fn with_nox(self, v: Real) -> Self {
        self.with(BaseParameter::NOx, v)
    }

    #[must_use]
    pub fn with_sol_org_p(self, v: Real) -> Self {
        self.with(BaseParameter::SolOrgP, v)
    }

    #[must_use]
    pub fn with_part_org_p(self, v: Real) -> Self {
        self.with(BaseParameter::PartOrgP, v)
    }

    #[must_use]
    pub fn with_chem_p(self, v: Real) -> Self {
        self.with(BaseParameter::ChemP, v)
    }

    #[must_use]
    pub fn with_ort_p(self, v: Real) -> Self {
        self.with(BaseParameter::OrtP, v)
    }

    #[must_use]
    pub fn with_alk(self, v: Real) -> Self {
        self.with(BaseParameter::Alk, v)
    }

    #[must_use]
    pub fn with_other(self, v: Real) -> Self {
        self.with(BaseParameter::Other, v)
    }

    /// Re-split the total suspended solids so the volatile share is `frac`,
    /// keeping the total unchanged.
    pub fn with_vol_ss_frac(self, frac: Real) -> LoadResult<Self> {
        if !ww_core::is_open_fraction(frac) {
            return Err(LoadError::FractionOutOfRange {
                what: "VolSS",
                value: frac,
            });
        }
        let total = self.tot_ss();
        let vol = frac * total;
        Ok(self.with_vol_ss(vol).with_inert_ss(total - vol))
    }

    fn zip_with(self, rhs: Load, f: impl Fn(Real, Real) -> Real) -> Load {
        let mut values = self.values;
        for (v, r) in values.iter_mut().zip(rhs.values) {
            *v = f(*v, r);
        }
        Load { values }
    }
}

impl Default for Load {
    fn default() -> Self {
        Self::empty()
    }
}

impl Index<BaseParameter> for Load {
    type Output = Real;

    fn index(&self, bp: BaseParameter) -> &Real {
        &self.values[bp.offset()]
    }
}

impl Add for Load {
    type Output = Load;

    fn add(self, rhs: Load) -> Load {
        self.zip_with(rhs, |a, b| (a + b).min(MAX_VALUE))
    }
}

impl Sub for Load {
    type Output = Load;

    fn sub(self, rhs: Load) -> Load {
        self.zip_with(rhs, |a, b| (a - b).max(MIN_VALUE))
    }
}

/// Scaling by a factor below [`MIN_VALUE`] (including zero and negative
/// factors) saturates to [`Load::empty`].
impl Mul<Real> for Load {
    type Output = Load;

    fn mul(self, factor: Real) -> Load {
        if factor < MIN_VALUE {
            return Load::empty();
        }
        let mut values = self.values;
        for v in &mut values {
            *v = (*v * factor).min(MAX_VALUE);
        }
        Load { values }
    }
}

impl Mul<Load> for Real {
    type Output = Load;

    fn mul(self, load: Load) -> Load {
        load * self
    }
}

/// An empty sum is [`Load::empty`], never an all-zero load.
impl Sum for Load {
    fn sum<I: Iterator<Item = Load>>(iter: I) -> Load {
        iter.reduce(Add::add).unwrap_or_else(Load::empty)
    }
}

impl fmt::Debug for Load {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (bp, v) in self.iter() {
            map.entry(&bp.key(), &v);
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Load {
        Load::empty()
            .with_vol_ss(10.0)
            .with_inert_ss(20.0)
            .with_amm_n(15.0)
            .with_sol_org_n(10.0)
            .with_part_org_n(10.0)
    }

    #[test]
    fn basic_aggregates() {
        let load = sample();
        assert_eq!(load.tot_ss(), 30.0);
        assert_eq!(load.tot_org_n(), 20.0);
        assert_eq!(load.tot_kn(), 35.0);
    }

    #[test]
    fn empty_is_minimum_everywhere() {
        let load = Load::empty();
        for (_, v) in load.iter() {
            assert_eq!(v, MIN_VALUE);
        }
        assert_eq!(load.tot_bod(), 2.0 * MIN_VALUE);
        assert_eq!(load.tot_p(), 4.0 * MIN_VALUE);
        assert!(load.tot_n() > 0.0);
    }

    #[test]
    fn named_aggregates_match_bitsets() {
        let load = Load::from_array(core::array::from_fn(|i| (i + 1) as Real));
        assert_eq!(load.tot_ss(), load.total(ProcessParameter::SS_TOT));
        assert_eq!(load.tot_bod(), load.total(ProcessParameter::BOD_TOT));
        assert_eq!(load.tot_org_n(), load.total(ProcessParameter::N_ORG_TOT));
        assert_eq!(load.tot_kn(), load.total(ProcessParameter::N_TKN));
        assert_eq!(load.tot_n(), load.total(ProcessParameter::N_TOT));
        assert_eq!(load.tot_org_p(), load.total(ProcessParameter::P_ORG_TOT));
        assert_eq!(load.tot_p(), load.total(ProcessParameter::P_TOT));
    }

    #[test]
    fn operators_are_field_wise() {
        let a = Load::from_array(core::array::from_fn(|i| (i + 1) as Real));
        let b = Load::from_array(core::array::from_fn(|i| 100.0 * (i + 1) as Real));
        let sum = a + b;
        let diff = b - a;
        let scaled = a * 2.0;
        for bp in BaseParameter::ALL {
            let i = bp.offset() as Real + 1.0;
            assert_eq!(sum[bp], 101.0 * i);
            assert_eq!(diff[bp], 99.0 * i);
            assert_eq!(scaled[bp], 2.0 * i);
        }
        assert_eq!(2.0 * a, a * 2.0);
    }

    #[test]
    fn scaling_below_minimum_collapses() {
        assert_eq!(sample() * 0.0, Load::empty());
        assert_eq!(sample() * -3.0, Load::empty());
        assert_eq!(sample() * (MIN_VALUE / 2.0), Load::empty());
    }

    #[test]
    fn arithmetic_saturates() {
        let big = Load::empty().with_alk(MAX_VALUE);
        assert_eq!((big + big).alk(), MAX_VALUE);
        assert_eq!((big * 10.0).alk(), MAX_VALUE);
        assert_eq!((Load::empty() - sample()).vol_ss(), MIN_VALUE);
    }

    #[test]
    fn vol_ss_frac_resplits_total() {
        let load = sample().with_vol_ss_frac(0.75).unwrap();
        assert_eq!(load.tot_ss(), 30.0);
        assert!((load.vol_ss() - 22.5).abs() < 1e-12);
        assert!((load.vol_ss_frac() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn vol_ss_frac_rejects_out_of_range() {
        for frac in [0.0, 1.0, -0.2, 1.5, Real::NAN] {
            let err = sample().with_vol_ss_frac(frac).unwrap_err();
            assert!(matches!(err, LoadError::FractionOutOfRange { .. }));
        }
    }

    #[test]
    fn try_from_array_rejects_nan() {
        let mut values = [1.0; NUM_BASE_PARAMETERS];
        values[BaseParameter::OrtP.offset()] = Real::NAN;
        let err = Load::try_from_array(values).unwrap_err();
        assert!(matches!(err, LoadError::NonFinite { what: "OrtP", .. }));
    }

    #[test]
    fn sum_of_loads() {
        let total: Load = [sample(), sample(), sample()].into_iter().sum();
        assert!((total.tot_ss() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn empty_sum_is_sentinel() {
        let total: Load = core::iter::empty::<Load>().sum();
        assert_eq!(total, Load::empty());
        assert!(total.iter().all(|(_, v)| v > 0.0));
    }
}
