//! Symbolic coefficient expressions written by routers.
//!
//! Routers never see numbers while they assemble. They combine tokens
//! (`ParameterRef`, `FlowRef`) into definitions, and the assembler turns those
//! into matrix rows. Flow ratios stay symbolic until the hydraulic stage has
//! fixed every flow.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, Div, Mul, Neg, Sub};

use ww_loads::{BaseParameter, NUM_BASE_PARAMETERS};

/// Block of rows reserved for one stream (one connection).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouterIndex(pub(crate) u32);

impl RouterIndex {
    pub fn value(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for RouterIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RouterIndex({})", self.0)
    }
}

impl fmt::Display for RouterIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One row/column of the process matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParameterIndex {
    pub router: RouterIndex,
    pub parameter: BaseParameter,
}

impl ParameterIndex {
    pub fn new(router: RouterIndex, parameter: BaseParameter) -> Self {
        Self { router, parameter }
    }

    /// Flattened row: `router * NUM_BASE_PARAMETERS + offset(parameter)`.
    pub fn row(&self) -> usize {
        self.router.value() * NUM_BASE_PARAMETERS + self.parameter.offset()
    }
}

/// Symbolic reference to "this stream's value of constituent X".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParameterRef(pub(crate) ParameterIndex);

impl ParameterRef {
    pub fn index(&self) -> ParameterIndex {
        self.0
    }
}

/// Symbolic reference to a stream's flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowRef(pub(crate) RouterIndex);

impl FlowRef {
    pub fn router(&self) -> RouterIndex {
        self.0
    }
}

/// `Q[num] / Q[den]`, evaluated once flows are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowRatio {
    pub num: RouterIndex,
    pub den: RouterIndex,
}

impl FlowRatio {
    pub fn evaluate(&self, flows: &[f64]) -> Option<f64> {
        let num = flows.get(self.num.value())?;
        let den = flows.get(self.den.value())?;
        Some(num / den)
    }
}

impl Div for FlowRef {
    type Output = FlowRatio;

    fn div(self, rhs: FlowRef) -> FlowRatio {
        FlowRatio {
            num: self.0,
            den: rhs.0,
        }
    }
}

/// `scale * Π ratios`.
#[derive(Debug, Clone, PartialEq)]
pub struct Coefficient {
    pub scale: f64,
    pub ratios: Vec<FlowRatio>,
}

impl Coefficient {
    pub fn constant(scale: f64) -> Self {
        Self {
            scale,
            ratios: Vec::new(),
        }
    }

    pub fn is_constant(&self) -> bool {
        self.ratios.is_empty()
    }

    /// Numeric value given resolved flows. `None` if a ratio refers to a flow
    /// outside `flows`.
    pub fn evaluate(&self, flows: &[f64]) -> Option<f64> {
        self.ratios
            .iter()
            .try_fold(self.scale, |acc, r| Some(acc * r.evaluate(flows)?))
    }

    fn routers(&self) -> impl Iterator<Item = RouterIndex> + '_ {
        self.ratios.iter().flat_map(|r| [r.num, r.den])
    }
}

/// One `coefficient * parameter` product.
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub param: ParameterIndex,
    pub coef: Coefficient,
}

/// Affine combination `Σ coef * parameter + constant` defining one
/// constituent of one stream.
///
/// ```
/// # use ww_solver::{LinearSystem, Definition};
/// # use ww_loads::BaseParameter::VolSS;
/// let mut system = LinearSystem::default();
/// let inflow = system.register_effluent().unwrap();
/// let effluent = system.register_effluent().unwrap();
///
/// // Concentration is conserved across a mix point with one inflow.
/// let def: Definition = inflow.param(VolSS) * (inflow.flow() / effluent.flow());
/// assert_eq!(def.terms.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Definition {
    pub terms: Vec<Term>,
    pub constant: f64,
}

impl Definition {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    /// Every stream this definition reads from.
    pub fn routers(&self) -> impl Iterator<Item = RouterIndex> + '_ {
        self.terms
            .iter()
            .flat_map(|t| core::iter::once(t.param.router).chain(t.coef.routers()))
    }

    fn map_coefficients(mut self, f: impl Fn(&mut Coefficient)) -> Self {
        for term in &mut self.terms {
            f(&mut term.coef);
        }
        self
    }
}

impl From<ParameterRef> for Definition {
    fn from(p: ParameterRef) -> Self {
        Definition {
            terms: vec![Term {
                param: p.0,
                coef: Coefficient::constant(1.0),
            }],
            constant: 0.0,
        }
    }
}

impl From<f64> for Definition {
    fn from(v: f64) -> Self {
        Definition::constant(v)
    }
}

impl Mul<f64> for Definition {
    type Output = Definition;

    fn mul(self, factor: f64) -> Definition {
        let constant = self.constant * factor;
        Definition {
            constant,
            ..self.map_coefficients(|c| c.scale *= factor)
        }
    }
}

/// Flow ratios only scale the parameter terms: a constant has no flow to
/// scale with.
impl Mul<FlowRatio> for Definition {
    type Output = Definition;

    fn mul(self, ratio: FlowRatio) -> Definition {
        self.map_coefficients(|c| c.ratios.push(ratio))
    }
}

impl Mul<f64> for ParameterRef {
    type Output = Definition;

    fn mul(self, factor: f64) -> Definition {
        Definition::from(self) * factor
    }
}

impl Mul<FlowRatio> for ParameterRef {
    type Output = Definition;

    fn mul(self, ratio: FlowRatio) -> Definition {
        Definition::from(self) * ratio
    }
}

impl<T: Into<Definition>> Add<T> for Definition {
    type Output = Definition;

    fn add(mut self, rhs: T) -> Definition {
        let rhs = rhs.into();
        self.terms.extend(rhs.terms);
        self.constant += rhs.constant;
        self
    }
}

impl<T: Into<Definition>> Add<T> for ParameterRef {
    type Output = Definition;

    fn add(self, rhs: T) -> Definition {
        Definition::from(self) + rhs
    }
}

impl Neg for Definition {
    type Output = Definition;

    fn neg(self) -> Definition {
        self * -1.0
    }
}

impl<T: Into<Definition>> Sub<T> for Definition {
    type Output = Definition;

    fn sub(self, rhs: T) -> Definition {
        self + (-rhs.into())
    }
}

impl Sum for Definition {
    fn sum<I: Iterator<Item = Definition>>(iter: I) -> Definition {
        iter.fold(Definition::zero(), Add::add)
    }
}

/// Affine combination `Σ scale * Q[router] + constant` defining one
/// stream's flow.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlowDefinition {
    pub terms: Vec<(RouterIndex, f64)>,
    pub constant: f64,
}

impl FlowDefinition {
    pub fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    pub fn routers(&self) -> impl Iterator<Item = RouterIndex> + '_ {
        self.terms.iter().map(|(r, _)| *r)
    }
}

impl From<FlowRef> for FlowDefinition {
    fn from(f: FlowRef) -> Self {
        FlowDefinition {
            terms: vec![(f.0, 1.0)],
            constant: 0.0,
        }
    }
}

impl Mul<f64> for FlowDefinition {
    type Output = FlowDefinition;

    fn mul(mut self, factor: f64) -> FlowDefinition {
        for (_, scale) in &mut self.terms {
            *scale *= factor;
        }
        self.constant *= factor;
        self
    }
}

impl Mul<f64> for FlowRef {
    type Output = FlowDefinition;

    fn mul(self, factor: f64) -> FlowDefinition {
        FlowDefinition::from(self) * factor
    }
}

impl<T: Into<FlowDefinition>> Add<T> for FlowDefinition {
    type Output = FlowDefinition;

    fn add(mut self, rhs: T) -> FlowDefinition {
        let rhs = rhs.into();
        self.terms.extend(rhs.terms);
        self.constant += rhs.constant;
        self
    }
}

impl Sum<FlowRef> for FlowDefinition {
    fn sum<I: Iterator<Item = FlowRef>>(iter: I) -> FlowDefinition {
        iter.fold(FlowDefinition::default(), Add::add)
    }
}

impl Sum for FlowDefinition {
    fn sum<I: Iterator<Item = FlowDefinition>>(iter: I) -> FlowDefinition {
        iter.fold(FlowDefinition::default(), Add::add)
    }
}
