//! Linear system assembler and two-stage solver.
//!
//! Streams register a block of rows, routers define those rows symbolically,
//! and `solve` runs two direct solves:
//!
//! 1. hydraulics, one row per stream: `Q[i] - Σ a_ij Q[j] = c_i`
//! 2. process, one row per stream and base constituent:
//!    `C[r] - Σ coef(Q) C[j] = c_r`, with flow ratios evaluated from stage 1.

use nalgebra::{DMatrix, DVector};
use tracing::{debug, info, trace, warn};
use ww_loads::{BaseParameter, Load, NUM_BASE_PARAMETERS};

use crate::error::{SolveStage, SolverError, SolverResult};
use crate::expr::{Coefficient, Definition, FlowDefinition, ParameterIndex, RouterIndex};
use crate::handle::RouterHandle;
use crate::sparse::{Row, SparseRows};

/// How the matrices grow when a definition lands past their current size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Growth {
    /// Double the current size (or jump straight to the required size).
    #[default]
    Doubling,
    /// Grow to exactly the required size.
    Exact,
}

/// Assembler configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    /// Streams the matrices are sized for before anything is defined
    pub initial_capacity: usize,
    /// Growth policy for late definitions
    pub growth: Growth,
    /// Smallest accepted LU pivot, relative to the largest matrix entry
    pub pivot_tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 12,
            growth: Growth::Doubling,
            pivot_tolerance: 1e-12,
        }
    }
}

/// Lifecycle of one assembly session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemState {
    /// Streams and definitions may be added.
    Registration,
    /// Every row is defined; no further changes.
    Frozen,
    /// Results are available.
    Solved,
}

#[derive(Debug, Clone)]
struct Solution {
    flows: Vec<f64>,
    values: Vec<f64>,
}

/// Sparse row-wise assembler for the hydraulics and process systems.
///
/// Each stage expands its rows into a dense matrix for the LU, so a solve
/// costs O(n³) in the stage dimension; the process stage has 14 rows per
/// stream. That is immediate for plant-sized networks of tens of streams.
///
/// ```
/// use ww_loads::BaseParameter;
/// use ww_solver::{Definition, FlowDefinition, LinearSystem};
///
/// let mut system = LinearSystem::default();
/// let influent = system.register_effluent().unwrap();
/// system.define_flow(&influent, FlowDefinition::constant(4.0)).unwrap();
/// for bp in BaseParameter::ALL {
///     system.define_parameter(&influent, bp, Definition::constant(2.0)).unwrap();
/// }
/// system.solve().unwrap();
/// assert_eq!(system.flow(&influent).unwrap(), 4.0);
/// assert_eq!(system.load(&influent).unwrap().amm_n(), 2.0);
/// ```
#[derive(Debug)]
pub struct LinearSystem {
    config: SolverConfig,
    session: u64,
    state: SystemState,
    routers: u32,
    hydraulics: SparseRows<f64>,
    process: SparseRows<Coefficient>,
    solution: Option<Solution>,
}

impl Default for LinearSystem {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

impl LinearSystem {
    pub fn new(config: SolverConfig) -> Self {
        let capacity = config.initial_capacity;
        Self {
            hydraulics: SparseRows::with_capacity(capacity),
            process: SparseRows::with_capacity(capacity.saturating_mul(NUM_BASE_PARAMETERS)),
            config,
            session: 0,
            state: SystemState::Registration,
            routers: 0,
            solution: None,
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn state(&self) -> SystemState {
        self.state
    }

    /// Streams registered in this session.
    pub fn router_count(&self) -> usize {
        self.routers as usize
    }

    /// Current hydraulics matrix size (rows).
    pub fn hydraulics_dim(&self) -> usize {
        self.hydraulics.dim()
    }

    /// Current process matrix size (rows).
    pub fn process_dim(&self) -> usize {
        self.process.dim()
    }

    /// Allocate the next stream block. Matrices are not resized here.
    pub fn register_effluent(&mut self) -> SolverResult<RouterHandle> {
        self.require(SystemState::Registration)?;
        let router = RouterIndex(self.routers);
        self.routers = self
            .routers
            .checked_add(1)
            .ok_or_else(|| SolverError::InvalidHandle {
                what: "stream index space exhausted".into(),
            })?;
        trace!(router = router.value(), session = self.session, "registered stream");
        Ok(RouterHandle::new(self.session, router))
    }

    pub fn define_flow(
        &mut self,
        handle: &RouterHandle,
        definition: FlowDefinition,
    ) -> SolverResult<()> {
        self.require(SystemState::Registration)?;
        self.check_handle(handle)?;
        for router in definition.routers() {
            self.check_router(router)?;
        }

        let router = handle.index();
        let row = router.value();
        self.hydraulics.ensure(row + 1, self.config.growth);
        let entries = definition
            .terms
            .into_iter()
            .map(|(r, scale)| (r.value(), scale))
            .collect();
        let inserted = self.hydraulics.insert(
            row,
            Row {
                entries,
                rhs: definition.constant,
            },
        );
        if !inserted {
            warn!(router = row, "flow defined twice");
            return Err(SolverError::DuplicateDefinition {
                router,
                what: "flow".into(),
            });
        }
        trace!(router = row, "flow defined");
        Ok(())
    }

    pub fn define_parameter(
        &mut self,
        handle: &RouterHandle,
        parameter: BaseParameter,
        definition: Definition,
    ) -> SolverResult<()> {
        self.require(SystemState::Registration)?;
        self.check_handle(handle)?;
        for router in definition.routers() {
            self.check_router(router)?;
        }

        let router = handle.index();
        self.process.ensure(
            (router.value() + 1) * NUM_BASE_PARAMETERS,
            self.config.growth,
        );
        let row = ParameterIndex::new(router, parameter).row();
        let entries = definition
            .terms
            .into_iter()
            .map(|t| (t.param.row(), t.coef))
            .collect();
        let inserted = self.process.insert(
            row,
            Row {
                entries,
                rhs: definition.constant,
            },
        );
        if !inserted {
            warn!(router = router.value(), %parameter, "parameter defined twice");
            return Err(SolverError::DuplicateDefinition {
                router,
                what: parameter.key().into(),
            });
        }
        Ok(())
    }

    pub fn is_flow_defined(&self, handle: &RouterHandle) -> bool {
        handle.session() == self.session && self.hydraulics.is_defined(handle.index().value())
    }

    pub fn is_parameter_defined(&self, handle: &RouterHandle, parameter: BaseParameter) -> bool {
        handle.session() == self.session
            && self
                .process
                .is_defined(ParameterIndex::new(handle.index(), parameter).row())
    }

    /// Size both matrices to the registered streams and check that every row
    /// is defined.
    pub fn freeze(&mut self) -> SolverResult<()> {
        self.require(SystemState::Registration)?;
        let streams = self.router_count();

        let stray = |row: usize| SolverError::InvalidHandle {
            what: format!("row {row} defined past the registered streams"),
        };
        self.hydraulics.fit(streams).map_err(stray)?;
        self.process
            .fit(streams * NUM_BASE_PARAMETERS)
            .map_err(stray)?;

        if let Some(row) = self.hydraulics.first_gap() {
            let router = RouterIndex(row as u32);
            warn!(router = row, "flow never defined");
            return Err(SolverError::UndefinedFlow { router });
        }
        if let Some(row) = self.process.first_gap() {
            let router = RouterIndex((row / NUM_BASE_PARAMETERS) as u32);
            let parameter = BaseParameter::ALL[row % NUM_BASE_PARAMETERS];
            warn!(router = router.value(), %parameter, "parameter never defined");
            return Err(SolverError::UndefinedParameter { router, parameter });
        }

        self.state = SystemState::Frozen;
        debug!(
            streams,
            hydraulic_nnz = self.hydraulics.nnz(),
            process_nnz = self.process.nnz(),
            "system frozen"
        );
        Ok(())
    }

    /// Solve hydraulics, then constituents. Freezes first if needed.
    ///
    /// Either both stages succeed and results become available, or nothing
    /// is stored and the system stays frozen.
    pub fn solve(&mut self) -> SolverResult<()> {
        match self.state {
            SystemState::Registration => self.freeze()?,
            SystemState::Frozen => {}
            SystemState::Solved => return Ok(()),
        }
        let tol = self.config.pivot_tolerance;

        debug!(rows = self.hydraulics.dim(), "solving hydraulics");
        let (a, b) = self
            .hydraulics
            .to_dense(|row, c| finite(SolveStage::Hydraulics, row, *c))?;
        let flows = solve_dense(a, b, SolveStage::Hydraulics, tol)
            .inspect_err(|e| warn!(error = %e, "hydraulic solve failed"))?;
        let flows: Vec<f64> = flows.iter().copied().collect();

        debug!(rows = self.process.dim(), "solving process");
        let (a, b) = self
            .process
            .to_dense(|row, coef| {
                let value = coef.evaluate(&flows).ok_or_else(|| SolverError::Numerical {
                    stage: SolveStage::Process,
                    what: format!("row {row} refers to an unknown flow"),
                })?;
                finite(SolveStage::Process, row, value)
            })
            .inspect_err(|e| warn!(error = %e, "process assembly failed"))?;
        let values = solve_dense(a, b, SolveStage::Process, tol)
            .inspect_err(|e| warn!(error = %e, "process solve failed"))?;

        self.solution = Some(Solution {
            flows,
            values: values.iter().copied().collect(),
        });
        self.state = SystemState::Solved;
        info!(
            streams = self.router_count(),
            session = self.session,
            "system solved"
        );
        Ok(())
    }

    pub fn flow(&self, handle: &RouterHandle) -> SolverResult<f64> {
        let solution = self.solution()?;
        self.check_handle(handle)?;
        solution
            .flows
            .get(handle.index().value())
            .copied()
            .ok_or_else(|| out_of_range(handle.index()))
    }

    pub fn value(&self, handle: &RouterHandle, parameter: BaseParameter) -> SolverResult<f64> {
        let solution = self.solution()?;
        self.check_handle(handle)?;
        solution
            .values
            .get(ParameterIndex::new(handle.index(), parameter).row())
            .copied()
            .ok_or_else(|| out_of_range(handle.index()))
    }

    /// Every constituent of one stream as a [`Load`].
    pub fn load(&self, handle: &RouterHandle) -> SolverResult<Load> {
        let solution = self.solution()?;
        self.check_handle(handle)?;
        let start = handle.index().value() * NUM_BASE_PARAMETERS;
        let block = solution
            .values
            .get(start..start + NUM_BASE_PARAMETERS)
            .ok_or_else(|| out_of_range(handle.index()))?;
        let mut values = [0.0; NUM_BASE_PARAMETERS];
        values.copy_from_slice(block);
        Ok(Load::try_from_array(values)?)
    }

    /// Drop everything and start a new session. Handles from earlier sessions
    /// are rejected afterwards.
    pub fn reset(&mut self) {
        let capacity = self.config.initial_capacity;
        self.session += 1;
        self.state = SystemState::Registration;
        self.routers = 0;
        self.hydraulics.clear(capacity);
        self.process
            .clear(capacity.saturating_mul(NUM_BASE_PARAMETERS));
        self.solution = None;
        debug!(session = self.session, "system reset");
    }

    fn require(&self, expected: SystemState) -> SolverResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SolverError::InvalidState {
                expected,
                actual: self.state,
            })
        }
    }

    fn solution(&self) -> SolverResult<&Solution> {
        self.solution.as_ref().ok_or(SolverError::InvalidState {
            expected: SystemState::Solved,
            actual: self.state,
        })
    }

    fn check_handle(&self, handle: &RouterHandle) -> SolverResult<()> {
        if handle.session() != self.session {
            return Err(SolverError::InvalidHandle {
                what: format!(
                    "stream {} is from session {}, current session is {}",
                    handle.index(),
                    handle.session(),
                    self.session
                ),
            });
        }
        self.check_router(handle.index())
    }

    fn check_router(&self, router: RouterIndex) -> SolverResult<()> {
        if router.0 < self.routers {
            Ok(())
        } else {
            Err(SolverError::InvalidHandle {
                what: format!("stream {router} was never registered"),
            })
        }
    }
}

fn out_of_range(router: RouterIndex) -> SolverError {
    SolverError::InvalidHandle {
        what: format!("stream {router} has no solved value"),
    }
}

fn finite(stage: SolveStage, row: usize, value: f64) -> SolverResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SolverError::Numerical {
            stage,
            what: format!("non-finite coefficient {value} in row {row}"),
        })
    }
}

/// Direct LU solve with a relative pivot check, so near-singular systems are
/// reported instead of returning garbage.
fn solve_dense(
    a: DMatrix<f64>,
    b: DVector<f64>,
    stage: SolveStage,
    pivot_tolerance: f64,
) -> SolverResult<DVector<f64>> {
    let n = a.nrows();
    if n == 0 {
        return Ok(b);
    }
    if let Some(v) = b.iter().find(|v| !v.is_finite()) {
        return Err(SolverError::Numerical {
            stage,
            what: format!("non-finite right-hand side {v}"),
        });
    }

    let scale = a.amax();
    let lu = a.lu();
    let min_pivot = lu
        .u()
        .diagonal()
        .iter()
        .fold(f64::INFINITY, |m, p| m.min(p.abs()));
    if !(min_pivot > pivot_tolerance * scale) {
        return Err(SolverError::Numerical {
            stage,
            what: format!("singular matrix (n = {n}, smallest pivot {min_pivot:.3e})"),
        });
    }

    let x = lu.solve(&b).ok_or_else(|| SolverError::Numerical {
        stage,
        what: "LU solve failed".into(),
    })?;
    if x.iter().any(|v| !v.is_finite()) {
        return Err(SolverError::Numerical {
            stage,
            what: "non-finite solution".into(),
        });
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ww_loads::BaseParameter::{AmmN, VolSS};

    fn define_constant_stream(system: &mut LinearSystem, handle: &RouterHandle, q: f64, c: f64) {
        system
            .define_flow(handle, FlowDefinition::constant(q))
            .unwrap();
        for bp in BaseParameter::ALL {
            system.define_parameter(handle, bp, c.into()).unwrap();
        }
    }

    #[test]
    fn registration_does_not_resize() {
        let config = SolverConfig {
            initial_capacity: 1,
            ..SolverConfig::default()
        };
        let mut system = LinearSystem::new(config);
        for _ in 0..5 {
            system.register_effluent().unwrap();
        }
        assert_eq!(system.hydraulics_dim(), 1);
        assert_eq!(system.process_dim(), NUM_BASE_PARAMETERS);
        assert_eq!(system.router_count(), 5);
    }

    #[test]
    fn definitions_grow_lazily() {
        let config = SolverConfig {
            initial_capacity: 1,
            ..SolverConfig::default()
        };
        let mut system = LinearSystem::new(config);
        let handles: Vec<_> = (0..3).map(|_| system.register_effluent().unwrap()).collect();

        system
            .define_flow(&handles[2], FlowDefinition::constant(1.0))
            .unwrap();
        assert_eq!(system.hydraulics_dim(), 3);

        // Defining a lower index never shrinks
        system
            .define_flow(&handles[0], FlowDefinition::constant(1.0))
            .unwrap();
        assert_eq!(system.hydraulics_dim(), 3);

        system.define_parameter(&handles[1], AmmN, Definition::constant(1.0)).unwrap();
        assert_eq!(system.process_dim(), 2 * NUM_BASE_PARAMETERS);
    }

    #[test]
    fn exact_growth() {
        let config = SolverConfig {
            initial_capacity: 0,
            growth: Growth::Exact,
            ..SolverConfig::default()
        };
        let mut system = LinearSystem::new(config);
        let a = system.register_effluent().unwrap();
        let b = system.register_effluent().unwrap();
        system.define_flow(&a, FlowDefinition::constant(1.0)).unwrap();
        assert_eq!(system.hydraulics_dim(), 1);
        system.define_flow(&b, FlowDefinition::constant(1.0)).unwrap();
        assert_eq!(system.hydraulics_dim(), 2);
    }

    #[test]
    fn growth_keeps_earlier_rows() {
        for growth in [Growth::Doubling, Growth::Exact] {
            let config = SolverConfig {
                initial_capacity: 0,
                growth,
                ..SolverConfig::default()
            };
            let mut system = LinearSystem::new(config);
            let chain: Vec<_> = (0..5).map(|_| system.register_effluent().unwrap()).collect();

            // The head is defined first, while the matrices are still empty
            system
                .define_flow(&chain[0], FlowDefinition::constant(2.0))
                .unwrap();
            for bp in BaseParameter::ALL {
                let c = if bp == VolSS { 7.0 } else { 1.0 };
                system.define_parameter(&chain[0], bp, Definition::constant(c)).unwrap();
            }
            let mut sizes = vec![system.hydraulics_dim()];
            for pair in chain.windows(2) {
                let (up, down) = (&pair[0], &pair[1]);
                system.define_flow(down, up.flow().into()).unwrap();
                for bp in BaseParameter::ALL {
                    system.define_parameter(down, bp, up.param(bp).into()).unwrap();
                }
                sizes.push(system.hydraulics_dim());
            }
            sizes.dedup();
            assert!(sizes.len() >= 3, "{growth:?}: grew {sizes:?}");

            system.solve().unwrap();
            assert_eq!(system.hydraulics_dim(), 5);
            assert_eq!(system.process_dim(), 5 * NUM_BASE_PARAMETERS);
            for handle in [&chain[0], &chain[1], &chain[4]] {
                assert!((system.flow(handle).unwrap() - 2.0).abs() < 1e-12);
                assert!((system.value(handle, VolSS).unwrap() - 7.0).abs() < 1e-12);
                assert!((system.value(handle, AmmN).unwrap() - 1.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn freeze_sizes_to_registered_streams() {
        let mut system = LinearSystem::default();
        let a = system.register_effluent().unwrap();
        define_constant_stream(&mut system, &a, 1.0, 1.0);
        assert_eq!(system.hydraulics_dim(), 12);
        system.freeze().unwrap();
        assert_eq!(system.hydraulics_dim(), 1);
        assert_eq!(system.process_dim(), NUM_BASE_PARAMETERS);
        assert_eq!(system.state(), SystemState::Frozen);
        assert!(matches!(
            system.register_effluent(),
            Err(SolverError::InvalidState { .. })
        ));
    }

    #[test]
    fn duplicate_definition_rejected() {
        let mut system = LinearSystem::default();
        let a = system.register_effluent().unwrap();
        system.define_flow(&a, FlowDefinition::constant(1.0)).unwrap();
        let err = system
            .define_flow(&a, FlowDefinition::constant(2.0))
            .unwrap_err();
        assert!(matches!(err, SolverError::DuplicateDefinition { .. }));

        system.define_parameter(&a, VolSS, Definition::constant(1.0)).unwrap();
        let err = system.define_parameter(&a, VolSS, Definition::constant(1.0)).unwrap_err();
        assert!(matches!(err, SolverError::DuplicateDefinition { .. }));
    }

    #[test]
    fn undefined_rows_reported() {
        let mut system = LinearSystem::default();
        let a = system.register_effluent().unwrap();
        assert_eq!(
            system.freeze(),
            Err(SolverError::UndefinedFlow { router: a.index() })
        );

        system.define_flow(&a, FlowDefinition::constant(1.0)).unwrap();
        for bp in BaseParameter::ALL.into_iter().filter(|bp| *bp != AmmN) {
            system.define_parameter(&a, bp, Definition::constant(1.0)).unwrap();
        }
        assert_eq!(
            system.solve(),
            Err(SolverError::UndefinedParameter {
                router: a.index(),
                parameter: AmmN
            })
        );
        assert_eq!(system.state(), SystemState::Registration);
    }

    #[test]
    fn unregistered_reference_rejected() {
        let mut system = LinearSystem::default();
        let a = system.register_effluent().unwrap();
        let ghost = RouterHandle::new(0, RouterIndex(9));
        let err = system
            .define_flow(&a, FlowDefinition::from(ghost.flow()))
            .unwrap_err();
        assert!(matches!(err, SolverError::InvalidHandle { .. }));
    }

    #[test]
    fn chained_streams_solve() {
        let mut system = LinearSystem::default();
        let inf = system.register_effluent().unwrap();
        let out = system.register_effluent().unwrap();
        define_constant_stream(&mut system, &inf, 8.0, 3.0);
        system.define_flow(&out, inf.flow() * 0.5).unwrap();
        for bp in BaseParameter::ALL {
            system
                .define_parameter(&out, bp, inf.param(bp) * (inf.flow() / out.flow()))
                .unwrap();
        }
        system.solve().unwrap();
        assert_eq!(system.flow(&out).unwrap(), 4.0);
        assert_eq!(system.value(&out, VolSS).unwrap(), 6.0);
        assert_eq!(system.load(&out).unwrap().amm_n(), 6.0);
    }

    #[test]
    fn results_require_solve() {
        let mut system = LinearSystem::default();
        let a = system.register_effluent().unwrap();
        assert!(matches!(
            system.flow(&a),
            Err(SolverError::InvalidState {
                expected: SystemState::Solved,
                ..
            })
        ));
    }

    #[test]
    fn singular_hydraulics() {
        let mut system = LinearSystem::default();
        let a = system.register_effluent().unwrap();
        let b = system.register_effluent().unwrap();
        system.define_flow(&a, b.flow().into()).unwrap();
        system.define_flow(&b, a.flow().into()).unwrap();
        for h in [&a, &b] {
            for bp in BaseParameter::ALL {
                system.define_parameter(h, bp, Definition::constant(1.0)).unwrap();
            }
        }
        let err = system.solve().unwrap_err();
        assert!(matches!(
            err,
            SolverError::Numerical {
                stage: SolveStage::Hydraulics,
                ..
            }
        ));
        assert_eq!(system.state(), SystemState::Frozen);
        assert!(system.flow(&a).is_err());
    }

    #[test]
    fn reset_invalidates_handles() {
        let mut system = LinearSystem::default();
        let old = system.register_effluent().unwrap();
        define_constant_stream(&mut system, &old, 1.0, 1.0);
        system.solve().unwrap();

        system.reset();
        assert_eq!(system.state(), SystemState::Registration);
        assert_eq!(system.router_count(), 0);
        let fresh = system.register_effluent().unwrap();
        assert_eq!(fresh.index(), old.index());
        assert!(matches!(
            system.define_flow(&old, FlowDefinition::constant(1.0)),
            Err(SolverError::InvalidHandle { .. })
        ));
        define_constant_stream(&mut system, &fresh, 2.0, 5.0);
        system.solve().unwrap();
        assert_eq!(system.flow(&fresh).unwrap(), 2.0);
    }
}
