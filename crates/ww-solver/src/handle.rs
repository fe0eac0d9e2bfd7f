//! Handles issued to routers for their outflow streams.

use core::ops::Index;

use ww_loads::{BaseParameter, NUM_BASE_PARAMETERS};

use crate::expr::{FlowRef, ParameterIndex, ParameterRef, RouterIndex};

/// A stream's block of rows in one [`LinearSystem`](crate::LinearSystem)
/// session.
///
/// Handles are only valid in the session that issued them; after
/// [`reset`](crate::LinearSystem::reset) the system rejects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouterHandle {
    session: u64,
    router: RouterIndex,
}

impl RouterHandle {
    pub(crate) fn new(session: u64, router: RouterIndex) -> Self {
        Self { session, router }
    }

    pub(crate) fn session(&self) -> u64 {
        self.session
    }

    pub fn index(&self) -> RouterIndex {
        self.router
    }

    pub fn flow(&self) -> FlowRef {
        FlowRef(self.router)
    }

    pub fn param(&self, bp: BaseParameter) -> ParameterRef {
        ParameterRef(ParameterIndex::new(self.router, bp))
    }

    /// Tokens for every base constituent of this stream.
    pub fn params(&self) -> ProcessLoadings {
        ProcessLoadings(BaseParameter::ALL.map(|bp| self.param(bp)))
    }
}

/// All base-constituent tokens of one stream, indexable by
/// [`BaseParameter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessLoadings([ParameterRef; NUM_BASE_PARAMETERS]);

impl ProcessLoadings {
    pub fn iter(&self) -> impl Iterator<Item = (BaseParameter, ParameterRef)> + '_ {
        BaseParameter::ALL.into_iter().zip(self.0.iter().copied())
    }
}

impl Index<BaseParameter> for ProcessLoadings {
    type Output = ParameterRef;

    fn index(&self, bp: BaseParameter) -> &ParameterRef {
        &self.0[bp.offset()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_cover_every_constituent() {
        let handle = RouterHandle::new(0, RouterIndex(4));
        let loadings = handle.params();
        for (bp, token) in loadings.iter() {
            assert_eq!(token, handle.param(bp));
            assert_eq!(loadings[bp].index().row(), 4 * NUM_BASE_PARAMETERS + bp.offset());
        }
        assert_eq!(handle.flow().router(), handle.index());
    }
}
