//! Constituent taxonomy: base constituents and their aggregate groupings.

use core::fmt;
use core::ops::{BitAnd, BitOr, BitOrAssign};

/// Number of base constituent slots (including [`BaseParameter::Other`]).
pub const NUM_BASE_PARAMETERS: usize = 14;

/// Irreducible constituents carried by every stream.
///
/// The declaration order is the matrix offset of each constituent inside a
/// stream's block of rows, so it must never be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BaseParameter {
    /// Volatile suspended solids
    VolSS = 0,
    /// Inert (fixed) suspended solids
    InertSS,
    /// Soluble BOD
    SolBOD,
    /// Particulate BOD
    PartBOD,
    /// Ammonia and ammonium nitrogen
    AmmN,
    /// Soluble organic nitrogen
    SolOrgN,
    /// Particulate organic nitrogen
    PartOrgN,
    /// Oxidized nitrogen (NO2 and NO3)
    NOx,
    /// Soluble organic phosphorus
    SolOrgP,
    /// Particulate organic phosphorus
    PartOrgP,
    /// Chemically bound phosphorus
    ChemP,
    /// Orthophosphate
    OrtP,
    /// Alkalinity
    Alk,
    /// Any other tracked constituent
    Other,
}

impl BaseParameter {
    pub const ALL: [BaseParameter; NUM_BASE_PARAMETERS] = [
        BaseParameter::VolSS,
        BaseParameter::InertSS,
        BaseParameter::SolBOD,
        BaseParameter::PartBOD,
        BaseParameter::AmmN,
        BaseParameter::SolOrgN,
        BaseParameter::PartOrgN,
        BaseParameter::NOx,
        BaseParameter::SolOrgP,
        BaseParameter::PartOrgP,
        BaseParameter::ChemP,
        BaseParameter::OrtP,
        BaseParameter::Alk,
        BaseParameter::Other,
    ];

    /// Position of this constituent inside a stream's block.
    pub const fn offset(self) -> usize {
        self as usize
    }

    pub fn from_offset(offset: usize) -> Option<Self> {
        Self::ALL.get(offset).copied()
    }

    pub fn key(&self) -> &'static str {
        match self {
            BaseParameter::VolSS => "VolSS",
            BaseParameter::InertSS => "InertSS",
            BaseParameter::SolBOD => "SolBOD",
            BaseParameter::PartBOD => "PartBOD",
            BaseParameter::AmmN => "AmmN",
            BaseParameter::SolOrgN => "SolOrgN",
            BaseParameter::PartOrgN => "PartOrgN",
            BaseParameter::NOx => "NOx",
            BaseParameter::SolOrgP => "SolOrgP",
            BaseParameter::PartOrgP => "PartOrgP",
            BaseParameter::ChemP => "ChemP",
            BaseParameter::OrtP => "OrtP",
            BaseParameter::Alk => "Alk",
            BaseParameter::Other => "Other",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            BaseParameter::VolSS => "Volatile suspended solids",
            BaseParameter::InertSS => "Inert suspended solids",
            BaseParameter::SolBOD => "Soluble BOD",
            BaseParameter::PartBOD => "Particulate BOD",
            BaseParameter::AmmN => "Ammonia nitrogen",
            BaseParameter::SolOrgN => "Soluble organic nitrogen",
            BaseParameter::PartOrgN => "Particulate organic nitrogen",
            BaseParameter::NOx => "Oxidized nitrogen",
            BaseParameter::SolOrgP => "Soluble organic phosphorus",
            BaseParameter::PartOrgP => "Particulate organic phosphorus",
            BaseParameter::ChemP => "Chemical phosphorus",
            BaseParameter::OrtP => "Orthophosphate",
            BaseParameter::Alk => "Alkalinity",
            BaseParameter::Other => "Other",
        }
    }

    /// Constituents that settle with the solids fraction.
    pub fn is_particulate(&self) -> bool {
        ProcessParameter::PARTICULATE.contains(*self)
    }
}

impl fmt::Display for BaseParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Bit-set over [`BaseParameter`] naming a constituent or an aggregate of them.
///
/// Aggregates are unions of base bits, fixed at definition time:
///
/// ```
/// use ww_loads::{BaseParameter, ProcessParameter};
///
/// assert_eq!(
///     ProcessParameter::SS_TOT.to_base_parameters(),
///     vec![BaseParameter::VolSS, BaseParameter::InertSS]
/// );
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProcessParameter(u16);

const fn bit(bp: BaseParameter) -> u16 {
    1 << (bp as u16)
}

impl ProcessParameter {
    pub const NONE: ProcessParameter = ProcessParameter(0);

    pub const SS_VOL: ProcessParameter = ProcessParameter(bit(BaseParameter::VolSS));
    pub const SS_INT: ProcessParameter = ProcessParameter(bit(BaseParameter::InertSS));
    pub const SS_TOT: ProcessParameter = ProcessParameter(Self::SS_VOL.0 | Self::SS_INT.0);

    pub const BOD_SOL: ProcessParameter = ProcessParameter(bit(BaseParameter::SolBOD));
    pub const BOD_PRT: ProcessParameter = ProcessParameter(bit(BaseParameter::PartBOD));
    pub const BOD_TOT: ProcessParameter = ProcessParameter(Self::BOD_SOL.0 | Self::BOD_PRT.0);

    pub const N_AMM: ProcessParameter = ProcessParameter(bit(BaseParameter::AmmN));
    pub const N_ORG_SOL: ProcessParameter = ProcessParameter(bit(BaseParameter::SolOrgN));
    pub const N_ORG_PRT: ProcessParameter = ProcessParameter(bit(BaseParameter::PartOrgN));
    pub const N_ORG_TOT: ProcessParameter =
        ProcessParameter(Self::N_ORG_SOL.0 | Self::N_ORG_PRT.0);
    /// Total Kjeldahl nitrogen
    pub const N_TKN: ProcessParameter = ProcessParameter(Self::N_AMM.0 | Self::N_ORG_TOT.0);
    pub const N_OXD: ProcessParameter = ProcessParameter(bit(BaseParameter::NOx));
    pub const N_TOT: ProcessParameter = ProcessParameter(Self::N_TKN.0 | Self::N_OXD.0);

    pub const P_ORG_SOL: ProcessParameter = ProcessParameter(bit(BaseParameter::SolOrgP));
    pub const P_ORG_PRT: ProcessParameter = ProcessParameter(bit(BaseParameter::PartOrgP));
    pub const P_ORG_TOT: ProcessParameter =
        ProcessParameter(Self::P_ORG_SOL.0 | Self::P_ORG_PRT.0);
    pub const P_CHM: ProcessParameter = ProcessParameter(bit(BaseParameter::ChemP));
    pub const P_ORT: ProcessParameter = ProcessParameter(bit(BaseParameter::OrtP));
    pub const P_TOT: ProcessParameter =
        ProcessParameter(Self::P_ORG_TOT.0 | Self::P_CHM.0 | Self::P_ORT.0);

    pub const ALK: ProcessParameter = ProcessParameter(bit(BaseParameter::Alk));
    pub const OTHER: ProcessParameter = ProcessParameter(bit(BaseParameter::Other));

    /// Everything that is captured with settled solids.
    pub const PARTICULATE: ProcessParameter = ProcessParameter(
        Self::SS_TOT.0 | Self::BOD_PRT.0 | Self::N_ORG_PRT.0 | Self::P_ORG_PRT.0 | Self::P_CHM.0,
    );

    pub const ALL: ProcessParameter = ProcessParameter((1 << NUM_BASE_PARAMETERS) - 1);

    /// Every named parameter with its key, base constituents first.
    pub const NAMED: [(ProcessParameter, &'static str); 21] = [
        (Self::SS_VOL, "SSVol"),
        (Self::SS_INT, "SSInt"),
        (Self::SS_TOT, "SSTot"),
        (Self::BOD_SOL, "BODSol"),
        (Self::BOD_PRT, "BODPrt"),
        (Self::BOD_TOT, "BODTot"),
        (Self::N_AMM, "NAmm"),
        (Self::N_ORG_SOL, "NOrgSol"),
        (Self::N_ORG_PRT, "NOrgPrt"),
        (Self::N_ORG_TOT, "NOrgTot"),
        (Self::N_TKN, "NTkn"),
        (Self::N_OXD, "NOxd"),
        (Self::N_TOT, "NTot"),
        (Self::P_ORG_SOL, "POrgSol"),
        (Self::P_ORG_PRT, "POrgPrt"),
        (Self::P_ORG_TOT, "POrgTot"),
        (Self::P_CHM, "PChm"),
        (Self::P_ORT, "POrt"),
        (Self::P_TOT, "PTot"),
        (Self::ALK, "Alk"),
        (Self::OTHER, "Other"),
    ];

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, bp: BaseParameter) -> bool {
        self.0 & bit(bp) != 0
    }

    pub const fn includes(self, other: ProcessParameter) -> bool {
        self.0 & other.0 == other.0
    }

    /// Number of base constituents in the set.
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate the base constituents in offset order.
    pub fn iter(self) -> impl Iterator<Item = BaseParameter> {
        BaseParameter::ALL
            .into_iter()
            .filter(move |bp| self.contains(*bp))
    }

    pub fn to_base_parameters(self) -> Vec<BaseParameter> {
        self.iter().collect()
    }

    /// Key of a named parameter, if this exact set has one.
    pub fn key(self) -> Option<&'static str> {
        Self::NAMED
            .iter()
            .find(|(p, _)| *p == self)
            .map(|(_, key)| *key)
    }
}

impl From<BaseParameter> for ProcessParameter {
    fn from(bp: BaseParameter) -> Self {
        ProcessParameter(bit(bp))
    }
}

impl BitOr for ProcessParameter {
    type Output = ProcessParameter;

    fn bitor(self, rhs: Self) -> Self::Output {
        ProcessParameter(self.0 | rhs.0)
    }
}

impl BitOrAssign for ProcessParameter {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ProcessParameter {
    type Output = ProcessParameter;

    fn bitand(self, rhs: Self) -> Self::Output {
        ProcessParameter(self.0 & rhs.0)
    }
}

impl fmt::Debug for ProcessParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.key() {
            Some(key) => write!(f, "ProcessParameter({key})"),
            None => f.debug_set().entries(self.iter()).finish(),
        }
    }
}
