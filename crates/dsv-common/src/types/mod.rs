//! Common types used across DSV

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::DsvError;

/// Semantic version of a data set version
///
/// Data set versions are numbered `major.minor.patch`. Publishing a next
/// version bumps either the major or the minor component; the patch component
/// is reserved for corrections made outside the mapping workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Next major version (`X+1.0.0`)
    ///
    /// Fails when the major component is already `u32::MAX`.
    pub fn next_major(&self) -> Result<Self, DsvError> {
        let major = self
            .major
            .checked_add(1)
            .ok_or_else(|| DsvError::InvalidVersion(format!("{self} has no next major version")))?;
        Ok(Self::new(major, 0, 0))
    }

    /// Next minor version (`X.Y+1.0`)
    ///
    /// Fails when the minor component is already `u32::MAX`.
    pub fn next_minor(&self) -> Result<Self, DsvError> {
        let minor = self
            .minor
            .checked_add(1)
            .ok_or_else(|| DsvError::InvalidVersion(format!("{self} has no next minor version")))?;
        Ok(Self::new(self.major, minor, 0))
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::new(1, 0, 0)
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = DsvError;

    /// Parse `"1"`, `"1.2"` or `"1.2.3"`, with an optional leading `v`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('v');
        if trimmed.is_empty() {
            return Err(DsvError::InvalidVersion(s.to_string()));
        }

        let mut parts = [0u32; 3];
        let mut count = 0;
        for part in trimmed.split('.') {
            if count == 3 {
                return Err(DsvError::InvalidVersion(s.to_string()));
            }
            parts[count] = part
                .parse()
                .map_err(|_| DsvError::InvalidVersion(s.to_string()))?;
            count += 1;
        }

        Ok(Self::new(parts[0], parts[1], parts[2]))
    }
}

/// Geographic level a location option belongs to
///
/// Location keys are only unique within a level, so the level is part of a
/// location's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GeographicLevel {
    #[serde(rename = "EDA")]
    EnglishDevolvedArea,
    #[serde(rename = "INST")]
    Institution,
    #[serde(rename = "LA")]
    LocalAuthority,
    #[serde(rename = "LAD")]
    LocalAuthorityDistrict,
    #[serde(rename = "LEP")]
    LocalEnterprisePartnership,
    #[serde(rename = "LSIP")]
    LocalSkillsImprovementPlanArea,
    #[serde(rename = "MCA")]
    MayoralCombinedAuthority,
    #[serde(rename = "MAT")]
    MultiAcademyTrust,
    #[serde(rename = "NAT")]
    Country,
    #[serde(rename = "OA")]
    OpportunityArea,
    #[serde(rename = "PA")]
    PlanningArea,
    #[serde(rename = "PCON")]
    ParliamentaryConstituency,
    #[serde(rename = "PFA")]
    PoliceForceArea,
    #[serde(rename = "PROV")]
    Provider,
    #[serde(rename = "REG")]
    Region,
    #[serde(rename = "RSC")]
    RscRegion,
    #[serde(rename = "SCH")]
    School,
    #[serde(rename = "SPON")]
    Sponsor,
    #[serde(rename = "WARD")]
    Ward,
}

impl GeographicLevel {
    pub const ALL: [GeographicLevel; 19] = [
        GeographicLevel::EnglishDevolvedArea,
        GeographicLevel::Institution,
        GeographicLevel::LocalAuthority,
        GeographicLevel::LocalAuthorityDistrict,
        GeographicLevel::LocalEnterprisePartnership,
        GeographicLevel::LocalSkillsImprovementPlanArea,
        GeographicLevel::MayoralCombinedAuthority,
        GeographicLevel::MultiAcademyTrust,
        GeographicLevel::Country,
        GeographicLevel::OpportunityArea,
        GeographicLevel::PlanningArea,
        GeographicLevel::ParliamentaryConstituency,
        GeographicLevel::PoliceForceArea,
        GeographicLevel::Provider,
        GeographicLevel::Region,
        GeographicLevel::RscRegion,
        GeographicLevel::School,
        GeographicLevel::Sponsor,
        GeographicLevel::Ward,
    ];

    /// Short code used on the wire and in storage (e.g. `LA`)
    pub fn code(self) -> &'static str {
        match self {
            GeographicLevel::EnglishDevolvedArea => "EDA",
            GeographicLevel::Institution => "INST",
            GeographicLevel::LocalAuthority => "LA",
            GeographicLevel::LocalAuthorityDistrict => "LAD",
            GeographicLevel::LocalEnterprisePartnership => "LEP",
            GeographicLevel::LocalSkillsImprovementPlanArea => "LSIP",
            GeographicLevel::MayoralCombinedAuthority => "MCA",
            GeographicLevel::MultiAcademyTrust => "MAT",
            GeographicLevel::Country => "NAT",
            GeographicLevel::OpportunityArea => "OA",
            GeographicLevel::PlanningArea => "PA",
            GeographicLevel::ParliamentaryConstituency => "PCON",
            GeographicLevel::PoliceForceArea => "PFA",
            GeographicLevel::Provider => "PROV",
            GeographicLevel::Region => "REG",
            GeographicLevel::RscRegion => "RSC",
            GeographicLevel::School => "SCH",
            GeographicLevel::Sponsor => "SPON",
            GeographicLevel::Ward => "WARD",
        }
    }
}

impl std::fmt::Display for GeographicLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for GeographicLevel {
    type Err = DsvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GeographicLevel::ALL
            .into_iter()
            .find(|level| level.code().eq_ignore_ascii_case(s))
            .ok_or_else(|| DsvError::UnknownGeographicLevel(s.to_string()))
    }
}
