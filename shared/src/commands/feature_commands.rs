use crate::{
    commands::feature::{FeatureKind, FeatureTarget, FeatureValue},
    MappingVersion,
};

/// Peer → host: please set `value` on `target`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub struct SetRequest {
    pub target: FeatureTarget,
    pub value: FeatureValue,
}

impl SetRequest {
    pub fn new(target: FeatureTarget, value: FeatureValue) -> Self {
        Self { target, value }
    }

    pub fn feature(&self) -> FeatureKind {
        self.value.feature()
    }
}

/// The value actually in effect on the host after a change.
///
/// Sent host → all, or peer → host as an unsolicited notice. `mapping_version`
/// is the sender's mapping version when the record was produced; receivers whose
/// mapping is older defer the apply.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub struct Applied {
    pub target: FeatureTarget,
    pub value: FeatureValue,
    pub mapping_version: Option<MappingVersion>,
}

impl Applied {
    pub fn new(target: FeatureTarget, value: FeatureValue, mapping_version: Option<MappingVersion>) -> Self {
        Self {
            target,
            value,
            mapping_version,
        }
    }

    pub fn feature(&self) -> FeatureKind {
        self.value.feature()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub struct BatchEntry {
    pub target: FeatureTarget,
    pub value: FeatureValue,
}

impl BatchEntry {
    pub fn new(target: FeatureTarget, value: FeatureValue) -> Self {
        Self { target, value }
    }
}

/// Several applied values of one feature, broadcast without request/response.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub struct BatchApplied {
    pub feature: FeatureKind,
    pub entries: Vec<BatchEntry>,
    pub mapping_version: Option<MappingVersion>,
}

impl BatchApplied {
    pub fn new(feature: FeatureKind, entries: Vec<BatchEntry>, mapping_version: Option<MappingVersion>) -> Self {
        Self {
            feature,
            entries,
            mapping_version,
        }
    }

    /// Views each entry as a standalone applied record.
    pub fn applied_records(&self) -> impl Iterator<Item = Applied> + '_ {
        self.entries
            .iter()
            .map(move |entry| Applied::new(entry.target, entry.value, self.mapping_version))
    }
}
