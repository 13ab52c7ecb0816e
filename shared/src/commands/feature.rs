use std::fmt;

use crate::{CompoundAddress, EntityRef, Handle};

/// Highest speed limit, in km/h, a request may carry.
pub const MAX_SPEED_LIMIT_KMH: u16 = 1000;

/// Most lanes a single lane can be connected to.
pub const MAX_LANE_CONNECTIONS: usize = 8;

/// Synchronized traffic-control features.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub enum FeatureKind {
    SpeedLimit,
    LaneArrows,
    VehicleRestrictions,
    ParkingRestriction,
    PrioritySign,
    JunctionRestrictions,
    CrosswalkHidden,
    TrafficLight,
    LaneConnections,
}

impl FeatureKind {
    pub const ALL: [FeatureKind; 9] = [
        FeatureKind::SpeedLimit,
        FeatureKind::LaneArrows,
        FeatureKind::VehicleRestrictions,
        FeatureKind::ParkingRestriction,
        FeatureKind::PrioritySign,
        FeatureKind::JunctionRestrictions,
        FeatureKind::CrosswalkHidden,
        FeatureKind::TrafficLight,
        FeatureKind::LaneConnections,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FeatureKind::SpeedLimit => "speed_limit",
            FeatureKind::LaneArrows => "lane_arrows",
            FeatureKind::VehicleRestrictions => "vehicle_restrictions",
            FeatureKind::ParkingRestriction => "parking_restriction",
            FeatureKind::PrioritySign => "priority_sign",
            FeatureKind::JunctionRestrictions => "junction_restrictions",
            FeatureKind::CrosswalkHidden => "crosswalk_hidden",
            FeatureKind::TrafficLight => "traffic_light",
            FeatureKind::LaneConnections => "lane_connections",
        }
    }

    /// The kind of target every record of this feature addresses.
    pub fn target_kind(&self) -> TargetKind {
        match self {
            FeatureKind::SpeedLimit
            | FeatureKind::LaneArrows
            | FeatureKind::VehicleRestrictions
            | FeatureKind::LaneConnections => TargetKind::Lane,
            FeatureKind::ParkingRestriction => TargetKind::Segment,
            FeatureKind::PrioritySign
            | FeatureKind::JunctionRestrictions
            | FeatureKind::CrosswalkHidden => TargetKind::SegmentEnd,
            FeatureKind::TrafficLight => TargetKind::Node,
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Lane,
    Segment,
    Node,
    SegmentEnd,
}

/// A lane as named by the participant that sent a record: its handle there
/// plus its address inside the owning segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub struct LaneRef {
    pub lane: Handle,
    pub address: CompoundAddress,
}

impl LaneRef {
    pub fn new(lane: Handle, segment: Handle, lane_index: u16) -> Self {
        Self {
            lane,
            address: CompoundAddress::new(segment, lane_index),
        }
    }

    pub fn entity(&self) -> EntityRef {
        EntityRef::lane(self.lane)
    }

    pub fn target(&self) -> FeatureTarget {
        FeatureTarget::Lane {
            lane: self.lane,
            address: self.address,
        }
    }
}

impl fmt::Display for LaneRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lane:{}@{}", self.lane, self.address)
    }
}

/// The lanes a lane leads into. Kept sorted and free of duplicates, so two
/// sets holding the same lanes compare equal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub struct LaneSet {
    lanes: [Option<LaneRef>; MAX_LANE_CONNECTIONS],
}

impl LaneSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails when more than [`MAX_LANE_CONNECTIONS`] distinct lanes are given.
    pub fn from_lanes(lanes: impl IntoIterator<Item = LaneRef>) -> Result<Self, String> {
        let lanes: Vec<LaneRef> = lanes.into_iter().collect();
        Self::from_vec(lanes).map_err(|count| {
            format!(
                "{} lane connections exceed the limit of {}",
                count, MAX_LANE_CONNECTIONS
            )
        })
    }

    fn from_vec(mut lanes: Vec<LaneRef>) -> Result<Self, usize> {
        lanes.sort();
        lanes.dedup();
        if lanes.len() > MAX_LANE_CONNECTIONS {
            return Err(lanes.len());
        }
        let mut set = Self::default();
        for (slot, lane) in set.lanes.iter_mut().zip(lanes) {
            *slot = Some(lane);
        }
        Ok(set)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LaneRef> + '_ {
        self.lanes.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes[0].is_none()
    }

    pub fn contains_lane(&self, lane: Handle) -> bool {
        self.iter().any(|connected| connected.lane == lane)
    }

    /// Rewrites every lane, e.g. into another participant's handles.
    pub fn try_map<E>(&self, mut f: impl FnMut(&LaneRef) -> Result<LaneRef, E>) -> Result<Self, E> {
        let mut mapped = Vec::with_capacity(MAX_LANE_CONNECTIONS);
        for lane in self.iter() {
            mapped.push(f(lane)?);
        }
        // never grows, so it always fits
        Ok(Self::from_vec(mapped).unwrap_or_default())
    }
}

/// The entity (or entity pair) a feature value is attached to.
///
/// Segment and node handles are shared by every participant of a session, lane
/// handles are not: a lane is carried with the handle of whoever sent the
/// record plus its address inside the owning segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub enum FeatureTarget {
    Lane { lane: Handle, address: CompoundAddress },
    Segment { segment: Handle },
    Node { node: Handle },
    SegmentEnd { segment: Handle, node: Handle },
}

impl FeatureTarget {
    pub fn lane(lane: Handle, segment: Handle, lane_index: u16) -> Self {
        FeatureTarget::Lane {
            lane,
            address: CompoundAddress::new(segment, lane_index),
        }
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            FeatureTarget::Lane { .. } => TargetKind::Lane,
            FeatureTarget::Segment { .. } => TargetKind::Segment,
            FeatureTarget::Node { .. } => TargetKind::Node,
            FeatureTarget::SegmentEnd { .. } => TargetKind::SegmentEnd,
        }
    }

    /// Referenced entities, in lock acquisition order.
    pub fn entities(&self) -> Vec<EntityRef> {
        let mut entities = match self {
            FeatureTarget::Lane { lane, .. } => vec![EntityRef::lane(*lane)],
            FeatureTarget::Segment { segment } => vec![EntityRef::segment(*segment)],
            FeatureTarget::Node { node } => vec![EntityRef::node(*node)],
            FeatureTarget::SegmentEnd { segment, node } => {
                vec![EntityRef::segment(*segment), EntityRef::node(*node)]
            }
        };
        entities.sort();
        entities
    }

    /// The entity reported back when a record about this target is rejected.
    pub fn primary(&self) -> EntityRef {
        match self {
            FeatureTarget::Lane { lane, .. } => EntityRef::lane(*lane),
            FeatureTarget::Segment { segment } | FeatureTarget::SegmentEnd { segment, .. } => {
                EntityRef::segment(*segment)
            }
            FeatureTarget::Node { node } => EntityRef::node(*node),
        }
    }
}

impl fmt::Display for FeatureTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureTarget::Lane { lane, address } => write!(f, "lane:{}@{}", lane, address),
            FeatureTarget::Segment { segment } => write!(f, "segment:{}", segment),
            FeatureTarget::Node { node } => write!(f, "node:{}", node),
            FeatureTarget::SegmentEnd { segment, node } => {
                write!(f, "segment:{}/node:{}", segment, node)
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub enum PrioritySign {
    None,
    Priority,
    Stop,
    Yield,
}

pub mod lane_arrows {
    pub const LEFT: u8 = 1 << 0;
    pub const FORWARD: u8 = 1 << 1;
    pub const RIGHT: u8 = 1 << 2;
    pub const ALL: u8 = LEFT | FORWARD | RIGHT;
}

pub mod junction_flags {
    pub const U_TURN: u8 = 1 << 0;
    pub const LANE_CHANGE: u8 = 1 << 1;
    pub const ENTER_BLOCKED: u8 = 1 << 2;
    pub const PEDESTRIAN_CROSSING: u8 = 1 << 3;
    pub const TURN_ON_RED: u8 = 1 << 4;
    pub const ALL: u8 = U_TURN | LANE_CHANGE | ENTER_BLOCKED | PEDESTRIAN_CROSSING | TURN_ON_RED;
}

pub mod vehicle_flags {
    pub const PASSENGER_CAR: u32 = 1 << 0;
    pub const BUS: u32 = 1 << 1;
    pub const TAXI: u32 = 1 << 2;
    pub const CARGO_TRUCK: u32 = 1 << 3;
    pub const SERVICE: u32 = 1 << 4;
    pub const EMERGENCY: u32 = 1 << 5;
    pub const PASSENGER_TRAIN: u32 = 1 << 6;
    pub const CARGO_TRAIN: u32 = 1 << 7;
    pub const ALL: u32 = (1 << 8) - 1;
}

/// A feature's value as carried by requests and applied records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub enum FeatureValue {
    /// km/h, `None` restores the lane's default
    SpeedLimit(Option<u16>),
    LaneArrows(u8),
    /// Allowed vehicle types, see [`vehicle_flags`]
    VehicleRestrictions(u32),
    ParkingRestriction { forward: bool, backward: bool },
    PrioritySign(PrioritySign),
    JunctionRestrictions(u8),
    CrosswalkHidden(bool),
    TrafficLight(bool),
    /// Every lane the target lane leads into; replaces the previous set
    LaneConnections(LaneSet),
}

impl FeatureValue {
    pub fn feature(&self) -> FeatureKind {
        match self {
            FeatureValue::SpeedLimit(_) => FeatureKind::SpeedLimit,
            FeatureValue::LaneArrows(_) => FeatureKind::LaneArrows,
            FeatureValue::VehicleRestrictions(_) => FeatureKind::VehicleRestrictions,
            FeatureValue::ParkingRestriction { .. } => FeatureKind::ParkingRestriction,
            FeatureValue::PrioritySign(_) => FeatureKind::PrioritySign,
            FeatureValue::JunctionRestrictions(_) => FeatureKind::JunctionRestrictions,
            FeatureValue::CrosswalkHidden(_) => FeatureKind::CrosswalkHidden,
            FeatureValue::TrafficLight(_) => FeatureKind::TrafficLight,
            FeatureValue::LaneConnections(_) => FeatureKind::LaneConnections,
        }
    }

    /// Lanes the value itself refers to, besides its target.
    pub fn lanes(&self) -> Vec<LaneRef> {
        match self {
            FeatureValue::LaneConnections(connected) => connected.iter().copied().collect(),
            _ => Vec::new(),
        }
    }

    /// Every entity touched by setting this value on `target`, in lock acquisition order.
    pub fn entities_with(&self, target: &FeatureTarget) -> Vec<EntityRef> {
        let mut entities = target.entities();
        entities.extend(self.lanes().iter().map(LaneRef::entity));
        entities.sort();
        entities.dedup();
        entities
    }

    /// Checks the value is in range and addressed to the right kind of target.
    pub fn validate(&self, target: &FeatureTarget) -> Result<(), String> {
        let feature = self.feature();
        if feature.target_kind() != target.kind() {
            return Err(format!(
                "{} cannot target {:?}, expected {:?}",
                feature,
                target.kind(),
                feature.target_kind()
            ));
        }
        if let FeatureTarget::SegmentEnd { segment, node } = target {
            if segment == node {
                return Err(format!("segment end {} references itself", target));
            }
        }
        match self {
            FeatureValue::SpeedLimit(Some(kmh)) if *kmh == 0 || *kmh > MAX_SPEED_LIMIT_KMH => {
                Err(format!("speed limit {} km/h out of range", kmh))
            }
            FeatureValue::LaneArrows(arrows) if arrows & !lane_arrows::ALL != 0 => {
                Err(format!("unknown lane arrow bits {:#05b}", arrows))
            }
            FeatureValue::VehicleRestrictions(mask) if mask & !vehicle_flags::ALL != 0 => {
                Err(format!("unknown vehicle type bits {:#x}", mask))
            }
            FeatureValue::JunctionRestrictions(flags) if flags & !junction_flags::ALL != 0 => {
                Err(format!("unknown junction restriction bits {:#07b}", flags))
            }
            FeatureValue::LaneConnections(connected) => match target {
                FeatureTarget::Lane { lane, address }
                    if connected
                        .iter()
                        .any(|other| other.lane == *lane || other.address == *address) =>
                {
                    Err(format!("{} cannot connect to itself", target))
                }
                _ => Ok(()),
            },
            _ => Ok(()),
        }
    }
}
