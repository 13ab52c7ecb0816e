//! # Roadsync Shared
//! Common functionality shared between roadsync-server & roadsync-client crates.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod adapter;
mod apply;
mod batch;
mod command_channel;
mod commands;
mod config;
mod deferred;
mod error;
mod identity;
mod ignore_scope;
mod locks;
mod types;

pub use adapter::{AdapterError, EntityCatalog, TrafficControlAdapter};
pub use apply::{
    applied_op::AppliedOp,
    change_observer::ChangeObserver,
    remote_apply::{apply_remote, needs_mapping, ApplyResult},
    sync_world::{host_target, host_value, Localized, SyncWorld},
};
pub use batch::{
    change_batcher::{ChangeBatcher, FlushAction},
    tick_queue::{SimulationScheduler, SimulationTask, TickQueue},
};
pub use command_channel::{CommandInbox, CommandSink};
pub use commands::{
    edit_lock::{EditLockApplied, EditTarget},
    feature::{
        junction_flags, lane_arrows, vehicle_flags, FeatureKind, FeatureTarget, FeatureValue,
        LaneRef, LaneSet, PrioritySign, TargetKind, MAX_LANE_CONNECTIONS, MAX_SPEED_LIMIT_KMH,
    },
    feature_commands::{Applied, BatchApplied, BatchEntry, SetRequest},
    mapping_commands::{MappingBatch, MappingChanged, MappingRecord, MappingRemoved},
    rejection::{RejectReason, RequestRejected},
    sync_message::{SyncMessage, PROTOCOL_VERSION},
    version_check::{VersionCheck, VersionResult},
};
pub use config::SyncConfig;
pub use deferred::{
    deferred_op::DeferredOp,
    deferred_queue::{DeferredQueue, DrainReport},
    error::DeferredError,
};
pub use error::SyncError;
pub use identity::{
    error::MappingError,
    mapping_entry::{MappingEntry, UpsertResult},
    mapping_store::IdentityMappingStore,
    resolver::{find_local_handle, resolve_pending, ResolutionReport},
    stable_id::{CompoundAddress, EntityKind, EntityRef, StableId},
};
pub use ignore_scope::IgnoreScope;
pub use locks::{
    apply_guard::ApplyGuard,
    error::LockError,
    lock_registry::{EntityLockRegistry, LockEntry, LockGrant},
};
pub use types::{Handle, HostType, MappingVersion, PeerId, Tick};
