//! Data set version mapping engine
//!
//! When a next version of a data set is prepared, each option of the
//! previous version's locations, filters and indicators is mapped onto an
//! option of the new version (or onto nothing). This module holds the
//! mapping model and the rules around it:
//!
//! - [`types`]: mapping plans and the [`DataSetVersionMapping`] aggregate
//! - [`documents`]: JSON shape of plans, shared by HTTP and storage
//! - [`validator`]: checks operator updates against the current plan
//! - [`reconcile`]: applies a validated batch, producing a new plan
//! - [`completeness`]: whether a dimension is fully resolved
//! - [`calculator`]: whether publishing is a major or minor version bump
//! - [`storage`]: persistence boundary
//!
//! # Mapping lifecycle
//!
//! ```text
//! None --auto-mapper--> AutoMapped | AutoNone --operator--> ManualMapped | ManualNone
//! ```
//!
//! Operators may move a mapping between the two manual states any number of
//! times.

pub mod calculator;
pub mod completeness;
pub mod documents;
pub mod reconcile;
pub mod storage;
pub mod types;
pub mod validator;

pub use calculator::{calculate_bump, next_version, BumpType};
pub use completeness::Completeness;
pub use reconcile::{reconcile, ReconcileError, Reconciliation};
pub use storage::{
    DataSetVersion, InMemoryMappingStore, MappingCommit, MappingStore, PgMappingStore,
    SharedMappingStore, StoreError,
};
pub use types::{
    DataSetVersionMapping, Dimension, FilterOption, FilterPlan, Filters, IndicatorOption,
    IndicatorPlan, Indicators, LocationKey, LocationMappingUpdate, LocationOption, LocationPlan,
    Locations, Mapping, MappingPlan, MappingType, OptionKey, OptionMapping, OptionMappingUpdate,
    PlanSwap, Submitted,
};
pub use validator::{MappingUpdate, ValidationCode, ValidationFailure};
