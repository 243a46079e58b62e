//! Delegation of approval authority
//!
//! A delegator hands approval authority to a delegate, optionally until an
//! expiry. This module holds the record and its validity rules, the
//! eligibility checks applied at creation, the effective-approver resolver
//! and the expiration sweep.

pub mod eligibility;
pub mod record;
pub mod resolver;
pub mod sweep;

pub use record::{Delegation, DelegationReason, DelegationRecord};
pub use resolver::{resolve_effective_approver, Resolution};
pub use sweep::{sweep_expired, SweepReport};
