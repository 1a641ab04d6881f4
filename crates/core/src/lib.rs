pub mod config;
pub mod domain;
pub mod entitlement;
pub mod errors;
pub mod policy;

pub use domain::account::{Account, AccountId};
pub use domain::turn::{Role, Turn};
pub use entitlement::{EntitlementDecision, EntitlementEvaluator, EntitlementState, Evaluation};
pub use errors::{ApplicationError, InterfaceError};
pub use policy::domain::{DomainClassifier, DomainTag};
pub use policy::moderation::{ModerationCategory, ModerationFilter, ModerationVerdict};
pub use policy::PolicyTables;
