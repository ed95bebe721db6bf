//! Mutation authorization.
//!
//! Stateless: the decision depends only on the caller's [`Privilege`].
//! The automated-detection ingress never reaches this module.

use crate::identity::{Account, Privilege};

/// Whether `account` may create or delete markers.
pub fn can_mutate(account: &Account) -> bool {
    match account.privilege {
        Privilege::Operator => true,
        Privilege::Viewer => false,
    }
}
