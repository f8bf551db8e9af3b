//! Customer account record.

use common::{UserId, VillageId};
use serde::{Deserialize, Serialize};

/// The slice of a customer account the order workflow touches.
///
/// Credentials and profile fields live with the external identity
/// subsystem; the order flow only needs the id and the shipping village.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub village_id: Option<VillageId>,
}

impl User {
    /// Creates a user without a shipping village.
    pub fn new(id: UserId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            village_id: None,
        }
    }
}
