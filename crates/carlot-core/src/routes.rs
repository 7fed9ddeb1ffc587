// ── Route table ──
//
// Static mapping from role to landing route, shared by the route guard and
// login-success redirection.

use serde::{Deserialize, Serialize};

use crate::model::Role;

/// Where each kind of user lands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteTable {
    pub login: String,
    pub buyer_home: String,
    pub dealer_home: String,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self {
            login: "/login".into(),
            buyer_home: "/buyer/home".into(),
            dealer_home: "/dealer/home".into(),
        }
    }
}

impl RouteTable {
    pub fn home_for(&self, role: Role) -> &str {
        match role {
            Role::Buyer => &self.buyer_home,
            Role::Dealer => &self.dealer_home,
        }
    }

    pub fn login(&self) -> &str {
        &self.login
    }
}
