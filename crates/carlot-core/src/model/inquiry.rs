use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::EntityId;

/// Inquiry lifecycle: `new → responded → closed`, with `new → closed`
/// allowed as a shortcut. Nothing leaves `closed`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InquiryStatus {
    New,
    Responded,
    Closed,
}

impl InquiryStatus {
    /// Status only moves forward.
    pub fn can_transition_to(self, next: Self) -> bool {
        next > self
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Closed
    }
}

/// A buyer's message to a dealer, optionally about a specific car.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inquiry {
    pub id: EntityId,
    pub buyer_id: EntityId,
    pub dealer_id: EntityId,
    #[serde(default)]
    pub car_id: Option<EntityId>,
    pub message: String,
    pub status: InquiryStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InquiryListParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<InquiryStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub car_id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl InquiryListParams {
    pub fn matches(&self, inquiry: &Inquiry) -> bool {
        self.status.is_none_or(|s| inquiry.status == s)
            && self
                .car_id
                .as_ref()
                .is_none_or(|c| inquiry.car_id.as_ref() == Some(c))
    }
}

/// Payload for a buyer opening an inquiry. `car_id` is `None` for general
/// questions to a dealer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInquiry {
    pub dealer_id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub car_id: Option<EntityId>,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_only() {
        assert!(InquiryStatus::New.can_transition_to(InquiryStatus::Responded));
        assert!(InquiryStatus::New.can_transition_to(InquiryStatus::Closed));
        assert!(InquiryStatus::Responded.can_transition_to(InquiryStatus::Closed));
        assert!(!InquiryStatus::Closed.can_transition_to(InquiryStatus::New));
        assert!(!InquiryStatus::Responded.can_transition_to(InquiryStatus::New));
        assert!(!InquiryStatus::Closed.can_transition_to(InquiryStatus::Closed));
    }
}
