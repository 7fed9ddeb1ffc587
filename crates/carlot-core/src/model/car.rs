use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::EntityId;

/// Listing status of a car.
///
/// Availability is a separate flag; a car can be `Active` but temporarily
/// unavailable (on hold for a buyer, in the shop).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CarStatus {
    Active,
    Sold,
    Deleted,
}

impl CarStatus {
    /// Whether a listing may move from `self` to `next`.
    ///
    /// A sold car is frozen. A deleted car may only be restored.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::Sold | Self::Deleted) | (Self::Deleted, Self::Active)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarImage {
    pub url: String,
    #[serde(default)]
    pub is_main: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Car {
    pub id: EntityId,
    pub make: String,
    pub model: String,
    pub year: u16,
    pub price: f64,
    #[serde(default)]
    pub mileage: u32,
    pub status: CarStatus,
    #[serde(default = "default_available")]
    pub is_available: bool,
    pub dealer_id: EntityId,
    #[serde(default)]
    pub images: Vec<CarImage>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_available() -> bool {
    true
}

impl Car {
    /// The image flagged main, falling back to the first one.
    pub fn main_image(&self) -> Option<&CarImage> {
        self.images
            .iter()
            .find(|img| img.is_main)
            .or_else(|| self.images.first())
    }

    /// Flag the image at `index` as main and clear the flag everywhere else.
    /// Returns `false` (and changes nothing) if `index` is out of range.
    pub fn set_main_image(&mut self, index: usize) -> bool {
        if index >= self.images.len() {
            return false;
        }
        for (i, img) in self.images.iter_mut().enumerate() {
            img.is_main = i == index;
        }
        true
    }

    pub fn title(&self) -> String {
        format!("{} {} {}", self.year, self.make, self.model)
    }
}

/// Filters, sort and paging for a car listing query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarListParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_min: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_max: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CarStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dealer_id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl CarListParams {
    pub fn make(make: impl Into<String>) -> Self {
        Self {
            make: Some(make.into()),
            ..Self::default()
        }
    }

    /// Client-side mirror of the server filter, used by in-memory gateways.
    pub fn matches(&self, car: &Car) -> bool {
        self.make
            .as_deref()
            .is_none_or(|m| car.make.eq_ignore_ascii_case(m))
            && self
                .model
                .as_deref()
                .is_none_or(|m| car.model.eq_ignore_ascii_case(m))
            && self.year_min.is_none_or(|y| car.year >= y)
            && self.year_max.is_none_or(|y| car.year <= y)
            && self.price_max.is_none_or(|p| car.price <= p)
            && self.status.is_none_or(|s| car.status == s)
            && self.dealer_id.as_ref().is_none_or(|d| &car.dealer_id == d)
    }
}

/// Payload for creating a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCar {
    pub make: String,
    pub model: String,
    pub year: u16,
    pub price: f64,
    pub mileage: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<CarImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Partial update for a listing; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mileage: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<CarImage>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
