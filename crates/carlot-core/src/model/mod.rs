// ── Domain model ──
//
// Canonical client-side views of server-owned records. The server is
// authoritative; these types only mirror what it returns.

mod car;
mod entity_id;
mod inquiry;
mod profile;
mod request;

pub use car::{Car, CarImage, CarListParams, CarPatch, CarStatus, NewCar};
pub use entity_id::{EntityId, EntityKind};
pub use inquiry::{Inquiry, InquiryListParams, InquiryStatus, NewInquiry};
pub use profile::{BuyerPreferences, DealerInfo, LoginResponse, ProfilePatch, Role, UserProfile};
pub use request::{CarRequest, CarRequestPatch, NewCarRequest, RequestListParams, RequestStatus};

pub use carlot_api::{Page, Pagination};
