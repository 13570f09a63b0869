use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMethod {
    #[default]
    Meetup,
    Shipping,
}

impl DeliveryMethod {
    pub fn label(&self) -> &str {
        match self {
            Self::Meetup => "Meetup",
            Self::Shipping => "Shipping",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetupDetails {
    pub date: Option<NaiveDate>,
    pub time_slot: Option<String>,
    /// Id of the selected [`SafeZone`](crate::safe_zone::SafeZone)
    pub safe_zone: Option<u32>,
}

impl MeetupDetails {
    pub fn is_complete(&self) -> bool {
        self.date.is_some()
            && self.time_slot.as_deref().is_some_and(|slot| !slot.is_empty())
            && self.safe_zone.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

impl ShippingAddress {
    /// Recipient name is optional, every other field is required
    pub fn is_complete(&self) -> bool {
        [
            &self.address,
            &self.city,
            &self.state,
            &self.pincode,
            &self.phone,
        ]
        .iter()
        .all(|field| !field.is_empty())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    StoredCredit,
    #[default]
    Card,
}

impl PaymentMethod {
    pub fn label(&self) -> &str {
        match self {
            Self::StoredCredit => "Legion credits",
            Self::Card => "Card",
        }
    }
}

pub const MIN_CARD_NUMBER_LEN: usize = 16;
pub const MIN_CVV_LEN: usize = 3;

#[derive(Clone, Default, PartialEq, Eq)]
pub struct CardDetails {
    pub number: String,
    pub expiry: String,
    pub cvv: String,
    pub name: String,
}

impl CardDetails {
    pub fn is_complete(&self) -> bool {
        self.number.chars().count() >= MIN_CARD_NUMBER_LEN
            && !self.expiry.is_empty()
            && self.cvv.chars().count() >= MIN_CVV_LEN
            && !self.name.is_empty()
    }

    fn masked_number(&self) -> String {
        let count = self.number.chars().count();
        let tail: String = self.number.chars().skip(count.saturating_sub(4)).collect();
        format!("**** {tail}")
    }
}

impl std::fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardDetails")
            .field("number", &self.masked_number())
            .field("expiry", &self.expiry)
            .field("cvv", &"***")
            .field("name", &self.name)
            .finish()
    }
}
