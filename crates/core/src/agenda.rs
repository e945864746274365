//! Quote validation and agenda derivation.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::model::{AgendaItem, Profile, ServiceRequest};
use crate::types::{Price, RequestStatus};
use crate::validation::{ValidationError, required};

/// Description given to agenda items created by scheduling.
pub const DEFAULT_AGENDA_DESCRIPTION: &str = "Scheduled service";

/// A quote as submitted by a collaborator, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteDraft {
    pub price: Option<Decimal>,
    #[serde(default)]
    pub labor_description: String,
    #[serde(default)]
    pub materials_list: String,
    pub suggested_execution_date: Option<DateTime<Utc>>,
}

/// Validated quote terms, ready to store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteTerms {
    pub price: Price,
    pub labor_description: String,
    pub materials_list: String,
    pub suggested_execution_date: DateTime<Utc>,
}

impl QuoteDraft {
    /// Check the draft and produce storable terms.
    ///
    /// # Errors
    ///
    /// Rejects a missing or negative price, a blank labor description, or a
    /// missing suggested date.
    pub fn validate(&self) -> Result<QuoteTerms, ValidationError> {
        let price = self
            .price
            .ok_or(ValidationError::Required { field: "price" })?;
        let price = Price::new(price)?;
        let labor_description = required("labor description", &self.labor_description)?;
        let suggested_execution_date = self
            .suggested_execution_date
            .ok_or(ValidationError::Required {
                field: "suggested date",
            })?;

        Ok(QuoteTerms {
            price,
            labor_description,
            materials_list: self.materials_list.trim().to_owned(),
            suggested_execution_date,
        })
    }
}

/// The denormalized fields of a new agenda item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgendaSeed {
    pub client_name: String,
    pub client_address: String,
    pub description: String,
}

impl AgendaSeed {
    /// Seed an agenda item from the client's profile at schedule time.
    ///
    /// Falls back to the name recorded on the request when the profile has
    /// none.
    #[must_use]
    pub fn from_client(client: &Profile, request: &ServiceRequest) -> Self {
        let client_name = if client.name.trim().is_empty() {
            request.client_name.clone()
        } else {
            client.name.clone()
        };

        Self {
            client_name,
            client_address: client.address.clone(),
            description: DEFAULT_AGENDA_DESCRIPTION.to_owned(),
        }
    }
}

/// Upcoming visits on `date`, earliest first.
///
/// Only items still `Scheduled` are listed.
#[must_use]
pub fn agenda_for_day(items: &[AgendaItem], date: NaiveDate) -> Vec<AgendaItem> {
    let mut day: Vec<AgendaItem> = items
        .iter()
        .filter(|item| item.status == RequestStatus::Scheduled)
        .filter(|item| item.execution_datetime.date_naive() == date)
        .cloned()
        .collect();
    day.sort_by_key(|item| (item.execution_datetime, item.id));
    day
}

/// Days of `month` in `year` that have at least one upcoming visit.
#[must_use]
pub fn days_with_service(items: &[AgendaItem], year: i32, month: u32) -> BTreeSet<u32> {
    items
        .iter()
        .filter(|item| item.status == RequestStatus::Scheduled)
        .map(|item| item.execution_datetime.date_naive())
        .filter(|date| date.year() == year && date.month() == month)
        .map(|date| date.day())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::model::fixtures::{at, pending_request};
    use crate::types::{AgendaItemId, Email, PriceError, RequestId, Role, UserId};

    fn item(id: i64, when: DateTime<Utc>, status: RequestStatus) -> AgendaItem {
        AgendaItem {
            id: AgendaItemId::new(id),
            collaborator_id: UserId::random(),
            request_id: RequestId::new(id),
            client_name: "Carla".to_owned(),
            client_address: "12 Elm St".to_owned(),
            description: DEFAULT_AGENDA_DESCRIPTION.to_owned(),
            execution_datetime: when,
            status,
        }
    }

    fn draft() -> QuoteDraft {
        QuoteDraft {
            price: Some(Decimal::new(15000, 2)),
            labor_description: "replace washer".to_owned(),
            materials_list: " washer ".to_owned(),
            suggested_execution_date: Some(at(10, 14)),
        }
    }

    #[test]
    fn test_valid_draft_produces_terms() {
        let terms = draft().validate().unwrap();
        assert_eq!(terms.price.to_string(), "150.00");
        assert_eq!(terms.materials_list, "washer");
    }

    #[test]
    fn test_draft_rejections() {
        let negative = QuoteDraft {
            price: Some(Decimal::new(-1, 0)),
            ..draft()
        };
        assert_eq!(
            negative.validate(),
            Err(ValidationError::Price(PriceError::Negative))
        );

        let blank = QuoteDraft {
            labor_description: "  ".to_owned(),
            ..draft()
        };
        assert!(matches!(
            blank.validate(),
            Err(ValidationError::Required { field: "labor description" })
        ));

        let undated = QuoteDraft {
            suggested_execution_date: None,
            ..draft()
        };
        assert!(undated.validate().is_err());

        let unpriced = QuoteDraft {
            price: None,
            ..draft()
        };
        assert!(unpriced.validate().is_err());
    }

    #[test]
    fn test_seed_uses_client_profile() {
        let client = Profile {
            id: UserId::random(),
            role: Role::Client,
            name: "Carla Dias".to_owned(),
            email: Email::parse("carla@example.com").unwrap(),
            phone: String::new(),
            address: "12 Elm St".to_owned(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let request = pending_request(1, client.id);

        let seed = AgendaSeed::from_client(&client, &request);
        assert_eq!(seed.client_name, "Carla Dias");
        assert_eq!(seed.client_address, "12 Elm St");
        assert_eq!(seed.description, "Scheduled service");
    }

    #[test]
    fn test_agenda_for_day_lists_scheduled_in_time_order() {
        let items = vec![
            item(1, at(10, 16), RequestStatus::Scheduled),
            item(2, at(10, 9), RequestStatus::Scheduled),
            item(3, at(10, 12), RequestStatus::Completed),
            item(4, at(11, 9), RequestStatus::Scheduled),
        ];

        let day = agenda_for_day(&items, at(10, 0).date_naive());
        let ids: Vec<i64> = day.iter().map(|i| i.id.as_i64()).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_days_with_service_filters_month() {
        let february = Utc.with_ymd_and_hms(2024, 2, 3, 10, 0, 0).unwrap();
        let items = vec![
            item(1, at(10, 16), RequestStatus::Scheduled),
            item(2, at(10, 9), RequestStatus::Scheduled),
            item(3, at(12, 9), RequestStatus::Completed),
            item(4, at(20, 9), RequestStatus::Scheduled),
            item(5, february, RequestStatus::Scheduled),
        ];

        let days: Vec<u32> = days_with_service(&items, 2024, 1).into_iter().collect();
        assert_eq!(days, vec![10, 20]);
    }
}
