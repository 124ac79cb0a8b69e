// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed conversation state.
//!
//! Each variant carries exactly the scratch fields its step needs. On disk
//! the state stays an open key/value map; decoding a row whose fields do
//! not match its step fails, and callers fall back to the main menu.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use strum::{Display, EnumString};

use rentbot_core::{RentError, UserState};

use crate::step::Step;

/// How a manager booking picks its dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum DateType {
    Single,
    Range,
}

/// Client details gathered at the start of a manager booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientDraft {
    pub client_name: String,
    pub client_phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversation {
    MainMenu,

    SelectItem {
        page: usize,
    },
    WaitingDate {
        item_id: i64,
    },
    EnterName {
        item_id: i64,
        date: NaiveDate,
    },
    PhoneNumber {
        item_id: i64,
        date: NaiveDate,
        user_name: String,
    },
    Confirmation {
        item_id: i64,
        date: NaiveDate,
        user_name: String,
        phone: String,
    },

    ManagerClientName,
    ManagerClientPhone {
        client_name: String,
    },
    ManagerItemSelection {
        client: ClientDraft,
        page: usize,
    },
    ManagerDateType {
        client: ClientDraft,
        item_id: i64,
    },
    ManagerSingleDate {
        client: ClientDraft,
        item_id: i64,
    },
    ManagerStartDate {
        client: ClientDraft,
        item_id: i64,
    },
    ManagerEndDate {
        client: ClientDraft,
        item_id: i64,
        start_date: NaiveDate,
    },
    ManagerComment {
        client: ClientDraft,
        item_id: i64,
        date_type: DateType,
        dates: Vec<NaiveDate>,
    },
    ManagerConfirm {
        client: ClientDraft,
        item_id: i64,
        date_type: DateType,
        dates: Vec<NaiveDate>,
        comment: Option<String>,
    },

    ScheduleSelectItem {
        page: usize,
    },
    ViewSchedule {
        item_id: i64,
    },
    WaitingSpecificDate {
        item_id: i64,
    },
}

impl Conversation {
    pub fn step(&self) -> Step {
        match self {
            Conversation::MainMenu => Step::MainMenu,
            Conversation::SelectItem { .. } => Step::SelectItem,
            Conversation::WaitingDate { .. } => Step::WaitingDate,
            Conversation::EnterName { .. } => Step::EnterName,
            Conversation::PhoneNumber { .. } => Step::PhoneNumber,
            Conversation::Confirmation { .. } => Step::Confirmation,
            Conversation::ManagerClientName => Step::ManagerWaitingClientName,
            Conversation::ManagerClientPhone { .. } => Step::ManagerWaitingClientPhone,
            Conversation::ManagerItemSelection { .. } => Step::ManagerWaitingItemSelection,
            Conversation::ManagerDateType { .. } => Step::ManagerWaitingDateType,
            Conversation::ManagerSingleDate { .. } => Step::ManagerWaitingSingleDate,
            Conversation::ManagerStartDate { .. } => Step::ManagerWaitingStartDate,
            Conversation::ManagerEndDate { .. } => Step::ManagerWaitingEndDate,
            Conversation::ManagerComment { .. } => Step::ManagerWaitingComment,
            Conversation::ManagerConfirm { .. } => Step::ManagerConfirmBooking,
            Conversation::ScheduleSelectItem { .. } => Step::ScheduleSelectItem,
            Conversation::ViewSchedule { .. } => Step::ViewSchedule,
            Conversation::WaitingSpecificDate { .. } => Step::WaitingSpecificDate,
        }
    }

    /// The state one step earlier, dropping the field the current step added.
    pub fn back(self) -> Conversation {
        use Conversation::*;
        match self {
            MainMenu | SelectItem { .. } | ManagerClientName | ScheduleSelectItem { .. } => {
                MainMenu
            }
            WaitingDate { .. } => SelectItem { page: 0 },
            EnterName { item_id, .. } => WaitingDate { item_id },
            PhoneNumber { item_id, date, .. } => EnterName { item_id, date },
            Confirmation {
                item_id,
                date,
                user_name,
                ..
            } => PhoneNumber {
                item_id,
                date,
                user_name,
            },
            ManagerClientPhone { .. } => ManagerClientName,
            ManagerItemSelection { client, .. } => ManagerClientPhone {
                client_name: client.client_name,
            },
            ManagerDateType { client, .. } => ManagerItemSelection { client, page: 0 },
            ManagerSingleDate { client, item_id } | ManagerStartDate { client, item_id } => {
                ManagerDateType { client, item_id }
            }
            ManagerEndDate {
                client, item_id, ..
            } => ManagerStartDate { client, item_id },
            ManagerComment {
                client,
                item_id,
                date_type,
                dates,
            } => match (date_type, dates.first()) {
                (DateType::Range, Some(&start_date)) => ManagerEndDate {
                    client,
                    item_id,
                    start_date,
                },
                (DateType::Range, None) => ManagerStartDate { client, item_id },
                (DateType::Single, _) => ManagerSingleDate { client, item_id },
            },
            ManagerConfirm {
                client,
                item_id,
                date_type,
                dates,
                ..
            } => ManagerComment {
                client,
                item_id,
                date_type,
                dates,
            },
            ViewSchedule { .. } => ScheduleSelectItem { page: 0 },
            WaitingSpecificDate { item_id } => ViewSchedule { item_id },
        }
    }

    /// Encodes into the persisted key/value form.
    pub fn to_state(&self, user_id: i64, now: DateTime<Utc>) -> UserState {
        let mut data = Scratch::default();
        use Conversation::*;
        match self {
            MainMenu | ManagerClientName => {}
            SelectItem { page } | ScheduleSelectItem { page } => data.put_page(*page),
            WaitingDate { item_id } | ViewSchedule { item_id } | WaitingSpecificDate { item_id } => {
                data.put_int(keys::ITEM_ID, *item_id);
            }
            EnterName { item_id, date } => {
                data.put_int(keys::ITEM_ID, *item_id);
                data.put_date(keys::DATE, *date);
            }
            PhoneNumber {
                item_id,
                date,
                user_name,
            } => {
                data.put_int(keys::ITEM_ID, *item_id);
                data.put_date(keys::DATE, *date);
                data.put_str(keys::USER_NAME, user_name);
            }
            Confirmation {
                item_id,
                date,
                user_name,
                phone,
            } => {
                data.put_int(keys::ITEM_ID, *item_id);
                data.put_date(keys::DATE, *date);
                data.put_str(keys::USER_NAME, user_name);
                data.put_str(keys::PHONE, phone);
            }
            ManagerClientPhone { client_name } => {
                data.put_manager();
                data.put_str(keys::CLIENT_NAME, client_name);
            }
            ManagerItemSelection { client, page } => {
                data.put_client(client);
                data.put_page(*page);
            }
            ManagerDateType { client, item_id }
            | ManagerSingleDate { client, item_id }
            | ManagerStartDate { client, item_id } => {
                data.put_client(client);
                data.put_int(keys::ITEM_ID, *item_id);
            }
            ManagerEndDate {
                client,
                item_id,
                start_date,
            } => {
                data.put_client(client);
                data.put_int(keys::ITEM_ID, *item_id);
                data.put_str(keys::DATE_TYPE, &DateType::Range.to_string());
                data.put_date(keys::START_DATE, *start_date);
            }
            ManagerComment {
                client,
                item_id,
                date_type,
                dates,
            } => {
                data.put_client(client);
                data.put_int(keys::ITEM_ID, *item_id);
                data.put_str(keys::DATE_TYPE, &date_type.to_string());
                data.put_dates(dates);
            }
            ManagerConfirm {
                client,
                item_id,
                date_type,
                dates,
                comment,
            } => {
                data.put_client(client);
                data.put_int(keys::ITEM_ID, *item_id);
                data.put_str(keys::DATE_TYPE, &date_type.to_string());
                data.put_dates(dates);
                if let Some(comment) = comment {
                    data.put_str(keys::COMMENT, comment);
                }
            }
        }
        UserState {
            user_id,
            step: self.step().to_string(),
            data: data.0,
            updated_at: now,
        }
    }

    /// Decodes a persisted row. Fails when the step is unknown or a field
    /// the step requires is missing or malformed.
    pub fn from_state(state: &UserState) -> Result<Conversation, RentError> {
        let step = Step::from_str(&state.step)
            .map_err(|_| RentError::Validation(format!("unknown step `{}`", state.step)))?;
        let data = ScratchRef(&state.data);
        let conversation = match step {
            Step::MainMenu => Conversation::MainMenu,
            Step::SelectItem => Conversation::SelectItem { page: data.page() },
            Step::WaitingDate => Conversation::WaitingDate {
                item_id: data.int(keys::ITEM_ID)?,
            },
            Step::EnterName => Conversation::EnterName {
                item_id: data.int(keys::ITEM_ID)?,
                date: data.date(keys::DATE)?,
            },
            Step::PhoneNumber => Conversation::PhoneNumber {
                item_id: data.int(keys::ITEM_ID)?,
                date: data.date(keys::DATE)?,
                user_name: data.string(keys::USER_NAME)?,
            },
            Step::Confirmation => Conversation::Confirmation {
                item_id: data.int(keys::ITEM_ID)?,
                date: data.date(keys::DATE)?,
                user_name: data.string(keys::USER_NAME)?,
                phone: data.string(keys::PHONE)?,
            },
            Step::ManagerWaitingClientName => Conversation::ManagerClientName,
            Step::ManagerWaitingClientPhone => Conversation::ManagerClientPhone {
                client_name: data.string(keys::CLIENT_NAME)?,
            },
            Step::ManagerWaitingItemSelection => Conversation::ManagerItemSelection {
                client: data.client()?,
                page: data.page(),
            },
            Step::ManagerWaitingDateType => Conversation::ManagerDateType {
                client: data.client()?,
                item_id: data.int(keys::ITEM_ID)?,
            },
            Step::ManagerWaitingSingleDate => Conversation::ManagerSingleDate {
                client: data.client()?,
                item_id: data.int(keys::ITEM_ID)?,
            },
            Step::ManagerWaitingStartDate => Conversation::ManagerStartDate {
                client: data.client()?,
                item_id: data.int(keys::ITEM_ID)?,
            },
            Step::ManagerWaitingEndDate => Conversation::ManagerEndDate {
                client: data.client()?,
                item_id: data.int(keys::ITEM_ID)?,
                start_date: data.date(keys::START_DATE)?,
            },
            Step::ManagerWaitingComment => Conversation::ManagerComment {
                client: data.client()?,
                item_id: data.int(keys::ITEM_ID)?,
                date_type: data.date_type()?,
                dates: data.dates()?,
            },
            Step::ManagerConfirmBooking => Conversation::ManagerConfirm {
                client: data.client()?,
                item_id: data.int(keys::ITEM_ID)?,
                date_type: data.date_type()?,
                dates: data.dates()?,
                comment: data.string(keys::COMMENT).ok(),
            },
            Step::ScheduleSelectItem => Conversation::ScheduleSelectItem { page: data.page() },
            Step::ViewSchedule => Conversation::ViewSchedule {
                item_id: data.int(keys::ITEM_ID)?,
            },
            Step::WaitingSpecificDate => Conversation::WaitingSpecificDate {
                item_id: data.int(keys::ITEM_ID)?,
            },
        };
        Ok(conversation)
    }
}

/// Scratch keys of the persisted map.
pub mod keys {
    pub const ITEM_ID: &str = "item_id";
    pub const DATE: &str = "date";
    pub const DATES: &str = "dates";
    pub const DATE_TYPE: &str = "date_type";
    pub const START_DATE: &str = "start_date";
    pub const USER_NAME: &str = "user_name";
    pub const PHONE: &str = "phone";
    pub const CLIENT_NAME: &str = "client_name";
    pub const CLIENT_PHONE: &str = "client_phone";
    pub const COMMENT: &str = "comment";
    pub const IS_MANAGER_BOOKING: &str = "is_manager_booking";
    pub const PAGE: &str = "page";
}

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Default)]
struct Scratch(BTreeMap<String, Value>);

impl Scratch {
    fn put_int(&mut self, key: &str, v: i64) {
        self.0.insert(key.to_string(), Value::from(v));
    }

    fn put_str(&mut self, key: &str, v: &str) {
        self.0.insert(key.to_string(), Value::from(v));
    }

    fn put_date(&mut self, key: &str, d: NaiveDate) {
        self.put_str(key, &d.format(DATE_FORMAT).to_string());
    }

    fn put_dates(&mut self, dates: &[NaiveDate]) {
        let list = dates
            .iter()
            .map(|d| Value::from(d.format(DATE_FORMAT).to_string()))
            .collect();
        self.0.insert(keys::DATES.to_string(), Value::Array(list));
    }

    fn put_page(&mut self, page: usize) {
        self.0.insert(keys::PAGE.to_string(), Value::from(page));
    }

    fn put_manager(&mut self) {
        self.0
            .insert(keys::IS_MANAGER_BOOKING.to_string(), Value::Bool(true));
    }

    fn put_client(&mut self, client: &ClientDraft) {
        self.put_manager();
        self.put_str(keys::CLIENT_NAME, &client.client_name);
        self.put_str(keys::CLIENT_PHONE, &client.client_phone);
    }
}

struct ScratchRef<'a>(&'a BTreeMap<String, Value>);

fn missing(key: &str) -> RentError {
    RentError::Validation(format!("conversation field `{key}` is missing or malformed"))
}

impl ScratchRef<'_> {
    fn int(&self, key: &str) -> Result<i64, RentError> {
        self.0.get(key).and_then(Value::as_i64).ok_or_else(|| missing(key))
    }

    fn string(&self, key: &str) -> Result<String, RentError> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| missing(key))
    }

    fn parse_date(key: &str, raw: &str) -> Result<NaiveDate, RentError> {
        NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| missing(key))
    }

    fn date(&self, key: &str) -> Result<NaiveDate, RentError> {
        Self::parse_date(key, &self.string(key)?)
    }

    fn dates(&self) -> Result<Vec<NaiveDate>, RentError> {
        let list = self
            .0
            .get(keys::DATES)
            .and_then(Value::as_array)
            .ok_or_else(|| missing(keys::DATES))?;
        if list.is_empty() {
            return Err(missing(keys::DATES));
        }
        list.iter()
            .map(|v| {
                v.as_str()
                    .ok_or_else(|| missing(keys::DATES))
                    .and_then(|raw| Self::parse_date(keys::DATES, raw))
            })
            .collect()
    }

    fn date_type(&self) -> Result<DateType, RentError> {
        DateType::from_str(&self.string(keys::DATE_TYPE)?).map_err(|_| missing(keys::DATE_TYPE))
    }

    fn page(&self) -> usize {
        self.0
            .get(keys::PAGE)
            .and_then(Value::as_u64)
            .and_then(|p| usize::try_from(p).ok())
            .unwrap_or(0)
    }

    fn client(&self) -> Result<ClientDraft, RentError> {
        Ok(ClientDraft {
            client_name: self.string(keys::CLIENT_NAME)?,
            client_phone: self.string(keys::CLIENT_PHONE)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, d).unwrap()
    }

    fn client() -> ClientDraft {
        ClientDraft {
            client_name: "John Doe".into(),
            client_phone: "79991234567".into(),
        }
    }

    #[test]
    fn persisted_form_uses_documented_keys() {
        let state = Conversation::Confirmation {
            item_id: 1,
            date: NaiveDate::from_ymd_opt(2025, 6, 5).unwrap(),
            user_name: "Иван".into(),
            phone: "79991234567".into(),
        }
        .to_state(7, Utc::now());
        assert_eq!(state.step, "confirmation");
        assert_eq!(state.data["item_id"], 1);
        assert_eq!(state.data["date"], "2025-06-05");
        assert_eq!(state.data["user_name"], "Иван");
        assert_eq!(state.data["phone"], "79991234567");
    }

    #[test]
    fn manager_confirm_decodes_back() {
        let original = Conversation::ManagerConfirm {
            client: client(),
            item_id: 2,
            date_type: DateType::Range,
            dates: vec![day(1), day(2), day(3)],
            comment: Some("holiday".into()),
        };
        let state = original.to_state(42, Utc::now());
        assert_eq!(state.data["is_manager_booking"], true);
        assert_eq!(state.data["date_type"], "range");
        assert_eq!(Conversation::from_state(&state).unwrap(), original);
    }

    #[test]
    fn inconsistent_rows_are_rejected() {
        let mut state = Conversation::EnterName {
            item_id: 3,
            date: day(9),
        }
        .to_state(1, Utc::now());
        state.data.remove("date");
        assert!(Conversation::from_state(&state).is_err());

        state.step = "does_not_exist".into();
        assert!(Conversation::from_state(&state).is_err());
    }

    #[test]
    fn back_walks_the_user_chain() {
        let mut c = Conversation::Confirmation {
            item_id: 1,
            date: day(5),
            user_name: "Ivan".into(),
            phone: "79991234567".into(),
        };
        let mut steps = vec![c.step()];
        while c != Conversation::MainMenu {
            c = c.back();
            steps.push(c.step());
        }
        assert_eq!(
            steps,
            vec![
                Step::Confirmation,
                Step::PhoneNumber,
                Step::EnterName,
                Step::WaitingDate,
                Step::SelectItem,
                Step::MainMenu,
            ]
        );
    }

    #[test]
    fn back_from_range_comment_returns_to_end_date() {
        let c = Conversation::ManagerComment {
            client: client(),
            item_id: 2,
            date_type: DateType::Range,
            dates: vec![day(1), day(2)],
        };
        assert_eq!(
            c.back(),
            Conversation::ManagerEndDate {
                client: client(),
                item_id: 2,
                start_date: day(1),
            }
        );
        let single = Conversation::ManagerComment {
            client: client(),
            item_id: 2,
            date_type: DateType::Single,
            dates: vec![day(4)],
        };
        assert_eq!(single.back().step(), Step::ManagerWaitingSingleDate);
    }
}
