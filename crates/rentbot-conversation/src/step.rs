// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Step names as persisted in the `user_states.step` column.

use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Step {
    MainMenu,

    // End-user booking capture.
    SelectItem,
    WaitingDate,
    EnterName,
    PhoneNumber,
    Confirmation,

    // Manager booking on behalf of a client.
    ManagerWaitingClientName,
    ManagerWaitingClientPhone,
    ManagerWaitingItemSelection,
    ManagerWaitingDateType,
    ManagerWaitingSingleDate,
    ManagerWaitingStartDate,
    ManagerWaitingEndDate,
    ManagerWaitingComment,
    ManagerConfirmBooking,

    // Schedule inspection.
    ScheduleSelectItem,
    ViewSchedule,
    WaitingSpecificDate,
}

impl Step {
    pub fn is_manager_flow(self) -> bool {
        self.to_string().starts_with("manager_")
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn names_are_snake_case() {
        assert_eq!(Step::PhoneNumber.to_string(), "phone_number");
        assert_eq!(
            Step::from_str("manager_waiting_end_date").unwrap(),
            Step::ManagerWaitingEndDate
        );
        assert!(Step::from_str("nope").is_err());
    }

    #[test]
    fn manager_steps_are_flagged() {
        assert!(Step::ManagerConfirmBooking.is_manager_flow());
        assert!(!Step::Confirmation.is_manager_flow());
    }
}
