//! Calendar helpers shared by sorting, validation and export.

use chrono::{Datelike, NaiveDate};

/// Whole years elapsed from `birth` to `today`.
///
/// The year only counts once the birthday has been reached, so someone born
/// on 2019-06-15 is 4 on 2024-06-14 and 5 on 2024-06-15.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}

/// `dd/mm/yyyy`, the pt-BR display form.
pub fn format_br(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}
