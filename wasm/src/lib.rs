//! WebAssembly module for the Practice Journal
//!
//! Lets the browser preview a week's score while the student is still typing,
//! using the same rules the server applies:
//! - Base points and consistency bonus
//! - Whole-week score previews
//! - Phone number checks before requesting parent approval
//! - Week anchoring for the school's configured start day

use chrono::NaiveDate;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::log_1(&"practice-journal-wasm loaded".into());
}

/// Base points for a weekly minute total
#[wasm_bindgen]
pub fn calculate_base_points(total_minutes: i32) -> i32 {
    base_points(total_minutes)
}

/// Consistency bonus for the number of days practiced
#[wasm_bindgen]
pub fn calculate_bonus_points(days_with_practice: i32) -> i32 {
    bonus_points(days_with_practice)
}

/// Score a week given as JSON minutes (`{"monday_minutes": 30, ...}`).
///
/// Returns the score as JSON.
#[wasm_bindgen]
pub fn score_week_preview(minutes_json: &str, signed: bool) -> Result<String, JsValue> {
    let minutes: WeeklyMinutes = serde_json::from_str(minutes_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid minutes JSON: {}", e)))?;

    for day in PracticeDay::ALL {
        validate_daily_minutes(minutes.get(day))
            .map_err(|e| JsValue::from_str(&format!("{}: {}", day, e)))?;
    }

    let score = score_week(&minutes, signed);
    serde_json::to_string(&score).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Check a parent phone number before sending an approval request
#[wasm_bindgen]
pub fn is_valid_phone_number(phone: &str) -> bool {
    validate_phone_number(phone).is_ok()
}

/// Start (YYYY-MM-DD) of the week containing `date`
#[wasm_bindgen]
pub fn week_start(date: &str, week_start_day: i16) -> Result<String, JsValue> {
    let date: NaiveDate = date
        .parse()
        .map_err(|_| JsValue::from_str("Invalid date format. Use YYYY-MM-DD"))?;
    Ok(week_start_for(date, week_start_day).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_helpers() {
        assert_eq!(calculate_base_points(19), 35);
        assert_eq!(calculate_base_points(100), 80);
        assert_eq!(calculate_bonus_points(5), 5);
        assert_eq!(calculate_bonus_points(2), 0);
    }

    #[test]
    fn test_score_week_preview() {
        let json = r#"{
            "monday_minutes": 20, "tuesday_minutes": 20, "wednesday_minutes": 20,
            "thursday_minutes": 20, "friday_minutes": 20,
            "saturday_minutes": 0, "sunday_minutes": 0
        }"#;
        let score: PracticeScore =
            serde_json::from_str(&score_week_preview(json, false).unwrap()).unwrap();
        assert_eq!(score.total_minutes, 100);
        assert_eq!(score.total_points, 85);
    }

    #[test]
    fn test_score_partial_week_preview() {
        let score: PracticeScore =
            serde_json::from_str(&score_week_preview(r#"{"monday_minutes": 30}"#, false).unwrap())
                .unwrap();
        assert_eq!(score.total_minutes, 30);
        assert_eq!(score.days_with_practice, 1);
    }

    #[test]
    fn test_phone_check() {
        assert!(is_valid_phone_number("(555) 123-4567"));
        assert!(!is_valid_phone_number("nope"));
    }

    #[test]
    fn test_week_start() {
        assert_eq!(week_start("2024-03-13", 1).unwrap(), "2024-03-11");
    }
}
