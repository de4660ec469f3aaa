use crate::models::CallIntent;
use crate::services::normalizer::Outcome;

/// Keyword classification of a finished call. A transcript that produced a
/// reservation (or a staged one) always counts as a reservation intent.
pub fn classify(transcript: &str, outcome: &Outcome) -> CallIntent {
    if matches!(outcome, Outcome::Ready(_) | Outcome::Staged { .. }) {
        return CallIntent::NewReservation;
    }

    let lower = transcript.to_lowercase();
    if lower.contains("cancel") {
        CallIntent::Cancellation
    } else if lower.contains("change") || lower.contains("reschedule") {
        CallIntent::Modification
    } else if lower.contains("menu") || lower.contains("food") {
        CallIntent::MenuInquiry
    } else if lower.contains("hours") || lower.contains("open") {
        CallIntent::HoursInquiry
    } else {
        CallIntent::GeneralInquiry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reservation_outcome_wins() {
        let outcome = Outcome::Staged {
            reason: "time missing".to_string(),
        };
        // "cancel" appears, but a staged reservation takes precedence
        assert_eq!(
            classify("i want to cancel... actually book a table", &outcome),
            CallIntent::NewReservation
        );
    }

    #[test]
    fn test_keyword_fallbacks() {
        let none = Outcome::NoReservation;
        assert_eq!(
            classify("please cancel my booking", &none),
            CallIntent::Cancellation
        );
        assert_eq!(
            classify("can i reschedule to later", &none),
            CallIntent::Modification
        );
        assert_eq!(classify("do you have vegan food", &none), CallIntent::MenuInquiry);
        assert_eq!(classify("when are you open", &none), CallIntent::HoursInquiry);
        assert_eq!(classify("hello there", &none), CallIntent::GeneralInquiry);
    }
}
