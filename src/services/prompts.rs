use chrono::NaiveDateTime;

use crate::models::Business;

/// Build the system prompt the voice agent runs with for one business.
/// The current date/time is embedded so the agent can talk about "tomorrow"
/// sensibly; the backend still re-anchors relative dates itself.
pub fn build_system_prompt(business: &Business, now: NaiveDateTime) -> String {
    let current_date = now.format("%A, %d %B %Y");
    let current_time = now.format("%H:%M");

    let collect_block = if business.business_type.to_lowercase().contains("restaurant") {
        "Naturally collect: guest name, reservation date, time, number of guests, \
         phone number, and special requests (ask only once)."
    } else {
        "Naturally collect: name, date, time, phone number, and guest count. \
         Ask for special requests once."
    };

    format!(
        "ROLE:\n\
         You are a warm, natural-sounding voice agent for {name} ({business_type}).\n\n\
         SERVER DATE/TIME:\n\
         - Today: {current_date}\n\
         - Local time: {current_time}\n\n\
         BUSINESS INFO:\n\
         - Address: {address}\n\
         - Description: {description}\n\
         - Policies: {policies}\n\n\
         GREETING:\n\
         {greeting}\n\n\
         {collect_block}\n\n\
         EXECUTION RULES:\n\
         - Keep the conversation natural and ask only necessary questions.\n\
         - Never output JSON and never say the reservation is confirmed or stored.\n\
         - End politely once all details are collected; the backend saves the \
         reservation after the call ends.",
        name = business.name,
        business_type = business.business_type,
        address = business.address,
        description = business.description,
        policies = business.policies,
        greeting = business.greeting,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn business() -> Business {
        Business {
            id: "biz-1".to_string(),
            name: "Trattoria Roma".to_string(),
            phone: "15551234567".to_string(),
            owner_id: "user-1".to_string(),
            business_type: "restaurant".to_string(),
            address: "1 Main St".to_string(),
            policies: "No-show fee applies".to_string(),
            greeting: "Hi, thanks for calling Trattoria Roma!".to_string(),
            description: "Family-run Italian kitchen".to_string(),
            created_at: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_prompt_embeds_business_and_date() {
        let now = NaiveDate::from_ymd_opt(2025, 6, 16)
            .unwrap()
            .and_hms_opt(18, 30, 0)
            .unwrap();
        let prompt = build_system_prompt(&business(), now);
        assert!(prompt.contains("Trattoria Roma"));
        assert!(prompt.contains("Monday, 16 June 2025"));
        assert!(prompt.contains("18:30"));
        assert!(prompt.contains("number of guests"));
        assert!(prompt.contains("No-show fee applies"));
    }
}
