// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Static dialogue scripts per service: question sequences, prompts, and
//! ticket summary rendering. Copy text is data, not logic.

use tessera_core::ServiceKind;

/// One scripted question in a service dialogue.
#[derive(Debug, Clone, Copy)]
pub struct Question {
    pub key: &'static str,
    pub label: &'static str,
    pub prompt: &'static str,
}

/// The full script for one service's question dialogue.
#[derive(Debug, Clone, Copy)]
pub struct ServiceScript {
    pub service: ServiceKind,
    pub questions: &'static [Question],
    pub start_prompt: &'static str,
    pub continue_prompt: &'static str,
    /// Noun used in customer-facing ticket wording ("food order", "flight").
    pub ticket_label: &'static str,
}

const FOOD_QUESTIONS: &[Question] = &[
    Question {
        key: "name",
        label: "Name",
        prompt: "👤 First and last name?",
    },
    Question {
        key: "address",
        label: "Address",
        prompt: "📍 Delivery address?\n(street, city, zip)",
    },
    Question {
        key: "phone",
        label: "Phone",
        prompt: "📞 Phone number for the driver?",
    },
];

const FLIGHT_QUESTIONS: &[Question] = &[
    Question {
        key: "trip_dates",
        label: "Trip Dates",
        prompt: "📅 Trip Dates?",
    },
    Question {
        key: "passenger_form",
        label: "Passenger Info",
        prompt: "👤 Passenger full name and date of birth?",
    },
    Question {
        key: "residence",
        label: "State of residence",
        prompt: "📍 State of residence?",
    },
    Question {
        key: "order_total",
        label: "Total value",
        prompt: "💵 Total value of order?",
    },
    Question {
        key: "airlines",
        label: "Airlines",
        prompt: "✈️ What airlines?",
    },
];

const HOTEL_QUESTIONS: &[Question] = &[
    Question {
        key: "destination",
        label: "Destination",
        prompt: "📍 Destination city?",
    },
    Question {
        key: "dates",
        label: "Dates",
        prompt: "📅 Check-in and check-out dates?",
    },
    Question {
        key: "budget",
        label: "Budget",
        prompt: "💵 Budget range?",
    },
    Question {
        key: "email",
        label: "Email",
        prompt: "📧 Customer email for booking?",
    },
    Question {
        key: "booking_link",
        label: "Booking link",
        prompt: "🔗 Booking.com link (if any)?",
    },
    Question {
        key: "preferred_chain",
        label: "Preferred chain",
        prompt: "🏨 Preferred hotel chain (or none)?",
    },
];

const FOOD_SCRIPT: ServiceScript = ServiceScript {
    service: ServiceKind::Food,
    questions: FOOD_QUESTIONS,
    start_prompt: "🍔 Welcome! Pick a food option from the menu to get started.\nSend /start to see the menu again.",
    continue_prompt: "All set? Reply \"yes\" to connect with our workers.",
    ticket_label: "food order",
};

const FLIGHT_SCRIPT: ServiceScript = ServiceScript {
    service: ServiceKind::Flight,
    questions: FLIGHT_QUESTIONS,
    start_prompt: "✈️ Welcome! Answer a few questions and we will connect you with an agent.\nSend /start to begin.",
    continue_prompt: "All set? Reply \"yes\" to connect with our workers.",
    ticket_label: "flight",
};

const HOTEL_SCRIPT: ServiceScript = ServiceScript {
    service: ServiceKind::Hotel,
    questions: HOTEL_QUESTIONS,
    start_prompt: "🏨 Welcome! Share your trip details and we will connect you with an agent.\nSend /start to begin.",
    continue_prompt: "All set? Reply \"yes\" to connect with our workers.",
    ticket_label: "hotel",
};

pub fn script_for(service: ServiceKind) -> &'static ServiceScript {
    match service {
        ServiceKind::Food => &FOOD_SCRIPT,
        ServiceKind::Flight => &FLIGHT_SCRIPT,
        ServiceKind::Hotel => &HOTEL_SCRIPT,
    }
}

/// Food menu options: `(id, label)`, laid out two per row.
pub const FOOD_CATEGORIES: &[(&str, &str)] = &[
    ("fast_food", "🔴 Fast Food Pickup 55% off"),
    ("meal_kits", "🥑 Meal Kits"),
    ("sonic_combo", "🔴 Sonic | 🍗 Zaxby's | 🥤 Smoothie King"),
    ("ihop_dennys", "🥞 IHOP/Dennys"),
    ("panera", "🥪 Panera"),
    ("wingstop", "🍗 WingStop"),
    ("panda", "🐼 Panda Express"),
    ("five_guys", "🍔 Five Guys"),
    ("pizza", "🍕 Pizza"),
    ("chipotle", "🌯 Chipotle"),
    ("cava", "🥗 Cava"),
    ("shake_shack", "🍔 Shake Shack"),
    ("canes", "🔴 Canes"),
    ("ubereats", "🚗 UberEats"),
    ("doordash", "🚗 Doordash"),
    ("grubhub", "🌭 Grubhub Delivery"),
    ("restaurants", "🍽️ Restaurants"),
    ("dine_in", "🍽️ Dine-In"),
    ("groceries", "🛒 Groceries"),
    ("movies", "🎬 Movies"),
    ("uber_rides", "🔴 Uber Rides"),
];

/// Label for a food category id.
pub fn food_category_label(id: &str) -> Option<&'static str> {
    FOOD_CATEGORIES
        .iter()
        .find(|(cid, _)| *cid == id)
        .map(|(_, label)| *label)
}

/// Render the worker-facing summary block for a ticket's answers, in the
/// script's question order, with `-` for unanswered fields.
pub fn service_summary(
    service: ServiceKind,
    category: &str,
    answers: &[(String, String)],
) -> String {
    let lookup = |key: &str| {
        answers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .unwrap_or("-")
            .to_string()
    };

    let mut lines = Vec::new();
    if service == ServiceKind::Food {
        lines.push(format!("Category: {category}"));
    }
    for question in script_for(service).questions {
        lines.push(format!("{}: {}", question.label, lookup(question.key)));
    }
    // Extra collected fields (e.g. subtotal) that are not scripted questions.
    for (key, value) in answers {
        if key == "subtotal" {
            lines.push(format!("Subtotal: {value}"));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn food_summary_includes_category_and_fields() {
        let answers = vec![
            ("name".to_string(), "Alice".to_string()),
            ("address".to_string(), "12 High St".to_string()),
            ("phone".to_string(), "555-0101".to_string()),
        ];
        let summary = service_summary(ServiceKind::Food, "🍕 Pizza", &answers);
        assert!(summary.starts_with("Category: 🍕 Pizza"));
        assert!(summary.contains("Name: Alice"));
        assert!(summary.contains("Phone: 555-0101"));
    }

    #[test]
    fn missing_answers_render_dashes() {
        let summary = service_summary(ServiceKind::Flight, "-", &[]);
        assert!(summary.contains("Trip Dates: -"));
        assert!(summary.contains("Airlines: -"));
        assert!(!summary.contains("Category"));
    }

    #[test]
    fn category_lookup() {
        assert_eq!(food_category_label("pizza"), Some("🍕 Pizza"));
        assert_eq!(food_category_label("nope"), None);
    }

    #[test]
    fn every_service_has_a_script() {
        for service in [ServiceKind::Food, ServiceKind::Flight, ServiceKind::Hotel] {
            let script = script_for(service);
            assert!(!script.questions.is_empty());
            assert_eq!(script.service, service);
        }
    }
}
