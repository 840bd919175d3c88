//! Delivery channel adapters for overdue reminders.

mod http_gateway;
mod logging;

pub use http_gateway::{EmailGatewayPayload, HttpEmailGateway};
pub use logging::LoggingDeliveryChannel;

use crate::domain::ports::DeliveryRequest;

/// Subject line used for every reminder.
pub const REMINDER_SUBJECT: &str = "Overdue library loan";

/// Plain-text reminder body.
pub fn render_reminder(request: &DeliveryRequest) -> String {
    format!(
        "Dear {name},\n\n\
         The loan period for \"{title}\" ended on {due}.\n\
         Please return the book to the library as soon as possible.\n\n\
         Kind regards,\nThe library",
        name = request.recipient_name,
        title = request.item_title,
        due = request.due_at.format("%d.%m.%Y"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    use crate::domain::{DeliveryContext, NotificationId};

    #[rstest]
    fn reminder_names_patron_title_and_due_date() {
        let request = DeliveryRequest::new(
            NotificationId::random(),
            DeliveryContext {
                recipient_email: "john.doe@example.com".to_owned(),
                recipient_name: "John Doe".to_owned(),
                item_title: "Effective Java".to_owned(),
                due_at: Utc
                    .with_ymd_and_hms(2026, 3, 4, 12, 0, 0)
                    .single()
                    .expect("valid time"),
            },
        );

        let body = render_reminder(&request);

        assert!(body.starts_with("Dear John Doe,"));
        assert!(body.contains("\"Effective Java\" ended on 04.03.2026"));
    }
}
