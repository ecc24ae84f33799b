use chrono::{DateTime, Utc};

use tweetwatch_common::{Record, Target, TargetKind};

/// Transport-shaped message: a title, a body, a permalink, metric fields,
/// and an optional image. Built once per record; backends map it onto their
/// own wire format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedMessage {
    pub title: String,
    pub body: String,
    pub url: String,
    pub fields: Vec<MessageField>,
    pub timestamp: DateTime<Utc>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageField {
    pub name: String,
    pub value: String,
}

impl MessageField {
    fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

/// Pure function of `(record, target)` — no clock, no I/O.
pub fn format_message(record: &Record, target: &Target) -> FormattedMessage {
    let title = match target.kind {
        TargetKind::Profile => format!("New post from @{}", record.payload.handle),
        TargetKind::Hashtag => format!("New post in #{}", target.locator),
    };

    FormattedMessage {
        title,
        body: record.payload.text.clone(),
        url: record.external_id.clone(),
        fields: vec![
            MessageField::new("Likes", &record.payload.likes),
            MessageField::new("Reposts", &record.payload.reposts),
            MessageField::new("Replies", &record.payload.replies),
        ],
        timestamp: record.occurred_at,
        image_url: record.payload.media_url.clone(),
    }
}
