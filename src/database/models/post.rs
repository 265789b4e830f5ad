use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub post_date: DateTime<Utc>,
    pub post_type: String,
    pub summary: String,
    pub source_urls: Vec<String>,
    pub contexts: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Strip HTML tags, keeping text content. Summaries are stored tag-free.
pub fn strip_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_keeps_text() {
        assert_eq!(strip_html("<p>Hello <b>world</b></p>"), "Hello world");
        assert_eq!(strip_html("plain text"), "plain text");
        assert_eq!(strip_html("<div class=\"x\">a</div>"), "a");
    }

    #[test]
    fn unterminated_tag_drops_remainder() {
        assert_eq!(strip_html("before <broken"), "before");
    }

    #[test]
    fn empty_input_is_empty() {
        assert_eq!(strip_html(""), "");
    }
}
