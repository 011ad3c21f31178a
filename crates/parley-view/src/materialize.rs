//! Turns a flat, unordered message collection into the renderable thread.

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use parley_types::models::Message;
use tracing::debug;

/// One row of the rendered thread. Derived on every change, never stored.
#[derive(Debug, Clone, PartialEq)]
pub enum ListItem {
    Message(Message),
    /// Separator before the first message of a calendar day
    Date(NaiveDate),
    /// "N new messages" divider before the first unread message
    UnreadCount(usize),
}

impl ListItem {
    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Self::Message(m) => Some(m),
            _ => None,
        }
    }

    /// Stable key for list diffing.
    pub fn key(&self) -> String {
        match self {
            Self::Message(m) => format!("msg-{}", m.id),
            Self::Date(day) => format!("date-{}", day.format("%Y-%m-%d")),
            Self::UnreadCount(_) => "unread".to_string(),
        }
    }
}

/// Materialize using the device's local calendar.
pub fn materialize<'a, I>(messages: I) -> Vec<ListItem>
where
    I: IntoIterator<Item = &'a Message>,
{
    materialize_in(messages, &Local)
}

/// Sort by timestamp and insert a date separator at every calendar-day change
/// in `tz`. Messages whose timestamp does not resolve are dropped.
pub fn materialize_in<'a, I, Tz>(messages: I, tz: &Tz) -> Vec<ListItem>
where
    I: IntoIterator<Item = &'a Message>,
    Tz: TimeZone,
{
    let mut dropped = 0usize;
    let mut dated: Vec<(DateTime<Utc>, &Message)> = messages
        .into_iter()
        .filter_map(|m| {
            let at = m.sent_at();
            if at.is_none() {
                dropped += 1;
            }
            at.map(|t| (t, m))
        })
        .collect();

    if dropped > 0 {
        debug!(dropped, "dropping messages with unreadable timestamps");
    }

    // Stable: equal timestamps keep arrival order.
    dated.sort_by_key(|(t, _)| *t);

    let mut items = Vec::with_capacity(dated.len() + dated.len() / 8 + 1);
    let mut current_day: Option<NaiveDate> = None;
    for (at, msg) in dated {
        let day = at.with_timezone(tz).date_naive();
        if current_day != Some(day) {
            items.push(ListItem::Date(day));
            current_day = Some(day);
        }
        items.push(ListItem::Message(msg.clone()));
    }
    items
}

/// Like [`materialize_in`], plus an unread divider before the first of the
/// trailing `unread` messages. Counts larger than the thread are clamped.
pub fn materialize_with_unread<'a, I, Tz>(messages: I, unread: usize, tz: &Tz) -> Vec<ListItem>
where
    I: IntoIterator<Item = &'a Message>,
    Tz: TimeZone,
{
    let mut items = materialize_in(messages, tz);
    if unread == 0 {
        return items;
    }

    let total = items.iter().filter(|i| i.as_message().is_some()).count();
    let unread = unread.min(total);
    if unread == 0 {
        return items;
    }

    let first_unread = total - unread;
    let position = items
        .iter()
        .enumerate()
        .filter(|(_, item)| item.as_message().is_some())
        .nth(first_unread)
        .map(|(idx, _)| idx);

    if let Some(idx) = position {
        items.insert(idx, ListItem::UnreadCount(unread));
    }
    items
}

/// Messages the viewer has not deleted for themselves.
pub fn visible_messages<'a>(messages: &'a [Message], viewer_id: &'a str) -> impl Iterator<Item = &'a Message> + 'a {
    messages.iter().filter(move |m| m.is_visible_to(viewer_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDateTime};
    use parley_types::models::RawTimestamp;

    fn at(s: &str) -> i64 {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
            .unwrap()
            .and_utc()
            .timestamp_millis()
    }

    fn msg(id: &str, sender: &str, ts: i64) -> Message {
        Message::text(id, "c1", sender, ts, format!("body {id}"))
    }

    fn ids(items: &[ListItem]) -> Vec<String> {
        items.iter().map(ListItem::key).collect()
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn single_day_thread() {
        let messages = vec![
            msg("c", "user2", at("2024-03-05 10:02:00")),
            msg("a", "user1", at("2024-03-05 10:00:00")),
            msg("b", "user1", at("2024-03-05 10:00:30")),
        ];
        let items = materialize_in(&messages, &Utc);
        assert_eq!(items.len(), 4);
        assert_eq!(items[0], ListItem::Date(day("2024-03-05")));
        assert_eq!(ids(&items[1..]), vec!["msg-a", "msg-b", "msg-c"]);
    }

    #[test]
    fn one_separator_per_calendar_day_in_order() {
        let messages = vec![
            msg("d2b", "u1", at("2024-03-06 09:00:00")),
            msg("d1a", "u1", at("2024-03-05 08:00:00")),
            msg("d3a", "u2", at("2024-03-08 23:59:59")),
            msg("d2a", "u2", at("2024-03-06 00:00:00")),
            msg("d1b", "u2", at("2024-03-05 23:59:59")),
        ];
        let items = materialize_in(&messages, &Utc);

        assert_eq!(
            ids(&items),
            vec![
                "date-2024-03-05",
                "msg-d1a",
                "msg-d1b",
                "date-2024-03-06",
                "msg-d2a",
                "msg-d2b",
                "date-2024-03-08",
                "msg-d3a",
            ]
        );

        let stamps: Vec<i64> = items
            .iter()
            .filter_map(ListItem::as_message)
            .filter_map(|m| m.timestamp.millis())
            .collect();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn calendar_day_follows_time_zone() {
        // 23:30 UTC on the 5th is already the 6th at UTC+2.
        let messages = vec![
            msg("a", "u1", at("2024-03-05 21:00:00")),
            msg("b", "u1", at("2024-03-05 23:30:00")),
        ];
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();

        let utc_items = materialize_in(&messages, &Utc);
        assert_eq!(utc_items.iter().filter(|i| matches!(i, ListItem::Date(_))).count(), 1);

        let local_items = materialize_in(&messages, &plus_two);
        assert_eq!(
            ids(&local_items),
            vec!["date-2024-03-05", "msg-a", "date-2024-03-06", "msg-b"]
        );
    }

    #[test]
    fn unreadable_timestamps_are_dropped() {
        let mut broken = msg("x", "u1", 0);
        broken.timestamp = RawTimestamp::Text("not-a-date".into());
        let mut overflow = msg("y", "u1", 0);
        overflow.timestamp = RawTimestamp::Millis(i64::MAX);

        let messages = vec![
            msg("a", "u1", at("2024-03-05 10:00:00")),
            broken,
            msg("b", "u2", at("2024-03-05 11:00:00")),
            overflow,
        ];
        let items = materialize_in(&messages, &Utc);
        assert_eq!(items.iter().filter(|i| i.as_message().is_some()).count(), 2);
        assert_eq!(ids(&items), vec!["date-2024-03-05", "msg-a", "msg-b"]);
    }

    #[test]
    fn equal_timestamps_keep_input_order() {
        let t = at("2024-03-05 10:00:00");
        let messages = vec![msg("first", "u1", t), msg("second", "u2", t)];
        let items = materialize_in(&messages, &Utc);
        assert_eq!(ids(&items[1..]), vec!["msg-first", "msg-second"]);
    }

    #[test]
    fn rerunning_is_idempotent() {
        let messages = vec![
            msg("b", "u1", at("2024-03-06 10:00:00")),
            msg("a", "u1", at("2024-03-05 10:00:00")),
        ];
        assert_eq!(materialize_in(&messages, &Utc), materialize_in(&messages, &Utc));
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(materialize_in(&Vec::<Message>::new(), &Utc).is_empty());
    }

    #[test]
    fn unread_divider_precedes_first_unread() {
        let messages = vec![
            msg("a", "u1", at("2024-03-05 10:00:00")),
            msg("b", "u2", at("2024-03-06 10:00:00")),
            msg("c", "u2", at("2024-03-06 10:01:00")),
        ];
        let items = materialize_with_unread(&messages, 2, &Utc);
        assert_eq!(
            ids(&items),
            vec!["date-2024-03-05", "msg-a", "date-2024-03-06", "unread", "msg-b", "msg-c"]
        );
        assert_eq!(items[3], ListItem::UnreadCount(2));

        let clamped = materialize_with_unread(&messages, 10, &Utc);
        assert_eq!(clamped[1], ListItem::UnreadCount(3));

        assert_eq!(materialize_with_unread(&messages, 0, &Utc), materialize_in(&messages, &Utc));
    }

    #[test]
    fn deleted_for_viewer_is_hidden() {
        let mut hidden = msg("a", "u1", at("2024-03-05 10:00:00"));
        hidden.deleted_for.push("me".into());
        let messages = vec![hidden, msg("b", "u1", at("2024-03-05 10:01:00"))];

        let items = materialize_in(visible_messages(&messages, "me"), &Utc);
        assert_eq!(ids(&items), vec!["date-2024-03-05", "msg-b"]);
    }
}
