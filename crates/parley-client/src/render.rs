use chrono::TimeZone;
use parley_types::events::Notice;
use parley_types::models::{CulturalAnalysis, MessageStatus};
use parley_view::{BubbleFlags, ListItem, TranslationController};

pub fn thread<Tz: TimeZone>(
    rows: &[(ListItem, BubbleFlags)],
    translations: &TranslationController,
    viewer: &str,
    tz: &Tz,
) where
    Tz::Offset: std::fmt::Display,
{
    if rows.is_empty() {
        println!("(no messages)");
        return;
    }

    for (item, flags) in rows {
        match item {
            ListItem::Date(day) => println!("\n──── {} ────", day.format("%a, %-d %b %Y")),
            ListItem::UnreadCount(n) => println!("──── {} new message{} ────", n, if *n == 1 { "" } else { "s" }),
            ListItem::Message(m) => {
                if flags.show_sender_name {
                    println!("  {}", m.sender_name.as_deref().unwrap_or(&m.sender_id));
                }
                let who = if m.is_from(viewer) { ">" } else { "<" };
                if m.deleted_for_everyone {
                    println!("{} (message deleted)", who);
                    continue;
                }

                let display = translations.display(m);
                let mut line = format!("{} {}", who, display.primary);
                if flags.show_timestamp {
                    if let Some(at) = m.sent_at() {
                        line.push_str(&format!("  [{}]", at.with_timezone(tz).format("%H:%M")));
                    }
                }
                match m.status {
                    MessageStatus::Sending => line.push_str(" …"),
                    MessageStatus::Failed => line.push_str(" (failed)"),
                    _ => {}
                }
                println!("{}", line);
                if let Some(secondary) = display.secondary {
                    println!("    ↳ {}", secondary);
                }
            }
        }
    }
}

pub fn cultural(analysis: &CulturalAnalysis) {
    if let Some(explanation) = &analysis.message_explanation {
        println!("{}", explanation);
    }
    for phrase in analysis.cultural_phrases.iter().chain(&analysis.slang_terms) {
        match &phrase.literal_meaning {
            Some(literal) => println!("  • {} ({}): {}", phrase.phrase, literal, phrase.explanation),
            None => println!("  • {}: {}", phrase.phrase, phrase.explanation),
        }
    }
    if analysis.is_empty() {
        println!("Nothing culturally specific found.");
    }
}

pub fn notice(notice: &Notice) {
    match notice {
        Notice::Alert { title, message } => eprintln!("{}: {}", title, message),
        Notice::RemovedFromChat { chat_name, chat_id } => eprintln!(
            "You are no longer a member of {}",
            chat_name.as_deref().unwrap_or(chat_id)
        ),
    }
}
