//! Default scripts and trigger rules

use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::models::{ChatType, NewBotMessage, TriggerRuleUpdate};
use crate::storage::Database;

/// What `seed_defaults` wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub messages_created: usize,
    pub rules_created: usize,
}

fn entry(chat_type: ChatType, key: &str, step: u32, content: &str, content_bn: &str) -> NewBotMessage {
    NewBotMessage {
        chat_type,
        message_key: key.to_string(),
        step_number: step,
        content: content.to_string(),
        content_alt: Some(content_bn.to_string()),
        display_order: Some(i64::from(step)),
    }
}

/// The stock three step scripts for both chat types
pub fn default_catalog() -> Vec<NewBotMessage> {
    vec![
        entry(
            ChatType::LiveChat,
            "live_chat_welcome",
            1,
            "Welcome to the City Desk live chat! How can we help you today?",
            "সিটি ডেস্ক লাইভ চ্যাটে স্বাগতম! আজ আমরা আপনাকে কিভাবে সাহায্য করতে পারি?",
        ),
        entry(
            ChatType::LiveChat,
            "live_chat_team_response",
            2,
            "Our team will respond shortly. You can send text, images, or voice messages.",
            "আমাদের টিম শীঘ্রই উত্তর দেবে। আপনি টেক্সট, ছবি বা ভয়েস মেসেজ পাঠাতে পারেন।",
        ),
        entry(
            ChatType::LiveChat,
            "live_chat_office_hours",
            3,
            "Office hours: Saturday to Thursday, 9 AM - 5 PM",
            "অফিস সময়: শনিবার থেকে বৃহস্পতিবার, সকাল ৯টা - বিকাল ৫টা",
        ),
        entry(
            ChatType::ComplaintChat,
            "complaint_chat_received",
            1,
            "Your complaint has been received and is being reviewed.",
            "আপনার অভিযোগ গ্রহণ করা হয়েছে এবং পর্যালোচনা করা হচ্ছে।",
        ),
        entry(
            ChatType::ComplaintChat,
            "complaint_chat_working",
            2,
            "Our team is working on your complaint. We will update you soon.",
            "আমাদের টিম আপনার অভিযোগে কাজ করছে। আমরা শীঘ্রই আপডেট দেব।",
        ),
        entry(
            ChatType::ComplaintChat,
            "complaint_chat_patience",
            3,
            "Please wait while we process your complaint. Thank you for your patience.",
            "আপনার অভিযোগ প্রক্রিয়া করার সময় অনুগ্রহ করে অপেক্ষা করুন। আপনার ধৈর্যের জন্য ধন্যবাদ।",
        ),
    ]
}

/// Install any missing default messages and trigger rules.
///
/// Only absent entries are written; edited, parked or replaced stock
/// messages and changed rules are left as they are.
#[instrument(skip(db))]
pub fn seed_defaults(db: &Database) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    let messages = db.bot_messages();
    for message in default_catalog() {
        if let Some(holder) = messages.message_for_step(message.chat_type, message.step_number)? {
            debug!(
                message_key = %message.message_key,
                holder = %holder.message_key,
                "Step already scripted, skipping default"
            );
            continue;
        }
        if messages.create_if_absent(&message)?.is_some() {
            report.messages_created += 1;
        }
    }

    let rules = db.trigger_rules();
    for &chat_type in ChatType::all() {
        if rules.get(chat_type)?.is_none() {
            rules.upsert(chat_type, &TriggerRuleUpdate::default())?;
            report.rules_created += 1;
        }
    }

    info!(
        messages = report.messages_created,
        rules_created = report.rules_created,
        "Seeded default bot scripts"
    );
    Ok(report)
}
