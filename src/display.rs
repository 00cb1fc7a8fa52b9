//! Terminal rendering for the interactive client
//!
//! Simple line-oriented output; all the interesting state lives in the
//! session and capture modules.

use crate::backend::CustomerRecord;

pub(crate) fn banner() {
    println!("callassist - call assistance client");
    println!("{}", help_text());
}

pub(crate) fn help_text() -> &'static str {
    "commands:\n  lookup <phone>   look up a customer\n  record           start or stop recording\n  recs             negotiation recommendations\n  summary          post-call analysis\n  help             show this help\n  quit             exit"
}

pub(crate) fn notice(message: &str) {
    println!("{}", message);
}

pub(crate) fn customer_panel(record: &CustomerRecord) {
    println!("Customer: {}", record.customer_name);
    println!("  Email:         {}", record.email);
    println!("  Last purchase: {}", record.last_purchase_date);
    println!("  Total spend:   ${:.0}", record.purchase_history);
    println!("  Segment:       {}", record.customer_segment);
    if !record.interaction_history.is_empty() {
        println!("  Previous interactions:");
        for interaction in &record.interaction_history {
            println!("    - {}", interaction);
        }
    }
}

pub(crate) fn live_partial(text: &str) {
    if !text.is_empty() {
        println!("  ... {}", text);
    }
}

pub(crate) fn live_transcript(text: &str) {
    println!("  >>> {}", text);
}

pub(crate) fn analysis(text: &str) {
    println!("Analysis:");
    for line in text.lines() {
        println!("  {}", line);
    }
}

pub(crate) fn recommendations(items: &[String]) {
    println!("Negotiation recommendations:");
    if items.is_empty() {
        println!("  (none available)");
        return;
    }
    for item in items {
        println!("  - {}", item);
    }
}

pub(crate) fn post_call(text: &str) {
    println!("Post-call analysis:");
    for line in text.lines() {
        println!("  {}", line);
    }
}
