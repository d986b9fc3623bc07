//! Joins messages with the member directory and the authorized names, and
//! lays out one sheet of rows per eligible sender.

use std::collections::BTreeMap;

use crate::directory::AuthorizedName;
use crate::slack::{Member, Message};
use crate::window::{DATE_FORMAT, ReportWindow, TIME_FORMAT, ts_sort_key, ts_to_local};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub date: String,
    pub time: String,
    pub text: String,
    /// Slack `ts` the row came from
    pub ts: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSheet {
    /// Sender's real name; sanitized for the file format at write time
    pub name: String,
    pub sender_id: String,
    pub rows: Vec<ReportRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub month: String,
    pub sheets: Vec<ReportSheet>,
}

/// Sorts by timestamp, then partitions by sender keeping that order.
pub fn group_by_sender(messages: &[Message]) -> BTreeMap<String, Vec<Message>> {
    let mut sorted = messages.to_vec();
    sorted.sort_by_key(|m| ts_sort_key(&m.ts));

    let mut groups: BTreeMap<String, Vec<Message>> = BTreeMap::new();
    for message in sorted {
        groups
            .entry(message.sender_id.clone())
            .or_default()
            .push(message);
    }
    groups
}

pub fn is_authorized(real_name: &str, names: &[AuthorizedName]) -> bool {
    names.iter().any(|n| real_name.starts_with(&n.name))
}

fn find_member<'m>(members: &'m [Member], sender_id: &str) -> Option<&'m Member> {
    members.iter().find(|m| m.id == sender_id)
}

fn render_rows(messages: &[Message], window: &ReportWindow) -> Vec<ReportRow> {
    let offset = window.offset();
    messages
        .iter()
        .filter_map(|message| {
            let Some(moment) = ts_to_local(&message.ts, offset) else {
                tracing::warn!(
                    ts = %message.ts,
                    sender = %message.sender_id,
                    "skipping message with unparseable timestamp"
                );
                return None;
            };
            if moment < window.start {
                return None;
            }
            Some(ReportRow {
                date: moment.format(DATE_FORMAT).to_string(),
                time: moment.format(TIME_FORMAT).to_string(),
                text: message.text.clone(),
                ts: message.ts.clone(),
            })
        })
        .collect()
}

pub fn build_report(
    messages: &[Message],
    members: &[Member],
    authorized: &[AuthorizedName],
    window: &ReportWindow,
) -> Report {
    let mut sheets = Vec::new();

    for (sender_id, group) in group_by_sender(messages) {
        let Some(member) = find_member(members, &sender_id) else {
            tracing::debug!(
                sender = %sender_id,
                messages = group.len(),
                "sender not in directory, skipping"
            );
            continue;
        };
        if !is_authorized(&member.real_name, authorized) {
            tracing::debug!(
                sender = %sender_id,
                real_name = %member.real_name,
                "sender not authorized, skipping"
            );
            continue;
        }

        let rows = render_rows(&group, window);
        tracing::debug!(sheet = %member.real_name, rows = rows.len(), "built sheet");
        sheets.push(ReportSheet {
            name: member.real_name.clone(),
            sender_id,
            rows,
        });
    }

    if sheets.is_empty() {
        tracing::warn!(
            month = %window.month_key(),
            "no authorized sender posted in the window; report will be empty"
        );
    }

    Report {
        month: window.month_key(),
        sheets,
    }
}
