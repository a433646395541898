use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::LazyLock;

use lumdash_db::models::{Program, ReservedGearItem, Table};
use regex::Regex;
use serde::Serialize;

use crate::reservation::format_day;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextSection {
    Schedule,
    Crew,
    Gear,
    Tasks,
    Travel,
    CardLog,
    Shotlists,
}

impl ContextSection {
    pub const ALL: [ContextSection; 7] = [
        ContextSection::Schedule,
        ContextSection::Crew,
        ContextSection::Gear,
        ContextSection::Tasks,
        ContextSection::Travel,
        ContextSection::CardLog,
        ContextSection::Shotlists,
    ];

    fn title(self) -> &'static str {
        match self {
            ContextSection::Schedule => "Schedule",
            ContextSection::Crew => "Crew",
            ContextSection::Gear => "Gear",
            ContextSection::Tasks => "Tasks",
            ContextSection::Travel => "Travel",
            ContextSection::CardLog => "Card log",
            ContextSection::Shotlists => "Shotlists",
        }
    }
}

static SECTION_PATTERNS: LazyLock<Vec<(ContextSection, Regex)>> = LazyLock::new(|| {
    [
        (
            ContextSection::Schedule,
            r"(?i)\b(schedul\w*|times?|when|programs?|agenda|sessions?|start\w*|ends?|today|tomorrow)\b",
        ),
        (
            ContextSection::Crew,
            r"(?i)\b(crew|teams?|who|staff\w*|photographers?|videographers?|roles?|shifts?)\b",
        ),
        (
            ContextSection::Gear,
            r"(?i)\b(gear|equipment|cameras?|lens\w*|kits?|inventory|pack\w*)\b",
        ),
        (
            ContextSection::Tasks,
            r"(?i)\b(tasks?|todos?|to-dos?|deadlines?|due|assign\w*)\b",
        ),
        (
            ContextSection::Travel,
            r"(?i)\b(travel\w*|flights?|hotels?|trains?|arriv\w*|depart\w*|accommodations?)\b",
        ),
        (
            ContextSection::CardLog,
            r"(?i)\b(cards?|card\s?log|footage|offload\w*|media)\b",
        ),
        (
            ContextSection::Shotlists,
            r"(?i)\b(shots?|shot\s?lists?|coverage)\b",
        ),
    ]
    .into_iter()
    .map(|(section, pattern)| (section, Regex::new(pattern).expect("section pattern compiles")))
    .collect()
});

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "was", "what", "when", "where", "which", "who", "with", "this",
    "that", "there", "have", "has", "our", "your", "you", "does", "about", "from", "into", "any",
    "all", "can", "will", "how", "many", "much", "show", "tell", "list", "give", "please",
];

/// Sections whose keywords appear in `query`. A query that matches nothing
/// gets every section.
pub fn select_sections(query: &str) -> Vec<ContextSection> {
    let matched: Vec<ContextSection> = SECTION_PATTERNS
        .iter()
        .filter(|(_, pattern)| pattern.is_match(query))
        .map(|(section, _)| *section)
        .collect();

    if matched.is_empty() {
        ContextSection::ALL.to_vec()
    } else {
        matched
    }
}

/// Lowercased alphanumeric words of `text`, minus stop words and anything
/// shorter than three characters.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() >= 3)
        .map(str::to_lowercase)
        .filter(|word| !STOP_WORDS.contains(&word.as_str()))
        .collect()
}

#[derive(Debug, Clone, Copy)]
pub struct ContextLimits {
    pub max_schedule_items: usize,
    pub max_section_items: usize,
}

#[derive(Debug, Clone)]
pub struct ScheduledProgram<'a> {
    pub date: &'a str,
    pub program: &'a Program,
    pub score: usize,
}

/// Picks the `cap` schedule entries that share the most words with
/// `query`. Ties, and the all-zero case, fall back to chronological order.
/// The result is returned in chronological order.
pub fn rank_schedule<'a>(table: &'a Table, query: &str, cap: usize) -> Vec<ScheduledProgram<'a>> {
    let query_tokens: HashSet<String> = tokenize(query).into_iter().collect();

    let mut entries: Vec<ScheduledProgram<'a>> = table
        .program_schedule
        .iter()
        .flat_map(|day| {
            day.programs.iter().map(move |program| ScheduledProgram {
                date: day.date.as_str(),
                program,
                score: 0,
            })
        })
        .collect();
    entries.sort_by(|a, b| chronological_key(a).cmp(&chronological_key(b)));

    for entry in &mut entries {
        let haystack = tokenize(&program_haystack(entry.date, entry.program));
        entry.score = query_tokens
            .iter()
            .filter(|token| haystack.iter().any(|word| word.starts_with(token.as_str())))
            .count();
    }

    // Stable sort keeps chronological order among equal scores.
    entries.sort_by(|a, b| b.score.cmp(&a.score));
    entries.truncate(cap);
    entries.sort_by(|a, b| chronological_key(a).cmp(&chronological_key(b)));
    entries
}

fn chronological_key<'a>(entry: &ScheduledProgram<'a>) -> (&'a str, &'a str) {
    (
        entry.date,
        entry.program.start_time.as_deref().unwrap_or(""),
    )
}

fn program_haystack(date: &str, program: &Program) -> String {
    [
        Some(date),
        Some(program.name.as_str()),
        program.location.as_deref(),
        program.photographer.as_deref(),
        program.notes.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ")
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatContext {
    pub sections: Vec<ContextSection>,
    pub text: String,
}

/// Serializes the parts of `table` that `query` asks about into plain text
/// for the assistant prompt.
pub fn build_context(
    table: &Table,
    gear: &[ReservedGearItem],
    query: &str,
    limits: &ContextLimits,
) -> ChatContext {
    let sections = select_sections(query);
    let mut text = String::new();

    write_general(&mut text, table);

    for section in &sections {
        let _ = writeln!(text);
        match section {
            ContextSection::Schedule => write_schedule(&mut text, table, query, limits),
            ContextSection::Crew => write_crew(&mut text, table, limits),
            ContextSection::Gear => write_gear(&mut text, gear, limits),
            ContextSection::Tasks => write_tasks(&mut text, table, limits),
            ContextSection::Travel => write_travel(&mut text, table, limits),
            ContextSection::CardLog => write_card_log(&mut text, table, limits),
            ContextSection::Shotlists => write_shotlists(&mut text, table, limits),
        }
    }

    ChatContext { sections, text }
}

fn write_general(out: &mut String, table: &Table) {
    let general = &table.general;
    let _ = writeln!(out, "Event: {}", table.title);
    if let Some(client) = &general.client {
        let _ = writeln!(out, "Client: {client}");
    }
    if let Some(location) = &general.location {
        let _ = writeln!(out, "Location: {location}");
    }
    match (&general.start, &general.end) {
        (Some(start), Some(end)) => {
            let _ = writeln!(out, "Dates: {start} to {end}");
        }
        (Some(start), None) => {
            let _ = writeln!(out, "Date: {start}");
        }
        _ => {}
    }
    if let (Some(out_date), Some(in_date)) = (table.gear.check_out_date, table.gear.check_in_date)
    {
        let _ = writeln!(
            out,
            "Gear window: {} to {}",
            format_day(out_date),
            format_day(in_date)
        );
    }
    if let Some(notes) = &general.notes {
        let _ = writeln!(out, "Notes: {notes}");
    }
}

fn write_heading(out: &mut String, section: ContextSection, shown: usize, total: usize) {
    if shown < total {
        let _ = writeln!(out, "## {} (showing {shown} of {total})", section.title());
    } else {
        let _ = writeln!(out, "## {}", section.title());
    }
    if total == 0 {
        let _ = writeln!(out, "(none)");
    }
}

fn write_schedule(out: &mut String, table: &Table, query: &str, limits: &ContextLimits) {
    let total: usize = table.program_schedule.iter().map(|d| d.programs.len()).sum();
    let ranked = rank_schedule(table, query, limits.max_schedule_items);
    write_heading(out, ContextSection::Schedule, ranked.len(), total);

    for entry in ranked {
        let program = entry.program;
        let mut line = format!("- {}", entry.date);
        match (&program.start_time, &program.end_time) {
            (Some(start), Some(end)) => {
                let _ = write!(line, " {start}-{end}");
            }
            (Some(start), None) => {
                let _ = write!(line, " {start}");
            }
            _ => {}
        }
        let _ = write!(line, " {}", program.name);
        if let Some(location) = &program.location {
            let _ = write!(line, " @ {location}");
        }
        if let Some(photographer) = &program.photographer {
            let _ = write!(line, " (photographer: {photographer})");
        }
        if program.done {
            line.push_str(" [done]");
        }
        if let Some(notes) = &program.notes {
            let _ = write!(line, ". {notes}");
        }
        let _ = writeln!(out, "{line}");
    }
}

fn write_crew(out: &mut String, table: &Table, limits: &ContextLimits) {
    let rows = &table.rows;
    let shown = rows.len().min(limits.max_section_items);
    write_heading(out, ContextSection::Crew, shown, rows.len());

    for row in rows.iter().take(shown) {
        let mut line = format!("- {}", row.name);
        if let Some(role) = &row.role {
            let _ = write!(line, ", {role}");
        }
        if let Some(date) = &row.date {
            let _ = write!(line, ", {date}");
        }
        if let (Some(start), Some(end)) = (&row.start_time, &row.end_time) {
            let _ = write!(line, " {start}-{end}");
        }
        if let Some(notes) = &row.notes {
            let _ = write!(line, ". {notes}");
        }
        let _ = writeln!(out, "{line}");
    }
}

fn write_gear(out: &mut String, gear: &[ReservedGearItem], limits: &ContextLimits) {
    let shown = gear.len().min(limits.max_section_items);
    write_heading(out, ContextSection::Gear, shown, gear.len());

    for item in gear.iter().take(shown) {
        let mut line = format!("- {} ({}) x{}", item.label, item.category, item.quantity);
        if let Some(serial) = &item.serial {
            let _ = write!(line, ", serial {serial}");
        }
        let _ = write!(line, ", list {}", item.list_name);
        line.push_str(if item.is_packed { ", packed" } else { ", not packed" });
        let _ = writeln!(out, "{line}");
    }
}

fn write_tasks(out: &mut String, table: &Table, limits: &ContextLimits) {
    let tasks = &table.tasks;
    let shown = tasks.len().min(limits.max_section_items);
    write_heading(out, ContextSection::Tasks, shown, tasks.len());

    for task in tasks.iter().take(shown) {
        let mark = if task.completed { "x" } else { " " };
        let mut line = format!("- [{mark}] {}", task.title);
        if let Some(deadline) = &task.deadline {
            let _ = write!(line, " (due {deadline})");
        }
        if let Some(assignee) = &task.assigned_to {
            let _ = write!(line, ", assigned to {assignee}");
        }
        let _ = writeln!(out, "{line}");
    }
}

fn write_travel(out: &mut String, table: &Table, limits: &ContextLimits) {
    let travel = &table.travel;
    let shown = travel.len().min(limits.max_section_items);
    write_heading(out, ContextSection::Travel, shown, travel.len());

    for entry in travel.iter().take(shown) {
        let mut line = format!("- {}:", entry.name);
        for part in [&entry.date, &entry.time].into_iter().flatten() {
            let _ = write!(line, " {part}");
        }
        if let (Some(from), Some(to)) = (&entry.from, &entry.to) {
            let _ = write!(line, " {from} to {to}");
        }
        if let Some(carrier) = &entry.carrier {
            let _ = write!(line, " via {carrier}");
        }
        if let Some(reference) = &entry.reference {
            let _ = write!(line, " (ref {reference})");
        }
        if let Some(notes) = &entry.notes {
            let _ = write!(line, ". {notes}");
        }
        let _ = writeln!(out, "{line}");
    }
}

fn write_card_log(out: &mut String, table: &Table, limits: &ContextLimits) {
    let log = &table.card_log;
    let shown = log.len().min(limits.max_section_items);
    write_heading(out, ContextSection::CardLog, shown, log.len());

    // Most recent offloads are the interesting ones.
    for entry in log.iter().rev().take(shown) {
        let mut line = String::from("-");
        for part in [&entry.date, &entry.camera].into_iter().flatten() {
            let _ = write!(line, " {part}");
        }
        if let Some(card) = &entry.card1 {
            let _ = write!(line, ", card1 {card}");
        }
        if let Some(card) = &entry.card2 {
            let _ = write!(line, ", card2 {card}");
        }
        if let Some(user) = &entry.user {
            let _ = write!(line, " by {user}");
        }
        let _ = writeln!(out, "{line}");
    }
}

fn write_shotlists(out: &mut String, table: &Table, limits: &ContextLimits) {
    let lists = &table.shotlists;
    let shown = lists.len().min(limits.max_section_items);
    write_heading(out, ContextSection::Shotlists, shown, lists.len());

    for list in lists.iter().take(shown) {
        let done = list.items.iter().filter(|item| item.done).count();
        let pending: Vec<&str> = list
            .items
            .iter()
            .filter(|item| !item.done)
            .map(|item| item.title.as_str())
            .take(limits.max_section_items)
            .collect();
        let mut line = format!("- {}: {done}/{} done", list.name, list.items.len());
        if !pending.is_empty() {
            let _ = write!(line, "; pending: {}", pending.join(", "));
        }
        let _ = writeln!(out, "{line}");
    }
}
