//! Terminal rendering of notes, domains, statistics and settings

use crate::cli::{Cli, OutputFormat};
use crate::error::CliResult;
use colored::*;
use serde::Serialize;
use snapnote::{Note, NoteType, Settings, Stats};
use tabled::{
    settings::{object::Rows, Alignment, Color, Modify, Style},
    Table, Tabled,
};

const PREVIEW_CHARS: usize = 50;

#[derive(Tabled)]
struct NoteRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Domain")]
    domain: String,
    #[tabled(rename = "Type")]
    note_type: String,
    #[tabled(rename = "Content")]
    content: String,
    #[tabled(rename = "Created")]
    created: String,
}

#[derive(Tabled, Serialize)]
pub struct ActionRow {
    #[tabled(rename = "Action")]
    pub action: &'static str,
    #[tabled(rename = "Description")]
    pub description: &'static str,
}

#[derive(Tabled, Serialize, serde::Deserialize)]
pub struct DomainRow {
    #[tabled(rename = "Domain")]
    pub domain: String,
    #[tabled(rename = "Notes")]
    pub count: usize,
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

/// Shorten `text` to at most [`PREVIEW_CHARS`] characters on one line
pub fn preview(text: &str) -> String {
    let single_line = text.replace(['\n', '\r'], " ");
    if single_line.chars().count() > PREVIEW_CHARS {
        let cut: String = single_line.chars().take(PREVIEW_CHARS - 3).collect();
        format!("{cut}...")
    } else {
        single_line
    }
}

fn styled(mut table: Table, header_only: bool, rows: &[Color]) -> Table {
    table.with(Style::modern());

    if Cli::should_use_color() {
        table.with(Modify::new(Rows::first()).with(Color::FG_BRIGHT_CYAN));
        if !header_only {
            for (i, color) in rows.iter().enumerate() {
                table.with(Modify::new(Rows::new(i + 1..i + 2)).with(color.clone()));
            }
        }
    }

    table.with(Modify::new(Rows::new(1..)).with(Alignment::left()));
    table
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a list of notes
pub fn print_notes(notes: &[Note], format: OutputFormat) -> CliResult<()> {
    if format == OutputFormat::Json {
        return print_json(notes);
    }

    if notes.is_empty() {
        println!("No notes found.");
        return Ok(());
    }

    let rows: Vec<NoteRow> = notes
        .iter()
        .map(|note| NoteRow {
            id: note.id.to_string(),
            domain: note.domain.clone(),
            note_type: note.note_type.to_string(),
            content: preview(&note.content),
            created: note.timestamp.format("%Y-%m-%d %H:%M").to_string(),
        })
        .collect();
    let colors: Vec<Color> = notes
        .iter()
        .map(|note| match note.note_type {
            NoteType::Text => Color::FG_GREEN,
            NoteType::Image => Color::FG_YELLOW,
        })
        .collect();

    println!("{}", styled(Table::new(rows), false, &colors));
    println!("{} note(s)", notes.len());
    Ok(())
}

/// Print a single note with all of its fields
pub fn print_note(note: &Note) {
    println!("🆔 ID: {}", note.id);
    println!("🌐 Domain: {}", note.domain);
    println!("🔗 URL: {}", note.url);
    println!("📄 Title: {}", note.title);
    println!("🏷️  Type: {}", note.note_type);
    println!("📅 Created: {}", note.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
    if let Some(modified) = note.last_modified {
        println!("✏️  Modified: {}", modified.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!("📂 Category: {}", note.category);
    if !note.tags.is_empty() {
        println!("🔖 Tags: {}", note.tags.join(", "));
    }
    if let Some(src) = &note.image_src {
        println!("🖼️  Image: {}", src);
    }
    println!();
    println!("{}", note.content);
}

/// Print domains with their note counts
pub fn print_domains(domains: &[DomainRow], format: OutputFormat) -> CliResult<()> {
    if format == OutputFormat::Json {
        return print_json(domains);
    }
    if domains.is_empty() {
        println!("No notes found.");
        return Ok(());
    }

    let mut table = Table::new(domains);
    table.with(Style::modern());
    if Cli::should_use_color() {
        table.with(Modify::new(Rows::first()).with(Color::FG_BRIGHT_CYAN));
    }
    println!("{}", table);
    Ok(())
}

/// Print the router actions and what they do
pub fn print_actions(actions: &[ActionRow], format: OutputFormat) -> CliResult<()> {
    if format == OutputFormat::Json {
        return print_json(actions);
    }

    let mut table = Table::new(actions);
    table.with(Style::modern());
    if Cli::should_use_color() {
        table.with(Modify::new(Rows::first()).with(Color::FG_BRIGHT_CYAN));
    }
    println!("{}", table);
    Ok(())
}

/// Print the statistics counters
pub fn print_stats(stats: &Stats, format: OutputFormat) -> CliResult<()> {
    if format == OutputFormat::Json {
        return print_json(stats);
    }

    let rows = vec![
        FieldRow {
            field: "Notes added",
            value: stats.notes_added.to_string(),
        },
        FieldRow {
            field: "Notes deleted",
            value: stats.notes_deleted.to_string(),
        },
        FieldRow {
            field: "Text notes",
            value: stats.text_notes.to_string(),
        },
        FieldRow {
            field: "Image notes",
            value: stats.image_notes.to_string(),
        },
        FieldRow {
            field: "Last updated",
            value: stats
                .last_updated
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "never".to_string()),
        },
    ];
    println!("{}", styled(Table::new(rows), true, &[]));
    Ok(())
}

/// Print the user settings
pub fn print_settings(settings: &Settings, format: OutputFormat) -> CliResult<()> {
    if format == OutputFormat::Json {
        return print_json(settings);
    }

    let color = Cli::should_use_color();
    let flag = |on: bool| match (on, color) {
        (true, true) => "on".green().to_string(),
        (false, true) => "off".red().to_string(),
        (true, false) => "on".to_string(),
        (false, false) => "off".to_string(),
    };
    let rows = vec![
        FieldRow {
            field: "Dark mode",
            value: flag(settings.dark_mode),
        },
        FieldRow {
            field: "Auto backup",
            value: flag(settings.auto_backup),
        },
        FieldRow {
            field: "Max notes",
            value: settings.max_notes.to_string(),
        },
        FieldRow {
            field: "Notifications",
            value: flag(settings.notifications),
        },
    ];
    println!("{}", styled(Table::new(rows), true, &[]));
    Ok(())
}

/// Success line, green on a terminal
pub fn success(message: &str) -> String {
    if Cli::should_use_color() {
        format!("✅ {}", message.green())
    } else {
        format!("✅ {}", message)
    }
}
