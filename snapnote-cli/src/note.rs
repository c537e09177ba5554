use crate::cli::{NoteCommands, NoteKind, OutputFormat};
use crate::context::CliContext;
use crate::display;
use crate::error::CliResult;
use is_terminal::IsTerminal;
use serde_json::{json, Value};
use snapnote::Note;
use std::io::{self, Read};

pub async fn handle_note_command(command: NoteCommands, context: &CliContext) -> CliResult<()> {
    match command {
        NoteCommands::Create {
            url,
            title,
            note_type,
            content,
            tags,
            category,
            image_src,
        } => {
            let content = get_content_input(content)?;
            let draft = NoteDraftArgs {
                url,
                title,
                note_type,
                content,
                tags,
                category,
                image_src,
            };
            create_note(context, draft).await?;
        }
        NoteCommands::List { url, format } => {
            list_notes(context, url, format).await?;
        }
        NoteCommands::Get { id } => {
            get_note(context, &id).await?;
        }
        NoteCommands::Update { id, content } => {
            let content = get_content_input(content)?;
            update_note(context, &id, content).await?;
        }
        NoteCommands::Delete { id } => {
            delete_note(context, &id).await?;
        }
        NoteCommands::Search { query, url, format } => {
            search_notes(context, query, url, format).await?;
        }
    }

    Ok(())
}

struct NoteDraftArgs {
    url: String,
    title: Option<String>,
    note_type: NoteKind,
    content: String,
    tags: Vec<String>,
    category: Option<String>,
    image_src: Option<String>,
}

impl NoteDraftArgs {
    fn into_value(self) -> Value {
        let mut data = json!({
            "url": self.url,
            "content": self.content,
            "type": self.note_type.as_str(),
        });
        if let Some(title) = self.title {
            data["title"] = json!(title);
        }
        if !self.tags.is_empty() {
            data["tags"] = json!(self.tags);
        }
        if let Some(category) = self.category {
            data["category"] = json!(category);
        }
        if let Some(src) = self.image_src {
            data["imageSrc"] = json!(src);
        }
        data
    }
}

async fn create_note(context: &CliContext, draft: NoteDraftArgs) -> CliResult<()> {
    let args = CliContext::create_arguments(vec![("data", Some(draft.into_value()))]);
    let mut response = context.execute("saveNote", args).await?;
    let note: Note = response.take("note")?;

    println!("{}", display::success(&format!("Created note on {}", note.domain)));
    display::print_note(&note);
    Ok(())
}

async fn list_notes(
    context: &CliContext,
    url: Option<String>,
    format: OutputFormat,
) -> CliResult<()> {
    let args = CliContext::create_arguments(vec![("url", url.map(Value::from))]);
    let mut response = context.execute("getNotes", args).await?;
    let notes: Vec<Note> = response.take("notes")?;
    display::print_notes(&notes, format)
}

async fn get_note(context: &CliContext, id: &str) -> CliResult<()> {
    let args = CliContext::create_arguments(vec![("noteId", Some(json!(id)))]);
    let mut response = context.execute("getNote", args).await?;
    let note: Note = response.take("note")?;
    display::print_note(&note);
    Ok(())
}

async fn update_note(context: &CliContext, id: &str, content: String) -> CliResult<()> {
    let args = CliContext::create_arguments(vec![
        ("noteId", Some(json!(id))),
        ("content", Some(json!(content))),
    ]);
    let mut response = context.execute("updateNote", args).await?;
    let note: Note = response.take("note")?;

    println!("{}", display::success(&format!("Updated note {}", note.id)));
    display::print_note(&note);
    Ok(())
}

async fn delete_note(context: &CliContext, id: &str) -> CliResult<()> {
    let args = CliContext::create_arguments(vec![("noteId", Some(json!(id)))]);
    context.execute("deleteNote", args).await?;
    println!("{}", display::success(&format!("Deleted note {id}")));
    Ok(())
}

async fn search_notes(
    context: &CliContext,
    query: String,
    url: Option<String>,
    format: OutputFormat,
) -> CliResult<()> {
    let args = CliContext::create_arguments(vec![
        ("query", Some(json!(query))),
        ("url", url.map(Value::from)),
    ]);
    let mut response = context.execute("searchNotes", args).await?;
    let notes: Vec<Note> = response.take("notes")?;
    display::print_notes(&notes, format)
}

/// Content source for create and update
enum ContentInput {
    Direct(String),
    Stdin,
    Interactive,
}

/// `-` reads stdin, no value prompts when stdin is a terminal
fn get_content_input(content: Option<String>) -> CliResult<String> {
    let input_type = match content {
        Some(c) if c == "-" => ContentInput::Stdin,
        Some(c) => ContentInput::Direct(c),
        None => ContentInput::Interactive,
    };

    match input_type {
        ContentInput::Direct(content) => Ok(content),
        ContentInput::Stdin => read_stdin(),
        ContentInput::Interactive => {
            if io::stdin().is_terminal() {
                eprintln!("📝 Enter note content, then press Ctrl+D when finished:");
            }
            read_stdin()
        }
    }
}

fn read_stdin() -> CliResult<String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_content_is_used_verbatim() {
        let content = get_content_input(Some("  spaced  ".to_string())).unwrap();
        assert_eq!(content, "  spaced  ");
    }

    #[test]
    fn test_draft_value_uses_wire_names() {
        let value = NoteDraftArgs {
            url: "https://a.com".to_string(),
            title: None,
            note_type: NoteKind::Image,
            content: "cat".to_string(),
            tags: vec!["pets".to_string()],
            category: None,
            image_src: Some("https://a.com/cat.png".to_string()),
        }
        .into_value();

        assert_eq!(value["type"], "image");
        assert_eq!(value["imageSrc"], "https://a.com/cat.png");
        assert_eq!(value["tags"], json!(["pets"]));
        assert!(value.get("title").is_none());
    }
}
