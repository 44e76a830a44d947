//! Line-oriented chat console.

use medai_agent::{Assistant, Reply, Role};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

const PROMPT: &str = "You: ";

/// Render one reply for the terminal.
pub fn format_reply(reply: &Reply) -> String {
    match reply.role {
        Role::Receptionist => format!("Receptionist Agent: {}", reply.content),
        Role::Clinical => format!("Clinical Agent: {}", reply.content),
        Role::Source => format!("  [{}]", reply.content),
        Role::User => format!("{PROMPT}{}", reply.content),
    }
}

fn print_replies(replies: &[Reply]) {
    for reply in replies {
        println!("\n{}", format_reply(reply));
    }
    println!();
}

/// Read lines until the dialogue finishes, Ctrl-C, or end of input.
pub async fn run(mut assistant: Assistant) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new()?;
    print_replies(&assistant.welcome());

    while !assistant.is_done() {
        match editor.readline(PROMPT) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    editor.add_history_entry(line.as_str())?;
                }
                let replies = assistant.handle_turn(&line).await;
                if !replies.is_empty() {
                    print_replies(&replies);
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replies_are_prefixed_by_speaker() {
        assert_eq!(
            format_reply(&Reply::receptionist("What's your name?")),
            "Receptionist Agent: What's your name?"
        );
        assert_eq!(format_reply(&Reply::clinical("Rest.")), "Clinical Agent: Rest.");
        assert_eq!(
            format_reply(&Reply::source("Source: Nephrology PDF")),
            "  [Source: Nephrology PDF]"
        );
    }
}
