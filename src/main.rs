use std::io::{self, BufRead, IsTerminal, Read, Write};

use anyhow::{Result, anyhow};
use clap::Parser;
use ruby_translator::{RubyStyle, Session, TargetLanguages};

#[derive(Parser, Debug)]
#[command(
    name = "ruby-translator",
    version,
    about = "Translate text into 2-3 languages with furigana and pinyin readings"
)]
struct Cli {
    /// Target languages, comma separated (en, jp, zh, mm, vi). Default from settings
    #[arg(short = 'l', long = "lang")]
    lang: Option<String>,

    /// Gemini model name
    #[arg(short = 'm', long = "model")]
    model: Option<String>,

    /// API key (overrides GEMINI_API_KEY/GOOGLE_API_KEY/API_KEY)
    #[arg(short = 'k', long = "key")]
    key: Option<String>,

    /// Render readings as <ruby> HTML markup
    #[arg(long = "html")]
    html: bool,

    /// Show translation histories and exit
    #[arg(long = "show-histories")]
    show_histories: bool,

    /// Delete one history entry by id and exit
    #[arg(long = "delete-history", value_name = "ID")]
    delete_history: Option<String>,

    /// Delete every history entry and exit
    #[arg(long = "clear-histories")]
    clear_histories: bool,

    /// Skip the confirmation prompt of --clear-histories and /clear
    #[arg(short = 'y', long = "yes")]
    yes: bool,

    /// Recognize handwritten characters and print candidates. IMAGE is a file
    /// path, a `data:image/png;base64,...` URL, or `-` to read that URL from stdin
    #[arg(long = "handwriting", value_name = "IMAGE")]
    handwriting: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,

    /// Interactive mode
    #[arg(short = 'i', long = "interactive")]
    interactive: bool,
}

impl Cli {
    fn config(&self) -> ruby_translator::Config {
        ruby_translator::Config {
            lang: self.lang.clone(),
            model: self.model.clone(),
            key: self.key.clone(),
            html: self.html,
            settings_path: self.read_settings.clone(),
            show_histories: self.show_histories,
            delete_history: self.delete_history.clone(),
            clear_histories: self.clear_histories,
            handwriting: self.handwriting.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    ruby_translator::logging::init(cli.verbose)?;
    if cli.interactive {
        return run_interactive(cli).await;
    }

    if cli.clear_histories && !cli.yes && !confirm("Clear all translation history?")? {
        println!("cancelled");
        return Ok(());
    }

    let handwriting_from_stdin = cli.handwriting.as_deref().map(str::trim) == Some("-");
    let needs_input = handwriting_from_stdin
        || !(cli.show_histories
            || cli.delete_history.is_some()
            || cli.clear_histories
            || cli.handwriting.is_some());
    let input = if needs_input {
        let mut buffer = Vec::new();
        io::stdin().read_to_end(&mut buffer)?;
        Some(String::from_utf8(buffer).map_err(|_| anyhow!("stdin must be UTF-8 text"))?)
    } else {
        None
    };

    let output = ruby_translator::run(cli.config(), input).await?;
    println!("{}", output);
    Ok(())
}

fn confirm(question: &str) -> Result<bool> {
    if !io::stdin().is_terminal() {
        return Err(anyhow!("refusing to continue without confirmation (pass --yes)"));
    }
    print!("{} [y/N] ", question);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

async fn run_interactive(cli: Cli) -> Result<()> {
    let mut session = Session::open(&cli.config())?;
    println!("Interactive mode. Use /quit or /exit to finish.");
    println!("Type /help to see available commands.");

    let mut line = String::new();
    loop {
        line.clear();
        print!("> ");
        io::stdout().flush()?;
        if io::stdin().lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.starts_with('/') {
            match handle_interactive_command(input, &mut session, cli.yes) {
                Ok(true) => break,
                Ok(false) => {}
                Err(err) => eprintln!("{}", err),
            }
            continue;
        }

        match session.translate(input).await {
            Ok(outcome) => println!("{}", session.format_outcome(&outcome)),
            Err(err) => eprintln!("{}", ruby_translator::into_report(err)),
        }
    }
    Ok(())
}

fn handle_interactive_command(
    input: &str,
    session: &mut Session<ruby_translator::Gemini>,
    assume_yes: bool,
) -> Result<bool> {
    let trimmed = input.trim();
    if matches!(trimmed, "/quit" | "/exit") {
        return Ok(true);
    }
    if trimmed == "/help" {
        print_interactive_help();
        return Ok(false);
    }
    if trimmed == "/history" {
        println!("{}", session.format_histories());
        return Ok(false);
    }
    if trimmed == "/clear" {
        if assume_yes || confirm("Clear all translation history?")? {
            session.clear_history();
            println!("history cleared");
        } else {
            println!("cancelled");
        }
        return Ok(false);
    }
    if let Some(arg) = trimmed.strip_prefix("/delete") {
        let id = arg.trim();
        if id.is_empty() {
            return Err(anyhow!("usage: /delete <id>"));
        }
        if session.delete_history(id) {
            println!("deleted {}", id);
        } else {
            println!("history entry '{}' not found", id);
        }
        return Ok(false);
    }
    if let Some(arg) = trimmed.strip_prefix("/lang") {
        let value = arg.trim();
        if value.is_empty() {
            println!("lang: {}", session.targets());
        } else {
            session.set_targets(TargetLanguages::parse_list(value)?);
            println!("lang set to {}", session.targets());
        }
        return Ok(false);
    }
    if let Some(arg) = trimmed.strip_prefix("/html") {
        let current = session.ruby_style() == RubyStyle::Html;
        let enabled = parse_toggle(arg, current)?;
        session.set_ruby_style(if enabled {
            RubyStyle::Html
        } else {
            RubyStyle::Plain
        });
        println!("html: {}", enabled);
        return Ok(false);
    }

    Err(anyhow!("unknown command: {}", trimmed))
}

fn parse_toggle(arg: &str, current: bool) -> Result<bool> {
    let value = arg.trim();
    if value.is_empty() {
        return Ok(!current);
    }
    match value.to_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(anyhow!("expected on/off/true/false/1/0")),
    }
}

fn print_interactive_help() {
    println!("Commands:");
    println!("  /quit, /exit         Exit interactive mode");
    println!("  /history             Show translation histories");
    println!("  /delete <id>         Delete one history entry");
    println!("  /clear               Delete every history entry (asks first unless --yes)");
    println!("  /lang <codes>        Set target languages, e.g. en,jp,zh (or show current)");
    println!("  /html [on|off]       Toggle <ruby> HTML output");
}

#[cfg(test)]
mod tests {
    use super::*;
    use ruby_translator::store::{BlobStore, MemoryStore};
    use ruby_translator::{Gemini, HistoryItem, TranslationResult, Translator};
    use serde_json::json;
    use std::sync::Arc;

    fn session_with_one_entry() -> Session<Gemini> {
        let results: TranslationResult = serde_json::from_value(json!({
            "detectedLanguage": "en",
            "en": "Hello",
            "vi": "Xin chào"
        }))
        .unwrap();
        let items = vec![HistoryItem::new("Hello", results)];
        let store = MemoryStore::new();
        store
            .write("translation_history", &serde_json::to_string(&items).unwrap())
            .unwrap();
        Session::new(
            Translator::new(Gemini::new(None)),
            Arc::new(store),
            TargetLanguages::parse_list("en,vi").unwrap(),
            RubyStyle::Plain,
        )
    }

    #[test]
    fn clear_command_honors_assume_yes_without_a_terminal() {
        let mut session = session_with_one_entry();
        assert_eq!(session.history().len(), 1);
        assert!(!handle_interactive_command("/clear", &mut session, true).unwrap());
        assert!(session.history().is_empty());
    }

    #[test]
    fn clear_command_refuses_without_confirmation() {
        let mut session = session_with_one_entry();
        if io::stdin().is_terminal() {
            return;
        }
        assert!(handle_interactive_command("/clear", &mut session, false).is_err());
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn toggle_parsing() {
        assert!(parse_toggle("", false).unwrap());
        assert!(!parse_toggle(" off ", true).unwrap());
        assert!(parse_toggle("maybe", true).is_err());
    }
}
