use std::io::{BufRead, Write};

use anyhow::{Context, anyhow};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::form::{TaskForm, Validation};
use crate::i18n::Locale;
use crate::session::{Session, Submitted};
use crate::store::{Clock, StatusFilter};
use crate::task::{Priority, Status};

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "board", "list", "add", "edit", "status", "delete", "info", "filter", "search", "lang",
        "export", "help", "quit", "exit",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Reads commands until end of input or `quit`.
#[instrument(skip(session, input, out))]
pub fn run_session<C: Clock, R: BufRead, W: Write>(
    session: &mut Session<C>,
    input: &mut R,
    out: &mut W,
    interactive: bool,
) -> anyhow::Result<()> {
    if interactive {
        writeln!(out, "{}", session.messages().t("session.welcome"))?;
    }

    loop {
        if interactive {
            write!(out, "{}", session.messages().t("session.prompt"))?;
            out.flush()?;
        }

        let Some(line) = read_line(input)? else {
            debug!("end of input");
            break;
        };

        if execute_line(session, &line, input, out)? == Flow::Quit {
            break;
        }
    }

    info!("session finished");
    Ok(())
}

/// Runs a single command line. `input` is consulted again only for the
/// delete confirmation.
#[instrument(skip(session, input, out))]
pub fn execute_line<C: Clock, R: BufRead, W: Write>(
    session: &mut Session<C>,
    line: &str,
    input: &mut R,
    out: &mut W,
) -> anyhow::Result<Flow> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(Flow::Continue);
    }

    let (word, rest) = split_command(trimmed);
    let known = known_command_names();
    let Some(command) = expand_command_abbrev(&word.to_ascii_lowercase(), &known).map(str::to_string)
    else {
        let msg = session
            .messages()
            .fmt("session.unknownCommand", &[("command", word)]);
        writeln!(out, "{msg}")?;
        return Ok(Flow::Continue);
    };

    debug!(command = %command, "dispatching command");

    if command == "search" {
        cmd_search(session, rest, out)?;
        return Ok(Flow::Continue);
    }

    let args = match split_args(rest) {
        Ok(args) => args,
        Err(err) => {
            warn!(error = %err, "could not tokenize command line");
            let msg = session
                .messages()
                .fmt("session.invalidArgument", &[("value", rest.trim())]);
            writeln!(out, "{msg}")?;
            return Ok(Flow::Continue);
        }
    };

    match command.as_str() {
        "board" | "list" => cmd_board(session, out)?,
        "add" => cmd_add(session, &args, out)?,
        "edit" => cmd_edit(session, &args, out)?,
        "status" => cmd_status(session, &args, out)?,
        "delete" => cmd_delete(session, &args, input, out)?,
        "info" => cmd_info(session, &args, out)?,
        "filter" => cmd_filter(session, &args, out)?,
        "lang" => cmd_lang(session, &args, out)?,
        "export" => cmd_export(session, out)?,
        "help" => cmd_help(session, out)?,
        "quit" | "exit" => {
            writeln!(out, "{}", session.messages().t("session.bye"))?;
            return Ok(Flow::Quit);
        }
        other => return Err(anyhow!("unhandled command: {other}")),
    }

    Ok(Flow::Continue)
}

#[instrument(skip_all)]
fn cmd_board<C: Clock, W: Write>(session: &Session<C>, out: &mut W) -> anyhow::Result<()> {
    let msgs = session.messages();
    let view = session.view();
    let store = session.store();
    session.renderer().print_board(
        out,
        &msgs,
        &view,
        &session.counts(),
        store.filter(),
        store.search_query(),
        store.now(),
    )
}

#[instrument(skip(session, out))]
fn cmd_add<C: Clock, W: Write>(
    session: &mut Session<C>,
    args: &[String],
    out: &mut W,
) -> anyhow::Result<()> {
    info!("command add");

    let (words, mods) = match parse_words_and_mods(args) {
        Ok(parsed) => parsed,
        Err(bad) => return report_bad_modifier(session, &bad, out),
    };

    let form = session.open_create_form();
    if !words.is_empty() {
        form.set_title(words.join(" "));
    }
    apply_mods(form, &mods);

    submit_and_report(session, out)
}

#[instrument(skip(session, out))]
fn cmd_edit<C: Clock, W: Write>(
    session: &mut Session<C>,
    args: &[String],
    out: &mut W,
) -> anyhow::Result<()> {
    info!("command edit");

    let Some(id) = resolve_first(session, args, out)? else {
        return Ok(());
    };
    let (words, mods) = match parse_words_and_mods(&args[1..]) {
        Ok(parsed) => parsed,
        Err(bad) => return report_bad_modifier(session, &bad, out),
    };
    if words.is_empty() && mods.is_empty() {
        writeln!(out, "{}", session.messages().t("session.nothingToChange"))?;
        return Ok(());
    }

    let Some(form) = session.open_edit_form(id) else {
        return Ok(());
    };
    if !words.is_empty() {
        form.set_title(words.join(" "));
    }
    apply_mods(form, &mods);

    submit_and_report(session, out)
}

#[instrument(skip(session, out))]
fn cmd_status<C: Clock, W: Write>(
    session: &mut Session<C>,
    args: &[String],
    out: &mut W,
) -> anyhow::Result<()> {
    let Some(id) = resolve_first(session, args, out)? else {
        return Ok(());
    };
    let raw = args.get(1).map(String::as_str).unwrap_or_default();
    let Ok(status) = raw.parse::<Status>() else {
        let msg = session
            .messages()
            .fmt("session.invalidStatus", &[("value", raw)]);
        writeln!(out, "{msg}")?;
        return Ok(());
    };

    session.change_status(id, status);
    let msgs = session.messages();
    let short = short_id(id);
    writeln!(
        out,
        "{}",
        msgs.fmt(
            "session.statusChanged",
            &[("id", short.as_str()), ("status", msgs.t(status.message_id()))]
        )
    )?;
    Ok(())
}

#[instrument(skip(session, input, out))]
fn cmd_delete<C: Clock, R: BufRead, W: Write>(
    session: &mut Session<C>,
    args: &[String],
    input: &mut R,
    out: &mut W,
) -> anyhow::Result<()> {
    info!("command delete");

    let Some(id) = resolve_first(session, args, out)? else {
        return Ok(());
    };

    let msgs = session.messages();
    write!(
        out,
        "{} [{}/{}] ",
        msgs.t("taskCard.deleteConfirm"),
        msgs.t("common.yes"),
        msgs.t("common.no")
    )?;
    out.flush()?;
    let answer = read_line(input)?.unwrap_or_default();
    writeln!(out)?;

    let confirmed = is_affirmative(&answer, msgs.t("common.yes"));
    if session.delete_confirmed(id, confirmed) {
        let msg = session
            .messages()
            .fmt("session.deleted", &[("id", short_id(id).as_str())]);
        writeln!(out, "{msg}")?;
    } else {
        writeln!(out, "{}", session.messages().t("session.deleteAborted"))?;
    }
    Ok(())
}

#[instrument(skip(session, out))]
fn cmd_info<C: Clock, W: Write>(
    session: &Session<C>,
    args: &[String],
    out: &mut W,
) -> anyhow::Result<()> {
    let Some(id) = resolve_first(session, args, out)? else {
        return Ok(());
    };
    let Some(task) = session.store().get(id) else {
        return Ok(());
    };
    session
        .renderer()
        .print_task_info(out, &session.messages(), task, session.store().now())
}

#[instrument(skip(session, out))]
fn cmd_filter<C: Clock, W: Write>(
    session: &mut Session<C>,
    args: &[String],
    out: &mut W,
) -> anyhow::Result<()> {
    let raw = args.first().map(String::as_str).unwrap_or("all");
    let Ok(filter) = raw.parse::<StatusFilter>() else {
        let msg = session
            .messages()
            .fmt("session.invalidFilter", &[("value", raw)]);
        writeln!(out, "{msg}")?;
        return Ok(());
    };

    session.set_filter(filter);
    let msgs = session.messages();
    writeln!(
        out,
        "{}",
        msgs.fmt("session.filterSet", &[("filter", msgs.t(filter.message_id()))])
    )?;
    Ok(())
}

/// The query is everything after the command word, untouched.
#[instrument(skip(session, out))]
fn cmd_search<C: Clock, W: Write>(
    session: &mut Session<C>,
    query: &str,
    out: &mut W,
) -> anyhow::Result<()> {
    session.set_search_query(query.to_string());
    let msgs = session.messages();
    if query.is_empty() {
        writeln!(out, "{}", msgs.t("session.searchCleared"))?;
    } else {
        writeln!(out, "{}", msgs.fmt("session.searchSet", &[("query", query)]))?;
    }
    Ok(())
}

#[instrument(skip(session, out))]
fn cmd_lang<C: Clock, W: Write>(
    session: &mut Session<C>,
    args: &[String],
    out: &mut W,
) -> anyhow::Result<()> {
    let raw = args.first().map(String::as_str).unwrap_or_default();
    let Some(locale) = Locale::from_code(raw) else {
        let msg = session
            .messages()
            .fmt("session.invalidLanguage", &[("value", raw)]);
        writeln!(out, "{msg}")?;
        return Ok(());
    };

    session.set_locale(locale);
    let msg = session
        .messages()
        .fmt("session.languageChanged", &[("language", locale.native_name())]);
    writeln!(out, "{msg}")?;
    Ok(())
}

#[instrument(skip_all)]
fn cmd_export<C: Clock, W: Write>(session: &Session<C>, out: &mut W) -> anyhow::Result<()> {
    let view = session.view();
    let tasks = view.displayed_tasks(session.store().tasks());
    let json = serde_json::to_string_pretty(&tasks).context("failed to serialize tasks")?;
    writeln!(out, "{json}")?;
    Ok(())
}

fn cmd_help<C: Clock, W: Write>(session: &Session<C>, out: &mut W) -> anyhow::Result<()> {
    let msgs = session.messages();
    writeln!(out, "{}:", msgs.t("help.title"))?;
    for id in [
        "help.board",
        "help.add",
        "help.edit",
        "help.status",
        "help.delete",
        "help.info",
        "help.filter",
        "help.search",
        "help.lang",
        "help.export",
        "help.quit",
    ] {
        writeln!(out, "  {}", msgs.t(id))?;
    }
    writeln!(out, "  {}", msgs.t("taskForm.dueDateFormat"))?;
    Ok(())
}

fn submit_and_report<C: Clock, W: Write>(
    session: &mut Session<C>,
    out: &mut W,
) -> anyhow::Result<()> {
    let title_id = session
        .form()
        .map(TaskForm::title_message_id)
        .unwrap_or("taskForm.createTitle");

    match session.submit_form() {
        Some(Ok(Submitted::Created(id))) => {
            let msg = session
                .messages()
                .fmt("session.created", &[("id", short_id(id).as_str())]);
            writeln!(out, "{msg}")?;
        }
        Some(Ok(Submitted::Updated(id))) => {
            let msg = session
                .messages()
                .fmt("session.updated", &[("id", short_id(id).as_str())]);
            writeln!(out, "{msg}")?;
        }
        Some(Err(errors)) => {
            report_validation(session, title_id, &errors, out)?;
            // A command line is one submit attempt; the dialog does not
            // outlive it.
            session.close_form();
        }
        None => {}
    }
    Ok(())
}

fn report_validation<C: Clock, W: Write>(
    session: &Session<C>,
    title_id: &str,
    errors: &Validation,
    out: &mut W,
) -> anyhow::Result<()> {
    let msgs = session.messages();
    writeln!(out, "{}", msgs.t(title_id))?;
    session.renderer().print_validation(out, &msgs, errors)?;
    writeln!(out, "{}", msgs.t("session.submitBlocked"))?;
    Ok(())
}

fn resolve_first<C: Clock, W: Write>(
    session: &Session<C>,
    args: &[String],
    out: &mut W,
) -> anyhow::Result<Option<Uuid>> {
    let reference = args.first().map(String::as_str).unwrap_or_default();
    match session.resolve(reference) {
        Ok(id) => Ok(Some(id)),
        Err(err) => {
            let msg = session
                .messages()
                .fmt(err.message_id(), &[("reference", reference)]);
            writeln!(out, "{msg}")?;
            Ok(None)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mod {
    Title(String),
    Description(String),
    Priority(Priority),
    Due(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum BadModifier {
    Priority(String),
}

fn parse_words_and_mods(args: &[String]) -> Result<(Vec<String>, Vec<Mod>), BadModifier> {
    let mut words = Vec::new();
    let mut mods = Vec::new();

    let mut literal = false;
    for arg in args {
        if arg == "--" {
            literal = true;
            continue;
        }

        if !literal && let Some(one_mod) = parse_one_mod(arg)? {
            mods.push(one_mod);
            continue;
        }

        words.push(arg.clone());
    }

    Ok((words, mods))
}

fn parse_one_mod(tok: &str) -> Result<Option<Mod>, BadModifier> {
    let Some((key, value)) = tok.split_once(':') else {
        return Ok(None);
    };

    let one_mod = match key.to_ascii_lowercase().as_str() {
        "title" => Mod::Title(value.to_string()),
        "desc" | "description" => Mod::Description(value.to_string()),
        "pri" | "priority" => Mod::Priority(
            value
                .parse::<Priority>()
                .map_err(|_| BadModifier::Priority(value.to_string()))?,
        ),
        "due" => Mod::Due(value.to_string()),
        _ => return Ok(None),
    };
    Ok(Some(one_mod))
}

fn apply_mods(form: &mut TaskForm, mods: &[Mod]) {
    for one_mod in mods {
        match one_mod {
            Mod::Title(title) => form.set_title(title.clone()),
            Mod::Description(description) => form.set_description(description.clone()),
            Mod::Priority(priority) => form.set_priority(*priority),
            Mod::Due(due) => form.set_due_date(due.clone()),
        }
    }
}

fn report_bad_modifier<C: Clock, W: Write>(
    session: &Session<C>,
    bad: &BadModifier,
    out: &mut W,
) -> anyhow::Result<()> {
    let BadModifier::Priority(value) = bad;
    let msg = session
        .messages()
        .fmt("session.invalidPriority", &[("value", value.as_str())]);
    writeln!(out, "{msg}")?;
    Ok(())
}

fn short_id(id: Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

fn is_affirmative(answer: &str, localized_yes: &str) -> bool {
    let answer = answer.trim().to_lowercase();
    !answer.is_empty()
        && (["y", "yes", "д", "да"].contains(&answer.as_str()) || answer == localized_yes)
}

fn read_line<R: BufRead>(input: &mut R) -> anyhow::Result<Option<String>> {
    let mut line = String::new();
    let read = input.read_line(&mut line).context("failed reading input")?;
    if read == 0 {
        return Ok(None);
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(Some(line))
}

/// Splits off the command word; the remainder loses exactly one separator.
fn split_command(line: &str) -> (&str, &str) {
    match line.find(char::is_whitespace) {
        Some(idx) => {
            let (word, rest) = line.split_at(idx);
            let mut chars = rest.chars();
            chars.next();
            (word, chars.as_str())
        }
        None => (line, ""),
    }
}

/// Whitespace-separated arguments with `"double quoted"` groups and `\`
/// escapes inside quotes.
fn split_args(raw: &str) -> anyhow::Result<Vec<String>> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quoted = false;
    let mut chars = raw.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                quoted = !quoted;
                in_token = true;
            }
            '\\' if quoted => {
                let escaped = chars
                    .next()
                    .ok_or_else(|| anyhow!("dangling escape in {raw:?}"))?;
                current.push(escaped);
            }
            ch if ch.is_whitespace() && !quoted => {
                if in_token {
                    args.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            ch => {
                current.push(ch);
                in_token = true;
            }
        }
    }

    if quoted {
        return Err(anyhow!("unterminated quote in {raw:?}"));
    }
    if in_token {
        args.push(current);
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::{
        Mod, expand_command_abbrev, is_affirmative, known_command_names, parse_words_and_mods,
        split_args, split_command,
    };
    use crate::task::Priority;

    #[test]
    fn splits_quoted_arguments() {
        let args = split_args(r#"Buy milk desc:"2% low fat" due:2026-05-02 "" x"#).expect("split");
        assert_eq!(
            args,
            vec!["Buy", "milk", "desc:2% low fat", "due:2026-05-02", "", "x"]
        );
        assert!(split_args(r#"desc:"open"#).is_err());
        assert_eq!(
            split_args(r#""say \"hi\"""#).expect("split"),
            vec![r#"say "hi""#]
        );
    }

    #[test]
    fn command_split_keeps_remainder_verbatim() {
        assert_eq!(split_command("search  Milk "), ("search", " Milk "));
        assert_eq!(split_command("search"), ("search", ""));
    }

    #[test]
    fn abbreviations_must_be_unique() {
        let known = known_command_names();
        assert_eq!(expand_command_abbrev("ad", &known), Some("add"));
        assert_eq!(expand_command_abbrev("st", &known), Some("status"));
        assert_eq!(expand_command_abbrev("e", &known), None);
        assert_eq!(expand_command_abbrev("list", &known), Some("list"));
    }

    #[test]
    fn modifiers_are_separated_from_title_words() {
        let args: Vec<String> = ["Buy", "milk", "pri:high", "desc:2% fat", "--", "due:soon"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let (words, mods) = parse_words_and_mods(&args).expect("parse");
        assert_eq!(words, vec!["Buy", "milk", "due:soon"]);
        assert_eq!(
            mods,
            vec![
                Mod::Priority(Priority::High),
                Mod::Description("2% fat".to_string())
            ]
        );

        let bad = vec!["priority:urgent".to_string()];
        assert!(parse_words_and_mods(&bad).is_err());
    }

    #[test]
    fn confirmation_accepts_both_languages() {
        assert!(is_affirmative("y", "y"));
        assert!(is_affirmative(" Да ", "д"));
        assert!(!is_affirmative("", "y"));
        assert!(!is_affirmative("n", "y"));
        assert!(!is_affirmative("sure", "y"));
    }
}
