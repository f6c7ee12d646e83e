//! `locka shell` — interactive session with idle auto-lock.
//!
//! Stdin is owned by a reader thread that reads exactly one line per
//! request from the main loop.  On a terminal it reads key by key and
//! checks a shared `hidden` flag on every key, so when the session locks
//! mid-line the half-typed command is dropped and the rest of the input
//! is taken, unechoed, as the master passphrase.  An [`IdleWatcher`]
//! ticks the session in the background and posts a `Locked` event into
//! the same channel, so the main loop handles input and locking in one
//! place.
//!
//! Lines that complete before the lock was noticed are discarded (they
//! are not activity).  Cancelling the unlock prompt ends the process.

use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use console::{Key, Term};
use zeroize::Zeroizing;

use crate::app::Locka;
use crate::cli::output;
use crate::cli::{load_config, open_vault, parse_position, Cli};
use crate::errors::{LockaError, Result};
use crate::session::{IdleWatcher, ReauthOutcome};
use crate::vault::record::parse_tags;
use crate::vault::Record;

const UNLOCK_PROMPT: &str = "Master passphrase (empty to quit): ";

#[derive(Debug, PartialEq, Eq)]
enum ShellEvent {
    Line(String),
    /// Answer to the unlock prompt; `None` when empty or cancelled.
    Secret(Option<Zeroizing<String>>),
    Locked,
    Closed,
}

/// What to do after a command line has been handled.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Lock,
    Quit,
}

const HELP: &str = "\
Commands:
  list [TEXT]      show records, filtered by TEXT (empty clears the filter)
  add              add a record
  edit N           edit record N
  delete N         delete record N
  show | hide      show or mask passwords
  save             save the vault now
  lock             lock the session
  help             this text
  quit             leave the shell";

/// Execute the `shell` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let mut locka = open_vault(&config)?;

    let (event_tx, event_rx) = mpsc::channel();
    let (request_tx, request_rx) = mpsc::channel();
    let input = Input {
        requests: request_tx,
        hidden: Arc::new(AtomicBool::new(false)),
    };
    spawn_reader(request_rx, event_tx.clone(), Arc::clone(&input.hidden));

    let lock_tx = event_tx.clone();
    let mut watcher = IdleWatcher::spawn(locka.session_handle(), config.poll_interval(), move |_| {
        let _ = lock_tx.send(ShellEvent::Locked);
    });
    drop(event_tx);

    output::info(&format!(
        "Vault unlocked. Locks after {}s without input. Type `help` for commands.",
        config.idle_timeout_secs
    ));

    let mut query = String::new();
    refresh(&locka, &query);
    input.ask_line();

    // Exactly one read is outstanding whenever the loop waits here.
    while let Ok(event) = event_rx.recv() {
        match event {
            ShellEvent::Locked => {
                // The pending read switches to hidden input on its next key.
                locka.note_idle_lock();
                refresh(&locka, &query);
                thread::sleep(config.reauth_delay());
                locka.begin_reauth();
                input.show_unlock_prompt();
            }
            ShellEvent::Line(_) if locka.is_locked() => input.ask_again(),
            ShellEvent::Line(line) => {
                locka.touch_activity();

                let flow = match run_command(&mut locka, line.trim(), &mut query) {
                    Ok(flow) => flow,
                    Err(e) => {
                        output::error(&e.to_string());
                        Flow::Continue
                    }
                };
                match flow {
                    Flow::Quit => break,
                    Flow::Lock => {
                        refresh(&locka, &query);
                        locka.begin_reauth();
                        input.show_unlock_prompt();
                        input.ask_again();
                    }
                    Flow::Continue => {
                        refresh(&locka, &query);
                        input.ask_line();
                    }
                }
            }
            ShellEvent::Secret(answer) => {
                match locka.answer_reauth(answer.as_deref().map(String::as_str)) {
                    ReauthOutcome::Unlocked => {
                        output::success("Unlocked.");
                        refresh(&locka, &query);
                        input.ask_line();
                    }
                    ReauthOutcome::Retry => {
                        output::error(&LockaError::AuthenticationFailure.to_string());
                        input.show_unlock_prompt();
                        input.ask_again();
                    }
                    ReauthOutcome::Exit => {
                        output::info("Unlock cancelled, exiting.");
                        break;
                    }
                }
            }
            ShellEvent::Closed => break,
        }
    }

    watcher.stop();
    Ok(())
}

/// Redraw the record list.  Shows only the placeholder while locked.
fn refresh(locka: &Locka, query: &str) {
    println!();
    for line in locka.render(query) {
        println!("{line}");
    }
}

/// The main loop's side of the reader thread.
struct Input {
    requests: Sender<()>,
    hidden: Arc<AtomicBool>,
}

impl Input {
    /// Prompt for a command and start reading it.
    fn ask_line(&self) {
        self.hidden.store(false, Ordering::SeqCst);
        print!("locka> ");
        let _ = io::stdout().flush();
        self.ask_again();
    }

    /// Switch the current or next read to hidden input.
    fn show_unlock_prompt(&self) {
        self.hidden.store(true, Ordering::SeqCst);
        print!("{UNLOCK_PROMPT}");
        let _ = io::stdout().flush();
    }

    fn ask_again(&self) {
        let _ = self.requests.send(());
    }
}

/// Own stdin for the life of the process and serve read requests.
fn spawn_reader(requests: Receiver<()>, events: Sender<ShellEvent>, hidden: Arc<AtomicBool>) {
    thread::spawn(move || {
        let term = Term::stdout();
        let keyed = io::stdin().is_terminal() && term.is_term();
        while requests.recv().is_ok() {
            let event = if keyed {
                read_keys(&term, &hidden)
            } else {
                read_plain(&hidden)
            };
            if events.send(event).is_err() {
                break;
            }
        }
    });
}

fn read_keys(term: &Term, hidden: &AtomicBool) -> ShellEvent {
    let mut editor = LineEditor::new(hidden.load(Ordering::SeqCst));
    loop {
        let key = match term.read_key() {
            Ok(key) => key,
            Err(_) => return closed(hidden.load(Ordering::SeqCst)),
        };
        match editor.feed(key, hidden.load(Ordering::SeqCst)) {
            Step::Echo(c) => {
                let _ = term.write_str(c.encode_utf8(&mut [0; 4]));
            }
            Step::Erase => {
                let _ = term.clear_chars(1);
            }
            Step::Pending => {}
            Step::Done(event) => {
                let _ = term.write_line("");
                return event;
            }
        }
    }
}

/// Piped input: whole lines, typed as secret or not when they complete.
fn read_plain(hidden: &AtomicBool) -> ShellEvent {
    let mut buf = Zeroizing::new(String::new());
    let read = io::stdin().lock().read_line(&mut buf);
    let secret = hidden.load(Ordering::SeqCst);
    match read {
        Ok(0) | Err(_) => closed(secret),
        Ok(_) => finish(buf.trim_end_matches(['\r', '\n']).to_string(), secret),
    }
}

fn finish(text: String, secret: bool) -> ShellEvent {
    if secret {
        ShellEvent::Secret(Some(Zeroizing::new(text)).filter(|pw| !pw.is_empty()))
    } else {
        ShellEvent::Line(text)
    }
}

fn closed(secret: bool) -> ShellEvent {
    if secret {
        ShellEvent::Secret(None)
    } else {
        ShellEvent::Closed
    }
}

/// What the terminal should show after one key.
#[derive(Debug, PartialEq, Eq)]
enum Step {
    Echo(char),
    Erase,
    Pending,
    Done(ShellEvent),
}

/// One line of keyboard input that may turn secret halfway through.
struct LineEditor {
    buf: Zeroizing<String>,
    secret: bool,
}

impl LineEditor {
    fn new(secret: bool) -> Self {
        Self {
            buf: Zeroizing::new(String::new()),
            secret,
        }
    }

    /// Apply `key`, typed while the input was (or was not) `secret`.
    ///
    /// A change of mode throws away what was typed so far.
    fn feed(&mut self, key: Key, secret: bool) -> Step {
        if secret != self.secret {
            self.buf.clear();
            self.secret = secret;
        }
        match key {
            Key::Enter => Step::Done(finish(std::mem::take(&mut *self.buf), secret)),
            Key::Backspace => match self.buf.pop() {
                Some(_) if !secret => Step::Erase,
                _ => Step::Pending,
            },
            Key::CtrlC => Step::Done(closed(secret)),
            Key::Escape if secret => Step::Done(closed(true)),
            Key::Char('\u{4}') if self.buf.is_empty() => Step::Done(closed(secret)),
            Key::Char(c) if !c.is_control() => {
                self.buf.push(c);
                if secret {
                    Step::Pending
                } else {
                    Step::Echo(c)
                }
            }
            _ => Step::Pending,
        }
    }
}

/// Run one shell command against the vault.
fn run_command(locka: &mut Locka, line: &str, query: &mut String) -> Result<Flow> {
    let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    match cmd {
        "" => {}
        "help" | "?" => println!("{HELP}"),
        "quit" | "exit" => return Ok(Flow::Quit),
        "list" | "search" => {
            locka.list_records()?;
            *query = rest.to_string();
        }
        "add" => {
            let record = prompt_record(locka, None)?;
            locka.add(record)?;
            output::success("Record added.");
        }
        "edit" => {
            let index = parse_index(rest)?;
            let current = locka.get(index)?.clone();
            let record = prompt_record(locka, Some(&current))?;
            locka.edit(index, record)?;
            output::success(&format!("Record #{} updated.", index + 1));
        }
        "delete" => {
            let index = parse_index(rest)?;
            let removed = locka.delete(index)?;
            output::success(&format!("Deleted '{}'.", removed.site));
        }
        "show" => locka.set_show_password(true)?,
        "hide" => locka.set_show_password(false)?,
        "save" => {
            locka.save()?;
            output::success("Vault saved.");
        }
        "lock" => {
            locka.lock();
            output::info("Session locked.");
            return Ok(Flow::Lock);
        }
        other => {
            return Err(LockaError::CommandFailed(format!(
                "unknown command '{other}', type `help`"
            )))
        }
    }
    Ok(Flow::Continue)
}

fn parse_index(arg: &str) -> Result<usize> {
    let position: usize = arg
        .parse()
        .map_err(|_| LockaError::CommandFailed(format!("expected a record number, got '{arg}'")))?;
    parse_position(position)
}

/// Ask for every field, offering the current values as defaults.
fn prompt_record(locka: &Locka, current: Option<&Record>) -> Result<Record> {
    let ask = |label: &str, initial: &str, allow_empty: bool| -> Result<String> {
        let value = dialoguer::Input::<String>::new()
            .with_prompt(label)
            .with_initial_text(initial)
            .allow_empty(allow_empty)
            .interact_text()
            .map_err(|e| LockaError::CommandFailed(format!("input prompt: {e}")))?;
        locka.touch_activity();
        Ok(value)
    };

    let site = ask("Site", current.map_or("", |r| r.site.as_str()), false)?;
    let id = ask("ID", current.map_or("", |r| r.id.as_str()), true)?;

    let password = dialoguer::Password::new()
        .with_prompt(if current.is_some() {
            "Password (empty keeps the current one)"
        } else {
            "Password"
        })
        .allow_empty_password(true)
        .interact()
        .map_err(|e| LockaError::CommandFailed(format!("password prompt: {e}")))?;
    locka.touch_activity();
    let password = match current {
        Some(r) if password.is_empty() => r.password.clone(),
        _ => password,
    };

    let tags = ask(
        "Tags (comma separated)",
        &current.map_or_else(String::new, |r| r.tags.join(", ")),
        true,
    )?;

    Ok(Record::new(site, id, password, parse_tags(&tags)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::kdf::{KdfKind, KdfParams};
    use crate::vault::VaultStore;
    use std::time::Duration;
    use tempfile::TempDir;

    fn open(dir: &TempDir) -> Locka {
        let store = VaultStore::new(
            dir.path().join("locka.enc"),
            KdfParams {
                kind: KdfKind::Pbkdf2Sha256,
                iterations: 1_000,
            },
        );
        Locka::open(store, "pw", Duration::from_secs(120)).unwrap()
    }

    #[test]
    fn list_sets_and_clears_filter() {
        let dir = TempDir::new().unwrap();
        let mut locka = open(&dir);
        let mut query = String::new();

        run_command(&mut locka, "list git", &mut query).unwrap();
        assert_eq!(query, "git");
        run_command(&mut locka, "list", &mut query).unwrap();
        assert_eq!(query, "");
    }

    #[test]
    fn commands_refused_while_locked() {
        let dir = TempDir::new().unwrap();
        let mut locka = open(&dir);
        let mut query = String::new();
        locka.lock();

        assert!(matches!(
            run_command(&mut locka, "show", &mut query),
            Err(LockaError::SessionLocked)
        ));
        assert!(matches!(
            run_command(&mut locka, "list x", &mut query),
            Err(LockaError::SessionLocked)
        ));
        assert_eq!(query, "");
    }

    #[test]
    fn quit_and_unknown_commands() {
        let dir = TempDir::new().unwrap();
        let mut locka = open(&dir);
        let mut query = String::new();

        assert_eq!(run_command(&mut locka, "quit", &mut query).unwrap(), Flow::Quit);
        assert_eq!(run_command(&mut locka, "", &mut query).unwrap(), Flow::Continue);
        assert!(run_command(&mut locka, "frobnicate", &mut query).is_err());
        assert!(run_command(&mut locka, "delete zero", &mut query).is_err());
        assert!(matches!(
            run_command(&mut locka, "delete 1", &mut query),
            Err(LockaError::RecordNotFound(0))
        ));
    }

    fn type_text(editor: &mut LineEditor, text: &str, secret: bool) -> Vec<Step> {
        text.chars().map(|c| editor.feed(Key::Char(c), secret)).collect()
    }

    #[test]
    fn command_line_is_echoed_and_editable() {
        let mut editor = LineEditor::new(false);
        assert_eq!(
            type_text(&mut editor, "lsx", false),
            vec![Step::Echo('l'), Step::Echo('s'), Step::Echo('x')]
        );
        assert_eq!(editor.feed(Key::Backspace, false), Step::Erase);
        assert_eq!(
            editor.feed(Key::Enter, false),
            Step::Done(ShellEvent::Line("ls".into()))
        );
    }

    #[test]
    fn lock_mid_line_drops_typed_text_and_hides_the_rest() {
        let mut editor = LineEditor::new(false);
        type_text(&mut editor, "delete 1", false);

        assert!(type_text(&mut editor, "pw", true)
            .iter()
            .all(|step| *step == Step::Pending));
        assert_eq!(editor.feed(Key::Backspace, true), Step::Pending);
        type_text(&mut editor, "w", true);
        assert_eq!(
            editor.feed(Key::Enter, true),
            Step::Done(ShellEvent::Secret(Some(Zeroizing::new("pw".into()))))
        );
    }

    #[test]
    fn empty_or_escaped_unlock_prompt_cancels() {
        let mut editor = LineEditor::new(true);
        assert_eq!(
            editor.feed(Key::Enter, true),
            Step::Done(ShellEvent::Secret(None))
        );

        let mut editor = LineEditor::new(true);
        type_text(&mut editor, "half", true);
        assert_eq!(
            editor.feed(Key::Escape, true),
            Step::Done(ShellEvent::Secret(None))
        );
    }

    #[test]
    fn end_of_input_closes_only_an_empty_line() {
        let mut editor = LineEditor::new(false);
        assert_eq!(editor.feed(Key::Backspace, false), Step::Pending);
        assert_eq!(
            editor.feed(Key::Char('\u{4}'), false),
            Step::Done(ShellEvent::Closed)
        );

        let mut editor = LineEditor::new(false);
        type_text(&mut editor, "ls", false);
        assert_eq!(editor.feed(Key::Char('\u{4}'), false), Step::Pending);
        assert_eq!(editor.feed(Key::Escape, false), Step::Pending);
    }

    #[test]
    fn lock_command_asks_for_the_passphrase() {
        let dir = TempDir::new().unwrap();
        let mut locka = open(&dir);
        let mut query = String::new();

        assert_eq!(run_command(&mut locka, "lock", &mut query).unwrap(), Flow::Lock);
        assert!(locka.is_locked());
    }
}
