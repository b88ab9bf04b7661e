use std::io::{self, Write};
use std::sync::mpsc::{Receiver, Sender};
use std::thread::JoinHandle;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{debug, error, warn};

use super::error::{LpmError, Result};
use super::parser::{parse_entry, parse_query, NO_MATCH};
use super::routing_trie::PrefixTrie;
use super::Command;

const USAGE: &str = "Commands: add <a.b.c.d/len> <routing>, lookup <a.b.c.d>, lr, exit";

/// Turn one console line into a command. `Ok(None)` for a blank line, `Err`
/// with a message to show the user otherwise.
pub fn parse_command(line_no: usize, line: &str) -> std::result::Result<Option<Command>, String> {
    let args: Vec<&str> = line.split_whitespace().collect();
    if args.is_empty() {
        return Ok(None);
    }

    match args[0] {
        "add" => {
            if args.len() == 3 {
                let entry = parse_entry(line_no, &args[1..].join(" ")).map_err(|e| e.to_string())?;
                Ok(Some(Command::AddRoute(entry.prefix, entry.routing_number)))
            } else {
                Err("Usage: add <a.b.c.d/len> <routing>".to_string())
            }
        }
        "lookup" | "l" => {
            if args.len() == 2 {
                let addr = parse_query(line_no, args[1]).map_err(|e| e.to_string())?;
                Ok(Some(Command::Lookup(addr)))
            } else {
                Err("Usage: lookup <a.b.c.d>".to_string())
            }
        }
        "lr" => Ok(Some(Command::ListRoutes)),
        "exit" => Ok(Some(Command::Exit)),
        "help" => Err(USAGE.to_string()),
        _ => Err(format!("Unknown command: {}", args[0])),
    }
}

/// Read commands from the terminal and send them to the trie owner.
pub fn repl(sender: Sender<Command>) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    let mut line_no = 0;

    loop {
        match rl.readline("> ") {
            Ok(line) => {
                line_no += 1;
                if let Err(e) = rl.add_history_entry(line.as_str()) {
                    debug!("could not record history entry: {}", e);
                }
                match parse_command(line_no, &line) {
                    Ok(Some(command)) => {
                        let exit = command == Command::Exit;
                        if sender.send(command).is_err() || exit {
                            break;
                        }
                    }
                    Ok(None) => continue,
                    Err(message) => println!("{}", message),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                let _ = sender.send(Command::Exit);
                break;
            }
            Err(err) => {
                let _ = sender.send(Command::Exit);
                return Err(err.into());
            }
        }
    }
    Ok(())
}

/// Wait for the console thread. A panic in it is reported as an error.
pub fn join_repl(handle: JoinHandle<Result<()>>) -> Result<()> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => {
            error!("console thread panicked");
            Err(LpmError::Io(io::Error::other("console thread panicked")))
        }
    }
}

/// Owns the trie for an interactive session and applies commands one at a
/// time, so the trie is only ever mutated from this thread.
#[derive(Debug, Default)]
pub struct RouteConsole {
    trie: PrefixTrie,
}

impl RouteConsole {
    pub fn new(trie: PrefixTrie) -> Self {
        RouteConsole { trie }
    }

    pub fn trie(&self) -> &PrefixTrie {
        &self.trie
    }

    pub fn into_trie(self) -> PrefixTrie {
        self.trie
    }

    /// Apply one command, writing its output. Returns `false` once the
    /// session should end.
    pub fn handle<W: Write>(&mut self, command: Command, out: &mut W) -> Result<bool> {
        match command {
            Command::AddRoute(prefix, routing_number) => {
                match self.trie.insert_prefix(prefix, routing_number) {
                    Ok(Some(old)) => writeln!(out, "Replaced {} ({} -> {})", prefix.trunc(), old, routing_number)?,
                    Ok(None) => writeln!(out, "Added {} -> {}", prefix.trunc(), routing_number)?,
                    Err(e) => {
                        warn!(%prefix, "rejected route: {}", e);
                        writeln!(out, "Error: {}", e)?;
                    }
                }
            }
            Command::Lookup(addr) => match self.trie.longest_match(addr) {
                Some((prefix, routing_number)) => writeln!(out, "{} via {}", routing_number, prefix)?,
                None => writeln!(out, "{}", NO_MATCH)?,
            },
            Command::ListRoutes => {
                writeln!(out, "Prefix              Routing")?;
                for (prefix, routing_number) in self.trie.routes() {
                    writeln!(out, "{:<19} {}", prefix.to_string(), routing_number)?;
                }
            }
            Command::Exit => return Ok(false),
        }
        Ok(true)
    }

    /// Process commands until `Exit` arrives or the sender hangs up.
    pub fn listen_for_commands<W: Write>(&mut self, receiver: Receiver<Command>, out: &mut W) -> Result<()> {
        while let Ok(command) = receiver.recv() {
            debug!(?command, "console command");
            if !self.handle(command, out)? {
                break;
            }
            out.flush()?;
        }
        Ok(())
    }
}
