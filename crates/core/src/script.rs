//! Line-based edit scripts.
//!
//! Scripts describe a tracked editing session over plain text. They drive the fixture tests,
//! the `replay` example and the fuzz targets' reproductions.
//!
//! ```text
//! # comments and blank lines are ignored
//! doc The quick fox          initial document (only before the first edit)
//! insert 10 brown            insert text at a byte offset
//! delete 0 4                 delete a byte range
//! replace 0 3 A              replace a byte range (text may be empty)
//! begin                      group the following edits into one transform...
//! end                        ...until here
//! commit 1000 first draft    seal uncommitted steps: time, then message
//! hide 1001 autosave         same, but the commit is hidden
//! ```
//!
//! Text arguments run to the end of the line; `\n` and `\\` are unescaped. Edits outside a
//! `begin`/`end` block are folded as single-step transforms.

use crate::{
    TrackError,
    edit::Edit,
    track::{TrackConfig, TrackState},
    transform::Transform,
};

/// One parsed script instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOp {
    Doc(String),
    Edit(Edit),
    Begin,
    End,
    Commit {
        time: i64,
        message: String,
        hidden: bool,
    },
}

/// A script instruction with its 1-based source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLine {
    pub line: usize,
    pub op: ScriptOp,
}

/// Result of replaying a script.
#[derive(Debug, Clone)]
pub struct Replay {
    /// The document the session started from.
    pub initial: String,
    /// The live document at the end of the script.
    pub doc: String,
    pub state: TrackState<Edit>,
}

/// Parse `source` into instructions.
pub fn parse_script(source: &str) -> Result<Vec<ScriptLine>, TrackError> {
    let mut out = Vec::new();
    for (idx, raw) in source.lines().enumerate() {
        let line = idx + 1;
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        if raw.trim().is_empty() || raw.trim_start().starts_with('#') {
            continue;
        }
        let op = parse_line(raw).map_err(|message| TrackError::Script { line, message })?;
        out.push(ScriptLine { line, op });
    }
    Ok(out)
}

fn parse_line(raw: &str) -> Result<ScriptOp, String> {
    let (keyword, rest) = raw.split_once(' ').unwrap_or((raw, ""));
    match keyword {
        "doc" => Ok(ScriptOp::Doc(unescape(rest))),
        "begin" => Ok(ScriptOp::Begin),
        "end" => Ok(ScriptOp::End),
        "insert" => {
            let (at, text) = next_number(rest)?;
            Ok(ScriptOp::Edit(Edit::insert(at, unescape(text))))
        }
        "delete" => {
            let (start, rest) = next_number(rest)?;
            let (end, _) = next_number(rest)?;
            Ok(ScriptOp::Edit(Edit::delete(start, end)))
        }
        "replace" => {
            let (start, rest) = next_number(rest)?;
            let (end, text) = next_number(rest)?;
            Ok(ScriptOp::Edit(Edit::replace(start, end, unescape(text))))
        }
        "commit" | "hide" => {
            let (time, message) = rest.split_once(' ').unwrap_or((rest, ""));
            let time = time
                .parse::<i64>()
                .map_err(|e| format!("invalid time {time:?}: {e}"))?;
            Ok(ScriptOp::Commit {
                time,
                message: unescape(message),
                hidden: keyword == "hide",
            })
        }
        other => Err(format!("unknown instruction {other:?}")),
    }
}

/// Split a leading decimal number off `s`, returning it and the remainder after one space.
fn next_number(s: &str) -> Result<(usize, &str), String> {
    let (num, rest) = s.split_once(' ').unwrap_or((s, ""));
    let value = num
        .parse::<usize>()
        .map_err(|e| format!("invalid offset {num:?}: {e}"))?;
    Ok((value, rest))
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Parse and replay `source`.
pub fn replay_script(source: &str, config: &TrackConfig) -> Result<Replay, TrackError> {
    replay(&parse_script(source)?, config)
}

/// Replay parsed instructions from an empty document.
pub fn replay(lines: &[ScriptLine], config: &TrackConfig) -> Result<Replay, TrackError> {
    let mut initial = String::new();
    let mut doc = String::new();
    let mut state = TrackState::<Edit>::default();
    let mut started = false;
    let mut batch: Option<(usize, Transform<Edit>)> = None;

    for &ScriptLine { line, ref op } in lines {
        let at_line = |e: TrackError| script_error(line, e.to_string());
        match op {
            ScriptOp::Doc(text) => {
                if started {
                    return Err(script_error(line, "doc must come before the first edit"));
                }
                initial = text.clone();
                doc = text.clone();
                state = TrackState::from_doc(&doc);
            }
            ScriptOp::Begin => {
                if batch.is_some() {
                    return Err(script_error(line, "nested begin"));
                }
                started = true;
                batch = Some((line, Transform::new(doc.clone())));
            }
            ScriptOp::Edit(edit) => {
                started = true;
                match batch.as_mut() {
                    Some((_, tr)) => {
                        tr.step(edit.clone()).map_err(at_line)?;
                    }
                    None => {
                        let mut tr = Transform::new(doc.clone());
                        tr.step(edit.clone()).map_err(at_line)?;
                        state = state.try_apply_transform(&tr, config).map_err(at_line)?;
                        doc = tr.into_doc();
                    }
                }
            }
            ScriptOp::End => {
                let Some((_, tr)) = batch.take() else {
                    return Err(script_error(line, "end without begin"));
                };
                state = state.try_apply_transform(&tr, config).map_err(at_line)?;
                doc = tr.into_doc();
            }
            ScriptOp::Commit {
                time,
                message,
                hidden,
            } => {
                if batch.is_some() {
                    return Err(script_error(line, "commit inside begin/end"));
                }
                started = true;
                state = if *hidden {
                    state.apply_hidden_commit(message.as_str(), *time)
                } else {
                    state.apply_commit(message.as_str(), *time)
                };
            }
        }
    }

    if let Some((line, _)) = batch {
        return Err(script_error(line, "begin without end"));
    }
    Ok(Replay {
        initial,
        doc,
        state,
    })
}

fn script_error(line: usize, message: impl Into<String>) -> TrackError {
    TrackError::Script {
        line,
        message: message.into(),
    }
}
