//! wasm-bindgen exports.
//!
//! This module exposes change tracking over plain text to JavaScript via `wasm-bindgen`.
//! The host keeps one [`TrackedText`] per document, feeds it each edit batch, and seals commits
//! when it wants a named revision. The tracking logic lives in the `blame-track` crate.

use wasm_bindgen::prelude::*;

use blame_track::{
    Edit, Span, TrackConfig as TrackConfigInner, TrackError, TrackState, Transform,
};

/// Checks applied to every edit batch.
#[derive(Debug, Clone, Copy, Default, serde::Deserialize, tsify::Tsify)]
#[tsify(from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct TrackConfig {
    /// Reject batches computed against a different document length
    pub verify_base: bool,
    /// Check that the blame map still covers the whole document after each batch
    pub verify_coverage: bool,
}

impl From<TrackConfig> for TrackConfigInner {
    fn from(val: TrackConfig) -> Self {
        TrackConfigInner {
            verify_base: val.verify_base,
            verify_coverage: val.verify_coverage,
        }
    }
}

/// One byte-range replacement, in the coordinates left by the previous edit of the batch.
#[derive(Debug, Clone, serde::Deserialize, tsify::Tsify)]
pub struct TextEdit {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// Edits applied together as one transform.
#[derive(Debug, Clone, serde::Deserialize, tsify::Tsify)]
#[tsify(from_wasm_abi)]
pub struct EditBatch {
    pub edits: Vec<TextEdit>,
}

/// A blame map range; `commit` is absent for content no commit produced.
#[derive(Debug, Clone, PartialEq, serde::Serialize, tsify::Tsify)]
pub struct BlameSpan {
    pub from: usize,
    pub to: usize,
    pub commit: Option<usize>,
}

impl From<&Span> for BlameSpan {
    fn from(span: &Span) -> Self {
        BlameSpan {
            from: span.from,
            to: span.to,
            commit: span.commit,
        }
    }
}

/// The blame map of the live document.
#[derive(Debug, Clone, serde::Serialize, tsify::Tsify)]
#[tsify(into_wasm_abi)]
pub struct BlameOutput {
    pub spans: Vec<BlameSpan>,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct CommitInfo {
    id: usize,
    message: String,
    time: f64,
    step_count: usize,
    hidden: bool,
}

/// A text document with tracked history.
#[wasm_bindgen]
pub struct TrackedText {
    text: String,
    state: TrackState<Edit>,
    config: TrackConfigInner,
}

#[wasm_bindgen]
impl TrackedText {
    /// Start tracking `text`; all of it is attributed to no commit.
    #[wasm_bindgen(constructor)]
    pub fn new(text: String, config: TrackConfig) -> TrackedText {
        console_error_panic_hook::set_once();

        TrackedText {
            state: TrackState::from_doc(&text),
            text,
            config: config.into(),
        }
    }

    /// The live document.
    #[wasm_bindgen(getter)]
    pub fn text(&self) -> String {
        self.text.clone()
    }

    /// Apply one batch of edits. On error nothing changes.
    pub fn apply(&mut self, batch: EditBatch) -> Result<(), JsValue> {
        let (text, state) =
            apply_batch(&self.text, &self.state, &self.config, batch).map_err(to_js)?;
        self.text = text;
        self.state = state;
        Ok(())
    }

    /// Seal uncommitted edits. `time` defaults to `Date.now()`. Returns whether a commit was
    /// created.
    pub fn commit(&mut self, message: String, time: Option<f64>) -> bool {
        let time = time.unwrap_or_else(js_sys::Date::now) as i64;
        self.seal(self.state.apply_commit(message, time))
    }

    /// Like `commit`, but the commit is hidden from `commits()`.
    #[wasm_bindgen(js_name = commitHidden)]
    pub fn commit_hidden(&mut self, message: String, time: Option<f64>) -> bool {
        let time = time.unwrap_or_else(js_sys::Date::now) as i64;
        self.seal(self.state.apply_hidden_commit(message, time))
    }

    pub fn blame(&self) -> BlameOutput {
        blame_output(&self.state)
    }

    /// Every commit, hidden ones included, as `{ id, message, time, stepCount, hidden }`
    /// objects.
    pub fn commits(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&commit_infos(&self.state))
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// The document as it was just before commit `index`.
    pub fn revision(&self, index: usize) -> Result<String, JsValue> {
        self.state.revision(&self.text, index).map_err(to_js)
    }

    /// The whole tracking state (blame map, commits, uncommitted steps) for host-side storage.
    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.state).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

impl TrackedText {
    fn seal(&mut self, next: TrackState<Edit>) -> bool {
        let sealed = next.commits().len() > self.state.commits().len();
        self.state = next;
        sealed
    }
}

fn apply_batch(
    text: &str,
    state: &TrackState<Edit>,
    config: &TrackConfigInner,
    batch: EditBatch,
) -> Result<(String, TrackState<Edit>), TrackError> {
    let mut tr = Transform::new(text.to_string());
    for edit in batch.edits {
        tr.replace(edit.start, edit.end, edit.text)?;
    }
    let state = state.try_apply_transform(&tr, config)?;
    Ok((tr.into_doc(), state))
}

fn blame_output(state: &TrackState<Edit>) -> BlameOutput {
    BlameOutput {
        spans: state.blame_map().iter().map(BlameSpan::from).collect(),
    }
}

fn commit_infos(state: &TrackState<Edit>) -> Vec<CommitInfo> {
    state
        .commits()
        .iter()
        .enumerate()
        .map(|(id, c)| CommitInfo {
            id,
            message: c.message.clone(),
            time: c.time as f64,
            step_count: c.len(),
            hidden: c.hidden,
        })
        .collect()
}

fn to_js(e: TrackError) -> JsValue {
    JsValue::from_str(&e.to_string())
}
