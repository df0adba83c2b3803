#![no_main]

use blame_track::{
    Edit, TrackConfig, TrackState, Transform, blame::validate_blame_map, span::Span,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let data = if data.len() > 16 * 1024 {
        &data[..16 * 1024]
    } else {
        data
    };

    let config = TrackConfig {
        verify_base: true,
        verify_coverage: true,
    };

    let mut doc = String::from("seed text");
    let mut state = TrackState::<Edit>::from_doc(&doc);
    // `boundaries[i]` is the document just before commit `i`.
    let mut boundaries = vec![doc.clone()];

    for chunk in data.chunks_exact(4) {
        let &[op, a, b, c] = chunk else {
            unreachable!()
        };

        if op % 4 < 2 {
            let next = if op % 4 == 0 {
                state.apply_commit(format!("commit {}", boundaries.len()), i64::from(c))
            } else {
                state.apply_hidden_commit("hidden", i64::from(c))
            };
            if next.commits().len() > state.commits().len() {
                boundaries.push(doc.clone());
            }
            state = next;
            continue;
        }

        let mut tr = Transform::<Edit>::new(doc.clone());
        let len = tr.doc().len();
        let start = usize::from(a) % (len + 1);
        let end = start + usize::from(b) % (len - start + 1);
        let text = char::from(b'a' + c % 26).to_string().repeat(usize::from(c % 5));
        tr.replace(start, end, text).expect("ascii edit in bounds");

        if op % 4 == 3 {
            let at = usize::from(b) % (tr.doc().len() + 1);
            tr.insert(at, "+").expect("ascii insert in bounds");
        }

        state = state
            .try_apply_transform(&tr, &config)
            .expect("transform built on the live document");
        doc = tr.into_doc();

        if !doc.is_empty() {
            validate_blame_map(state.blame_map(), doc.len()).expect("blame map covers document");
        }
    }

    for (index, expected) in boundaries.iter().enumerate() {
        let restored = state.revision(&doc, index).expect("revision in range");
        assert_eq!(&restored, expected, "revision {index}");
    }
    assert!(state.revision(&doc, boundaries.len()).is_err());

    // Any panic here is a bug we want the fuzzer to catch.
    let json = serde_json::to_string(state.blame_map()).expect("blame map serializes");
    let spans: Vec<Span> = serde_json::from_str(&json).expect("blame map deserializes");
    assert_eq!(spans.as_slice(), state.blame_map());

    let json = serde_json::to_string(&state).expect("state serializes");
    let restored: TrackState<Edit> = serde_json::from_str(&json).expect("state deserializes");
    assert_eq!(restored, state);
});
