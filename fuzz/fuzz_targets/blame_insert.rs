#![no_main]

use blame_track::{
    blame::{insert_into_blame_map, validate_blame_map},
    span::Span,
};
use libfuzzer_sys::fuzz_target;

const LEN: usize = 64;

fuzz_target!(|data: &[u8]| {
    let mut map = vec![Span::new(0, LEN, None)];
    // Attribution of every position, painted naively.
    let mut model = [None; LEN];

    for chunk in data.chunks_exact(3) {
        let from = usize::from(chunk[0]) % (LEN + 1);
        let to = usize::from(chunk[1]) % (LEN + 1);
        let commit = usize::from(chunk[2] % 8);

        insert_into_blame_map(&mut map, from, to, commit);
        if from < to {
            model[from..to].fill(Some(commit));
        }

        validate_blame_map(&map, LEN).expect("painting keeps the map contiguous");
        let painted: Vec<_> = map
            .iter()
            .flat_map(|span| (span.from..span.to).map(move |_| span.commit))
            .collect();
        assert_eq!(painted.as_slice(), model.as_slice());
    }
});
