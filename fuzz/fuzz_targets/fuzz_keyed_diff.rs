#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use weft_harness::MemoryHost;
use weft_harness::fixtures::mixed_list;
use weft_render::{NodeId, Renderer};

#[derive(Arbitrary, Debug)]
struct Transition {
    lists: Vec<Vec<u8>>,
}

/// Keys as a list without duplicates, in first-seen order.
fn unique(raw: &[u8]) -> Vec<u32> {
    let mut seen = [false; 256];
    raw.iter()
        .take(64)
        .filter(|&&k| !std::mem::replace(&mut seen[usize::from(k)], true))
        .map(|&k| u32::from(k))
        .collect()
}

fn fresh(keys: &[u32]) -> (Renderer<MemoryHost>, NodeId) {
    let mut renderer = Renderer::new(MemoryHost::new());
    let root = renderer.host().root();
    renderer
        .render(Some(mixed_list(keys)), root)
        .expect("mixed lists are always renderable");
    (renderer, root)
}

fuzz_target!(|input: Transition| {
    let mut renderer = Renderer::new(MemoryHost::new());
    let root = renderer.host().root();

    for raw in input.lists.iter().take(8) {
        let keys = unique(raw);
        let stats = renderer
            .render(Some(mixed_list(&keys)), root)
            .expect("mixed lists are always renderable");
        assert!(stats.moved <= keys.len());

        let (expected, expected_root) = fresh(&keys);
        assert_eq!(
            renderer.host().serialize(root),
            expected.host().serialize(expected_root),
            "patched markup diverged for {keys:?}"
        );
    }

    renderer.render(None, root).expect("unmount");
    assert!(renderer.host().children(root).is_empty());
});
