//! First-seen-wins deduplication over generated report blocks.

use proptest::prelude::*;
use vglog_filter::{canon, LogFilter, Options};

#[derive(Clone, Debug)]
struct GenBlock {
    header: String,
    frames: Vec<String>,
}

fn gen_block() -> impl Strategy<Value = GenBlock> {
    let header = proptest::sample::select(vec![
        "Invalid read of size 4",
        "Invalid write of size 8",
        "Conditional jump or move depends on uninitialised value(s)",
        "Use of uninitialised value of size 8",
    ]);
    let frames = proptest::collection::vec("[a-z]{2,10}", 1..4);
    (header, frames).prop_map(|(header, frames)| GenBlock {
        header: header.to_string(),
        frames,
    })
}

fn render(blocks: &[GenBlock]) -> Vec<Vec<u8>> {
    let mut lines = Vec::new();
    for (i, block) in blocks.iter().enumerate() {
        lines.push(format!("==11== {}", block.header).into_bytes());
        for (j, frame) in block.frames.iter().enumerate() {
            lines.push(
                format!("==11==    at 0x{:x}: {} (src.c:{})", i * 16 + j + 1, frame, j + 1)
                    .into_bytes(),
            );
        }
    }
    lines
}

/// Depth-0 signature of one block, mirroring the emitted raw form.
fn full_key(block: &GenBlock) -> Vec<u8> {
    let mut key = Vec::new();
    key.extend_from_slice(&canon(block.header.as_bytes()));
    key.push(b'\n');
    for (j, frame) in block.frames.iter().enumerate() {
        let line = format!("at 0xdead: {} (src.c:{})", frame, j + 1);
        key.extend_from_slice(&canon(line.as_bytes()));
        key.push(b'\n');
    }
    key
}

proptest! {
    /// With depth 0, the number of emitted blocks equals the number of
    /// distinct full signatures, and emission order is first-seen.
    #[test]
    fn emitted_blocks_are_distinct_and_first_seen(blocks in proptest::collection::vec(gen_block(), 0..12)) {
        let opt = Options {
            trim: false,
            depth: 0,
            ..Options::default()
        };
        let mut out = Vec::new();
        let stats = LogFilter::new(opt, &mut out)
            .run_buffered(&render(&blocks))
            .unwrap();

        let mut seen = std::collections::HashSet::new();
        let mut expected_order = Vec::new();
        for block in &blocks {
            if seen.insert(full_key(block)) {
                expected_order.push(block.clone());
            }
        }
        prop_assert_eq!(stats.blocks_emitted as usize, expected_order.len());
        prop_assert_eq!(
            stats.blocks_suppressed as usize,
            blocks.len() - expected_order.len()
        );

        // The emitted headers appear in first-seen input order.
        let text = String::from_utf8(out).unwrap();
        let emitted_headers: Vec<&str> = text
            .split_terminator("\n\n")
            .map(|b| b.lines().next().unwrap())
            .collect();
        let expected_headers: Vec<String> =
            expected_order.iter().map(|b| b.header.clone()).collect();
        prop_assert_eq!(emitted_headers, expected_headers);
    }

    /// Depth 1 collapses every block sharing a header.
    #[test]
    fn depth_one_keys_on_the_header(blocks in proptest::collection::vec(gen_block(), 1..12)) {
        let opt = Options {
            trim: false,
            depth: 1,
            ..Options::default()
        };
        let mut out = Vec::new();
        let stats = LogFilter::new(opt, &mut out)
            .run_buffered(&render(&blocks))
            .unwrap();

        let distinct_headers: std::collections::HashSet<&str> =
            blocks.iter().map(|b| b.header.as_str()).collect();
        prop_assert_eq!(stats.blocks_emitted as usize, distinct_headers.len());
    }

    /// Every emitted block ends with exactly one blank line.
    #[test]
    fn block_framing_is_exact(blocks in proptest::collection::vec(gen_block(), 1..8)) {
        let opt = Options {
            trim: false,
            depth: 0,
            ..Options::default()
        };
        let mut out = Vec::new();
        LogFilter::new(opt, &mut out)
            .run_buffered(&render(&blocks))
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        if !text.is_empty() {
            prop_assert!(text.ends_with("\n\n"));
            prop_assert!(!text.contains("\n\n\n"));
        }
    }
}
