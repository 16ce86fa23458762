//! Fuzz target: `LineAssembler::push` + `Dispatcher::decode`
//!
//! Drives arbitrary byte sequences through the inbound path exactly as the
//! transport does and asserts that it never panics, never yields a line
//! longer than the receive buffer, and accounts for every line it yields.
//!
//! cargo fuzz run fuzz_line_decoder

#![no_main]

use feedercam::link::codec::{LineAssembler, LineOutcome, RX_BUF_SIZE};
use feedercam::protocol::Dispatcher;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut asm = LineAssembler::new();
    let mut dispatcher = Dispatcher::new();
    let mut lines = 0u32;

    for &byte in data {
        if let Some(LineOutcome::Line(line)) = asm.push(byte) {
            assert!(line.len() <= RX_BUF_SIZE, "line exceeds RX_BUF_SIZE");
            lines += 1;
            let _ = dispatcher.decode(&line);
        }
        assert!(asm.pending() <= RX_BUF_SIZE);
    }
    assert_eq!(dispatcher.decoded() + dispatcher.dropped(), lines);

    // After a reset the assembler must accept bytes cleanly again.
    asm.reset();
    assert_eq!(asm.pending(), 0);
    for &byte in data {
        let _ = asm.push(byte);
    }
});
