//! Fuzz target for line parsing
//!
//! Feeds arbitrary frames through the frame splitter and the line parser and
//! checks that neither panics, and that anything that parses also survives
//! serialization.

#![no_main]

use libfuzzer_sys::fuzz_target;
use slirc_tmi::transport::split_lines;
use slirc_tmi::Message;
use std::str;

fuzz_target!(|data: &[u8]| {
    // Frames are text; skip invalid UTF-8
    if let Ok(input) = str::from_utf8(data) {
        if input.len() > 8192 {
            return;
        }

        for line in split_lines(input) {
            if let Ok(msg) = Message::parse(line) {
                let serialized = msg.to_string();
                let _ = Message::parse(&serialized);
            }
        }
    }
});
