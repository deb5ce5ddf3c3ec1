//! Fuzz target: `LightCommand::parse`
//!
//! Feeds arbitrary bytes (lossily decoded as UTF-8) into the request
//! parser.  It must never panic, and any accepted channel request must
//! address a channel inside the bank.
//!
//! cargo fuzz run fuzz_command_parser

#![no_main]

use libfuzzer_sys::fuzz_target;
use lightshow::app::commands::LightCommand;
use lightshow::channels::CHANNEL_COUNT;

fuzz_target!(|data: &[u8]| {
    let line = String::from_utf8_lossy(data);
    if let Ok(LightCommand::SetChannel { index, .. }) = LightCommand::parse(&line) {
        assert!(index < CHANNEL_COUNT, "parser produced index {index}");
    }
});
