#![no_main]

use libfuzzer_sys::fuzz_target;
use simulator_core::{decode, InstructionWord, SimConfig, Simulator};

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let word = InstructionWord::from_le_bytes([data[0], data[1]]);
    if let Ok(instruction) = decode(word) {
        assert_eq!(decode(instruction.encode()), Ok(instruction));
    }

    let image = &data[..data.len().min(64)];
    let mut simulator = Simulator::new(SimConfig::zero_latency());
    if simulator.load_binary(image).is_ok() {
        let _ = simulator.run_until_halt(Some(256));
    }
});
