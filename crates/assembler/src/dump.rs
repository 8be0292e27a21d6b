//! Text dumps of final simulator state.
//!
//! Dumps use the binary-string style of the assembler's output so that
//! [`crate::compare`] can diff them: one byte per line, annotated with a
//! `//` comment naming the cell.

use simulator_core::{
    DataAddress, DataValue, MemorySnapshot, RegisterFileSnapshot, DATA_ADDRESS_SPACE,
};

/// Dumps data memory, one `bbbbbbbb // 0xAAA` line per cell.
///
/// With `full`, every address is listed and unwritten cells read as zero;
/// otherwise only written cells appear, in address order.
#[must_use]
pub fn data_memory_dump(memory: &MemorySnapshot<DataAddress, DataValue>, full: bool) -> String {
    let mut out = String::new();
    if full {
        out.push_str(&format!(
            "// Data memory: {DATA_ADDRESS_SPACE} bytes (unwritten cells read as zero)\n"
        ));
        for address in (0..=DataAddress::MASK).map(DataAddress::wrapping) {
            let value = memory.get(address).unwrap_or(DataValue::ZERO);
            out.push_str(&memory_line(address, value));
        }
    } else {
        out.push_str(&format!(
            "// Data memory: {} written cells\n",
            memory.cells.len()
        ));
        for (&address, &value) in memory.cells.iter() {
            out.push_str(&memory_line(address, value));
        }
    }
    out
}

fn memory_line(address: DataAddress, value: DataValue) -> String {
    format!("{:08b} // 0x{:03X}\n", value.unsigned(), address.value())
}

/// Dumps every register, one `bbbbbbbb // NAME` line each.
#[must_use]
pub fn register_dump(registers: &RegisterFileSnapshot) -> String {
    let mut out = String::from("// Register file\n");
    for (register, value) in registers.iter() {
        out.push_str(&format!("{:08b} // {}\n", value.unsigned(), register.name()));
    }
    out
}

#[cfg(test)]
mod tests {
    use simulator_core::{DataValue, Register, SimConfig, Simulator};

    use super::{data_memory_dump, register_dump};
    use crate::assembler::Assembler;

    fn run(source: &str) -> Simulator {
        let mut simulator = Simulator::new(SimConfig::zero_latency());
        simulator
            .load_program(source, &Assembler)
            .expect("valid program");
        simulator.run_until_halt(Some(1_000)).expect("halts");
        simulator
    }

    #[test]
    fn written_cells_only() {
        let simulator = run("SET 3\nPUT DOFF\nSET 0xA5\nSTORE\nHALT");
        let dump = data_memory_dump(&simulator.current_state().modules.data_memory, false);
        assert_eq!(dump, "// Data memory: 1 written cells\n10100101 // 0x003\n");
    }

    #[test]
    fn full_dump_covers_the_address_space() {
        let simulator = run("SET 1\nSTORE\nHALT");
        let dump = data_memory_dump(&simulator.current_state().modules.data_memory, true);
        let lines: Vec<_> = dump.lines().collect();
        assert_eq!(lines.len(), 4097);
        assert_eq!(lines[1], "00000001 // 0x000");
        assert_eq!(lines[2], "00000000 // 0x001");
        assert_eq!(lines[4096], "00000000 // 0xFFF");
    }

    #[test]
    fn register_dump_names_each_register() {
        let simulator = run("SET 0x81\nPUT R7\nHALT");
        let state = simulator.current_state();
        assert_eq!(state.register(Register::R7), DataValue::new(0x81));
        let dump = register_dump(&state.modules.register_file);
        assert!(dump.contains("10000001 // R7\n"));
        assert!(dump.contains("10000001 // ACC\n"));
        assert_eq!(dump.lines().count(), 15);
    }
}
