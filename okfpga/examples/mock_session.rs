//! In this example, we bring up a design on a mocked board: program it, poke a few registers,
//! retune a clock and pull data out of a pipe.

use anyhow::bail;
use okfpga::prelude::*;
use okfpga_utils::bitstream::Bitstream;

const REGISTERS: &str = "\
#,Direction,Type,Name,Address,Width,Description,Unit,Default,Offset
,FromPC,Wire,reset,00,1,Core reset,,1,0
,FromPC,Wire,decimation,00,8,Decimation factor,,1,8
,ToPC,Wire,echo,20,32,Wire-in 0 as seen by the fabric,,,0
,FromPC,Trigger,arm,40,1,Arm the capture,,,0
,ToPC,BTPipe,capture,a0,16,Captured samples,,,0
";

fn main() -> anyhow::Result<()> {
    // The mock echoes wire-in N on wire-out N + 0x20, like a loopback test design
    let mut transport = Mock::new().with_loopback(0x20);
    transport.push_pipe_data(0xA0, &(0u8..=255).collect::<Vec<_>>());

    let bitstream = Bitstream::from_bytes(vec![0xFF; 1024], "loopback.bin".into())?;
    let mut board = OpalKelly::from_parts(transport, &bitstream, REGISTERS.parse()?)?;
    println!("Connected to {}", board.device_name());

    board.set_register("reset", 0)?;
    board.set_register("decimation", "0x10")?;
    let echo = board.get_register("echo")?;
    println!("Wire-in 0 reads back as {echo:#010x}");
    if echo != 0x1000 {
        bail!("Loopback mismatch");
    }

    // Oversized values are skipped without touching the board
    match board.set_register("reset", 2) {
        Err(e) if e.is_diagnostic() => println!("Skipped: {e}"),
        other => other?,
    }

    board.set_pll(1, 500, 48, true)?;
    board.set_sys_clk(2, "PLL1-0", 5, true)?;
    println!("SYSCLK2 now runs at {} MHz", board.get_pll("SYSCLK2 Frequency")?);

    board.set_trigger("arm")?;
    let samples = board.get_block_pipe("capture", 64, 16)?;
    println!("Captured {} bytes, first few: {:?}", samples.len(), &samples[..8]);
    Ok(())
}
