use super::*;
use rand::{Rng, SeedableRng};
use uartbox_common::frame::{self, FRAME_BITS};

const EN: u8 = ControlWord::TR_EN.bits();
const MODE: u8 = ControlWord::MODE_OSL.bits();
const CLK: u8 = ControlWord::CLK_SEL.bits();
const WRITE: u8 = ControlWord::TX_DATA_W_EN.bits();
const LOAD: u8 = ControlWord::TR_DATA_LOAD.bits();
const READ: u8 = ControlWord::RX_DATA_READ_EN.bits();

fn pins(control: u8, data: u8) -> PortInputs {
    PortInputs {
        reset_n: true,
        control,
        data,
    }
}

fn idle_port(payload: u8) -> u8 {
    (payload << 1) | 1
}

fn clock(uart: &mut Uart, control: u8, data: u8, clocks: usize) -> PortOutputs {
    let mut out = uart.outputs();
    for _ in 0..clocks {
        out = uart.tick(&pins(control, data));
    }
    out
}

/// Start a transmission of `payload` and record the TX line once per clock
/// until busy drops. The first entry is the level after the start edge.
fn transmit(uart: &mut Uart, control: u8, payload: u8) -> Vec<bool> {
    let mut out = uart.tick(&pins(control | WRITE | LOAD, idle_port(payload)));
    let mut lines = Vec::new();
    while out.status.contains(Status::TX_BUSY) {
        lines.push(out.tx_line());
        out = uart.tick(&pins(control, idle_port(payload)));
        assert!(lines.len() < 10_000, "transmitter never finished");
    }
    lines
}

fn sample_frame(lines: &[bool], divider: usize) -> [bool; FRAME_BITS] {
    let mut bits = [true; FRAME_BITS];
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = lines[i * divider + divider / 2];
    }
    bits
}

/// Drive `byte` onto the RX pin at `divider` clocks per bit.
fn receive(uart: &mut Uart, control: u8, byte: u8, divider: usize) -> PortOutputs {
    let mut out = clock(uart, control, 0x01, 4);
    for level in frame::encode(byte) {
        out = clock(uart, control, level as u8, divider);
    }
    out
}

fn read(uart: &mut Uart) -> PortOutputs {
    let out = uart.tick(&pins(EN | READ, 0x01));
    uart.tick(&pins(EN, 0x01));
    out
}

#[test]
fn power_on_state() {
    let uart = Uart::default();
    let out = uart.outputs();
    assert_eq!(out.data, 0);
    assert_eq!(out.status, Status::TX_LINE);
    assert_eq!(uart.tx_state(), TxState::Idle);
    assert_eq!(uart.rx_state(), RxState::Idle);
}

#[test]
fn rejects_dividers_below_minimum() {
    let config = UartConfig::builder().alternate_divider(2).build();
    assert!(Uart::new(config).is_err());
    assert!(Uart::new(UartConfig::default()).is_ok());
}

#[test]
fn write_and_load_on_the_same_edge_sends_the_new_payload() {
    let mut uart = Uart::default();
    clock(&mut uart, EN, idle_port(0x55), 2);
    // Nothing is busy before the edge that samples the strobe.
    assert!(!uart.status().contains(Status::TX_BUSY));

    let lines = transmit(&mut uart, EN, 0x55);
    assert_eq!(lines.len(), FRAME_BITS * 32);
    assert_eq!(frame::decode(&sample_frame(&lines, 32)), Some(0x55));
}

#[test]
fn complete_interrupt_follows_busy() {
    let mut uart = Uart::default();
    clock(&mut uart, EN, idle_port(0x12), 1);
    transmit(&mut uart, EN, 0x12);
    // The edge that clears busy raises the interrupt for that one clock.
    assert!(uart.status().contains(Status::TX_COMPLETE));
    let out = clock(&mut uart, EN, idle_port(0x12), 1);
    assert!(!out.status.contains(Status::TX_COMPLETE));
}

#[test]
fn sticky_complete_interrupt_stays_up() {
    let config = UartConfig::builder().sticky_tx_irq(true).build();
    let mut uart = Uart::new(config).unwrap();
    clock(&mut uart, EN, idle_port(0x12), 1);
    transmit(&mut uart, EN, 0x12);
    let out = clock(&mut uart, EN, idle_port(0x12), 100);
    assert!(out.status.contains(Status::TX_COMPLETE));
}

#[test]
fn alternate_clock_source_halves_the_bit_period() {
    let mut uart = Uart::default();
    clock(&mut uart, EN | CLK, idle_port(0x3C), 1);
    let lines = transmit(&mut uart, EN | CLK, 0x3C);
    assert_eq!(lines.len(), FRAME_BITS * 16);
    assert_eq!(frame::decode(&sample_frame(&lines, 16)), Some(0x3C));
}

#[test]
fn clock_source_change_waits_for_the_next_frame() {
    let mut uart = Uart::default();
    clock(&mut uart, EN, idle_port(0x01), 1);
    let mut out = uart.tick(&pins(EN | WRITE | LOAD, idle_port(0x01)));
    let mut busy = 0;
    while out.status.contains(Status::TX_BUSY) {
        busy += 1;
        out = uart.tick(&pins(EN | CLK, idle_port(0x01)));
    }
    assert_eq!(busy, FRAME_BITS * 32);
}

#[test]
fn load_while_busy_leaves_the_frame_alone() {
    let mut uart = Uart::default();
    clock(&mut uart, EN, idle_port(0x0F), 1);
    let mut out = uart.tick(&pins(EN | WRITE | LOAD, idle_port(0x0F)));
    let mut lines = Vec::new();
    let mut clocks = 0;
    while out.status.contains(Status::TX_BUSY) {
        lines.push(out.tx_line());
        // Toggle write+load with a different payload every few clocks.
        let control = if clocks % 7 == 3 { EN | WRITE | LOAD } else { EN };
        out = uart.tick(&pins(control, idle_port(0x70)));
        clocks += 1;
    }
    assert_eq!(lines.len(), FRAME_BITS * 32);
    assert_eq!(frame::decode(&sample_frame(&lines, 32)), Some(0x0F));
}

#[test]
fn disabling_mid_transmission_completes_the_frame() {
    let mut uart = Uart::default();
    clock(&mut uart, EN, idle_port(0x2A), 1);
    let mut out = uart.tick(&pins(EN | WRITE | LOAD, idle_port(0x2A)));
    let mut lines = Vec::new();
    while out.status.contains(Status::TX_BUSY) {
        lines.push(out.tx_line());
        out = uart.tick(&pins(0, idle_port(0x2A)));
    }
    assert_eq!(frame::decode(&sample_frame(&lines, 32)), Some(0x2A));

    // Disabled: a load strobe does nothing.
    let out = clock(&mut uart, LOAD | WRITE, idle_port(0x2A), 5);
    assert!(!out.status.contains(Status::TX_BUSY));
}

#[test]
fn receives_and_routes_on_read() {
    let mut uart = Uart::default();
    let out = receive(&mut uart, EN, 0xAA, 32);
    assert!(out.status.contains(Status::RX_READY));
    // Not routed until the read strobe.
    assert_eq!(out.data, 0);

    let out = uart.tick(&pins(EN | READ, 0x01));
    assert_eq!(out.data, 0xAA);
    assert!(!out.status.contains(Status::RX_READY));
}

#[test]
fn read_value_holds_one_clock_after_the_strobe() {
    let mut uart = Uart::default();
    receive(&mut uart, EN, 0x3E, 32);
    clock(&mut uart, EN, 0x01, 20);

    assert_eq!(clock(&mut uart, EN | READ, 0x01, 3).data, 0x3E);
    assert_eq!(clock(&mut uart, EN, 0x01, 1).data, 0x3E);
    assert_eq!(clock(&mut uart, EN, 0x01, 1).data, 0x00);
}

#[test]
fn repeated_reads_return_the_same_byte() {
    let mut uart = Uart::default();
    receive(&mut uart, EN, 0xC3, 32);
    clock(&mut uart, EN, 0x01, 20);
    for _ in 0..4 {
        assert_eq!(read(&mut uart).data, 0xC3);
    }
    assert_eq!(uart.received(), 0xC3);
}

#[test]
fn overrun_and_framing_error_show_on_status() {
    let mut uart = Uart::default();
    receive(&mut uart, EN, 0x01, 32);
    let out = receive(&mut uart, EN, 0x02, 32);
    assert!(out.status.contains(Status::OVERRUN | Status::RX_READY));
    assert_eq!(uart.received(), 0x02);

    let out = read(&mut uart);
    assert!(!out.status.intersects(Status::OVERRUN | Status::RX_READY));

    // Stop bit held low.
    let mut bits = frame::encode(0x44);
    bits[FRAME_BITS - 1] = false;
    clock(&mut uart, EN, 0x01, 4);
    let mut out = uart.outputs();
    for level in bits {
        out = clock(&mut uart, EN, level as u8, 32);
    }
    assert!(out.status.contains(Status::FRAMING_ERROR));
    assert!(!out.status.contains(Status::RX_READY));
    assert_eq!(uart.received(), 0x02);

    let out = read(&mut uart);
    assert!(!out.status.contains(Status::FRAMING_ERROR));
}

#[test]
fn majority_mode_receives_clean_frames() {
    let mut uart = Uart::default();
    receive(&mut uart, EN | MODE, 0x96, 32);
    assert_eq!(read(&mut uart).data, 0x96);
}

#[test]
fn receiver_is_gated_by_enable() {
    let mut uart = Uart::default();
    let out = receive(&mut uart, 0, 0x5A, 32);
    assert!(!out.status.contains(Status::RX_READY));
    assert_eq!(uart.rx_state(), RxState::Idle);
}

#[test]
fn pin_loopback_for_every_seven_bit_payload() {
    let mut uart = Uart::default();
    let mut line = true;
    for payload in 0u8..0x80 {
        let port = |line: bool| (payload << 1) | line as u8;
        line = uart.tick(&pins(EN, port(line))).tx_line();
        line = uart.tick(&pins(EN | WRITE | LOAD, port(line))).tx_line();

        let mut ready = false;
        for _ in 0..1000 {
            let out = uart.tick(&pins(EN, port(line)));
            line = out.tx_line();
            if out.status.contains(Status::RX_READY) {
                ready = true;
                break;
            }
        }
        assert!(ready, "payload {:#04x} never arrived", payload);
        // Let the stop bit finish before the next frame.
        for _ in 0..32 {
            line = uart.tick(&pins(EN, port(line))).tx_line();
        }
        let out = uart.tick(&pins(EN | READ, port(line)));
        assert_eq!(out.data, payload);
        line = out.tx_line();
    }
}

#[test]
fn engine_loopback_for_every_byte() {
    for byte in 0..=u8::MAX {
        let mut tx = TxEngine::default();
        let mut rx = RxEngine::default();
        let idle = TxInput {
            divider: 32,
            ..Default::default()
        };
        let rx_input = |line| RxInput {
            enable: true,
            line,
            mode: SampleMode::Midpoint,
            divider: 32,
            read: false,
        };
        for _ in 0..4 {
            rx = rx.step(&rx_input(tx.output().line)).0;
        }
        tx = tx
            .step(&TxInput {
                write: Some(byte),
                start: true,
                divider: 32,
            })
            .0;
        for _ in 0..(FRAME_BITS * 32 + 8) {
            let line = tx.output().line;
            tx = tx.step(&idle).0;
            rx = rx.step(&rx_input(line)).0;
        }
        assert_eq!(rx.output().data, byte);
        assert!(rx.output().ready);
    }
}

#[test]
fn reset_returns_to_idle_from_anywhere() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x5eed);
    for _ in 0..50 {
        let mut uart = Uart::default();
        let steps = rng.gen_range(1..2000);
        for _ in 0..steps {
            let control = rng.gen::<u8>() | EN;
            let data = rng.gen::<u8>();
            uart.tick(&pins(control, data));
        }
        let out = uart.tick(&PortInputs {
            reset_n: false,
            control: rng.gen(),
            data: rng.gen(),
        });
        assert_eq!(uart.tx_state(), TxState::Idle);
        assert_eq!(uart.rx_state(), RxState::Idle);
        assert_eq!(out.status, Status::TX_LINE);
        assert_eq!(out.data, 0);
        assert_eq!(uart.received(), 0);
        assert_eq!(uart.cycles(), 0);
    }
}

#[test]
fn random_control_traffic_never_locks_up() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0xC0FFEE);
    let mut uart = Uart::default();
    for _ in 0..50_000 {
        let control = rng.gen::<u8>();
        let data = rng.gen::<u8>();
        uart.tick(&pins(control, data));
    }
    // Quiet, enabled, line idle: both engines must settle.
    let out = clock(&mut uart, EN, 0x01, FRAME_BITS * 32 * 2);
    assert_eq!(uart.tx_state(), TxState::Idle);
    assert_eq!(uart.rx_state(), RxState::Idle);
    assert!(!out.status.contains(Status::TX_BUSY));

    // And still work afterwards.
    receive(&mut uart, EN, 0x81, 32);
    assert_eq!(read(&mut uart).data, 0x81);
}
