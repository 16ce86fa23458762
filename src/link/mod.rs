//! Link transport: owns the serial channel and the two control lines.
//!
//! ```text
//!   SerialPort ──bytes──▶ LineAssembler ──lines──▶ Dispatcher ──▶ InboundMessage
//!        ▲                                                          │
//!        └──── encode_command ◀── Command            TrafficRing ◀──┘ (every line)
//!
//!   wake line ─── OutputPin (pulse)      power-enable ─── OutputPin (active-low cut)
//! ```
//!
//! Nothing else in the firmware writes to the UART or drives the wake and
//! power-enable GPIOs.

pub mod codec;
pub mod ring;
pub mod transport;

use core::fmt;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{debug, info, warn};

use crate::app::ports::LinkPort;
use crate::error::LinkError;
use crate::protocol::{Command, Dispatcher, InboundMessage};

use codec::{LineAssembler, LineOutcome, encode_command};
use ring::{Direction, TrafficRing};
use transport::SerialPort;

/// Bytes requested per serial read.
const READ_CHUNK: usize = 64;

/// Upper bound on reads per pump so a chattering module cannot starve the
/// rest of the tick.
const MAX_READS_PER_PUMP: usize = 16;

/// Counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub lines_in: u32,
    pub lines_out: u32,
    /// Lines lost to overflow or invalid UTF-8.
    pub discarded: u32,
    /// Lines that assembled but failed to decode.
    pub dropped: u32,
    pub write_failures: u32,
}

/// Line-oriented link to the companion module.
pub struct LinkTransport<S, W, P, D> {
    serial: S,
    wake: Option<W>,
    power: Option<P>,
    delay: D,
    wake_active_high: bool,
    open: bool,
    assembler: LineAssembler,
    ring: TrafficRing,
    dispatcher: Dispatcher,
    stats: LinkStats,
}

impl<S, W, P, D> LinkTransport<S, W, P, D>
where
    S: SerialPort,
    W: OutputPin,
    P: OutputPin,
    D: DelayNs,
{
    /// Wrap the channel.  Boards without a wake or power-enable line pass
    /// `None`; the matching operations then fail with a named error.
    pub fn new(serial: S, wake: Option<W>, power: Option<P>, delay: D) -> Self {
        Self {
            serial,
            wake,
            power,
            delay,
            wake_active_high: true,
            open: false,
            assembler: LineAssembler::new(),
            ring: TrafficRing::new(),
            dispatcher: Dispatcher::new(),
            stats: LinkStats::default(),
        }
    }

    /// Open the channel: set the baud rate, clear partial input, power the
    /// module rail and park the wake line inactive.
    pub fn begin(&mut self, baud: u32, wake_active_high: bool, now_ms: u64) -> Result<(), LinkError> {
        self.wake_active_high = wake_active_high;
        self.serial.set_baud(baud).map_err(|e| {
            warn!("LINK: set_baud({}) failed: {:?}", baud, e);
            LinkError::NotOpen
        })?;
        self.assembler.reset();
        if let Some(power) = self.power.as_mut() {
            power.set_high().map_err(|_| LinkError::PinFault)?;
        }
        if self.wake.is_some() {
            self.drive_wake(false)?;
        }
        self.open = true;
        self.ring.record(Direction::Note, now_ms, "open");
        info!("LINK: open at {} baud", baud);
        Ok(())
    }

    /// Stop servicing the channel.  Control lines are left as they are.
    pub fn close(&mut self, now_ms: u64) {
        if self.open {
            self.open = false;
            self.assembler.reset();
            self.ring.record(Direction::Note, now_ms, "close");
            info!("LINK: closed");
        }
    }

    pub fn ring(&self) -> &TrafficRing {
        &self.ring
    }

    pub fn stats(&self) -> LinkStats {
        LinkStats {
            dropped: self.dispatcher.dropped(),
            ..self.stats
        }
    }

    /// Render the diagnostic ring, oldest first.
    pub fn dump_traffic(&self, out: &mut impl fmt::Write) -> fmt::Result {
        self.ring.dump(out)
    }

    fn drive_wake(&mut self, active: bool) -> Result<(), LinkError> {
        let high = active == self.wake_active_high;
        let Some(pin) = self.wake.as_mut() else {
            return Err(LinkError::NoWakeLine);
        };
        let res = if high { pin.set_high() } else { pin.set_low() };
        res.map_err(|_| LinkError::PinFault)
    }

    fn handle_outcome(
        &mut self,
        outcome: LineOutcome,
        now_ms: u64,
        on_message: &mut dyn FnMut(InboundMessage),
    ) -> bool {
        match outcome {
            LineOutcome::Line(line) => {
                self.stats.lines_in = self.stats.lines_in.wrapping_add(1);
                self.ring.record(Direction::Inbound, now_ms, &line);
                debug!("LINK: < {}", line);
                match self.dispatcher.decode(&line) {
                    Some(msg) => {
                        on_message(msg);
                        true
                    }
                    None => false,
                }
            }
            LineOutcome::Overflow => {
                self.stats.discarded = self.stats.discarded.wrapping_add(1);
                self.ring.record(Direction::Note, now_ms, "rx overflow");
                warn!("LINK: rx line exceeded buffer, discarding");
                false
            }
            LineOutcome::NotUtf8 => {
                self.stats.discarded = self.stats.discarded.wrapping_add(1);
                self.ring.record(Direction::Note, now_ms, "rx not utf-8");
                warn!("LINK: rx line not valid UTF-8, discarding");
                false
            }
        }
    }
}

impl<S, W, P, D> LinkPort for LinkTransport<S, W, P, D>
where
    S: SerialPort,
    W: OutputPin,
    P: OutputPin,
    D: DelayNs,
{
    fn is_open(&self) -> bool {
        self.open
    }

    fn pump_once(&mut self, now_ms: u64, on_message: &mut dyn FnMut(InboundMessage)) -> usize {
        if !self.open {
            return 0;
        }
        let mut delivered = 0;
        let mut chunk = [0u8; READ_CHUNK];
        for _ in 0..MAX_READS_PER_PUMP {
            let n = match self.serial.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    warn!("LINK: serial read failed: {:?}", e);
                    break;
                }
            };
            for &byte in &chunk[..n] {
                if let Some(outcome) = self.assembler.push(byte) {
                    if self.handle_outcome(outcome, now_ms, on_message) {
                        delivered += 1;
                    }
                }
            }
            if n < READ_CHUNK {
                break;
            }
        }
        delivered
    }

    fn write_message(&mut self, now_ms: u64, cmd: &Command) -> Result<(), LinkError> {
        if !self.open {
            return Err(LinkError::NotOpen);
        }
        let line = encode_command(cmd)?;
        let mut written = 0;
        while written < line.len() {
            match self.serial.write(&line.as_bytes()[written..]) {
                Ok(0) | Err(_) => {
                    self.stats.write_failures = self.stats.write_failures.wrapping_add(1);
                    warn!("LINK: write of '{}' failed after {} bytes", cmd.op(), written);
                    return Err(LinkError::WriteFailed);
                }
                Ok(n) => written += n,
            }
        }
        if self.serial.flush().is_err() {
            self.stats.write_failures = self.stats.write_failures.wrapping_add(1);
            return Err(LinkError::WriteFailed);
        }
        self.stats.lines_out = self.stats.lines_out.wrapping_add(1);
        // The ring keeps the redacted form so Wi-Fi secrets never linger.
        let shown = encode_command(&cmd.redacted())?;
        self.ring.record(Direction::Outbound, now_ms, &shown);
        debug!("LINK: > {}", shown.trim_end());
        Ok(())
    }

    fn wake_line_pulse(&mut self, now_ms: u64, duration_ms: u32) -> Result<(), LinkError> {
        self.drive_wake(true)?;
        self.delay.delay_ms(duration_ms);
        self.drive_wake(false)?;
        self.ring.record(Direction::Note, now_ms, "wake pulse");
        debug!("LINK: wake pulse {} ms", duration_ms);
        Ok(())
    }

    fn power_cycle(&mut self, now_ms: u64, off_ms: u32, on_delay_ms: u32) -> Result<(), LinkError> {
        let Some(power) = self.power.as_mut() else {
            return Err(LinkError::NoPowerLine);
        };
        power.set_low().map_err(|_| LinkError::PinFault)?;
        self.delay.delay_ms(off_ms);
        power.set_high().map_err(|_| LinkError::PinFault)?;
        if on_delay_ms > 0 {
            self.delay.delay_ms(on_delay_ms);
        }
        // Whatever was half-received before the cut is garbage now.
        self.assembler.reset();
        self.ring.record(Direction::Note, now_ms, "power cycle");
        warn!("LINK: module power cycled ({} ms off)", off_ms);
        Ok(())
    }
}
