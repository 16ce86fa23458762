//! Feeder camera-link firmware: main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  UartSerial      LogEventSink    NvsAdapter     UptimeClock    │
//! │  (SerialPort)    (EventSink)     (ConfigPort)   (ms clock)     │
//! │  PinDriver ×2 ─▶ LinkTransport (LinkPort)                      │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              Orchestrator (pure logic)                 │    │
//! │  │  Arm FSM · Reliability · One-shot commands             │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{AnyInputPin, AnyOutputPin, Output, PinDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::uart::{UartDriver, config::Config as UartConfig};
use esp_idf_hal::units::Hertz;

use feedercam::adapters::log_sink::LogEventSink;
use feedercam::adapters::nvs::NvsAdapter;
use feedercam::adapters::time::UptimeClock;
use feedercam::adapters::uart::UartSerial;
use feedercam::app::ports::ConfigPort;
use feedercam::app::service::Orchestrator;
use feedercam::config::LinkConfig;
use feedercam::diagnostics::LinkDiagnostics;
use feedercam::link::LinkTransport;
use feedercam::pins;

/// Main loop period.  Short enough that the 256-byte receive FIFO never
/// overflows at 115200 baud.
const LOOP_PERIOD_MS: u32 = 10;

/// Diagnostics dump interval.
const DIAG_INTERVAL_MS: u64 = 60_000;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  FeederCam v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let nvs = NvsAdapter::new().map_err(|e| anyhow::anyhow!("NVS init failed: {}", e))?;
    let config = match nvs.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            LinkConfig::default()
        }
    };

    // ── 3. Companion-module link ──────────────────────────────
    let peripherals = Peripherals::take()?;
    let uart = UartDriver::new(
        peripherals.uart1,
        peripherals.pins.gpio13, // TX
        peripherals.pins.gpio12, // RX
        Option::<AnyInputPin>::None,
        Option::<AnyOutputPin>::None,
        &UartConfig::new().baudrate(Hertz(config.baud)),
    )?;
    info!(
        "Link: UART{} rx={} tx={} wake={}",
        pins::MINI_UART_NUM,
        pins::MINI_UART_RX_GPIO,
        pins::MINI_UART_TX_GPIO,
        pins::MINI_WAKE_GPIO
    );
    let wake = PinDriver::output(peripherals.pins.gpio14)?;
    // No load switch on this board revision.
    let power: Option<PinDriver<'_, AnyOutputPin, Output>> = None;
    if pins::fitted(pins::MINI_POWER_EN_GPIO).is_none() {
        info!("Link: no power-enable line, power-cycling disabled");
    }

    let clock = UptimeClock::new();
    let mut link = LinkTransport::new(UartSerial::new(uart), Some(wake), power, FreeRtos);
    link.begin(config.baud, config.wake_active_high, clock.uptime_ms())
        .map_err(|e| anyhow::anyhow!("link open failed: {}", e))?;

    // ── 4. Orchestrator ───────────────────────────────────────
    let mut sink = LogEventSink::new();
    let mut orch = Orchestrator::new(config);
    orch.start(clock.uptime_ms(), &mut sink);

    // Learn the module's state before the first visit.
    if let Err(e) = orch.status(clock.uptime_ms(), &mut link, &mut sink) {
        warn!("Link: initial status request failed: {}", e);
    }

    info!("System ready. Entering main loop.");

    // ── 5. Main loop ──────────────────────────────────────────
    let mut last_diag = clock.uptime_ms();
    loop {
        let now = clock.uptime_ms();
        orch.tick(now, &mut link, &mut sink);

        if now.saturating_sub(last_diag) >= DIAG_INTERVAL_MS {
            last_diag = now;
            let diag = LinkDiagnostics::collect(&orch, link.stats(), now);
            let mut text = String::new();
            if diag.render(&mut text).is_ok() {
                for line in text.lines() {
                    info!("DIAG | {}", line);
                }
            }
        }

        FreeRtos::delay_ms(LOOP_PERIOD_MS);
    }
}
