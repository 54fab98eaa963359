//! Two-node CSMA MAC simulation
//
// https://github.com/rust-iot/csma-mac
// Copyright 2021 Ryan Kurte

use std::time::Duration;

use log::{debug, info, warn, error};

use structopt::StructOpt;

use rand::SeedableRng;
use rand::rngs::StdRng;

use csma_mac::prelude::*;
use csma_mac::phy::mock::MockPhy;
use csma_mac::timer::mock::MockTimer;

type SimMac = CsmaMac<MockPhy, MockTimer, StdRng>;

#[derive(Debug, StructOpt)]
struct Options {
    #[structopt(long, default_value="256")]
    /// Set PAN ID
    pub pan_id: u16,

    #[structopt(long, default_value="10s")]
    /// Simulated run time
    pub duration: humantime::Duration,

    #[structopt(long, default_value="100us")]
    /// Simulated time between MAC ticks
    pub tick: humantime::Duration,

    #[structopt(long, default_value="1s")]
    /// Period of the sensor node's CBR traffic
    pub period: humantime::Duration,

    #[structopt(long, default_value="16")]
    /// CBR payload length
    pub length: usize,

    #[structopt(long)]
    /// Channel energy reported to both nodes (values >= 135 block access)
    pub energy: Option<i16>,

    #[structopt(long, default_value="1")]
    /// Seed for backoff and payload generation
    pub seed: u64,

    #[structopt(long, default_value = "info")]
    /// Configure log level
    pub log_level: simplelog::LevelFilter,
}

fn micros(d: Duration) -> anyhow::Result<u32> {
    let us = d.as_micros();
    if us > u32::MAX as u128 / 2 {
        return Err(anyhow::anyhow!("Duration {:?} exceeds timer range", d));
    }
    Ok(us as u32)
}

fn main() -> anyhow::Result<()> {
    // Load options
    let opts = Options::from_args();

    // Initialise logging
    let _ = simplelog::SimpleLogger::init(opts.log_level, simplelog::Config::default());

    info!("Starting sim-pair");

    let tick_us = micros(*opts.tick)?.max(1);
    let duration_us = micros(*opts.duration)?;

    let mut timer = MockTimer::new();
    let (mut phy_sensor, mut phy_sink) = MockPhy::pair(timer.clone());

    if let Some(e) = opts.energy {
        phy_sensor.set_energy(e);
        phy_sink.set_energy(e);
    }

    // Sensor node generates acknowledged CBR traffic towards the sink
    let mut sensor_cfg = MacConfig::new(opts.pan_id, 0x0001);
    sensor_cfg.cbr = Some(CbrConfig {
        period_us: micros(*opts.period)?,
        length: opts.length,
        destination: 0x0002,
        ack_request: true,
    });

    let sink_cfg = MacConfig::new(opts.pan_id, 0x0002);

    debug!("Initialising MACs");

    let mut sensor = SimMac::new(phy_sensor, timer.clone(), StdRng::seed_from_u64(opts.seed), sensor_cfg);
    let mut sink = SimMac::new(phy_sink, timer.clone(), StdRng::seed_from_u64(opts.seed + 1), sink_cfg);

    debug!("Starting loop");

    let mut elapsed = 0;
    let mut received = 0;

    while elapsed < duration_us {
        timer.inc_us(tick_us);
        elapsed += tick_us;

        match sensor.tick() {
            Ok(Some(c)) => info!("Sensor confirm at {} us: {}", timer.val(), c),
            Ok(None) => (),
            Err(e) => error!("Sensor tick error: {:?}", e),
        }

        if let Err(e) = sink.tick() {
            error!("Sink tick error: {:?}", e);
        }

        if let Some(rx) = sink.receive() {
            info!("Sink received {} bytes from 0x{:04x} (rssi {}): {:02x?}",
                rx.payload.len(), rx.source, rx.rssi, &rx.payload[..]);
            received += 1;
        }
    }

    let stats = sensor.stats();
    info!("Sensor stats: {:?}", stats);
    info!("Sink stats: {:?}", sink.stats());

    if stats.tx_success != received {
        warn!("{} confirmed frames, {} delivered", stats.tx_success, received);
    }

    sink.neighbors().log_table();

    Ok(())
}
