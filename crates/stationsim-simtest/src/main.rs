//! StationSim Headless Simulation Harness
//!
//! Drives the gas core through scripted scenarios and checks the results.
//! Runs entirely in-process. No host engine, no networking, no rendering.
//!
//! Usage:
//!   cargo run -p stationsim-simtest
//!   cargo run -p stationsim-simtest -- --verbose
//!   cargo run -p stationsim-simtest -- --config data/sim_config.json

use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use stationsim_logic::config::{validate_config, SimConfig};
use stationsim_logic::disposal::{pump_moles, BinState, DeviceId, DunkOutcome, Item};
use stationsim_logic::events::DeviceEvent;
use stationsim_logic::gas::{Gas, GasMix};
use stationsim_logic::persistence;
use stationsim_logic::station::Station;
use stationsim_logic::tiles::TilePos;
use stationsim_logic::transfer::{equalize, transfer_gas, TransferRequest};

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

impl TestResult {
    fn new(name: &str, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed,
            detail: detail.into(),
        }
    }
}

fn config_path() -> Option<String> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next();
        }
    }
    None
}

fn load_config(path: &Path) -> Result<SimConfig, String> {
    let text = std::fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    serde_json::from_str(&text).map_err(|e| format!("{}: {}", path.display(), e))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let verbose = std::env::args().any(|a| a == "--verbose");
    println!("=== StationSim Simulation Harness ===\n");

    let config = match config_path() {
        Some(path) => match load_config(Path::new(&path)) {
            Ok(config) => {
                log::info!("loaded config from {}", path);
                config
            }
            Err(e) => {
                log::error!("could not load config: {}", e);
                std::process::exit(2);
            }
        },
        None => SimConfig::default(),
    };

    let mut results = Vec::new();

    // 1. Configuration
    results.extend(validate_configuration(&config, verbose));

    // 2. Gas mix arithmetic
    results.extend(validate_gas_mix(verbose));

    // 3. Transfer engine
    results.extend(validate_transfer(verbose));

    // 4. Pump convergence
    results.extend(validate_pump(&config, verbose));

    // 5. Flush cycle
    results.extend(validate_flush_cycle(&config, verbose));

    // 6. Station soak
    results.extend(validate_station_run(&config, verbose));

    // 7. Persistence
    results.extend(validate_persistence(&config, verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

/// Small station used by the scenario sections.
fn scenario_station(config: &SimConfig, size: u32) -> Option<Station> {
    Station::new(SimConfig {
        width: size,
        height: size,
        ..config.clone()
    })
    .ok()
}

fn state_of(station: &Station, id: DeviceId) -> Option<BinState> {
    station.bin(id).map(|b| b.state())
}

// ── 1. Configuration ────────────────────────────────────────────────────

fn validate_configuration(config: &SimConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Configuration ---");
    let mut results = Vec::new();

    let errors = validate_config(config);
    results.push(TestResult::new(
        "config_valid",
        errors.is_empty(),
        if errors.is_empty() {
            format!(
                "{}x{} grid, target {:.0} kPa, reservoir {:.2} m³",
                config.width, config.height, config.bin.target_pressure, config.bin.reservoir_volume
            )
        } else {
            format!("{:?}", errors)
        },
    ));

    let broken = SimConfig {
        tick_interval: 0.0,
        exchange_rate: 2.0,
        ..config.clone()
    };
    let broken_errors = validate_config(&broken);
    results.push(TestResult::new(
        "config_reports_every_error",
        broken_errors.len() >= 2,
        format!("{} errors for a doubly broken config", broken_errors.len()),
    ));

    let json = serde_json::to_string(config).unwrap_or_default();
    let reparsed: Option<SimConfig> = serde_json::from_str(&json).ok();
    results.push(TestResult::new(
        "config_json_roundtrip",
        reparsed.as_ref() == Some(config),
        format!("{} bytes of JSON", json.len()),
    ));

    let partial: Option<SimConfig> = serde_json::from_str(r#"{ "width": 3 }"#).ok();
    results.push(TestResult::new(
        "config_partial_json_uses_defaults",
        partial
            .as_ref()
            .is_some_and(|c| c.width == 3 && c.bin == SimConfig::default().bin),
        "missing fields fall back to defaults",
    ));

    if verbose {
        println!("  {:#?}", config.bin);
    }
    results
}

// ── 2. Gas Mix ──────────────────────────────────────────────────────────

fn validate_gas_mix(verbose: bool) -> Vec<TestResult> {
    println!("--- Gas Mix ---");
    let mut results = Vec::new();

    match GasMix::air(2.5, 293.15, 101.325) {
        Ok(air) => {
            results.push(TestResult::new(
                "air_pressure",
                (air.pressure() - 101.325).abs() < 0.01,
                format!("{:.3} kPa from {:.3} mol", air.pressure(), air.total_moles()),
            ));
            let ratio_sum: f32 = Gas::ALL.iter().map(|g| air.ratio(*g)).sum();
            results.push(TestResult::new(
                "air_ratios_sum_to_one",
                (ratio_sum - 1.0).abs() < 1e-4,
                format!(
                    "N2 {:.2}, O2 {:.2}, CO2 {:.2}",
                    air.ratio(Gas::Nitrogen),
                    air.ratio(Gas::Oxygen),
                    air.ratio(Gas::CarbonDioxide)
                ),
            ));
            if verbose {
                for gas in Gas::ALL {
                    println!("    {:?}: {:.3} mol", gas, air.moles(gas));
                }
            }
        }
        Err(e) => results.push(TestResult::new("air_pressure", false, e.to_string())),
    }

    let rejected = [
        GasMix::new(0.0, 293.15).is_err(),
        GasMix::new(1.0, -4.0).is_err(),
        GasMix::new(f32::NAN, 293.15).is_err(),
    ];
    results.push(TestResult::new(
        "bad_mix_inputs_rejected",
        rejected.iter().all(|r| *r),
        format!("{:?}", rejected),
    ));

    let negative_rejected = GasMix::new(1.0, 293.15)
        .map(|mut m| m.set_moles(Gas::Plasma, -1.0).is_err() && m.total_moles() == 0.0)
        .unwrap_or(false);
    results.push(TestResult::new(
        "negative_moles_rejected",
        negative_rejected,
        "set_moles(-1) leaves the mix untouched",
    ));

    let empty_pressure = GasMix::new(1.0, 293.15).map(|m| m.pressure()).unwrap_or(-1.0);
    results.push(TestResult::new(
        "empty_mix_zero_pressure",
        empty_pressure == 0.0,
        format!("{} kPa", empty_pressure),
    ));

    results
}

// ── 3. Transfer Engine ──────────────────────────────────────────────────

fn validate_transfer(verbose: bool) -> Vec<TestResult> {
    println!("--- Transfer Engine ---");
    let mut results = Vec::new();
    let mut rng = StdRng::seed_from_u64(42);

    let mut worst_drift = 0.0f32;
    let mut negatives = 0;
    for _ in 0..1000 {
        let (Ok(mut a), Ok(mut b)) = (
            GasMix::air(rng.gen_range(0.5..5.0), 293.15, rng.gen_range(0.0..300.0)),
            GasMix::air(rng.gen_range(0.5..5.0), 293.15, rng.gen_range(0.0..300.0)),
        ) else {
            continue;
        };
        let before = a.total_moles() + b.total_moles();
        transfer_gas(&mut a, &mut b, rng.gen_range(-200.0..200.0));
        let after = a.total_moles() + b.total_moles();
        worst_drift = worst_drift.max((after - before).abs() / before.max(1.0));
        negatives += Gas::ALL
            .iter()
            .filter(|g| a.moles(**g) < 0.0 || b.moles(**g) < 0.0)
            .count();
    }
    results.push(TestResult::new(
        "transfer_conserves_mass",
        worst_drift < 1e-5,
        format!("worst relative drift {:.2e} over 1000 transfers", worst_drift),
    ));
    results.push(TestResult::new(
        "transfer_never_negative",
        negatives == 0,
        format!("{} negative species", negatives),
    ));

    let noops = GasMix::air(2.5, 293.15, 101.325).and_then(|mut a| {
        let mut b = GasMix::new(1.0, 293.15)?;
        let zero = transfer_gas(&mut a, &mut b, 0.0);
        let nan = transfer_gas(&mut a, &mut b, f32::NAN);
        Ok(zero == 0.0 && nan == 0.0 && b.is_empty())
    });
    results.push(TestResult::new(
        "zero_and_nan_are_noops",
        noops.unwrap_or(false),
        "no gas moved",
    ));

    let clamped = GasMix::air(2.5, 293.15, 101.325).and_then(|mut a| {
        let mut b = GasMix::new(1.0, 293.15)?;
        Ok(TransferRequest::clamped(50.0, 0.0, 8.0).execute(&mut a, &mut b))
    });
    results.push(TestResult::new(
        "clamped_request_capped",
        clamped.as_ref().is_ok_and(|m| (*m - 8.0).abs() < 1e-4),
        format!("{:?} mol moved", clamped),
    ));

    let equalized = GasMix::air(2.5, 293.15, 200.0).and_then(|mut a| {
        let mut b = GasMix::air(0.5, 293.15, 20.0)?;
        equalize(&mut a, &mut b);
        Ok((a.pressure(), b.pressure()))
    });
    let eq_ok = equalized
        .as_ref()
        .is_ok_and(|(pa, pb)| (pa - pb).abs() < 0.05);
    results.push(TestResult::new(
        "equalize_matches_pressures",
        eq_ok,
        format!("{:?}", equalized),
    ));

    if verbose {
        println!("  worst drift {:.2e}", worst_drift);
    }
    results
}

// ── 4. Pump Convergence ─────────────────────────────────────────────────

fn validate_pump(config: &SimConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Pump Convergence ---");
    let mut results = Vec::new();

    let first = pump_moles(100.0, 0.0, &config.bin);
    results.push(TestResult::new(
        "empty_reservoir_pumps_at_cap",
        first == config.bin.max_moles_per_tick,
        format!("{:.3} mol", first),
    ));
    let over = pump_moles(100.0, config.bin.target_pressure * 1.5, &config.bin);
    results.push(TestResult::new(
        "overcharged_reservoir_pumps_nothing",
        over == 0.0,
        format!("{:.3} mol", over),
    ));

    let Some(mut station) = scenario_station(config, 8) else {
        results.push(TestResult::new("pump_station", false, "station rejected config"));
        return results;
    };
    let bin = match station.add_bin(TilePos::new(4, 4)) {
        Ok(id) => id,
        Err(e) => {
            results.push(TestResult::new("pump_station", false, e.to_string()));
            return results;
        }
    };
    station.connect_power(bin);
    station.power_on(bin);

    let mut ticks = 0;
    let mut monotonic = true;
    let mut last = 0.0;
    while state_of(&station, bin) == Some(BinState::Recharging) && ticks < 60 {
        station.tick();
        ticks += 1;
        let charge = station.bin(bin).map_or(0.0, |b| b.charge_pressure());
        monotonic &= charge >= last;
        last = charge;
        if verbose {
            println!("    tick {:>2}: {:.2} kPa", ticks, charge);
        }
    }
    results.push(TestResult::new(
        "bin_reaches_ready",
        state_of(&station, bin) == Some(BinState::Ready),
        format!("{} ticks, {:.2} kPa", ticks, last),
    ));
    results.push(TestResult::new(
        "charge_monotonic_while_recharging",
        monotonic,
        "charge never dropped",
    ));

    // Sealed-off thin air: the pump creeps toward the target and stalls.
    let thin = SimConfig {
        tile_pressure: 30.0,
        ..config.clone()
    };
    if let Some(mut isolated) = scenario_station(&thin, 1) {
        if let Ok(id) = isolated.add_bin(TilePos::new(0, 0)) {
            isolated.connect_power(id);
            isolated.power_on(id);
            isolated.run(30);
            let charge = isolated.bin(id).map_or(0.0, |b| b.charge_pressure());
            results.push(TestResult::new(
                "thin_air_stalls_below_target",
                state_of(&isolated, id) == Some(BinState::Recharging)
                    && charge < config.bin.target_pressure,
                format!("{:.2} kPa after 30 ticks", charge),
            ));
        }
    }

    results
}

// ── 5. Flush Cycle ──────────────────────────────────────────────────────

fn validate_flush_cycle(config: &SimConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Flush Cycle ---");
    let mut results = Vec::new();

    let Some(mut station) = scenario_station(config, 6) else {
        results.push(TestResult::new("flush_station", false, "station rejected config"));
        return results;
    };
    let bin = match station.add_installed_bin(TilePos::new(2, 3)) {
        Ok(id) => id,
        Err(e) => {
            results.push(TestResult::new("flush_station", false, e.to_string()));
            return results;
        }
    };

    results.push(TestResult::new(
        "installed_bin_ready",
        state_of(&station, bin) == Some(BinState::Ready),
        format!("{:?}", state_of(&station, bin)),
    ));

    station.insert_item(bin, Item::object(1, "empty can"));
    station.insert_item(bin, Item::player(2, "assistant"));

    let escaped = station.try_escape(bin, 2);
    results.push(TestResult::new(
        "escape_before_flush",
        escaped.is_some(),
        "player climbed out of a ready bin",
    ));

    let auto_flush_ticks = (config.bin.auto_flush_delay / config.tick_interval).ceil() as u32;
    station.run(auto_flush_ticks);
    results.push(TestResult::new(
        "auto_flush_fires",
        state_of(&station, bin) == Some(BinState::Flushing),
        format!("{:?} after {} ticks", state_of(&station, bin), auto_flush_ticks),
    ));

    let flush_ticks = (config.bin.flush_duration / config.tick_interval).ceil() as u32;
    station.run(flush_ticks);
    let packets = station.registry().in_transit().len();
    results.push(TestResult::new(
        "flush_hands_off_payload",
        packets == 1 && station.bin(bin).is_some_and(|b| b.is_empty()),
        format!("{} packet(s) in transit", packets),
    ));

    let mut recharge_ticks = 0;
    while state_of(&station, bin) == Some(BinState::Recharging) && recharge_ticks < 60 {
        station.tick();
        recharge_ticks += 1;
    }
    results.push(TestResult::new(
        "recharges_after_flush",
        state_of(&station, bin) == Some(BinState::Ready),
        format!("{} ticks", recharge_ticks),
    ));

    let events = station.drain_events();
    let flap_closed = events
        .iter()
        .filter(|e| matches!(e, DeviceEvent::AirFlapClosed { .. }))
        .count();
    results.push(TestResult::new(
        "air_flap_closes_once",
        flap_closed == 1,
        format!("{} events, {} flap closures", events.len(), flap_closed),
    ));

    // Dunk odds over many throws.
    let mut rng = StdRng::seed_from_u64(7);
    let throws = 400;
    let mut scored = 0;
    for i in 0..throws {
        if matches!(
            station.try_dunk(bin, Item::object(100 + i, "paper ball"), &mut rng),
            DunkOutcome::Scored
        ) {
            scored += 1;
        }
    }
    let rate = scored as f32 / throws as f32;
    let expected = 1.0 - config.bin.dunk_miss_chance as f32 / 100.0;
    results.push(TestResult::new(
        "dunk_rate_near_expected",
        (rate - expected).abs() < 0.08,
        format!("{:.2} scored, expected {:.2}", rate, expected),
    ));

    if verbose {
        println!("  {}", station.bin(bin).map_or("", |b| b.examine()));
    }
    results
}

// ── 6. Station Soak ─────────────────────────────────────────────────────

fn validate_station_run(config: &SimConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Station Soak ---");
    let mut results = Vec::new();

    let mut station = match Station::new(config.clone()) {
        Ok(s) => s,
        Err(e) => {
            results.push(TestResult::new("soak_station", false, e.to_string()));
            return results;
        }
    };

    let mut rng = StdRng::seed_from_u64(1337);
    let mut bins = Vec::new();
    for _ in 0..6 {
        let pos = TilePos::new(
            rng.gen_range(0..config.width as i32),
            rng.gen_range(0..config.height as i32),
        );
        let placed = if rng.gen_bool(0.5) {
            station.add_installed_bin(pos)
        } else {
            station.add_bin(pos)
        };
        if let Ok(id) = placed {
            station.connect_power(id);
            station.power_on(id);
            bins.push(id);
        }
    }

    // Flushes vent the reservoir out of the station, so count what leaves.
    let before = station.total_moles();
    let mut vented = 0.0f32;
    let mut next_item = 1000;
    for _ in 0..200 {
        if let Some(&id) = bins.get(rng.gen_range(0..bins.len().max(1))) {
            match rng.gen_range(0..10) {
                0 => {
                    station.insert_item(id, Item::object(next_item, "trash"));
                    next_item += 1;
                }
                1 => {
                    station.toggle_power(id);
                }
                2 => {
                    station.flush(id);
                }
                _ => {}
            }
        }
        let held: Vec<(DeviceId, f32)> = station
            .bins()
            .iter()
            .map(|b| (b.id(), b.reservoir().total_moles()))
            .collect();
        station.tick();
        for event in station.drain_events() {
            if let DeviceEvent::Flushed { device, .. } = event {
                vented += held
                    .iter()
                    .find(|(id, _)| *id == device)
                    .map_or(0.0, |(_, moles)| *moles);
            }
        }
    }
    let after = station.total_moles() + vented;
    let drift = (after - before).abs() / before;

    results.push(TestResult::new(
        "soak_conserves_mass",
        drift < 1e-3,
        format!(
            "{:.3} -> {:.3} mol incl. {:.3} vented ({:.2e})",
            before, after, vented, drift
        ),
    ));

    let tile_negative = (0..config.height as i32)
        .flat_map(|y| (0..config.width as i32).map(move |x| TilePos::new(x, y)))
        .filter_map(|pos| station.tiles().tile(pos))
        .any(|t| Gas::ALL.iter().any(|g| t.gas.moles(*g) < 0.0));
    results.push(TestResult::new(
        "soak_no_negative_tiles",
        !tile_negative,
        "all tile species non-negative",
    ));

    let overshoot = station
        .bins()
        .iter()
        .filter(|b| b.state() == BinState::Recharging)
        .any(|b| b.charge_pressure() >= b.config().target_pressure);
    results.push(TestResult::new(
        "soak_no_charged_bin_left_recharging",
        !overshoot,
        format!("{} bins", station.bins().len()),
    ));

    if verbose {
        for b in station.bins() {
            println!(
                "    {:?} at {:?}: {:?}, {:.1} kPa, {} item(s)",
                b.id(),
                b.position(),
                b.state(),
                b.charge_pressure(),
                b.contents().len()
            );
        }
        println!("  {} packets delivered to disposals", station.registry().in_transit().len());
    }
    results
}

// ── 7. Persistence ──────────────────────────────────────────────────────

fn validate_persistence(config: &SimConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Persistence ---");
    let mut results = Vec::new();

    let Some(mut station) = scenario_station(config, 5) else {
        results.push(TestResult::new("save_station", false, "station rejected config"));
        return results;
    };
    let Ok(bin) = station.add_bin(TilePos::new(2, 2)) else {
        results.push(TestResult::new("save_station", false, "could not place bin"));
        return results;
    };
    station.connect_power(bin);
    station.power_on(bin);
    station.run(2);

    let bytes = match persistence::save_to_bytes(&station) {
        Ok(b) => b,
        Err(e) => {
            results.push(TestResult::new("save_station", false, e.to_string()));
            return results;
        }
    };
    results.push(TestResult::new(
        "save_station",
        !bytes.is_empty(),
        format!("{} bytes", bytes.len()),
    ));

    match persistence::load_from_bytes(&bytes) {
        Ok(mut restored) => {
            station.run(5);
            restored.run(5);
            let a = station.bin(bin).map(|b| (b.state(), b.charge_pressure()));
            let b = restored.bin(bin).map(|b| (b.state(), b.charge_pressure()));
            results.push(TestResult::new(
                "restored_station_replays_identically",
                a == b,
                format!("{:?} vs {:?}", a, b),
            ));
        }
        Err(e) => results.push(TestResult::new(
            "restored_station_replays_identically",
            false,
            e.to_string(),
        )),
    }

    let mut tampered = bytes.clone();
    tampered[..4].copy_from_slice(&(persistence::SAVE_VERSION + 1).to_le_bytes());
    let rejected = persistence::load_from_bytes(&tampered);
    results.push(TestResult::new(
        "version_mismatch_rejected",
        rejected.is_err(),
        match rejected {
            Err(e) => e.to_string(),
            Ok(_) => "loaded a save with the wrong version".into(),
        },
    ));

    if verbose {
        println!("  save format v{}", persistence::SAVE_VERSION);
    }
    results
}
