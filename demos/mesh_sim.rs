use home_mesh::device::{SimulatedOutlet, SimulatedStation};
use home_mesh::network::Medium;
use home_mesh::protocol::{Gateway, Peripheral, Repeater, Revision, StateSlot};
use home_mesh::{Config, Uid};
use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = Config {
        revision: Revision::V3,
        response_timeout: Duration::from_millis(300),
        ..Config::default()
    };

    // Two radio segments: the outlet sits next to the gateway, the irrigation
    // station is only reachable through the repeater
    let near = Medium::new(64);
    let far = Medium::new(64);

    let outlet = SimulatedOutlet::new();
    let mut outlet_node = Peripheral::new(Uid(5), config.revision, outlet.clone()).unwrap();
    let mut outlet_radio = near.attach();
    tokio::spawn(async move { outlet_node.serve(&mut outlet_radio).await });

    let station = SimulatedStation::new();
    let mut station_node = Peripheral::new(Uid(7), config.revision, station.clone()).unwrap();
    let mut station_radio = far.attach();
    tokio::spawn(async move { station_node.serve(&mut station_radio).await });

    let mut repeater = Repeater::new(Uid(2), config.revision).unwrap();
    let mut near_side = near.attach();
    let mut far_side = far.attach();
    tokio::spawn(async move { repeater.bridge(&mut near_side, &mut far_side).await });

    let mut gateway = Gateway::new(near.attach(), config.clone()).unwrap();

    println!("Mesh simulation:");
    println!("- Revision: {:?} ({} byte frames)", config.revision, config.revision.frame_len());
    println!("- Response timeout: {:?}", config.response_timeout);

    // Scans complete on the first answer; keep scanning to fill the device table
    for _ in 0..3 {
        match gateway.scan().await {
            Ok(devices) => println!("\nScan answered by {:?}", devices),
            Err(e) => eprintln!("Scan failed: {}", e),
        }
    }
    println!("Known devices: {:?}", gateway.known_devices());

    match gateway.ping(Uid(2)).await {
        Ok(()) => println!("\nRepeater 2 is alive"),
        Err(e) => eprintln!("Repeater ping failed: {}", e),
    }

    match gateway.set_state(Uid(5), [StateSlot::OnOff(true)]).await {
        Ok(state) => println!("Outlet 5 switched: {:?} (relay on: {})", state, outlet.is_on()),
        Err(e) => eprintln!("Outlet switch failed: {}", e),
    }

    if let Err(e) = gateway.set_state(Uid(7), [StateSlot::OnOff(true)]).await {
        eprintln!("Valve open failed: {}", e);
    }

    let mut rng = rand::thread_rng();
    for round in 1..=5 {
        station.set_soil_moisture(rng.gen_range(200..800));

        match gateway.get_state(Uid(7)).await {
            Ok(state) => println!("\nRound {}: station 7 reports {:?}", round, state),
            Err(e) => eprintln!("\nRound {}: station 7 failed: {}", round, e),
        }
        sleep(Duration::from_millis(200)).await;
    }

    match gateway.get_state(Uid(9)).await {
        Ok(state) => println!("\nUnexpected answer from uid 9: {:?}", state),
        Err(e) => println!("\nuid 9: {}", e),
    }
}
