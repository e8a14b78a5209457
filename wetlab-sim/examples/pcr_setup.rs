//! # PCR Setup
//!
//! Drives a session through the façade API directly: build a reaction,
//! cycle it, clean it up on the magnetic rack and quantify it. Prints the
//! execution log the scheduler would receive.

use wetlab_sim::{
    ContainerType, LabConfig, MemorySink, PortKind, Result, Session, ThermalHold, ThermalStep,
};

fn main() {
    println!("=== wetlab PCR setup ===\n");

    if let Err(e) = run() {
        eprintln!("{}", e.feedback());
        std::process::exit(1);
    }
}

fn hold(temperature_celsius: f64, duration_seconds: u64) -> ThermalHold {
    ThermalHold {
        temperature_celsius,
        duration_seconds,
    }
}

fn run() -> Result<()> {
    let sink = MemorySink::new();
    let mut lab = Session::with_sink(LabConfig::default(), sink.clone())?;

    let water = lab.new_replenishable("Nuclease-free water", 0.0)?;
    let master_mix = lab.new_replenishable("2x Master Mix", 1000.0)?;
    let template = lab.new_replenishable("Template DNA", 50.0)?;
    let beads = lab.new_replenishable("AMPure beads", 500.0)?;
    let reaction = lab.new_empty("PCR reaction", ContainerType::P200)?;
    let waste = lab.new_empty("waste", ContainerType::P1500)?;

    lab.pipette().transfer(25.0, master_mix, reaction)?;
    lab.pipette().transfer(20.0, water, reaction)?;
    lab.pipette().transfer(5.0, template, reaction)?;
    lab.pipette().mix(20.0, reaction, 10)?;

    lab.robot().move_container(reaction, "centrifuge_P200")?;
    lab.centrifuge_200ul().spin_down()?;

    lab.robot().move_container(reaction, "thermal_cycler")?;
    lab.thermal_cycler().close_lid()?;
    lab.thermal_cycler().run_protocol(vec![
        ThermalStep::hold(95.0, 180),
        ThermalStep::cycle(vec![hold(95.0, 15), hold(60.0, 30), hold(72.0, 30)], 30),
        ThermalStep::hold(72.0, 300),
        ThermalStep::hold(4.0, 0),
    ])?;
    lab.thermal_cycler().open_lid()?;

    lab.robot().move_container(reaction, "ContainerHolder")?;
    lab.pipette().transfer(90.0, beads, reaction)?;
    lab.pipette().mix(100.0, reaction, 10)?;
    lab.timer().wait(300)?;
    lab.robot().move_container(reaction, "magrack_P200")?;
    lab.magrack_200ul().separate(120)?;
    lab.pipette().transfer(140.0, reaction, waste)?;

    let flush = lab.port_tube(PortKind::Priming)?;
    lab.robot().open_port(PortKind::Priming)?;
    lab.pipette().transfer(1.0, flush, reaction)?;
    lab.robot().close_port(PortKind::Priming)?;

    lab.robot().move_container(reaction, "fluorometer")?;
    let readings = lab.fluorometer().measure_fluorescence()?;
    println!("Fluorometer readings: {:?}", readings);

    for c in lab.containers() {
        println!("  {} {:<22} {:>8.1} uL  @ {}", c.index(), c.label(), c.volume(), c.location());
    }

    let log = lab.finish()?;
    println!("\n{} commands recorded ({} persisted)\n", log.len(), sink.count());
    println!("{}", log.to_json()?);
    Ok(())
}
