//! Traffic Light State Machine
//!
//! This example demonstrates a cyclic machine driven by delayed transitions.
//!
//! Key concepts:
//! - `after` arms a timer that only fires if the light is still in the same state
//! - A pedestrian button cuts the green phase short; the pending timer goes stale
//! - Run logs go through `tracing`; set `RUST_LOG=stagehand=debug` to see them
//!
//! Run with: cargo run --example traffic_light

use stagehand::runtime::Next;
use stagehand::{event_enum, state_enum, MachineBuilder};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

state_enum! {
    enum TrafficLight {
        Red,
        Green,
        Yellow,
    }
}

event_enum! {
    enum Button {
        Pedestrian,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Traffic Light State Machine ===\n");

    let machine = MachineBuilder::<u32, TrafficLight, Button>::new()
        .initial(TrafficLight::Red)
        .state(TrafficLight::Red, |s| {
            s.on_entry(|_, set, _| set.update(|cycles| *cycles += 1))
                .after(Duration::from_millis(300), TrafficLight::Green)
        })
        .state(TrafficLight::Green, |s| {
            s.after(Duration::from_millis(500), TrafficLight::Yellow)
                .on_receive(|r| r.on("Pedestrian", |_, _, _| Next::To(TrafficLight::Yellow)))
        })
        .state(TrafficLight::Yellow, |s| {
            s.after(Duration::from_millis(100), TrafficLight::Red)
        })
        .edge(TrafficLight::Red, TrafficLight::Green)
        .edge(TrafficLight::Green, TrafficLight::Yellow)
        .edge(TrafficLight::Yellow, TrafficLight::Red)
        .build()
        .unwrap();

    println!("Graph:\n{}", machine.graph().to_mermaid());

    let run = machine.start(0);
    let _subscription = run.context().subscribe(|cycles: &u32| println!("Cycle {cycles}"));
    println!("Initial state: {:?}", run.state());

    for _ in 0..6 {
        tokio::time::sleep(Duration::from_millis(200)).await;
        println!("  light is {:?}", run.state());
    }

    println!("\nPressing the pedestrian button...");
    while run.state() != TrafficLight::Green {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    run.emit(Button::Pedestrian);
    println!("  light is {:?}", run.state());

    tokio::time::sleep(Duration::from_millis(600)).await;

    println!("\nHistory:");
    for transition in run.history().transitions() {
        println!("  {:?} -> {:?}", transition.from, transition.to);
    }
}
