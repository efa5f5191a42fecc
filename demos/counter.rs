//! Counter State Machine
//!
//! This example demonstrates guards, receivers and termination.
//!
//! Key concepts:
//! - Receivers update the context and pick the next state
//! - A guard sends the machine back to `Idle` once the count reaches five
//! - `Next::End` settles the run's completion signal
//!
//! Run with: cargo run --example counter

use stagehand::runtime::Next;
use stagehand::{event_enum, state_enum, MachineBuilder};

state_enum! {
    enum Counter {
        Idle,
        Active,
    }
}

event_enum! {
    enum Input {
        Inc,
        Done,
    }
}

#[tokio::main]
async fn main() {
    println!("=== Counter State Machine ===\n");

    let machine = MachineBuilder::<u32, Counter, Input>::new()
        .initial(Counter::Idle)
        .state(Counter::Idle, |s| {
            s.on_receive(|r| {
                r.on("Inc", |_, set, _| {
                    set.update(|count| *count += 1);
                    Next::To(Counter::Active)
                })
            })
        })
        .state(Counter::Active, |s| {
            s.guard(|count: &u32| *count < 5, Counter::Idle)
                .on_receive(|r| {
                    r.on("Inc", |_, set, _| {
                        set.update(|count| *count += 1);
                        Next::Stay
                    })
                    .on("Done", |_, _, _| Next::End)
                })
        })
        .edge(Counter::Idle, Counter::Active)
        .guard_edge(Counter::Active, Counter::Idle)
        .terminal(Counter::Active)
        .build()
        .unwrap();

    let run = machine.start(0);
    let completion = run.completion();

    for _ in 0..6 {
        run.emit(Input::Inc);
        println!("count = {}, state = {:?}", run.get(), run.state());
    }

    println!("\nResetting the count and finishing...");
    run.set(0);
    run.emit(Input::Inc);
    run.emit(Input::Done);

    match completion.await {
        Ok(()) => println!("\nRun finished with count {}", run.get()),
        Err(error) => println!("\nRun failed: {error}"),
    }
}
