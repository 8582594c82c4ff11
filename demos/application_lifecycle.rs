//! Solve requests as stored applications.
//!
//! Submits a valid request and a failing one to an in-memory store, then
//! prints the recorded status and results of each.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example application_lifecycle

use ode_ivp::{process_application, InMemoryStore, SolverRequest};

fn main() {
    env_logger::init();

    let requests = [
        r#"{
            "method": "heun",
            "order": 1,
            "userEquation": "y' = x * y",
            "formattedEquation": "x * y[0]",
            "initialX": 0.0,
            "initialY": [1.0],
            "reachPoint": 0.5,
            "stepSize": 0.1
        }"#,
        r#"{
            "method": "rungeKutta",
            "order": 1,
            "formattedEquation": "1 / (x - 0.2)",
            "initialX": 0.0,
            "initialY": [0.0],
            "reachPoint": 1.0,
            "stepSize": 0.1
        }"#,
    ];

    let user_id = 1;
    let mut store = InMemoryStore::new();

    for text in requests {
        let request: SolverRequest = serde_json::from_str(text).unwrap();
        let id = process_application(&mut store, user_id, &request).unwrap();
        println!("application {id}: {}", request.formatted_equation);
    }

    println!();
    for id in store.applications(user_id) {
        let status = store.status(id).unwrap();
        println!("application {id} -> {status}");
        if let Some(results) = store.results(id) {
            println!("  {results}");
        }
    }
}
