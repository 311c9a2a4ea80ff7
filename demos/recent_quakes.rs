use anyhow::Result;
use quakefeed::Client;
use quakefeed::time::{Timespec, isoformat};
use serde_json::json;

fn main() -> Result<()> {
    // Example program that queries a week of significant events and prints
    // one line per event. Configuration is optional; the public USGS
    // endpoint is used by default.
    env_logger::init();
    let client = Client::from_env()?;

    let params = json!({
        "starttime": "2024-03-01",
        "endtime": "2024-03-08",
        "minmagnitude": 4.5,
        "orderby": "time",
    });

    let catalog = client.query(&params)?;
    println!("{} event(s)", catalog.features.len());

    for quake in &catalog.features {
        let mag = match quake.properties.mag {
            Some(mag) => format!("M{mag:.1}"),
            None => "M?".to_string(),
        };
        println!(
            "{}  {:>5}  {}",
            isoformat(&quake.properties.time, Timespec::Seconds),
            mag,
            quake.properties.place,
        );
    }

    Ok(())
}
