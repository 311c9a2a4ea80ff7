use anyhow::Result;
use quakefeed::{Client, Content};
use serde_json::json;
use std::path::Path;

fn main() -> Result<()> {
    // Example program that follows a summary feature's detail link, lists
    // the event's products, and downloads the origin's QuakeML artifact.
    env_logger::init();
    let client = Client::from_env()?;

    let params = json!({
        "starttime": "2024-01-01",
        "minmagnitude": 6.5,
        "limit": 1,
        "orderby": "magnitude",
    });

    let catalog = client.query(&params)?;
    let Some(quake) = catalog.features.first() else {
        println!("no events matched");
        return Ok(());
    };
    println!("{}", quake.properties.title);

    let detail = client.detail(quake)?;
    for (product_type, products) in &detail.products {
        println!("  {} ({} version(s))", product_type, products.len());
    }

    let Some(origin) = detail.products.get("origin").and_then(|p| p.first()) else {
        println!("no origin product");
        return Ok(());
    };
    for (name, content) in &origin.contents {
        if name.ends_with("quakeml.xml") {
            if let Content::Url(remote) = content {
                let saved = client.download(remote, Path::new("quakeml.xml"))?;
                println!("saved {} ({} bytes)", saved.display(), remote.length);
                break;
            }
        }
    }

    Ok(())
}
