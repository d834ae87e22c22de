use std::error::Error;

use clap::Parser;
use env_logger::Env;
use zoneview::catalog::CATALOG;
use zoneview::store::LocalStore;
use zoneview::viewer::{Styles, Viewer};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Timestamp in "yyyy-MM-dd HH:mm:ss" format
    #[arg(short, long, default_value = "2024-03-10 12:00:00")]
    datetime: String,

    /// Timezone of the timestamp
    #[arg(short, long, default_value = "America/New_York")]
    zone: String,

    /// Directory holding the preference file
    #[arg(long, default_value = ".")]
    dir: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));
    let args = Args::parse();

    let store = LocalStore::new(&args.dir);
    let mut viewer = Viewer::new(&args.datetime, &args.zone, store, Styles::default())?;
    viewer.mount()?;

    println!("{}", viewer.trigger_text());
    for (zone, time) in viewer.tooltip_rows() {
        println!("  {:<32} {}", zone, time);
    }

    println!();
    println!("First 10 of {} catalog entries:", CATALOG.len());
    for entry in CATALOG.iter().take(10) {
        println!("  {}", entry.label);
    }
    Ok(())
}
