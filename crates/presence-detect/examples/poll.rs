//! Run with: cargo run -p presence-detect --example poll -- [PORT] [PASSWORD]
//!
//! Reads VLC's HTTP status once and prints the normalized snapshot.

use presence_detect::{PollOutcome, StatusSource, VlcHttpSource};

#[tokio::main]
async fn main() {
    let mut args = std::env::args().skip(1);
    let port = args.next().and_then(|p| p.parse().ok()).unwrap_or(9080);
    let password = args.next();

    let mut source = match VlcHttpSource::new(port, password) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Invalid source: {e}");
            return;
        }
    };

    let (running, message) = source.check_status().await;
    println!("{message}");
    if !running {
        return;
    }

    match source.poll(true).await {
        Ok(PollOutcome::Snapshot(snapshot)) => {
            println!("Status: {}", snapshot.status);
            println!("  Title:    {}", snapshot.media.title);
            if let Some(artist) = &snapshot.media.artist {
                println!("  Artist:   {artist}");
            }
            if let Some(album) = &snapshot.media.album {
                println!("  Album:    {album}");
            }
            println!(
                "  Position: {}/{}s",
                snapshot.playback.position, snapshot.playback.duration
            );
            if let Some(video) = &snapshot.video_info {
                println!("  Video:    {video}");
            }
        }
        Ok(other) => println!("{other:?}"),
        Err(e) => eprintln!("Error: {e}"),
    }
}
