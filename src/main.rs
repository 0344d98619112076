#[tokio::main]
async fn main() {
    if let Err(e) = camp_bookings::run().await {
        eprintln!("camp_bookings failed to start: {}", e);
        std::process::exit(1);
    }
}
