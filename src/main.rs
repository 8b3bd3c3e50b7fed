#[tokio::main]
async fn main() -> Result<(), eframe::Error> {
    // Set up logging; RUST_LOG controls the level
    env_logger::init();

    // File dialogs and exports are spawned onto this runtime
    pipe_sketch::run_app()
}
