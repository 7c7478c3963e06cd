/// Main entry point for the devrunner server
/// Everything lives in the library crate so integration tests can drive it
fn main() {
    devrunner_lib::install_panic_hook();

    if let Err(e) = devrunner_lib::run() {
        eprintln!("devrunner failed: {:#}", e);
        std::process::exit(1);
    }
}
