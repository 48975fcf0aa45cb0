fn main() {
    if let Err(err) = ev_registry::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
