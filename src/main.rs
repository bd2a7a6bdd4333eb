fn main() {
    if let Err(err) = archmap::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
