fn main() {
    if let Err(err) = product_dashboard::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
