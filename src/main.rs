fn main() {
    if let Err(err) = photobook_lib::run() {
        eprintln!("photobook: {err:#}");
        std::process::exit(1);
    }
}
