fn main() {
    if let Err(error) = sheetswitch_core::runtime::run() {
        eprintln!("[sheetswitch-core] runtime failed: {error}");
        std::process::exit(1);
    }
}
