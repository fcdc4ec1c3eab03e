fn main() {
    if let Err(err) = svg_necromancer::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
