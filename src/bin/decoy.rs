fn main() {
    decoy::cli::run();
}
