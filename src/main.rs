fn main() {
    snipkey_lib::run();
}
