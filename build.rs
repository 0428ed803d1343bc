fn main() {
    // Emits ESP-IDF link args and include paths for espidf builds.
    // Host builds (tests, fuzz) compile without the feature and skip it.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
