fn main() {
    println!("cargo:rerun-if-env-changed=UNIVERSE_ENGINE_LIB_DIR");

    // Only the `native` feature links libsimulation.
    if std::env::var_os("CARGO_FEATURE_NATIVE").is_none() {
        return;
    }
    if let Some(dir) = std::env::var_os("UNIVERSE_ENGINE_LIB_DIR") {
        println!("cargo:rustc-link-search=native={}", dir.to_string_lossy());
    }
}
