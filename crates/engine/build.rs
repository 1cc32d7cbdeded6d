// crates/engine/build.rs
fn main() {
    let f = |n| std::env::var(format!("CARGO_FEATURE_{}", n)).is_ok();

    if f("OPENSSL") && !f("C2PA") {
        panic!("feature 'openssl' requires 'c2pa'");
    }
    if f("WASM") && f("OPENSSL") {
        println!("cargo:warning=feature 'wasm' selects rust-native crypto; 'openssl' is redundant");
    }
    if f("REMOTE_MANIFESTS") && !f("C2PA") {
        panic!("feature 'remote_manifests' requires 'c2pa'");
    }
}
