use std::env;

fn main() {
    // build timestamp
    let build_date = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

    let version = env!("CARGO_PKG_VERSION");

    // Target platform (e.g., x86_64-unknown-linux-gnu)
    let target = env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=RUNTIME_CSV_MIGRATE_VERSION={}", version);
    println!("cargo:rustc-env=BUILD_DATE={}", build_date);
    println!("cargo:rustc-env=TARGET={}", target);
    println!("cargo:rerun-if-changed=build.rs");
}
