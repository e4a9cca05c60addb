use dotenvy::dotenv;
use std::env::var;

fn main() {
    dotenv().ok();

    println!("cargo:rustc-check-cfg=cfg(no_key)");
    println!("cargo:rerun-if-env-changed=BEE_API_KEY");
    println!("cargo:rerun-if-env-changed=BEE_API");

    if var("BEE_API_KEY").is_err() || var("BEE_API").is_err() {
        println!("cargo:rustc-cfg=no_key");
    }
}
