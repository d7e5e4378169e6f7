use std::{env, fs, path::Path};

fn main() {
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set");
    let cargo_toml_path = Path::new(&manifest_dir).join("Cargo.toml");
    println!("cargo:rerun-if-changed={}", cargo_toml_path.display());

    let content = fs::read_to_string(&cargo_toml_path)
        .unwrap_or_else(|e| panic!("Failed to read Cargo.toml: {e}"));
    let parsed: toml::Value =
        toml::from_str(&content).unwrap_or_else(|e| panic!("Failed to parse Cargo.toml: {e}"));
    let pkg = parsed
        .get("package")
        .and_then(|p| p.as_table())
        .expect("Cargo.toml missing [package]");

    let str_field = |key: &str, fallback: &'static str| -> String {
        pkg.get(key)
            .and_then(|v| v.as_str())
            .unwrap_or(fallback)
            .to_string()
    };
    let name = str_field("name", "nodelist");
    let version = str_field("version", "0.0.0");
    let description = str_field("description", "");

    // Default endpoints come from [package.metadata.nodelist].
    let endpoints = pkg
        .get("metadata")
        .and_then(|m| m.get("nodelist"))
        .and_then(|n| n.as_table());
    let endpoint = |key: &str, fallback: &'static str| -> String {
        endpoints
            .and_then(|t| t.get(key))
            .and_then(|v| v.as_str())
            .unwrap_or(fallback)
            .to_string()
    };
    let backend_url = endpoint("backend-url", "http://localhost:8080");
    let ws_url = endpoint("ws-url", "ws://localhost:8080/websocket");
    let topic = endpoint("topic", "/topic/tasks");

    let out_dir = env::var("OUT_DIR").expect("OUT_DIR not set");
    let dest = Path::new(&out_dir).join("pkg_info.rs");
    let contents = format!(
        r#"pub const PKG_NAME: &str = {name:?};
pub const PKG_VERSION: &str = {version:?};
pub const PKG_DESCRIPTION: &str = {description:?};
pub const DEFAULT_BACKEND_URL: &str = {backend_url:?};
pub const DEFAULT_WS_URL: &str = {ws_url:?};
pub const DEFAULT_TOPIC: &str = {topic:?};
"#
    );
    fs::write(&dest, contents).expect("Failed to write pkg_info.rs");
}
